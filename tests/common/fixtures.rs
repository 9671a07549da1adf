//! Source fixtures used across test modules

pub const COUNTER_TSX: &str = r#"import React, { useState, useEffect } from 'react';
import { format } from './format';
import _ from 'lodash';

interface CounterProps {
  label: string;
  step?: number;
}

export function Counter({ label, step = 1 }: CounterProps) {
  const [count, setCount] = useState(0);
  useEffect(() => {
    document.title = format(label, count);
  }, [label, count]);
  return (
    <div className="counter">
      <span>{label}</span>
      <button onClick={() => setCount(count + step)}>+</button>
    </div>
  );
}

const describe = (value: number) => {
  if (value > 10) {
    return 'many';
  }
  return value === 0 ? 'none' : 'some';
};

export default describe;
"#;

pub const UTILS_TS: &str = r#"import { b } from './b';
import { a } from './a';

export function classify(n: number): string {
  if (n < 0) {
    return 'negative';
  } else if (n === 0) {
    return 'zero';
  }
  for (const d of [2, 3, 5]) {
    if (n % d === 0 && n !== d) {
      return 'composite';
    }
  }
  return a(b(n));
}

function unused() {
  return 1;
}
"#;

pub const LIST_JSX: &str = r#"export function List({ items, onSelect }) {
  return (
    <ul>
      {items.map((item) => (
        <li key={item.id} onClick={() => onSelect(item)}>
          <strong>{item.title}</strong>
        </li>
      ))}
    </ul>
  );
}
"#;

pub const ALL: [(&str, &str); 3] = [("Counter.tsx", COUNTER_TSX), ("utils.ts", UTILS_TS), ("List.jsx", LIST_JSX)];
