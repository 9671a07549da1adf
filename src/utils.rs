//! Small shared helpers: content hashing and UTF-8 safe truncation

/// FNV-1a 64-bit hash of a string
///
/// Stable across runs and platforms, which is all a cache key needs.
pub fn fnv1a_hash(s: &str) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = OFFSET_BASIS;
    for byte in s.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// Content fingerprint used for cache keys and change detection
pub fn content_hash(text: &str) -> String {
    format!("{:016x}", fnv1a_hash(text))
}

/// Safely truncate a string at a UTF-8 char boundary.
///
/// # Examples
/// ```
/// use frontend_intel::utils::truncate_to_char_boundary;
///
/// assert_eq!(truncate_to_char_boundary("hello world", 5), "hello");
/// let s = "abc੨def"; // '੨' spans bytes 3-5
/// assert_eq!(truncate_to_char_boundary(s, 4), "abc");
/// ```
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Truncate and append "..." when something was cut
pub fn truncate_with_ellipsis(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        s.to_string()
    } else {
        format!("{}...", truncate_to_char_boundary(s, max_bytes))
    }
}

/// Collapse whitespace runs so source snippets fit on one line
pub fn one_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv1a_known_values() {
        assert_eq!(fnv1a_hash(""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a_hash("a"), 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn test_content_hash_is_hex_and_stable() {
        let h1 = content_hash("const x = 1;");
        let h2 = content_hash("const x = 1;");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 16);
        assert_ne!(h1, content_hash("const x = 2;"));
    }

    #[test]
    fn test_truncate_utf8_3byte() {
        let s = "abc੨def";
        assert_eq!(truncate_to_char_boundary(s, 3), "abc");
        assert_eq!(truncate_to_char_boundary(s, 5), "abc");
        assert_eq!(truncate_to_char_boundary(s, 6), "abc੨");
    }

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("hello", 100), "hello");
        assert_eq!(truncate_with_ellipsis("hello world", 5), "hello...");
    }

    #[test]
    fn test_one_line() {
        assert_eq!(one_line("a\n   b\tc"), "a b c");
    }
}
