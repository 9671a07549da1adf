//! Typed tags over tree-sitter node kind strings

use serde::Serialize;
use tree_sitter::Node;

/// Node kinds the engine cares about; everything else is `Other`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Program,
    FunctionDeclaration,
    GeneratorDeclaration,
    FunctionExpression,
    ArrowFunction,
    Method,
    Class,
    VariableDeclarator,
    LexicalDeclaration,
    VariableDeclaration,
    JsxElement,
    JsxSelfClosingElement,
    JsxFragment,
    JsxAttribute,
    JsxExpression,
    ImportStatement,
    ExportStatement,
    CallExpression,
    IfStatement,
    TernaryExpression,
    SwitchCase,
    ForStatement,
    ForInStatement,
    WhileStatement,
    DoStatement,
    CatchClause,
    BinaryExpression,
    ReturnStatement,
    StatementBlock,
    Identifier,
    Error,
    Other,
}

impl NodeKind {
    /// Anonymous tokens such as the `function` keyword are always `Other`
    pub fn of(node: &Node) -> Self {
        if !node.is_named() {
            return Self::Other;
        }
        Self::from_kind_str(node.kind())
    }

    pub fn from_kind_str(kind: &str) -> Self {
        match kind {
            "program" => Self::Program,
            "function_declaration" => Self::FunctionDeclaration,
            "generator_function_declaration" => Self::GeneratorDeclaration,
            "function_expression" | "generator_function" => Self::FunctionExpression,
            "arrow_function" => Self::ArrowFunction,
            "method_definition" => Self::Method,
            "class_declaration" | "class" | "abstract_class_declaration" => Self::Class,
            "variable_declarator" => Self::VariableDeclarator,
            "lexical_declaration" => Self::LexicalDeclaration,
            "variable_declaration" => Self::VariableDeclaration,
            "jsx_element" => Self::JsxElement,
            "jsx_self_closing_element" => Self::JsxSelfClosingElement,
            "jsx_fragment" => Self::JsxFragment,
            "jsx_attribute" => Self::JsxAttribute,
            "jsx_expression" => Self::JsxExpression,
            "import_statement" => Self::ImportStatement,
            "export_statement" => Self::ExportStatement,
            "call_expression" => Self::CallExpression,
            "if_statement" => Self::IfStatement,
            "ternary_expression" => Self::TernaryExpression,
            "switch_case" => Self::SwitchCase,
            "for_statement" => Self::ForStatement,
            "for_in_statement" => Self::ForInStatement,
            "while_statement" => Self::WhileStatement,
            "do_statement" => Self::DoStatement,
            "catch_clause" => Self::CatchClause,
            "binary_expression" => Self::BinaryExpression,
            "return_statement" => Self::ReturnStatement,
            "statement_block" => Self::StatementBlock,
            "identifier" => Self::Identifier,
            "ERROR" => Self::Error,
            _ => Self::Other,
        }
    }

    /// Anything that introduces its own function body
    pub fn is_function_like(&self) -> bool {
        matches!(
            self,
            Self::FunctionDeclaration
                | Self::GeneratorDeclaration
                | Self::FunctionExpression
                | Self::ArrowFunction
                | Self::Method
        )
    }

    /// Function-like nodes that rebind `this` (everything but arrows)
    pub fn binds_this(&self) -> bool {
        self.is_function_like() && *self != Self::ArrowFunction
    }

    pub fn is_loop(&self) -> bool {
        matches!(
            self,
            Self::ForStatement | Self::ForInStatement | Self::WhileStatement | Self::DoStatement
        )
    }

    pub fn is_jsx(&self) -> bool {
        matches!(
            self,
            Self::JsxElement | Self::JsxSelfClosingElement | Self::JsxFragment
        )
    }
}

/// Statement kinds that may appear directly in a block or program body
pub fn is_statement(kind: &str) -> bool {
    kind.ends_with("_statement")
        || kind.ends_with("_declaration")
        || matches!(kind, "statement_block" | "empty_statement")
}

/// Kinds that bound a statement list
pub fn is_statement_container(kind: &str) -> bool {
    matches!(kind, "program" | "statement_block" | "switch_case" | "switch_default")
}

/// Expression-ish kinds that can be lifted into a variable
pub fn is_expression(kind: &str) -> bool {
    matches!(
        kind,
        "identifier"
            | "number"
            | "string"
            | "template_string"
            | "true"
            | "false"
            | "null"
            | "undefined"
            | "regex"
            | "array"
            | "object"
            | "call_expression"
            | "new_expression"
            | "member_expression"
            | "subscript_expression"
            | "binary_expression"
            | "unary_expression"
            | "ternary_expression"
            | "parenthesized_expression"
            | "arrow_function"
            | "function_expression"
            | "await_expression"
            | "as_expression"
            | "satisfies_expression"
            | "non_null_expression"
            | "jsx_element"
            | "jsx_self_closing_element"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(NodeKind::from_kind_str("arrow_function"), NodeKind::ArrowFunction);
        assert_eq!(NodeKind::from_kind_str("function_expression"), NodeKind::FunctionExpression);
        assert_eq!(NodeKind::from_kind_str("function"), NodeKind::Other);
        assert_eq!(NodeKind::from_kind_str("something_else"), NodeKind::Other);
    }

    #[test]
    fn test_this_binding_kinds() {
        assert!(NodeKind::FunctionDeclaration.binds_this());
        assert!(!NodeKind::ArrowFunction.binds_this());
        assert!(NodeKind::ArrowFunction.is_function_like());
    }

    #[test]
    fn test_statement_helpers() {
        assert!(is_statement("if_statement"));
        assert!(is_statement("lexical_declaration"));
        assert!(!is_statement("identifier"));
        assert!(is_statement_container("statement_block"));
        assert!(is_expression("call_expression"));
    }
}
