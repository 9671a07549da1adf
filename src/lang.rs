//! Dialect detection and tree-sitter grammar loading

use std::path::Path;

use serde::{Deserialize, Serialize};
use tree_sitter::Language;

use crate::error::AnalysisError;

/// Supported source dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    TypeScript,
    Tsx,
    JavaScript,
    Jsx,
}

/// Whether markup (JSX) can be embedded in the script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    /// Plain script, no markup
    Script,
    /// Script with embedded JSX markup
    Markup,
}

impl Dialect {
    /// Detect dialect from file path extension
    pub fn from_path(path: &Path) -> Result<Self, AnalysisError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| AnalysisError::UnsupportedDialect {
                extension: "none".to_string(),
            })?;

        Self::from_extension(ext)
    }

    /// Detect dialect from file extension string
    pub fn from_extension(ext: &str) -> Result<Self, AnalysisError> {
        match ext.to_lowercase().as_str() {
            "ts" | "mts" | "cts" => Ok(Self::TypeScript),
            "tsx" => Ok(Self::Tsx),
            "js" | "mjs" | "cjs" => Ok(Self::JavaScript),
            "jsx" => Ok(Self::Jsx),
            _ => Err(AnalysisError::UnsupportedDialect {
                extension: ext.to_string(),
            }),
        }
    }

    /// Get the canonical name of the dialect
    pub fn name(&self) -> &'static str {
        match self {
            Self::TypeScript => "typescript",
            Self::Tsx => "tsx",
            Self::JavaScript => "javascript",
            Self::Jsx => "jsx",
        }
    }

    /// Get the tree-sitter Language for parsing
    pub fn tree_sitter_language(&self) -> Language {
        match self {
            Self::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Self::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Self::JavaScript | Self::Jsx => tree_sitter_javascript::LANGUAGE.into(),
        }
    }

    pub fn kind(&self) -> DialectKind {
        if self.supports_jsx() {
            DialectKind::Markup
        } else {
            DialectKind::Script
        }
    }

    /// Check if this dialect supports JSX syntax
    ///
    /// The JavaScript grammar always accepts JSX, so plain `.js` files are
    /// treated as JSX-capable as well.
    pub fn supports_jsx(&self) -> bool {
        matches!(self, Self::Tsx | Self::Jsx | Self::JavaScript)
    }

    /// Check if type annotations are part of the grammar
    pub fn is_typed(&self) -> bool {
        matches!(self, Self::TypeScript | Self::Tsx)
    }

    /// Get common file extensions for this dialect
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::TypeScript => &["ts", "mts", "cts"],
            Self::Tsx => &["tsx"],
            Self::JavaScript => &["js", "mjs", "cjs"],
            Self::Jsx => &["jsx"],
        }
    }
}
