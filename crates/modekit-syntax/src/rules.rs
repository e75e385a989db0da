//! Rule files.
//!
//! A mode's `file` property points at a TOML rule file describing how to
//! tokenize it:
//!
//! ```toml
//! keywords = ["fn", "let", "struct"]
//! control = ["if", "else", "match"]
//! types = ["u8", "String"]
//! constants = ["true", "false", "None"]
//! line_comments = ["//"]
//! block_comment = ["/*", "*/"]
//!
//! [flags]
//! lifetimes = true
//! macros = true
//!
//! [properties]
//! indentOpenBrackets = "{"
//! indentCloseBrackets = "}"
//! ```
//!
//! A file with `grammar = "rust"` is tokenized by tree-sitter instead and
//! only its `[properties]` matter.

use std::path::Path;

use modekit_modes::{LoadError, PropertyMap};
use serde::Deserialize;

/// Parsed rule file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RuleFile {
    /// Tree-sitter grammar to use instead of the word rules
    pub grammar: Option<String>,
    pub keywords: Vec<String>,
    pub control: Vec<String>,
    pub types: Vec<String>,
    pub constants: Vec<String>,
    pub builtins: Vec<String>,
    /// Markers that comment out the rest of the line
    pub line_comments: Vec<String>,
    /// Start and end markers of a block comment
    pub block_comment: Option<(String, String)>,
    pub flags: RuleFlags,
    /// Applied to the mode when its tokenizer loads
    pub properties: PropertyMap,
}

/// Optional lexical features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuleFlags {
    /// `'...'` is a string
    pub single_quote_strings: bool,
    /// `` `...` `` is a string
    pub backtick_strings: bool,
    /// `"""..."""` and `'''...'''` may span lines
    pub triple_quote_strings: bool,
    /// `'a` is a lifetime unless closed like a char literal
    pub lifetimes: bool,
    /// `name!` is a macro
    pub macros: bool,
    /// `#[...]` and `@name` are attributes
    pub attributes: bool,
    /// `$name` is a variable
    pub dollar_vars: bool,
    /// `10u8`, `1.5f32`
    pub numeric_suffixes: bool,
}

impl Default for RuleFlags {
    fn default() -> Self {
        Self {
            single_quote_strings: true,
            backtick_strings: false,
            triple_quote_strings: false,
            lifetimes: false,
            macros: false,
            attributes: false,
            dollar_vars: false,
            numeric_suffixes: false,
        }
    }
}

impl RuleFile {
    /// Parses rule-file text. `path` only labels errors.
    pub fn parse(source: &str, path: &Path) -> Result<Self, LoadError> {
        toml::from_str(source).map_err(|e| LoadError::Malformed {
            path: path.to_path_buf(),
            message: e.message().to_string(),
        })
    }

    /// Reads and parses a rule file.
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let source = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&source, path)
    }
}
