//! # Modekit Syntax
//!
//! Tokenizer backends that a [`ModeRegistry`](modekit_modes::ModeRegistry)
//! resolves lazily, the first time a file of a mode is tokenized.
//!
//! Two backends exist:
//! - [`RuleTokenizer`]: a hand-written scanner configured by word lists
//!   and flags from the mode's rule file. Works for any language.
//! - [`TreeSitterTokenizer`]: real parsing for the grammars compiled in
//!   (rust, javascript, python, json), chosen when the rule file says
//!   `grammar = "..."`.
//!
//! [`RuleFileLoader`] picks between them.
//!
//! ## Learning: Why Keep Both?
//!
//! Tree-sitter is accurate and error-tolerant but every grammar is a C
//! library linked into the binary. Rule files cost nothing to add, so
//! most modes use them and only the languages worth a grammar get one.

pub mod line;
pub mod loader;
pub mod rules;
pub mod treesitter;

pub use line::RuleTokenizer;
pub use loader::RuleFileLoader;
pub use rules::{RuleFile, RuleFlags};
pub use treesitter::{SUPPORTED_GRAMMARS, TreeSitterTokenizer};

use modekit_modes::LoadError;

/// Errors raised while setting up a grammar-backed tokenizer
#[derive(Debug, thiserror::Error)]
pub enum SyntaxError {
    #[error("Unknown grammar: {0}")]
    UnknownGrammar(String),

    #[error("Grammar {grammar} does not fit the linked tree-sitter: {message}")]
    IncompatibleGrammar { grammar: String, message: String },
}

impl From<SyntaxError> for LoadError {
    fn from(err: SyntaxError) -> Self {
        LoadError::UnsupportedGrammar(err.to_string())
    }
}
