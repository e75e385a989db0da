//! The tokenizing capability a mode resolves lazily.
//!
//! Tokenizers are built elsewhere (see `modekit-syntax`). This module only
//! fixes the shape: a [`Tokenizer`] classifies one line at a time, and a
//! [`TokenizerLoader`] builds one for a given mode.

use std::fmt;
use std::ops::Range;
use std::path::PathBuf;
use std::sync::Arc;

use crate::mode::ModeDescriptor;

/// Syntax category of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Keyword,
    Control,
    Type,
    Function,
    String,
    Number,
    Comment,
    Operator,
    Punctuation,
    Attribute,
    Constant,
    Boolean,
    Macro,
    Lifetime,
    Tag,
    Property,
    Variable,
    Default,
}

impl TokenKind {
    /// Returns the theme color key for this kind.
    pub fn theme_key(&self) -> &'static str {
        match self {
            TokenKind::Keyword | TokenKind::Control => "keyword",
            TokenKind::String => "string",
            TokenKind::Number | TokenKind::Boolean => "number",
            TokenKind::Comment => "comment",
            TokenKind::Function | TokenKind::Macro => "function",
            TokenKind::Type => "type_name",
            TokenKind::Variable | TokenKind::Property | TokenKind::Default => "variable",
            TokenKind::Constant | TokenKind::Lifetime => "constant",
            TokenKind::Operator => "operator",
            TokenKind::Punctuation => "punctuation",
            TokenKind::Attribute => "attribute",
            TokenKind::Tag => "tag",
        }
    }
}

/// A classified byte range of one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub range: Range<usize>,
}

/// What carries over from one line to the next.
///
/// Tokenizing a line needs only the line and the previous line's state,
/// so an editor can restart at any line whose state it kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LineState {
    /// Inside a block comment that has not been closed yet
    pub in_block_comment: bool,
    /// Inside a multi-line string opened by this quote character
    pub open_string: Option<char>,
}

/// Tokens of one line plus the state to feed the next line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenizedLine {
    pub tokens: Vec<Token>,
    pub state: LineState,
}

impl TokenizedLine {
    /// Iterates tokens together with the text they cover.
    pub fn spans<'a>(&'a self, line: &'a str) -> impl Iterator<Item = (TokenKind, &'a str)> + 'a {
        self.tokens
            .iter()
            .filter_map(move |t| line.get(t.range.clone()).map(|text| (t.kind, text)))
    }
}

/// Classifies text into tokens for one mode.
///
/// ## Learning: Trait Objects Behind `Arc`
///
/// A mode caches `Arc<dyn Tokenizer>` and hands out clones. Every open
/// buffer of that mode shares one tokenizer, so implementations take
/// `&self` and keep per-buffer progress in [`LineState`] instead.
pub trait Tokenizer: Send + Sync + fmt::Debug {
    /// Tokenizes `line`, continuing from `state`.
    fn tokenize_line(&self, line: &str, state: &LineState) -> TokenizedLine;

    /// Tokenizes consecutive lines starting from the default state.
    fn tokenize_lines<'a>(&self, lines: &mut dyn Iterator<Item = &'a str>) -> Vec<TokenizedLine> {
        let mut state = LineState::default();
        let mut out = Vec::new();
        for line in lines {
            let tokenized = self.tokenize_line(line, &state);
            state = tokenized.state.clone();
            out.push(tokenized);
        }
        out
    }
}

/// Builds tokenizers for modes.
pub trait TokenizerLoader: Send + Sync {
    /// Builds the tokenizer for `mode`.
    ///
    /// Called with the mode's tokenizer slot locked, so it must not ask
    /// the same mode for its tokenizer.
    fn load_tokenizer(&self, mode: &ModeDescriptor) -> Result<Arc<dyn Tokenizer>, LoadError>;
}

/// Why a tokenizer could not be built.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("mode {0} has no rule file")]
    NoRuleFile(String),

    #[error("cannot read rule file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed rule file {path}: {message}")]
    Malformed { path: PathBuf, message: String },

    #[error("unsupported grammar: {0}")]
    UnsupportedGrammar(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct WordTokenizer;

    impl Tokenizer for WordTokenizer {
        fn tokenize_line(&self, line: &str, state: &LineState) -> TokenizedLine {
            let mut tokens = Vec::new();
            let mut start = None;
            for (i, c) in line.char_indices() {
                match (c.is_whitespace(), start) {
                    (false, None) => start = Some(i),
                    (true, Some(s)) => {
                        tokens.push(Token {
                            kind: TokenKind::Default,
                            range: s..i,
                        });
                        start = None;
                    }
                    _ => {}
                }
            }
            if let Some(s) = start {
                tokens.push(Token {
                    kind: TokenKind::Default,
                    range: s..line.len(),
                });
            }
            TokenizedLine {
                tokens,
                state: state.clone(),
            }
        }
    }

    #[test]
    fn test_spans_pair_kind_and_text() {
        let line = "let x";
        let tokenized = WordTokenizer.tokenize_line(line, &LineState::default());
        let spans: Vec<_> = tokenized.spans(line).collect();
        assert_eq!(spans, vec![(TokenKind::Default, "let"), (TokenKind::Default, "x")]);
    }

    #[test]
    fn test_tokenize_lines_threads_state() {
        let lines = ["a b", "c"];
        let out = WordTokenizer.tokenize_lines(&mut lines.iter().copied());
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].tokens.len(), 1);
    }

    #[test]
    fn test_theme_keys() {
        assert_eq!(TokenKind::Control.theme_key(), "keyword");
        assert_eq!(TokenKind::Boolean.theme_key(), "number");
    }
}
