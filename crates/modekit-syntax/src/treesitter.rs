//! Tree-sitter backed tokenizer.
//!
//! ## Learning: FFI Behind a Lock
//!
//! Tree-sitter is a C library. A `Parser` is `Send` but not `Sync`, while
//! a mode's tokenizer is shared by every buffer of that mode. Wrapping the
//! parser in a `Mutex` gives `Sync` at the cost of parsing one text at a
//! time per mode.
//!
//! [`tokenize_lines`](Tokenizer::tokenize_lines) parses the whole text
//! once so constructs spanning lines are classified correctly.
//! [`tokenize_line`](Tokenizer::tokenize_line) parses the line on its own;
//! tree-sitter recovers from the missing context well enough for
//! incremental highlighting.

use std::fmt;

use modekit_modes::{LineState, Token, TokenKind, TokenizedLine, Tokenizer};
use parking_lot::Mutex;
use tree_sitter::{Language, Node, Parser};

use crate::SyntaxError;

/// Grammars compiled into this crate.
pub const SUPPORTED_GRAMMARS: &[&str] = &["rust", "javascript", "python", "json"];

/// Tokenizer classifying text with a tree-sitter grammar.
pub struct TreeSitterTokenizer {
    grammar: String,
    parser: Mutex<Parser>,
}

impl TreeSitterTokenizer {
    /// Creates a tokenizer for one of [`SUPPORTED_GRAMMARS`] (or an alias).
    pub fn new(grammar: &str) -> Result<Self, SyntaxError> {
        let language = language(grammar)?;

        let mut parser = Parser::new();
        parser
            .set_language(&language)
            .map_err(|e| SyntaxError::IncompatibleGrammar {
                grammar: grammar.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            grammar: grammar.to_string(),
            parser: Mutex::new(parser),
        })
    }

    /// The grammar name this tokenizer was built for.
    pub fn grammar(&self) -> &str {
        &self.grammar
    }

    /// Classified byte ranges of `source`, in document order.
    fn highlight(&self, source: &str) -> Vec<(TokenKind, usize, usize)> {
        let Some(tree) = self.parser.lock().parse(source, None) else {
            tracing::warn!(grammar = %self.grammar, "Tree-sitter parse was cancelled");
            return Vec::new();
        };

        let mut spans = Vec::new();
        collect(tree.root_node(), &mut spans);
        spans
    }
}

impl fmt::Debug for TreeSitterTokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeSitterTokenizer")
            .field("grammar", &self.grammar)
            .finish_non_exhaustive()
    }
}

impl Tokenizer for TreeSitterTokenizer {
    fn tokenize_line(&self, line: &str, state: &LineState) -> TokenizedLine {
        let tokens = self
            .highlight(line)
            .into_iter()
            .map(|(kind, start, end)| Token {
                kind,
                range: start..end,
            })
            .collect();

        TokenizedLine {
            tokens,
            state: state.clone(),
        }
    }

    fn tokenize_lines<'a>(&self, lines: &mut dyn Iterator<Item = &'a str>) -> Vec<TokenizedLine> {
        let lines: Vec<&str> = lines.collect();
        let source = lines.join("\n");

        let mut starts = Vec::with_capacity(lines.len());
        let mut offset = 0;
        for line in &lines {
            starts.push(offset);
            offset += line.len() + 1;
        }

        let mut out: Vec<TokenizedLine> = vec![TokenizedLine::default(); lines.len()];
        for (kind, start, end) in self.highlight(&source) {
            // Index of the line containing `start`
            let mut idx = starts.partition_point(|&s| s <= start).saturating_sub(1);
            while idx < lines.len() && starts[idx] < end {
                let line_start = starts[idx];
                let line_end = line_start + lines[idx].len();
                let from = start.max(line_start);
                let to = end.min(line_end);
                if to > from {
                    out[idx].tokens.push(Token {
                        kind,
                        range: from - line_start..to - line_start,
                    });
                }
                idx += 1;
            }
        }
        out
    }
}

/// Walks the tree, emitting the outermost node of each classified kind.
fn collect(node: Node, spans: &mut Vec<(TokenKind, usize, usize)>) {
    if let Some(kind) = token_kind(&node) {
        spans.push((kind, node.start_byte(), node.end_byte()));
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect(child, spans);
    }
}

/// Maps common node kinds across the bundled grammars to token kinds.
fn token_kind(node: &Node) -> Option<TokenKind> {
    let kind = match node.kind() {
        "fn" | "let" | "mut" | "const" | "static" | "pub" | "use" | "mod" | "struct" | "enum"
        | "impl" | "trait" | "type" | "where" | "unsafe" | "extern" | "crate" | "self"
        | "super" | "as" | "in" | "ref" | "move" | "dyn" | "function" | "class" | "def"
        | "import" | "from" | "with" | "lambda" | "var" | "new" | "delete" | "typeof"
        | "instanceof" | "void" | "export" | "extends" => TokenKind::Keyword,

        "if" | "else" | "match" | "for" | "while" | "loop" | "break" | "continue" | "return"
        | "async" | "await" | "yield" | "try" | "except" | "finally" | "throw" | "catch"
        | "switch" | "case" | "default" => TokenKind::Control,

        "true" | "false" => TokenKind::Boolean,
        "null" | "none" | "None" | "undefined" => TokenKind::Constant,

        "string_literal" | "raw_string_literal" | "char_literal" | "string"
        | "template_string" => TokenKind::String,

        "integer_literal" | "float_literal" | "number" | "integer" | "float" => TokenKind::Number,

        "line_comment" | "block_comment" | "comment" => TokenKind::Comment,

        "type_identifier" | "primitive_type" => TokenKind::Type,

        "attribute_item" | "inner_attribute_item" | "decorator" => TokenKind::Attribute,

        "lifetime" => TokenKind::Lifetime,

        "identifier" | "field_identifier" | "property_identifier" => {
            match node.parent().map(|p| p.kind()) {
                Some(
                    "function_item" | "function_definition" | "function_declaration"
                    | "method_definition" | "call_expression" | "call",
                ) => TokenKind::Function,
                Some("macro_invocation") => TokenKind::Macro,
                _ => return None,
            }
        }

        _ => return None,
    };
    Some(kind)
}

fn language(grammar: &str) -> Result<Language, SyntaxError> {
    match grammar {
        "rust" | "rs" => Ok(tree_sitter_rust::LANGUAGE.into()),
        "javascript" | "js" | "jsx" => Ok(tree_sitter_javascript::LANGUAGE.into()),
        "python" | "py" => Ok(tree_sitter_python::LANGUAGE.into()),
        "json" => Ok(tree_sitter_json::LANGUAGE.into()),
        _ => Err(SyntaxError::UnknownGrammar(grammar.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans<'a>(line: &'a str, tokenized: &'a TokenizedLine) -> Vec<(TokenKind, &'a str)> {
        tokenized.spans(line).collect()
    }

    #[test]
    fn test_rust_line() {
        let t = TreeSitterTokenizer::new("rust").unwrap();
        let line = "fn main() { let x = 42; }";
        let out = t.tokenize_line(line, &LineState::default());
        let found = spans(line, &out);

        assert!(found.contains(&(TokenKind::Keyword, "fn")));
        assert!(found.contains(&(TokenKind::Function, "main")));
        assert!(found.contains(&(TokenKind::Number, "42")));
    }

    #[test]
    fn test_unknown_grammar() {
        let err = TreeSitterTokenizer::new("cobol").unwrap_err();
        assert!(matches!(err, SyntaxError::UnknownGrammar(ref name) if name == "cobol"));
    }

    #[test]
    fn test_multi_line_comment_split_per_line() {
        let t = TreeSitterTokenizer::new("rust").unwrap();
        let lines = ["/* one", "two */", "let y = 1;"];
        let out = t.tokenize_lines(&mut lines.iter().copied());

        assert_eq!(out.len(), 3);
        assert_eq!(spans(lines[0], &out[0]), vec![(TokenKind::Comment, "/* one")]);
        assert_eq!(spans(lines[1], &out[1]), vec![(TokenKind::Comment, "two */")]);
        assert!(spans(lines[2], &out[2]).contains(&(TokenKind::Keyword, "let")));
    }

    #[test]
    fn test_python_and_json() {
        let py = TreeSitterTokenizer::new("python").unwrap();
        let line = "def f(): return 'x'";
        let out = py.tokenize_line(line, &LineState::default());
        assert!(spans(line, &out).contains(&(TokenKind::Keyword, "def")));

        let json = TreeSitterTokenizer::new("json").unwrap();
        let line = r#"{"a": true}"#;
        let out = json.tokenize_line(line, &LineState::default());
        assert!(spans(line, &out).contains(&(TokenKind::Boolean, "true")));
    }
}
