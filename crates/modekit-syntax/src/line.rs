//! Rule-driven line tokenizer.
//!
//! Scans one line left to right, classifying comments, strings, numbers,
//! identifiers, operators and punctuation. Word lists and lexical flags
//! come from a [`RuleFile`]; block comments and triple-quoted strings that
//! stay open carry over to the next line through [`LineState`].

use std::collections::HashSet;

use modekit_modes::{LineState, Token, TokenKind, TokenizedLine, Tokenizer};

use crate::rules::{RuleFile, RuleFlags};

/// Tokenizer built from a rule file.
#[derive(Debug, Clone)]
pub struct RuleTokenizer {
    keywords: HashSet<String>,
    control: HashSet<String>,
    types: HashSet<String>,
    constants: HashSet<String>,
    builtins: HashSet<String>,
    line_comments: Vec<String>,
    block_comment: Option<(String, String)>,
    flags: RuleFlags,
}

impl RuleTokenizer {
    /// Builds a tokenizer from parsed rules.
    pub fn new(rules: &RuleFile) -> Self {
        let set = |words: &[String]| words.iter().cloned().collect::<HashSet<_>>();
        Self {
            keywords: set(&rules.keywords),
            control: set(&rules.control),
            types: set(&rules.types),
            constants: set(&rules.constants),
            builtins: set(&rules.builtins),
            line_comments: rules
                .line_comments
                .iter()
                .filter(|m| !m.is_empty())
                .cloned()
                .collect(),
            block_comment: rules
                .block_comment
                .clone()
                .filter(|(start, end)| !start.is_empty() && !end.is_empty()),
            flags: rules.flags,
        }
    }

    fn classify_word(&self, word: &str, next: Option<u8>, after_next: Option<u8>) -> TokenKind {
        if self.constants.contains(word) {
            if matches!(word, "true" | "false" | "True" | "False") {
                TokenKind::Boolean
            } else {
                TokenKind::Constant
            }
        } else if self.control.contains(word) {
            TokenKind::Control
        } else if self.keywords.contains(word) {
            TokenKind::Keyword
        } else if self.types.contains(word) {
            TokenKind::Type
        } else if self.builtins.contains(word) {
            TokenKind::Function
        } else if next == Some(b'(') || (next == Some(b':') && after_next == Some(b':')) {
            TokenKind::Function
        } else if word.len() > 1 && word.starts_with(|c: char| c.is_ascii_uppercase()) {
            if word.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_') {
                TokenKind::Constant
            } else {
                TokenKind::Type
            }
        } else {
            TokenKind::Default
        }
    }
}

impl Tokenizer for RuleTokenizer {
    fn tokenize_line(&self, line: &str, state: &LineState) -> TokenizedLine {
        let mut scan = Scan {
            rules: self,
            line,
            bytes: line.as_bytes(),
            tokens: Vec::new(),
            state: state.clone(),
        };
        scan.run();
        TokenizedLine {
            tokens: scan.tokens,
            state: scan.state,
        }
    }
}

/// One pass over one line.
struct Scan<'a> {
    rules: &'a RuleTokenizer,
    line: &'a str,
    bytes: &'a [u8],
    tokens: Vec<Token>,
    state: LineState,
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

impl Scan<'_> {
    fn push(&mut self, kind: TokenKind, start: usize, end: usize) {
        if end > start {
            self.tokens.push(Token {
                kind,
                range: start..end,
            });
        }
    }

    fn at(&self, i: usize) -> Option<u8> {
        self.bytes.get(i).copied()
    }

    fn run(&mut self) {
        let len = self.bytes.len();
        let mut i = 0;

        // Block comment left open by the previous line
        if self.state.in_block_comment {
            let Some((_, end)) = self.rules.block_comment.as_ref() else {
                self.state.in_block_comment = false;
                return self.scan_from(0);
            };
            match self.line.find(end.as_str()) {
                Some(pos) => {
                    i = pos + end.len();
                    self.push(TokenKind::Comment, 0, i);
                    self.state.in_block_comment = false;
                }
                None => {
                    self.push(TokenKind::Comment, 0, len);
                    return;
                }
            }
        }

        // Multi-line string left open by the previous line
        if let Some(delim) = self.state.open_string {
            let triple: String = [delim; 3].iter().collect();
            match self.line[i..].find(&triple) {
                Some(pos) => {
                    let end = i + pos + 3;
                    self.push(TokenKind::String, i, end);
                    self.state.open_string = None;
                    i = end;
                }
                None => {
                    self.push(TokenKind::String, i, len);
                    return;
                }
            }
        }

        self.scan_from(i);
    }

    fn scan_from(&mut self, mut i: usize) {
        let rules = self.rules;
        let flags = rules.flags;
        let line = self.line;
        let bytes = self.bytes;
        let len = bytes.len();

        while i < len {
            let b = bytes[i];

            if b.is_ascii_whitespace() {
                i += 1;
                continue;
            }

            // Block comments go first so `--[[` wins over `--`
            if let Some((start_marker, end_marker)) = rules.block_comment.as_ref() {
                if line[i..].starts_with(start_marker.as_str()) {
                    let start = i;
                    i += start_marker.len();
                    match line[i..].find(end_marker.as_str()) {
                        Some(pos) => {
                            i += pos + end_marker.len();
                            self.push(TokenKind::Comment, start, i);
                            continue;
                        }
                        None => {
                            self.state.in_block_comment = true;
                            self.push(TokenKind::Comment, start, len);
                            return;
                        }
                    }
                }
            }

            if rules.line_comments.iter().any(|m| line[i..].starts_with(m.as_str())) {
                self.push(TokenKind::Comment, i, len);
                return;
            }

            // #[attr] and #![attr]
            if flags.attributes
                && b == b'#'
                && (self.at(i + 1) == Some(b'[')
                    || (self.at(i + 1) == Some(b'!') && self.at(i + 2) == Some(b'[')))
            {
                let start = i;
                let mut depth = 0;
                while i < len {
                    if bytes[i] == b'[' {
                        depth += 1;
                    } else if bytes[i] == b']' {
                        depth -= 1;
                        if depth == 0 {
                            i += 1;
                            break;
                        }
                    }
                    i += 1;
                }
                self.push(TokenKind::Attribute, start, i);
                continue;
            }

            // @Annotation
            if flags.attributes && b == b'@' {
                let start = i;
                i += 1;
                while i < len && is_word_byte(bytes[i]) {
                    i += 1;
                }
                if i > start + 1 {
                    self.push(TokenKind::Attribute, start, i);
                    continue;
                }
                i = start;
            }

            if flags.triple_quote_strings
                && (b == b'"' || b == b'\'')
                && self.at(i + 1) == Some(b)
                && self.at(i + 2) == Some(b)
            {
                let delim = b as char;
                let triple: String = [delim; 3].iter().collect();
                let start = i;
                i += 3;
                match line[i..].find(&triple) {
                    Some(pos) => {
                        i += pos + 3;
                        self.push(TokenKind::String, start, i);
                        continue;
                    }
                    None => {
                        self.state.open_string = Some(delim);
                        self.push(TokenKind::String, start, len);
                        return;
                    }
                }
            }

            if b == b'"' {
                let start = i;
                i = self.skip_quoted(i + 1, b'"');
                self.push(TokenKind::String, start, i);
                continue;
            }

            if flags.single_quote_strings && b == b'\'' {
                if flags.lifetimes {
                    if let Some(end) = self.lifetime_or_char(i) {
                        let kind = if bytes[end - 1] == b'\'' {
                            TokenKind::String
                        } else {
                            TokenKind::Lifetime
                        };
                        self.push(kind, i, end);
                        i = end;
                        continue;
                    }
                }
                let start = i;
                i = self.skip_quoted(i + 1, b'\'');
                self.push(TokenKind::String, start, i);
                continue;
            }

            if flags.backtick_strings && b == b'`' {
                let start = i;
                i = self.skip_quoted(i + 1, b'`');
                self.push(TokenKind::String, start, i);
                continue;
            }

            if b.is_ascii_digit() || (b == b'.' && self.at(i + 1).is_some_and(|n| n.is_ascii_digit())) {
                let start = i;
                i = self.skip_number(i);
                self.push(TokenKind::Number, start, i);
                continue;
            }

            if flags.dollar_vars && b == b'$' {
                let start = i;
                i += 1;
                while i < len && is_word_byte(bytes[i]) {
                    i += 1;
                }
                self.push(TokenKind::Variable, start, i);
                continue;
            }

            if b.is_ascii_alphabetic() || b == b'_' {
                let start = i;
                while i < len && is_word_byte(bytes[i]) {
                    i += 1;
                }
                if flags.macros && self.at(i) == Some(b'!') && self.at(i + 1) != Some(b'=') {
                    i += 1;
                    self.push(TokenKind::Macro, start, i);
                    continue;
                }
                let kind = rules.classify_word(&line[start..i], self.at(i), self.at(i + 1));
                self.push(kind, start, i);
                continue;
            }

            if matches!(
                b,
                b'=' | b'!' | b'<' | b'>' | b'+' | b'-' | b'*' | b'/' | b'%' | b'&' | b'|' | b'^' | b'~' | b'?'
            ) {
                let start = i;
                i += 1;
                if i < len && matches!(bytes[i], b'=' | b'>' | b'<' | b'&' | b'|' | b'.') {
                    i += 1;
                    if i < len && bytes[i] == b'=' {
                        i += 1;
                    }
                }
                self.push(TokenKind::Operator, start, i);
                continue;
            }

            if matches!(b, b'(' | b')' | b'{' | b'}' | b'[' | b']' | b';' | b',' | b'.' | b':') {
                self.push(TokenKind::Punctuation, i, i + 1);
                i += 1;
                continue;
            }

            // Anything else, one whole character
            let width = line[i..].chars().next().map_or(1, char::len_utf8);
            self.push(TokenKind::Default, i, i + width);
            i += width;
        }
    }

    /// Index just past the closing `quote`, or the line end.
    fn skip_quoted(&self, mut i: usize, quote: u8) -> usize {
        let len = self.bytes.len();
        while i < len {
            match self.bytes[i] {
                b'\\' if i + 1 < len => i += 2,
                b if b == quote => return i + 1,
                _ => i += 1,
            }
        }
        len
    }

    /// End of `'a` (lifetime) or `'a'` / `'\n'` (char literal) at `i`.
    fn lifetime_or_char(&self, i: usize) -> Option<usize> {
        let bytes = self.bytes;
        let len = bytes.len();
        match self.at(i + 1)? {
            b'\\' => {
                let mut j = i + 2;
                while j < len && bytes[j] != b'\'' {
                    j += 1;
                }
                Some((j + 1).min(len))
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                let mut j = i + 1;
                while j < len && is_word_byte(bytes[j]) {
                    j += 1;
                }
                if j < len && bytes[j] == b'\'' {
                    j += 1;
                }
                Some(j)
            }
            _ => None,
        }
    }

    fn skip_number(&self, mut i: usize) -> usize {
        let bytes = self.bytes;
        let len = bytes.len();

        let radix = match (bytes[i], self.at(i + 1)) {
            (b'0', Some(b'x' | b'X')) => Some(16),
            (b'0', Some(b'o' | b'O')) => Some(8),
            (b'0', Some(b'b' | b'B')) => Some(2),
            _ => None,
        };

        if let Some(radix) = radix {
            i += 2;
            while i < len && ((bytes[i] as char).is_digit(radix) || bytes[i] == b'_') {
                i += 1;
            }
        } else {
            while i < len
                && (bytes[i].is_ascii_digit() || matches!(bytes[i], b'.' | b'_' | b'e' | b'E'))
            {
                if matches!(bytes[i], b'e' | b'E') && matches!(self.at(i + 1), Some(b'+' | b'-')) {
                    i += 1;
                }
                i += 1;
            }
        }

        if self.rules.flags.numeric_suffixes && matches!(self.at(i), Some(b'u' | b'i' | b'f')) {
            while i < len && is_word_byte(bytes[i]) {
                i += 1;
            }
        }
        i
    }
}
