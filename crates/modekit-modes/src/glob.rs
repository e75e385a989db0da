//! Shell-style globs compiled to anchored, case-insensitive patterns.
//!
//! ## Learning: Translating Instead of Interpreting
//!
//! Rather than writing a glob matcher, a glob is rewritten into regex
//! syntax once and handed to the regex engine:
//!
//! | glob        | pattern            |
//! |-------------|--------------------|
//! | `*`         | `.*`               |
//! | `?`         | `.`                |
//! | `[!ab]`     | `[^ab]`            |
//! | `{c,cpp}`   | `(?:c\|cpp)`       |
//! | `{!foo}`    | `(?!foo).*`        |
//! | `\*`        | `\*`               |
//! | `(re)x+`    | `x+` (verbatim)    |
//!
//! `fancy-regex` is used because negated groups become a lookahead,
//! which the plain `regex` crate does not support. A comma separates
//! alternatives in negated groups too, so `{!a,b}*.c` rejects both
//! `a.c` and `b.c`.
//!
//! ## Path Separators
//!
//! When compiling for paths, every literal `/` or `\` becomes `[/\\]`, so
//! `src/*.rs` matches `src\main.rs` too. A glob without any separator is a
//! filename glob and gets an optional `(?:.*[/\\])?` directory prefix, so
//! `*.rs` matches both `main.rs` and `/home/me/main.rs`.

use fancy_regex::Regex;

/// Character class matching either path separator.
const SEPARATOR_CLASS: &str = r"[/\\]";

/// Optional leading directories for filename-only globs.
const DIRECTORY_PREFIX: &str = r"(?:.*[/\\])?";

/// Prefix marking the rest of a glob as a raw regular expression.
const RAW_PREFIX: &str = "(re)";

/// A glob that failed to compile.
#[derive(Debug, thiserror::Error)]
#[error("invalid glob `{glob}` (pattern `{pattern}`): {source}")]
pub struct GlobError {
    pub glob: String,
    pub pattern: String,
    #[source]
    pub source: Box<fancy_regex::Error>,
}

/// A compiled glob.
///
/// Always matches the whole input, ignoring case.
#[derive(Debug, Clone)]
pub struct GlobMatcher {
    glob: String,
    regex: Regex,
}

impl GlobMatcher {
    /// Compiles `glob`.
    ///
    /// With `match_against_path` the separator rules described in the module
    /// docs apply; without it (first-line globs) separators are plain text.
    pub fn compile(glob: &str, match_against_path: bool) -> Result<Self, GlobError> {
        let translated = translate(glob, match_against_path);

        let body = if match_against_path && !translated.has_separator {
            format!("{DIRECTORY_PREFIX}(?:{})", translated.pattern)
        } else {
            translated.pattern
        };
        let pattern = format!("(?i)^(?:{body})$");

        match Regex::new(&pattern) {
            Ok(regex) => Ok(Self {
                glob: glob.to_string(),
                regex,
            }),
            Err(e) => Err(GlobError {
                glob: glob.to_string(),
                pattern,
                source: Box::new(e),
            }),
        }
    }

    /// Returns true if the whole of `text` matches.
    pub fn is_match(&self, text: &str) -> bool {
        match self.regex.is_match(text) {
            Ok(matched) => matched,
            Err(e) => {
                // Backtracking limit on pathological input
                tracing::debug!("Glob `{}` gave up on {:?}: {}", self.glob, text, e);
                false
            }
        }
    }

    /// The glob this matcher was compiled from.
    pub fn glob(&self) -> &str {
        &self.glob
    }

    /// The final anchored pattern handed to the regex engine.
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }
}

/// Translates a glob to unanchored regex syntax, with no path handling.
pub fn glob_to_pattern(glob: &str) -> String {
    translate(glob, false).pattern
}

struct Translation {
    pattern: String,
    has_separator: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Group {
    Alternation,
    Negation,
}

fn translate(glob: &str, path_aware: bool) -> Translation {
    if let Some(raw) = glob.strip_prefix(RAW_PREFIX) {
        return translate_raw(raw, path_aware);
    }

    let mut out = String::with_capacity(glob.len() * 2);
    let mut has_separator = false;
    let mut groups: Vec<Group> = Vec::new();
    let mut in_class = false;
    let mut chars = glob.chars().peekable();

    while let Some(c) = chars.next() {
        if in_class {
            match c {
                ']' => {
                    out.push(']');
                    in_class = false;
                }
                '\\' => match chars.next() {
                    Some(next) => push_escaped(&mut out, next),
                    None => out.push_str(r"\\"),
                },
                '[' => out.push_str(r"\["),
                _ => out.push(c),
            }
            continue;
        }

        match c {
            '\\' => match chars.next() {
                Some(next @ ('/' | '\\')) => {
                    has_separator = true;
                    push_separator(&mut out, next, path_aware);
                }
                Some(next) => push_escaped(&mut out, next),
                None => out.push_str(r"\\"),
            },
            '/' => {
                has_separator = true;
                push_separator(&mut out, '/', path_aware);
            }
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => {
                in_class = true;
                out.push('[');
                if matches!(chars.peek(), Some('!') | Some('^')) {
                    chars.next();
                    out.push('^');
                }
                // A leading `]` is a member, not the end
                if chars.peek() == Some(&']') {
                    chars.next();
                    out.push_str(r"\]");
                }
            }
            '{' => {
                if chars.peek() == Some(&'!') {
                    chars.next();
                    out.push_str("(?!");
                    groups.push(Group::Negation);
                } else {
                    out.push_str("(?:");
                    groups.push(Group::Alternation);
                }
            }
            ',' if !groups.is_empty() => out.push('|'),
            '}' => match groups.pop() {
                Some(Group::Alternation) => out.push(')'),
                Some(Group::Negation) => out.push_str(").*"),
                None => out.push_str(r"\}"),
            },
            '|' => out.push('|'),
            _ => push_escaped(&mut out, c),
        }
    }

    Translation {
        pattern: out,
        has_separator,
    }
}

fn translate_raw(raw: &str, path_aware: bool) -> Translation {
    let has_separator = raw.contains('/') || raw.contains(r"\\");
    if !path_aware || !has_separator {
        return Translation {
            pattern: raw.to_string(),
            has_separator,
        };
    }

    let mut out = String::with_capacity(raw.len() * 2);
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '/' => out.push_str(SEPARATOR_CLASS),
            '\\' => match chars.next() {
                Some('\\') => out.push_str(SEPARATOR_CLASS),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            },
            _ => out.push(c),
        }
    }

    Translation {
        pattern: out,
        has_separator,
    }
}

fn push_separator(out: &mut String, sep: char, path_aware: bool) {
    if path_aware {
        out.push_str(SEPARATOR_CLASS);
    } else if sep == '\\' {
        out.push_str(r"\\");
    } else {
        out.push('/');
    }
}

fn push_escaped(out: &mut String, c: char) {
    if matches!(
        c,
        '.' | '+' | '*' | '?' | '(' | ')' | '|' | '[' | ']' | '{' | '}' | '^' | '$' | '\\'
    ) {
        out.push('\\');
    }
    out.push(c);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_glob(glob: &str) -> GlobMatcher {
        GlobMatcher::compile(glob, true).unwrap()
    }

    #[test]
    fn test_star_and_question() {
        assert_eq!(glob_to_pattern("*.c?"), r".*\.c.");
    }

    #[test]
    fn test_filename_glob_matches_bare_name_and_full_path() {
        let m = path_glob("*.cpp");
        assert!(m.is_match("foo.cpp"));
        assert!(m.is_match("FOO.CPP"));
        assert!(m.is_match("/home/me/src/foo.cpp"));
        assert!(m.is_match(r"C:\src\foo.cpp"));
        assert!(!m.is_match("foo.cppx"));
        assert!(!m.is_match("foo.h"));
    }

    #[test]
    fn test_path_glob_accepts_either_separator() {
        let m = path_glob("*/src/*.rs");
        assert!(m.is_match("/work/src/main.rs"));
        assert!(m.is_match(r"D:\work\src\main.rs"));
        assert!(!m.is_match("main.rs"));

        let m = path_glob(r"*\\etc\\hosts");
        assert!(m.is_match("/etc/hosts"));
        assert!(m.is_match(r"c:\windows\etc\hosts"));
    }

    #[test]
    fn test_alternation_group() {
        let m = path_glob("*.{c,cc,cpp,h}");
        assert!(m.is_match("a.c"));
        assert!(m.is_match("a.cc"));
        assert!(m.is_match("lib/a.h"));
        assert!(!m.is_match("a.hh"));
    }

    #[test]
    fn test_negated_group() {
        let m = GlobMatcher::compile("{!README}*.md", false).unwrap();
        assert!(m.is_match("notes.md"));
        assert!(!m.is_match("README.md"));
    }

    #[test]
    fn test_negated_group_with_alternatives() {
        let m = GlobMatcher::compile("{!a,b}*.c", false).unwrap();
        assert!(!m.is_match("a.c"));
        assert!(!m.is_match("b.c"));
        assert!(m.is_match("c.c"));
        assert!(!m.is_match("a,b.c"));
    }

    #[test]
    fn test_character_class() {
        let m = path_glob("[Mm]akefile");
        assert!(m.is_match("Makefile"));
        assert!(m.is_match("build/makefile"));

        let m = path_glob("*.[!o]");
        assert!(m.is_match("x.c"));
        assert!(!m.is_match("x.o"));
    }

    #[test]
    fn test_escaped_metacharacters_are_literal() {
        let m = path_glob(r"a\*b");
        assert!(m.is_match("a*b"));
        assert!(!m.is_match("axxb"));

        let m = path_glob("c++.txt");
        assert!(m.is_match("c++.txt"));
        assert!(!m.is_match("cc.txt"));

        let m = path_glob("$HOME");
        assert!(m.is_match("$home"));
    }

    #[test]
    fn test_raw_regex_prefix() {
        let m = path_glob(r"(re).*\.(c|h)pp");
        assert!(m.is_match("x.cpp"));
        assert!(m.is_match("dir/x.hpp"));
        assert!(!m.is_match("x.c"));

        let m = path_glob("(re)etc/.*");
        assert!(m.is_match(r"etc\passwd"));
    }

    #[test]
    fn test_first_line_glob_keeps_separators_literal() {
        let m = GlobMatcher::compile("#!*/bin/*sh*", false).unwrap();
        assert!(m.is_match("#!/bin/bash"));
        assert!(m.is_match("#!/USR/BIN/ZSH -e"));
        assert!(!m.is_match(r"#!\bin\bash"));
    }

    #[test]
    fn test_invalid_glob_reports_pattern() {
        let err = GlobMatcher::compile("*.[ch", true).unwrap_err();
        assert_eq!(err.glob, "*.[ch");
        assert!(err.pattern.contains(r"\.[ch"));

        assert!(GlobMatcher::compile("{a,b", true).is_err());
    }

    #[test]
    fn test_unmatched_closing_brace_is_literal() {
        let m = path_glob("a}b");
        assert!(m.is_match("a}b"));
    }

    #[test]
    fn test_accessors() {
        let m = path_glob("*.rs");
        assert_eq!(m.glob(), "*.rs");
        assert!(m.pattern().starts_with("(?i)^"));
    }
}
