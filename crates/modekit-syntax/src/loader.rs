//! Loading tokenizers from rule files.

use std::path::Path;
use std::sync::Arc;

use modekit_modes::property::{FILE, FILENAME_GLOB, FIRSTLINE_GLOB};
use modekit_modes::{LoadError, ModeDescriptor, Tokenizer, TokenizerLoader};

use crate::line::RuleTokenizer;
use crate::rules::RuleFile;
use crate::treesitter::TreeSitterTokenizer;

/// Properties owned by the catalog; a rule file cannot override them.
const CATALOG_PROPERTIES: [&str; 3] = [FILE, FILENAME_GLOB, FIRSTLINE_GLOB];

/// Builds a mode's tokenizer from the rule file named by its `file`
/// property.
///
/// The rule file's `[properties]` are merged into the mode first, so
/// indentation and whitespace settings arrive together with the
/// tokenizer.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleFileLoader;

impl RuleFileLoader {
    pub fn new() -> Self {
        Self
    }
}

impl TokenizerLoader for RuleFileLoader {
    fn load_tokenizer(&self, mode: &ModeDescriptor) -> Result<Arc<dyn Tokenizer>, LoadError> {
        let path = mode
            .string_property(FILE)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| LoadError::NoRuleFile(mode.name().to_string()))?;

        tracing::debug!(mode = %mode.name(), "Loading rule file {}", path);
        let mut rules = RuleFile::from_path(Path::new(&path))?;

        let mut properties = std::mem::take(&mut rules.properties);
        properties.retain(|key, _| !CATALOG_PROPERTIES.contains(&key.as_str()));
        mode.set_properties(properties);

        match rules.grammar.as_deref() {
            Some(grammar) => Ok(Arc::new(TreeSitterTokenizer::new(grammar)?)),
            None => Ok(Arc::new(RuleTokenizer::new(&rules))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modekit_modes::{LineState, TokenKind};
    use tempfile::tempdir;

    fn mode_with_file(path: &Path) -> ModeDescriptor {
        let mode = ModeDescriptor::new("test");
        mode.set_property(FILE, path.display().to_string());
        mode.set_property(FILENAME_GLOB, "*.t");
        mode
    }

    #[test]
    fn test_loads_rule_tokenizer_and_properties() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.toml");
        std::fs::write(
            &path,
            r##"
keywords = ["begin", "end"]
line_comments = ["#"]

[properties]
indentOpenBrackets = "{"
ignoreWhitespace = "false"
filenameGlob = "*.other"
"##,
        )
        .unwrap();

        let mode = mode_with_file(&path);
        let tokenizer = RuleFileLoader.load_tokenizer(&mode).unwrap();

        let out = tokenizer.tokenize_line("begin # c", &LineState::default());
        assert_eq!(out.tokens[0].kind, TokenKind::Keyword);
        assert_eq!(out.tokens[1].kind, TokenKind::Comment);

        assert!(!mode.ignore_whitespace());
        assert_eq!(mode.string_property("indentOpenBrackets").as_deref(), Some("{"));
        assert_eq!(mode.string_property(FILENAME_GLOB).as_deref(), Some("*.t"));
    }

    #[test]
    fn test_grammar_selects_tree_sitter() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rust.toml");
        std::fs::write(&path, "grammar = \"rust\"\n").unwrap();

        let tokenizer = RuleFileLoader.load_tokenizer(&mode_with_file(&path)).unwrap();
        assert!(format!("{tokenizer:?}").contains("TreeSitterTokenizer"));
    }

    #[test]
    fn test_missing_file_property() {
        let mode = ModeDescriptor::new("bare");
        let err = RuleFileLoader.load_tokenizer(&mode).unwrap_err();
        assert!(matches!(err, LoadError::NoRuleFile(name) if name == "bare"));
    }

    #[test]
    fn test_unreadable_and_malformed_files() {
        let dir = tempdir().unwrap();

        let missing = mode_with_file(&dir.path().join("missing.toml"));
        assert!(matches!(
            RuleFileLoader.load_tokenizer(&missing).unwrap_err(),
            LoadError::Io { .. }
        ));

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "keywords = [").unwrap();
        assert!(matches!(
            RuleFileLoader.load_tokenizer(&mode_with_file(&bad)).unwrap_err(),
            LoadError::Malformed { .. }
        ));
    }

    #[test]
    fn test_unsupported_grammar() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.toml");
        std::fs::write(&path, "grammar = \"brainfuck\"\n").unwrap();

        assert!(matches!(
            RuleFileLoader.load_tokenizer(&mode_with_file(&path)).unwrap_err(),
            LoadError::UnsupportedGrammar(message) if message.contains("brainfuck")
        ));
    }
}
