//! Mode property values.
//!
//! A mode carries a bag of properties. Only a few keys are read
//! structurally (the globs, `file`, `ignoreWhitespace`, the bracket and
//! electric-key strings); the rest pass through untouched for whoever
//! consumes the rule file.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Property holding the filename/path glob.
pub const FILENAME_GLOB: &str = "filenameGlob";
/// Property holding the first-line glob.
pub const FIRSTLINE_GLOB: &str = "firstlineGlob";
/// Property holding the rule-file path handed to the tokenizer loader.
pub const FILE: &str = "file";
/// Property controlling whitespace handling.
pub const IGNORE_WHITESPACE: &str = "ignoreWhitespace";
/// Properties concatenated, in this order, into a mode's electric keys.
pub const ELECTRIC_KEY_SOURCES: [&str; 3] =
    ["indentOpenBrackets", "indentCloseBrackets", "electricKeys"];

/// Properties keyed by name.
pub type PropertyMap = HashMap<String, PropertyValue>;

/// A property value.
///
/// ## Learning: Closed Variants Instead of `Any`
///
/// Values are strings, booleans or integers and nothing else, so an enum
/// keeps them typed without downcasting. `#[serde(untagged)]` lets TOML
/// write `tabSize = 4` or `noTabs = true` directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl PropertyValue {
    /// The string, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Interprets the value as a boolean.
    ///
    /// Strings `true`/`yes`/`on` and `false`/`no`/`off` are recognized
    /// ignoring case. Anything else yields `None`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            PropertyValue::Int(_) => None,
            PropertyValue::Str(s) => {
                let s = s.trim();
                if ["true", "yes", "on"].iter().any(|t| s.eq_ignore_ascii_case(t)) {
                    Some(true)
                } else if ["false", "no", "off"].iter().any(|f| s.eq_ignore_ascii_case(f)) {
                    Some(false)
                } else {
                    None
                }
            }
        }
    }

    /// Interprets the value as an integer, parsing strings.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(i) => Some(*i),
            PropertyValue::Str(s) => s.trim().parse().ok(),
            PropertyValue::Bool(_) => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(b) => write!(f, "{b}"),
            PropertyValue::Int(i) => write!(f, "{i}"),
            PropertyValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::Str(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::Str(s)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Int(i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_interpretation() {
        assert_eq!(PropertyValue::from("Yes").as_bool(), Some(true));
        assert_eq!(PropertyValue::from("OFF").as_bool(), Some(false));
        assert_eq!(PropertyValue::from("maybe").as_bool(), None);
        assert_eq!(PropertyValue::from(true).as_bool(), Some(true));
        assert_eq!(PropertyValue::from(1).as_bool(), None);
    }

    #[test]
    fn test_int_interpretation() {
        assert_eq!(PropertyValue::from(" 8 ").as_int(), Some(8));
        assert_eq!(PropertyValue::from(4).as_int(), Some(4));
        assert_eq!(PropertyValue::from("four").as_int(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(PropertyValue::from(false).to_string(), "false");
        assert_eq!(PropertyValue::from("{").to_string(), "{");
    }

    #[test]
    fn test_untagged_toml() {
        #[derive(Deserialize)]
        struct Props {
            properties: PropertyMap,
        }

        let props: Props = toml::from_str(
            "[properties]\ntabSize = 4\nnoTabs = true\nlineComment = \"//\"\n",
        )
        .unwrap();
        assert_eq!(props.properties["tabSize"], PropertyValue::Int(4));
        assert_eq!(props.properties["noTabs"], PropertyValue::Bool(true));
        assert_eq!(props.properties["lineComment"], PropertyValue::from("//"));
    }
}
