//! # Modekit Modes
//!
//! Editing modes and how files find them.
//!
//! ```text
//! catalog.toml ──► parse_catalog ──► CatalogIngestor ──► ModeRegistry
//!                                         │                  │
//!                                 ModeDescriptor::init   mode_for_file(path, name, line)
//!                                   (GlobMatcher)            │
//!                                                            ▼
//!                                                 ModeDescriptor::tokenizer
//!                                                  (TokenizerLoader, once)
//! ```
//!
//! ## Error Policy
//!
//! Nothing here aborts the registry. A bad glob disables one matcher, a
//! missing attribute or unreadable rule file degrades one mode, an
//! unreadable catalog skips one directory. Each is reported through the
//! registry's [`Diagnostics`](modekit_core::Diagnostics) and the rest
//! carries on.

use std::path::PathBuf;

pub mod catalog;
pub mod glob;
pub mod mode;
pub mod property;
pub mod registry;
pub mod tokenizer;

pub use catalog::{
    Attributes, CatalogError, CatalogHandler, CatalogIngestor, load_catalog, load_catalogs,
    parse_catalog, reload,
};
pub use glob::{GlobError, GlobMatcher};
pub use mode::{ModeDescriptor, TokenizerStatus};
pub use property::{PropertyMap, PropertyValue};
pub use registry::ModeRegistry;
pub use tokenizer::{
    LineState, LoadError, Token, TokenKind, TokenizedLine, Tokenizer, TokenizerLoader,
};

/// Errors raised while defining, matching or loading modes
#[derive(Debug, thiserror::Error)]
pub enum ModeError {
    #[error("Invalid {property} in mode {mode}: {source}")]
    InvalidGlob {
        mode: String,
        property: &'static str,
        #[source]
        source: GlobError,
    },

    #[error("{}: mode {mode} doesn't have a {attribute} attribute", catalog.display())]
    MissingAttribute {
        catalog: PathBuf,
        mode: String,
        attribute: &'static str,
    },

    #[error("{}: mode entry without a NAME attribute", catalog.display())]
    UnnamedEntry { catalog: PathBuf },

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl ModeError {
    /// True for problems in how a mode was declared, as opposed to
    /// failures reading files.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            ModeError::InvalidGlob { .. }
                | ModeError::MissingAttribute { .. }
                | ModeError::UnnamedEntry { .. }
        )
    }
}
