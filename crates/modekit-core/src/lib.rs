//! # Modekit Core
//!
//! Shared plumbing for the mode registry: configuration, the diagnostics
//! sink, the registry event bus and the catalog directory watcher.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      modekit-core                        │
//! │  ┌─────────────┐ ┌──────────────┐ ┌────────────────────┐ │
//! │  │   Config    │ │ Diagnostics  │ │  EventBus (tokio)  │ │
//! │  └─────────────┘ └──────────────┘ └────────────────────┘ │
//! │         │                                                │
//! │  ┌──────┴────────────────────────────┐                   │
//! │  │          CatalogWatcher            │                   │
//! │  │   notify ──► mpsc<CatalogChange>   │                   │
//! │  └────────────────────────────────────┘                   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing in here knows what a mode is. The registry crate reports into
//! [`Diagnostics`] and emits [`RegistryEvent`]s by mode name only.

pub mod config;
pub mod diagnostics;
pub mod event;
pub mod watcher;

pub use config::{CatalogConfig, Config, ConfigError, LoggingConfig};
pub use diagnostics::{Diagnostic, DiagnosticLog, Diagnostics, Severity, TracingDiagnostics};
pub use event::{EventBus, EventHandler, RegistryEvent};
pub use watcher::{CatalogChange, CatalogWatcher};

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core operations
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Directory not found: {0}")]
    DirectoryNotFound(String),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),
}
