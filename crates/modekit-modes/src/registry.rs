//! The mode registry.
//!
//! ## Learning: Explicit Instances Over Globals
//!
//! The registry is an ordinary value built at startup and passed by
//! reference to catalog loading and to whoever resolves files. Tests build
//! as many as they like, and a reload is `clear` plus repopulate on the
//! same instance.
//!
//! ## Resolution
//!
//! Several modes may accept a file. [`ModeRegistry::mode_for_file`] walks
//! the candidates newest registration first and prefers, in order:
//!
//! 1. a mode whose filename glob is literally the file name
//! 2. a mode matching by file *and* by first line
//! 3. a mode matching by file
//! 4. the newest candidate (first-line matches only)

use std::fmt;
use std::sync::Arc;

use modekit_core::{Diagnostics, EventBus, RegistryEvent, Severity, TracingDiagnostics};
use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::mode::ModeDescriptor;
use crate::tokenizer::{LoadError, Tokenizer, TokenizerLoader};

/// Compression suffix ignored when resolving a file's mode.
const GZIP_SUFFIX: &str = ".gz";

/// Registry of modes, keyed by name, in registration order.
pub struct ModeRegistry {
    modes: RwLock<Vec<Arc<ModeDescriptor>>>,
    loader: Box<dyn TokenizerLoader>,
    diagnostics: Arc<dyn Diagnostics>,
    events: EventBus,
}

impl ModeRegistry {
    /// Creates an empty registry that builds tokenizers with `loader`.
    ///
    /// Diagnostics go to `tracing` until
    /// [`with_diagnostics`](Self::with_diagnostics) says otherwise.
    pub fn new(loader: impl TokenizerLoader + 'static) -> Self {
        Self {
            modes: RwLock::new(Vec::new()),
            loader: Box::new(loader),
            diagnostics: Arc::new(TracingDiagnostics),
            events: EventBus::new(),
        }
    }

    /// Uses `diagnostics` for configuration errors and load failures.
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Emits registry events on `events` instead of a private bus.
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// The diagnostics sink.
    pub fn diagnostics(&self) -> &dyn Diagnostics {
        self.diagnostics.as_ref()
    }

    /// The event bus.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Subscribes to registry events.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    /// Adds a mode, replacing any mode with the same name.
    ///
    /// The new mode moves to the end of the registration order, so a
    /// redefinition outranks older modes. Returns the replaced mode.
    pub fn register(&self, mode: Arc<ModeDescriptor>) -> Option<Arc<ModeDescriptor>> {
        let name = mode.name().to_string();
        let replaced = {
            let mut modes = self.modes.write();
            let replaced = modes
                .iter()
                .position(|m| m.name() == name)
                .map(|idx| modes.remove(idx));
            modes.push(mode);
            replaced
        };

        tracing::debug!(mode = %name, replaced = replaced.is_some(), "Registered mode");
        self.events.emit(RegistryEvent::ModeRegistered(name));
        replaced
    }

    /// Returns the mode called `name`.
    pub fn lookup(&self, name: &str) -> Option<Arc<ModeDescriptor>> {
        self.modes.read().iter().find(|m| m.name() == name).cloned()
    }

    /// Removes the mode called `name`.
    pub fn remove(&self, name: &str) -> Option<Arc<ModeDescriptor>> {
        let removed = {
            let mut modes = self.modes.write();
            modes
                .iter()
                .position(|m| m.name() == name)
                .map(|idx| modes.remove(idx))
        };
        if removed.is_some() {
            self.events.emit(RegistryEvent::ModeRemoved(name.to_string()));
        }
        removed
    }

    /// Drops every mode.
    ///
    /// Sessions still holding a mode keep using it; it is only no longer
    /// found here.
    pub fn clear(&self) {
        self.modes.write().clear();
        self.events.emit(RegistryEvent::RegistryCleared);
    }

    /// All modes in registration order.
    pub fn modes(&self) -> Vec<Arc<ModeDescriptor>> {
        self.modes.read().clone()
    }

    /// Mode names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.modes
            .read()
            .iter()
            .map(|m| m.name().to_string())
            .collect()
    }

    /// Number of registered modes.
    pub fn len(&self) -> usize {
        self.modes.read().len()
    }

    /// Returns true if no mode is registered.
    pub fn is_empty(&self) -> bool {
        self.modes.read().is_empty()
    }

    /// Picks the mode for a file.
    ///
    /// A trailing `.gz` is ignored on both `path` and `filename`. Modes
    /// that have not finished their first `init` are not considered.
    pub fn mode_for_file(
        &self,
        path: Option<&str>,
        filename: Option<&str>,
        first_line: Option<&str>,
    ) -> Option<Arc<ModeDescriptor>> {
        let path = path.map(strip_gzip);
        let filename = filename.map(strip_gzip);

        // Snapshot so matching runs without holding the lock
        let modes = self.modes();
        let acceptable: Vec<_> = modes
            .into_iter()
            .filter(|m| m.is_initialized() && m.accept(path, filename, first_line))
            .collect();

        if acceptable.len() <= 1 {
            return acceptable.into_iter().next();
        }

        let newest_first = || acceptable.iter().rev();

        newest_first()
            .find(|m| m.accept_identical(path, filename))
            .or_else(|| {
                newest_first()
                    .find(|m| m.accept_file(path, filename) && m.accept_first_line(first_line))
            })
            .or_else(|| newest_first().find(|m| m.accept_file(path, filename)))
            .or_else(|| newest_first().next())
            .cloned()
    }

    /// Returns `mode`'s tokenizer, loading it on first use.
    pub fn tokenizer_for(&self, mode: &ModeDescriptor) -> Option<Arc<dyn Tokenizer>> {
        mode.tokenizer(self)
    }
}

impl TokenizerLoader for ModeRegistry {
    fn load_tokenizer(&self, mode: &ModeDescriptor) -> Result<Arc<dyn Tokenizer>, LoadError> {
        match self.loader.load_tokenizer(mode) {
            Ok(tokenizer) => {
                tracing::debug!(mode = %mode.name(), "Loaded tokenizer");
                self.events
                    .emit(RegistryEvent::TokenizerLoaded(mode.name().to_string()));
                Ok(tokenizer)
            }
            Err(e) => {
                self.diagnostics
                    .report(Severity::Error, mode.name(), &e.to_string());
                self.events
                    .emit(RegistryEvent::TokenizerFailed(mode.name().to_string()));
                Err(e)
            }
        }
    }
}

impl fmt::Debug for ModeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModeRegistry")
            .field("modes", &self.names())
            .finish_non_exhaustive()
    }
}

fn strip_gzip(name: &str) -> &str {
    name.strip_suffix(GZIP_SUFFIX).unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::{FILENAME_GLOB, FIRSTLINE_GLOB};
    use crate::tokenizer::{LineState, TokenizedLine};
    use modekit_core::DiagnosticLog;

    #[derive(Debug)]
    struct NullTokenizer;

    impl Tokenizer for NullTokenizer {
        fn tokenize_line(&self, _line: &str, state: &LineState) -> TokenizedLine {
            TokenizedLine {
                tokens: Vec::new(),
                state: state.clone(),
            }
        }
    }

    /// Loads for every mode except those named `broken`.
    struct StubLoader;

    impl TokenizerLoader for StubLoader {
        fn load_tokenizer(&self, mode: &ModeDescriptor) -> Result<Arc<dyn Tokenizer>, LoadError> {
            if mode.name() == "broken" {
                Err(LoadError::NoRuleFile(mode.name().to_string()))
            } else {
                Ok(Arc::new(NullTokenizer))
            }
        }
    }

    fn mode(name: &str, filename_glob: Option<&str>, firstline_glob: Option<&str>) -> Arc<ModeDescriptor> {
        let mode = ModeDescriptor::new(name);
        if let Some(glob) = filename_glob {
            mode.set_property(FILENAME_GLOB, glob);
        }
        if let Some(glob) = firstline_glob {
            mode.set_property(FIRSTLINE_GLOB, glob);
        }
        mode.init().unwrap();
        Arc::new(mode)
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = ModeRegistry::new(StubLoader);
        assert!(registry.is_empty());

        registry.register(mode("cpp", Some("*.cpp"), None));
        registry.register(mode("c", Some("*.c"), None));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.lookup("cpp").unwrap().name(), "cpp");
        assert!(registry.lookup("java").is_none());
        assert_eq!(registry.names(), vec!["cpp", "c"]);
    }

    #[test]
    fn test_reregister_replaces_and_moves_last() {
        let registry = ModeRegistry::new(StubLoader);
        registry.register(mode("a", Some("*.a"), None));
        registry.register(mode("b", Some("*.b"), None));

        let replaced = registry.register(mode("a", Some("*.aa"), None));
        assert!(replaced.is_some());
        assert_eq!(registry.names(), vec!["b", "a"]);
        assert!(registry.mode_for_file(None, Some("x.aa"), None).is_some());
        assert!(registry.mode_for_file(None, Some("x.a"), None).is_none());
    }

    #[test]
    fn test_remove_and_clear() {
        let registry = ModeRegistry::new(StubLoader);
        registry.register(mode("a", None, None));
        registry.register(mode("b", None, None));

        assert!(registry.remove("a").is_some());
        assert!(registry.remove("a").is_none());
        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_single_candidate() {
        let registry = ModeRegistry::new(StubLoader);
        registry.register(mode("cpp", Some("*.cpp"), None));
        registry.register(mode("java", Some("*.java"), None));

        let found = registry.mode_for_file(Some("/src/Main.java"), Some("Main.java"), None);
        assert_eq!(found.unwrap().name(), "java");
        assert!(registry.mode_for_file(None, Some("x.py"), None).is_none());
    }

    #[test]
    fn test_identical_glob_wins() {
        let registry = ModeRegistry::new(StubLoader);
        registry.register(mode("makefile", Some("Makefile"), None));
        registry.register(mode("catchall", Some("*file"), None));

        let found = registry.mode_for_file(Some("/p/Makefile"), Some("Makefile"), None);
        assert_eq!(found.unwrap().name(), "makefile");
    }

    #[test]
    fn test_file_and_first_line_beats_file_only() {
        let registry = ModeRegistry::new(StubLoader);
        registry.register(mode("python", Some("*.py"), Some("#!*python*")));
        registry.register(mode("jython", Some("*.py"), None));

        let found = registry.mode_for_file(None, Some("x.py"), Some("#!/usr/bin/python"));
        assert_eq!(found.unwrap().name(), "python");

        // Without the first line the newest file match wins
        let found = registry.mode_for_file(None, Some("x.py"), None);
        assert_eq!(found.unwrap().name(), "jython");
    }

    #[test]
    fn test_file_match_beats_first_line_only() {
        let registry = ModeRegistry::new(StubLoader);
        registry.register(mode("shell", Some("*.sh"), None));
        registry.register(mode("perl", None, Some("#!*")));

        let found = registry.mode_for_file(None, Some("run.sh"), Some("#!/bin/sh"));
        assert_eq!(found.unwrap().name(), "shell");
    }

    #[test]
    fn test_first_line_only_newest_wins() {
        let registry = ModeRegistry::new(StubLoader);
        registry.register(mode("old", None, Some("<?xml*")));
        registry.register(mode("new", None, Some("<?xml*")));

        let found = registry.mode_for_file(None, Some("doc"), Some("<?xml version=\"1.0\"?>"));
        assert_eq!(found.unwrap().name(), "new");
    }

    #[test]
    fn test_gzip_suffix_ignored() {
        let registry = ModeRegistry::new(StubLoader);
        registry.register(mode("c", Some("*.c"), None));

        assert!(registry.mode_for_file(Some("/tmp/x.c.gz"), Some("x.c.gz"), None).is_some());
    }

    #[test]
    fn test_uninitialized_mode_is_found_by_name_only() {
        let registry = ModeRegistry::new(StubLoader);
        let pending = ModeDescriptor::new("pending");
        pending.set_property(FILENAME_GLOB, "*.p");
        registry.register(Arc::new(pending));

        assert!(registry.lookup("pending").is_some());
        assert!(registry.mode_for_file(None, Some("x.p"), None).is_none());

        registry.lookup("pending").unwrap().init().unwrap();
        assert!(registry.mode_for_file(None, Some("x.p"), None).is_some());
    }

    #[test]
    fn test_tokenizer_failure_is_reported() {
        let log = Arc::new(DiagnosticLog::new());
        let registry = ModeRegistry::new(StubLoader).with_diagnostics(log.clone());
        registry.register(mode("broken", Some("*.b"), None));
        registry.register(mode("fine", Some("*.f"), None));

        let broken = registry.lookup("broken").unwrap();
        assert!(registry.tokenizer_for(&broken).is_none());
        assert_eq!(log.error_count(), 1);
        assert_eq!(log.entries()[0].source, "broken");

        // Matching keeps working for the degraded mode
        assert!(registry.mode_for_file(None, Some("x.b"), None).is_some());

        let fine = registry.lookup("fine").unwrap();
        assert!(registry.tokenizer_for(&fine).is_some());
        assert_eq!(log.error_count(), 1);
    }

    #[test]
    fn test_events_emitted() {
        let registry = ModeRegistry::new(StubLoader);
        let mut rx = registry.subscribe();

        registry.register(mode("a", None, None));
        let a = registry.lookup("a").unwrap();
        registry.tokenizer_for(&a);
        registry.remove("a");
        registry.clear();

        assert_eq!(rx.try_recv().unwrap(), RegistryEvent::ModeRegistered("a".to_string()));
        assert_eq!(rx.try_recv().unwrap(), RegistryEvent::TokenizerLoaded("a".to_string()));
        assert_eq!(rx.try_recv().unwrap(), RegistryEvent::ModeRemoved("a".to_string()));
        assert_eq!(rx.try_recv().unwrap(), RegistryEvent::RegistryCleared);
    }
}
