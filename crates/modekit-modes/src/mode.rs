//! Mode descriptors.
//!
//! A [`ModeDescriptor`] is one editing mode: a name, a property bag, the
//! matchers compiled from its globs, and a slot for its tokenizer which
//! is only filled when a file of that mode is first highlighted.
//!
//! ## Lifecycle
//!
//! ```text
//! new(name) ─► set_properties / set_property ─► init() ─► registry
//!                                                  │
//!                      accept(path, name, line) ◄──┘
//!                                │ match
//!                                ▼
//!                      tokenizer(loader)  (first call loads, later calls reuse)
//! ```
//!
//! ## Learning: Interior Mutability
//!
//! Descriptors live in `Arc`s shared by the registry and every editing
//! session, so every method takes `&self`. Each piece of mutable state has
//! its own lock: the property bag and the compiled matchers behind
//! `RwLock`s, the tokenizer slot and the electric-key cache behind
//! `Mutex`es so a check-then-initialize sequence runs exactly once.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::ModeError;
use crate::glob::GlobMatcher;
use crate::property::{
    ELECTRIC_KEY_SOURCES, FILENAME_GLOB, FIRSTLINE_GLOB, IGNORE_WHITESPACE, PropertyMap,
    PropertyValue,
};
use crate::tokenizer::{Tokenizer, TokenizerLoader};

/// Matchers compiled by [`ModeDescriptor::init`].
///
/// Replaced wholesale on every `init`, so a reader holding the old `Arc`
/// keeps a consistent pair.
#[derive(Debug, Default)]
struct Matchers {
    path: Option<GlobMatcher>,
    first_line: Option<GlobMatcher>,
}

#[derive(Debug)]
enum TokenizerSlot {
    NotLoaded,
    Loaded(Arc<dyn Tokenizer>),
    Failed(String),
}

/// Where a mode's tokenizer stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenizerStatus {
    /// Never requested since the last `init`
    NotLoaded,
    /// Built and cached
    Loaded,
    /// The last attempt failed with this message
    Failed(String),
}

/// An editing mode.
#[derive(Debug)]
pub struct ModeDescriptor {
    name: String,
    props: RwLock<PropertyMap>,
    ignore_whitespace: AtomicBool,
    matchers: RwLock<Arc<Matchers>>,
    initialized: AtomicBool,
    tokenizer: Mutex<TokenizerSlot>,
    electric_keys: Mutex<Option<Arc<str>>>,
}

impl ModeDescriptor {
    /// Creates a mode with no properties.
    ///
    /// It matches nothing until properties are set and [`init`](Self::init)
    /// has run.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            props: RwLock::new(PropertyMap::new()),
            ignore_whitespace: AtomicBool::new(true),
            matchers: RwLock::new(Arc::new(Matchers::default())),
            initialized: AtomicBool::new(false),
            tokenizer: Mutex::new(TokenizerSlot::NotLoaded),
            electric_keys: Mutex::new(None),
        }
    }

    /// The mode's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    /// Returns a property value.
    pub fn property(&self, key: &str) -> Option<PropertyValue> {
        self.props.read().get(key).cloned()
    }

    /// Returns a property rendered as a string.
    pub fn string_property(&self, key: &str) -> Option<String> {
        self.props.read().get(key).map(ToString::to_string)
    }

    /// Returns a boolean property, false when absent or not boolean-like.
    pub fn boolean_property(&self, key: &str) -> bool {
        self.props
            .read()
            .get(key)
            .and_then(PropertyValue::as_bool)
            .unwrap_or(false)
    }

    /// Returns an integer property.
    pub fn int_property(&self, key: &str) -> Option<i64> {
        self.props.read().get(key).and_then(PropertyValue::as_int)
    }

    /// Returns true if `key` is set.
    pub fn has_property(&self, key: &str) -> bool {
        self.props.read().contains_key(key)
    }

    /// Snapshot of all properties.
    pub fn properties(&self) -> PropertyMap {
        self.props.read().clone()
    }

    /// Sets one property.
    ///
    /// Glob changes take effect at the next [`init`](Self::init).
    pub fn set_property(&self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.props.write().insert(key.into(), value.into());
    }

    /// Removes one property.
    pub fn unset_property(&self, key: &str) {
        self.props.write().remove(key);
    }

    /// Merges `props` into the bag and recomputes `ignore_whitespace`.
    ///
    /// `ignore_whitespace` turns off only when `props` carries
    /// `ignoreWhitespace` with the value `false` (any case); without the key
    /// it goes back to true.
    pub fn set_properties(&self, props: PropertyMap) {
        let ignore = props
            .get(IGNORE_WHITESPACE)
            .is_none_or(|v| !v.to_string().eq_ignore_ascii_case("false"));
        self.ignore_whitespace.store(ignore, Ordering::Release);
        self.props.write().extend(props);
    }

    /// Whether whitespace differences are ignored in this mode.
    pub fn ignore_whitespace(&self) -> bool {
        self.ignore_whitespace.load(Ordering::Acquire)
    }

    // ------------------------------------------------------------------
    // Initialization
    // ------------------------------------------------------------------

    /// Compiles matchers from the current globs and drops any tokenizer.
    ///
    /// Must run after properties are set and before matching. Running it
    /// again (a redefined mode on reload) replaces both matchers and
    /// forgets the old tokenizer and electric keys.
    ///
    /// A glob that does not compile leaves its matcher empty and comes
    /// back as one [`ModeError::InvalidGlob`] per bad property; the other
    /// glob still compiles and the mode stays usable.
    pub fn init(&self) -> Result<(), Vec<ModeError>> {
        let mut errors = Vec::new();

        let path = self.compile_glob(FILENAME_GLOB, true, &mut errors);
        let first_line = self.compile_glob(FIRSTLINE_GLOB, false, &mut errors);

        *self.matchers.write() = Arc::new(Matchers { path, first_line });
        *self.tokenizer.lock() = TokenizerSlot::NotLoaded;
        *self.electric_keys.lock() = None;
        self.initialized.store(true, Ordering::Release);

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    fn compile_glob(
        &self,
        property: &'static str,
        match_against_path: bool,
        errors: &mut Vec<ModeError>,
    ) -> Option<GlobMatcher> {
        let glob = self.string_property(property).filter(|g| !g.is_empty())?;
        match GlobMatcher::compile(&glob, match_against_path) {
            Ok(matcher) => Some(matcher),
            Err(source) => {
                tracing::error!(mode = %self.name, "Invalid {} in mode {}: {}", property, self.name, source);
                errors.push(ModeError::InvalidGlob {
                    mode: self.name.clone(),
                    property,
                    source,
                });
                None
            }
        }
    }

    /// True once [`init`](Self::init) has completed at least once.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    fn matchers(&self) -> Arc<Matchers> {
        Arc::clone(&self.matchers.read())
    }

    // ------------------------------------------------------------------
    // Matching
    // ------------------------------------------------------------------

    /// Returns true if this mode fits the file.
    ///
    /// Any input may be `None`. True if the path matcher matches the name
    /// or the path, or the raw filename glob equals the name or the path's
    /// last segment, or the first-line matcher matches the first line.
    pub fn accept(&self, path: Option<&str>, filename: Option<&str>, first_line: Option<&str>) -> bool {
        self.accept_file(path, filename)
            || self.accept_identical(path, filename)
            || self.accept_first_line(first_line)
    }

    /// [`accept`](Self::accept) without a path.
    pub fn accept_name(&self, filename: Option<&str>, first_line: Option<&str>) -> bool {
        self.accept(None, filename, first_line)
    }

    /// True if the compiled filename glob matches `filename` or `path`.
    pub fn accept_file(&self, path: Option<&str>, filename: Option<&str>) -> bool {
        let matchers = self.matchers();
        let Some(matcher) = matchers.path.as_ref() else {
            return false;
        };

        filename.is_some_and(|f| matcher.is_match(f)) || path.is_some_and(|p| matcher.is_match(p))
    }

    /// True if the raw filename glob equals `filename`, or the last segment
    /// of `path`, ignoring case.
    ///
    /// Bypasses glob translation, so a glob naming one exact file behaves
    /// exactly even when it contains pattern characters.
    pub fn accept_identical(&self, path: Option<&str>, filename: Option<&str>) -> bool {
        let Some(glob) = self.string_property(FILENAME_GLOB).filter(|g| !g.is_empty()) else {
            return false;
        };

        if filename.is_some_and(|f| eq_ignore_case(f, &glob)) {
            return true;
        }

        path.is_some_and(|p| eq_ignore_case(last_segment(p), &glob))
    }

    /// True if the compiled first-line glob matches `first_line`.
    pub fn accept_first_line(&self, first_line: Option<&str>) -> bool {
        let matchers = self.matchers();
        match (matchers.first_line.as_ref(), first_line) {
            (Some(matcher), Some(line)) => matcher.is_match(line),
            _ => false,
        }
    }

    // ------------------------------------------------------------------
    // Tokenizer
    // ------------------------------------------------------------------

    /// Returns the tokenizer, building it through `loader` on first use.
    ///
    /// The slot stays locked while loading, so concurrent first calls
    /// load once and the rest wait for the result. A failed load is
    /// logged and yields `None`; the next call tries again.
    pub fn tokenizer(&self, loader: &dyn TokenizerLoader) -> Option<Arc<dyn Tokenizer>> {
        let mut slot = self.tokenizer.lock();
        if let TokenizerSlot::Loaded(tokenizer) = &*slot {
            return Some(Arc::clone(tokenizer));
        }

        match loader.load_tokenizer(self) {
            Ok(tokenizer) => {
                *slot = TokenizerSlot::Loaded(Arc::clone(&tokenizer));
                Some(tokenizer)
            }
            Err(e) => {
                tracing::error!(mode = %self.name, "Mode not correctly loaded, tokenizer is still missing: {}", e);
                *slot = TokenizerSlot::Failed(e.to_string());
                None
            }
        }
    }

    /// Installs a tokenizer directly, bypassing the loader.
    pub fn set_tokenizer(&self, tokenizer: Arc<dyn Tokenizer>) {
        *self.tokenizer.lock() = TokenizerSlot::Loaded(tokenizer);
    }

    /// Current state of the tokenizer slot.
    pub fn tokenizer_status(&self) -> TokenizerStatus {
        match &*self.tokenizer.lock() {
            TokenizerSlot::NotLoaded => TokenizerStatus::NotLoaded,
            TokenizerSlot::Loaded(_) => TokenizerStatus::Loaded,
            TokenizerSlot::Failed(message) => TokenizerStatus::Failed(message.clone()),
        }
    }

    // ------------------------------------------------------------------
    // Electric keys
    // ------------------------------------------------------------------

    /// Characters that trigger re-indentation when typed.
    ///
    /// `indentOpenBrackets`, `indentCloseBrackets` and `electricKeys`
    /// concatenated in that order, computed once per `init`.
    pub fn electric_keys(&self) -> Arc<str> {
        let mut cached = self.electric_keys.lock();
        if let Some(keys) = cached.as_ref() {
            return Arc::clone(keys);
        }

        let keys: Arc<str> = {
            let props = self.props.read();
            ELECTRIC_KEY_SOURCES
                .iter()
                .filter_map(|key| props.get(*key))
                .map(ToString::to_string)
                .collect::<String>()
                .into()
        };
        *cached = Some(Arc::clone(&keys));
        keys
    }

    /// Returns true if typing `ch` should re-indent the line.
    pub fn is_electric_key(&self, ch: char) -> bool {
        self.electric_keys().contains(ch)
    }
}

impl fmt::Display for ModeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || a.to_lowercase() == b.to_lowercase()
}

/// Text after the last `/` or `\`.
fn last_segment(path: &str) -> &str {
    match path.rfind(|c: char| c == '/' || c == '\\') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}
