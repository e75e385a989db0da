//! Mode catalogs.
//!
//! A catalog directory holds a `catalog.toml` listing the modes it
//! provides:
//!
//! ```toml
//! [[MODE]]
//! NAME = "cpp"
//! FILE = "cpp.toml"
//! FILE_NAME_GLOB = "*.{c,cc,cpp,h,hpp}"
//!
//! [[MODE]]
//! NAME = "shellscript"
//! FILE = "shellscript.toml"
//! FILE_NAME_GLOB = "*.{sh,bash}"
//! FIRST_LINE_GLOB = "#!*sh*"
//! ```
//!
//! ## Learning: Callbacks Over Trees
//!
//! Reading a catalog and acting on it are split. [`parse_catalog`] walks
//! the document and fires [`CatalogHandler::start_element`] once per
//! entry; [`CatalogIngestor`] is the handler that turns `MODE` entries
//! into registered modes. Another catalog syntax only needs another
//! reader driving the same handler.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use modekit_core::{RegistryEvent, Severity};

use crate::ModeError;
use crate::mode::ModeDescriptor;
use crate::property::{FILE, FILENAME_GLOB, FIRSTLINE_GLOB};
use crate::registry::ModeRegistry;

/// File name of a catalog inside its directory.
pub const CATALOG_FILE: &str = "catalog.toml";

/// Element describing one mode.
pub const MODE_ELEMENT: &str = "MODE";

const NAME_ATTR: &str = "NAME";
const FILE_ATTR: &str = "FILE";
const FILE_NAME_GLOB_ATTR: &str = "FILE_NAME_GLOB";
const FIRST_LINE_GLOB_ATTR: &str = "FIRST_LINE_GLOB";

/// Source used when the catalog itself reports a problem.
const DIAGNOSTIC_SOURCE: &str = "catalog";

/// Attributes of one catalog element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(BTreeMap<String, String>);

impl Attributes {
    /// Creates an empty attribute set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns an attribute's value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Sets an attribute.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Receives catalog elements as they are read.
pub trait CatalogHandler {
    /// Called once per element, in document order within each element kind.
    fn start_element(&mut self, element: &str, attributes: &Attributes);
}

/// A catalog that could not be read at all.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("cannot read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed catalog {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Reads a TOML catalog and feeds each element to `handler`.
///
/// Every top-level array of tables is a list of elements named by its key;
/// a lone table is a single element. Non-string attribute values are
/// passed on in their TOML spelling. Other top-level keys are skipped.
///
/// Returns the number of elements dispatched. `origin` only labels errors.
pub fn parse_catalog(
    source: &str,
    origin: &Path,
    handler: &mut dyn CatalogHandler,
) -> Result<usize, CatalogError> {
    let document: toml::Table = source.parse().map_err(|source| CatalogError::Parse {
        path: origin.to_path_buf(),
        source,
    })?;

    let mut dispatched = 0;
    for (element, value) in &document {
        match value {
            toml::Value::Array(items) => {
                for item in items {
                    if let toml::Value::Table(table) = item {
                        handler.start_element(element, &attributes_of(table));
                        dispatched += 1;
                    } else {
                        tracing::debug!("Skipping non-table {} entry in {}", element, origin.display());
                    }
                }
            }
            toml::Value::Table(table) => {
                handler.start_element(element, &attributes_of(table));
                dispatched += 1;
            }
            _ => tracing::debug!("Skipping top-level key {} in {}", element, origin.display()),
        }
    }

    Ok(dispatched)
}

fn attributes_of(table: &toml::Table) -> Attributes {
    table
        .iter()
        .map(|(key, value)| {
            let value = match value {
                toml::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), value)
        })
        .collect()
}

/// Turns `MODE` elements into registered, initialized modes.
///
/// For each entry the mode is created and registered right away, then
/// configured and initialized, so a half-configured mode is already
/// findable by name. Problems are reported through the registry's
/// diagnostics and never stop the catalog.
pub struct CatalogIngestor<'a> {
    directory: PathBuf,
    registry: &'a ModeRegistry,
    ingested: Vec<String>,
}

impl<'a> CatalogIngestor<'a> {
    /// Creates an ingestor resolving rule files relative to `directory`.
    pub fn new(directory: impl Into<PathBuf>, registry: &'a ModeRegistry) -> Self {
        Self {
            directory: directory.into(),
            registry,
            ingested: Vec::new(),
        }
    }

    /// Names of the modes ingested so far, in catalog order.
    pub fn ingested(&self) -> &[String] {
        &self.ingested
    }

    fn report(&self, source: &str, error: &ModeError) {
        self.registry
            .diagnostics()
            .report(Severity::Error, source, &error.to_string());
    }

    fn ingest_mode(&mut self, attributes: &Attributes) {
        let Some(name) = attributes.get(NAME_ATTR).filter(|n| !n.is_empty()) else {
            self.report(
                DIAGNOSTIC_SOURCE,
                &ModeError::UnnamedEntry {
                    catalog: self.directory.clone(),
                },
            );
            return;
        };

        let file = attributes.get(FILE_ATTR);
        if file.is_none() {
            self.report(
                DIAGNOSTIC_SOURCE,
                &ModeError::MissingAttribute {
                    catalog: self.directory.clone(),
                    mode: name.to_string(),
                    attribute: FILE_ATTR,
                },
            );
        }

        let mode = Arc::new(ModeDescriptor::new(name));
        self.registry.register(Arc::clone(&mode));

        match file {
            Some(file) => mode.set_property(FILE, self.directory.join(file).display().to_string()),
            None => mode.unset_property(FILE),
        }

        for (property, attribute) in [
            (FILENAME_GLOB, FILE_NAME_GLOB_ATTR),
            (FIRSTLINE_GLOB, FIRST_LINE_GLOB_ATTR),
        ] {
            mode.unset_property(property);
            if let Some(glob) = attributes.get(attribute) {
                mode.set_property(property, glob);
            }
        }

        if let Err(errors) = mode.init() {
            for e in &errors {
                self.report(name, e);
            }
        }

        tracing::trace!(mode = %name, "Ingested mode");
        self.ingested.push(name.to_string());
    }
}

impl CatalogHandler for CatalogIngestor<'_> {
    fn start_element(&mut self, element: &str, attributes: &Attributes) {
        if element == MODE_ELEMENT {
            self.ingest_mode(attributes);
        } else {
            tracing::trace!("Ignoring catalog element {}", element);
        }
    }
}

/// Loads `<directory>/catalog.toml` into `registry`.
///
/// Returns how many modes it defined.
pub fn load_catalog(directory: &Path, registry: &ModeRegistry) -> Result<usize, CatalogError> {
    let path = directory.join(CATALOG_FILE);
    let source = std::fs::read_to_string(&path).map_err(|source| CatalogError::Io {
        path: path.clone(),
        source,
    })?;

    let mut ingestor = CatalogIngestor::new(directory, registry);
    parse_catalog(&source, &path, &mut ingestor)?;

    let modes = ingestor.ingested().len();
    tracing::info!("Loaded {} modes from {}", modes, path.display());
    registry.events().emit(RegistryEvent::CatalogLoaded {
        directory: directory.to_path_buf(),
        modes,
    });
    Ok(modes)
}

/// Loads several catalog directories in order.
///
/// A directory that fails is reported and skipped. Returns the total
/// number of modes defined.
pub fn load_catalogs(registry: &ModeRegistry, directories: &[PathBuf]) -> usize {
    directories
        .iter()
        .map(|dir| match load_catalog(dir, registry) {
            Ok(modes) => modes,
            Err(e) => {
                registry.diagnostics().report(
                    Severity::Error,
                    DIAGNOSTIC_SOURCE,
                    &ModeError::from(e).to_string(),
                );
                0
            }
        })
        .sum()
}

/// Drops every mode and loads `directories` again into the same registry.
pub fn reload(registry: &ModeRegistry, directories: &[PathBuf]) -> usize {
    registry.clear();
    load_catalogs(registry, directories)
}
