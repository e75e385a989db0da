//! Subcommand implementations.
//!
//! Every command writes its output to a caller-supplied writer so tests
//! can capture it. Mode-level problems (bad globs, unreadable rule files)
//! are reported through diagnostics and never fail a command; only
//! problems with the command's own input do.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use modekit_core::{CatalogWatcher, Config, DiagnosticLog, EventHandler, Severity};
use modekit_modes::property::{FILE, FILENAME_GLOB, FIRSTLINE_GLOB};
use modekit_modes::{ModeDescriptor, ModeRegistry, TokenizerStatus, load_catalogs, reload};
use modekit_syntax::RuleFileLoader;
use serde::Serialize;

/// Notify reports one save as several events; wait this long for the rest.
const SETTLE_DELAY: Duration = Duration::from_millis(150);

/// A loaded registry plus what it was loaded from.
pub struct Session {
    pub config: Config,
    pub registry: ModeRegistry,
    pub diagnostics: Arc<DiagnosticLog>,
    pub directories: Vec<PathBuf>,
}

impl Session {
    /// Loads the configured catalogs followed by `extra_catalogs`.
    pub fn open(config: Config, extra_catalogs: &[PathBuf]) -> Self {
        let diagnostics = Arc::new(DiagnosticLog::new());
        let registry = ModeRegistry::new(RuleFileLoader::new()).with_diagnostics(diagnostics.clone());

        let mut directories = config.catalog_dirs();
        for dir in extra_catalogs {
            if !directories.contains(dir) {
                directories.push(dir.clone());
            }
        }

        let modes = load_catalogs(&registry, &directories);
        tracing::info!("{} modes from {} catalog directories", modes, directories.len());

        Self {
            config,
            registry,
            diagnostics,
            directories,
        }
    }

    /// The mode for `file`, falling back to the configured fallback mode.
    pub fn resolve(&self, file: &Path, first_line: Option<&str>) -> Option<Arc<ModeDescriptor>> {
        let path = file.to_string_lossy();
        let name = file.file_name().map(|n| n.to_string_lossy());

        self.registry
            .mode_for_file(Some(path.as_ref()), name.as_deref(), first_line)
            .or_else(|| self.registry.lookup(&self.config.catalogs.fallback_mode))
    }
}

/// `detect`: prints the resolved mode's name.
pub fn detect(
    session: &Session,
    file: &Path,
    first_line: Option<&str>,
    out: &mut dyn Write,
) -> Result<()> {
    let read_line;
    let first_line = match first_line {
        Some(line) => Some(line),
        None => {
            read_line = read_first_line(file);
            read_line.as_deref()
        }
    };

    match session.resolve(file, first_line) {
        Some(mode) => writeln!(out, "{}", mode.name())?,
        None => writeln!(out, "{}", session.config.catalogs.fallback_mode)?,
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct ModeSummary {
    name: String,
    file: Option<String>,
    filename_glob: Option<String>,
    firstline_glob: Option<String>,
    tokenizer: String,
}

impl ModeSummary {
    fn of(mode: &ModeDescriptor) -> Self {
        let tokenizer = match mode.tokenizer_status() {
            TokenizerStatus::NotLoaded => "not loaded".to_string(),
            TokenizerStatus::Loaded => "loaded".to_string(),
            TokenizerStatus::Failed(reason) => format!("failed: {reason}"),
        };
        Self {
            name: mode.name().to_string(),
            file: mode.string_property(FILE),
            filename_glob: mode.string_property(FILENAME_GLOB),
            firstline_glob: mode.string_property(FIRSTLINE_GLOB),
            tokenizer,
        }
    }
}

/// `list`: one line per mode, or a JSON array.
pub fn list(session: &Session, json: bool, out: &mut dyn Write) -> Result<()> {
    let summaries: Vec<_> = session.registry.modes().iter().map(|m| ModeSummary::of(m)).collect();

    if json {
        serde_json::to_writer_pretty(&mut *out, &summaries)?;
        writeln!(out)?;
    } else {
        for summary in &summaries {
            writeln!(
                out,
                "{:<20} {:<30} {}",
                summary.name,
                summary.filename_glob.as_deref().unwrap_or("-"),
                summary.firstline_glob.as_deref().unwrap_or("-"),
            )?;
        }
    }

    let problems = session.diagnostics.at_least(Severity::Warning).len();
    if problems > 0 {
        tracing::warn!("{} problems reported while loading catalogs", problems);
    }
    Ok(())
}

/// `tokenize`: prints `line:column kind text` for every token.
pub fn tokenize(
    session: &Session,
    file: &Path,
    mode_name: Option<&str>,
    out: &mut dyn Write,
) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Cannot read {}", file.display()))?;

    let mode = match mode_name {
        Some(name) => Some(
            session
                .registry
                .lookup(name)
                .with_context(|| format!("No mode named {name}"))?,
        ),
        None => session.resolve(file, text.lines().next()),
    };

    let Some(mode) = mode else {
        tracing::warn!("No mode for {}", file.display());
        return Ok(());
    };

    let Some(tokenizer) = session.registry.tokenizer_for(&mode) else {
        tracing::warn!("Mode {} has no tokenizer", mode.name());
        return Ok(());
    };

    let lines: Vec<&str> = text.lines().collect();
    let tokenized = tokenizer.tokenize_lines(&mut lines.iter().copied());
    for (idx, (line, result)) in lines.iter().zip(&tokenized).enumerate() {
        for token in &result.tokens {
            let Some(slice) = line.get(token.range.clone()) else {
                continue;
            };
            writeln!(
                out,
                "{}:{}\t{:?}\t{:?}",
                idx + 1,
                token.range.start + 1,
                token.kind,
                slice
            )?;
        }
    }
    Ok(())
}

/// `config`: prints the effective configuration, or saves it as the default.
pub fn show_config(config: &Config, save: bool, out: &mut dyn Write) -> Result<()> {
    if save {
        let path = config.save().context("Cannot save config")?;
        writeln!(out, "Saved {}", path.display())?;
    } else {
        write!(out, "{}", config.to_toml()?)?;
    }
    Ok(())
}

/// `watch`: reloads the registry on every catalog change until Ctrl-C.
pub async fn watch(session: &Session) -> Result<()> {
    let (watcher, mut changes) = CatalogWatcher::watch(&session.directories)?;
    println!(
        "Watching {} catalog directories, {} modes loaded",
        watcher.directories().len(),
        session.registry.len()
    );

    let mut events = EventHandler::new(session.registry.subscribe());
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            change = changes.recv() => {
                let Some(change) = change else { break };
                tracing::debug!("Catalog change: {:?}", change);

                tokio::time::sleep(SETTLE_DELAY).await;
                while changes.try_recv().is_ok() {}

                session.diagnostics.clear();
                let modes = reload(&session.registry, &session.directories);
                println!(
                    "Reloaded {} modes after change to {} ({} errors)",
                    modes,
                    change.path().display(),
                    session.diagnostics.error_count()
                );
            }
            Some(event) = events.next() => {
                tracing::trace!("Registry event: {:?}", event);
            }
            _ = &mut ctrl_c => break,
        }
    }

    Ok(())
}

fn read_first_line(file: &Path) -> Option<String> {
    let reader = BufReader::new(File::open(file).ok()?);
    reader.lines().next()?.ok()
}
