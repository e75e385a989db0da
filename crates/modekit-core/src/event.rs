//! Event bus for registry notifications.
//!
//! ## Learning: Observer Pattern in Rust
//!
//! Editing sessions want to know when the mode they are using was
//! redefined. Instead of holding callbacks, they subscribe to a
//! `tokio::sync::broadcast` channel and receive cloned events.

use std::path::PathBuf;
use tokio::sync::broadcast;

/// Something that happened to the mode registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    /// A mode was added or replaced a same-named one
    ModeRegistered(String),
    /// A mode was removed by name
    ModeRemoved(String),
    /// Every mode was dropped ahead of a reload
    RegistryCleared,
    /// A catalog directory finished loading
    CatalogLoaded { directory: PathBuf, modes: usize },
    /// A mode's tokenizer was built
    TokenizerLoaded(String),
    /// A mode's tokenizer could not be built
    TokenizerFailed(String),
}

/// Event bus for broadcasting registry events.
///
/// Lagging receivers lose old events instead of blocking the registry.
pub struct EventBus {
    sender: broadcast::Sender<RegistryEvent>,
}

impl EventBus {
    /// Creates a new event bus.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }

    /// Emits an event to all subscribers.
    pub fn emit(&self, event: RegistryEvent) {
        // No receivers is fine
        let _ = self.sender.send(event);
    }

    /// Subscribes to events.
    ///
    /// Returns a receiver that will get all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("receivers", &self.sender.receiver_count())
            .finish()
    }
}

/// Helper for processing events asynchronously.
///
/// ## Example
///
/// ```ignore
/// let mut handler = EventHandler::new(registry.subscribe());
///
/// tokio::spawn(async move {
///     while let Some(event) = handler.next().await {
///         if let RegistryEvent::ModeRegistered(name) = event {
///             // Re-resolve open buffers using `name`
///         }
///     }
/// });
/// ```
pub struct EventHandler {
    receiver: broadcast::Receiver<RegistryEvent>,
}

impl EventHandler {
    /// Creates a new event handler.
    pub fn new(receiver: broadcast::Receiver<RegistryEvent>) -> Self {
        Self { receiver }
    }

    /// Waits for the next event.
    pub async fn next(&mut self) -> Option<RegistryEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Event handler lagged, missed {} events", n);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
