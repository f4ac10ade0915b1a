//! Persisted favorites
//!
//! The whole collection lives in one named slot as a JSON array of
//! [`FavoriteRecord`]. Every save rewrites the slot wholesale. The store owns
//! the identity-key uniqueness invariant: saving an already-saved destination
//! is a no-op.

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use wander_common::config::atomic_write;
use wander_common::events::{EventBus, SearchEvent};
use wander_common::models::{Destination, FavoriteRecord};
use wander_common::Result;

/// Name of the durable slot holding the favorites collection
pub const FAVORITES_SLOT: &str = "savedDestinations";

/// Durable storage for the favorites slot
pub trait FavoritesSlot: Send + Sync {
    /// Raw slot contents, `None` if the slot was never written
    fn read(&self) -> Result<Option<String>>;

    /// Replace the slot contents
    fn write(&self, contents: &str) -> Result<()>;
}

/// Slot backed by a JSON file, replaced atomically on write
#[derive(Debug, Clone)]
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<folder>/savedDestinations.json`
    pub fn in_folder(folder: &Path) -> Self {
        Self::new(folder.join(format!("{}.json", FAVORITES_SLOT)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FavoritesSlot for FileSlot {
    fn read(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, contents: &str) -> Result<()> {
        atomic_write(&self.path, contents.as_bytes())
    }
}

/// In-memory slot
///
/// Clones share the same contents, so a second store built from a clone sees
/// what the first one wrote.
#[derive(Debug, Clone, Default)]
pub struct MemorySlot {
    contents: Arc<Mutex<Option<String>>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot pre-filled with `contents`
    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Arc::new(Mutex::new(Some(contents.into()))),
        }
    }

    /// Current raw contents
    pub fn contents(&self) -> Option<String> {
        self.contents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl FavoritesSlot for MemorySlot {
    fn read(&self) -> Result<Option<String>> {
        Ok(self.contents())
    }

    fn write(&self, contents: &str) -> Result<()> {
        *self
            .contents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(contents.to_string());
        Ok(())
    }
}

/// Outcome of [`FavoritesStore::save`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    AlreadySaved,
}

/// Favorites collection loaded from a slot
pub struct FavoritesStore<S: FavoritesSlot> {
    slot: S,
    records: Vec<FavoriteRecord>,
    event_bus: Option<EventBus>,
}

impl<S: FavoritesSlot> FavoritesStore<S> {
    /// Read the collection from `slot`
    ///
    /// Never fails: an absent, unreadable or corrupt slot yields an empty
    /// collection. Duplicate keys left by older writers are dropped, keeping
    /// the first record.
    pub fn load(slot: S) -> Self {
        let records = match slot.read() {
            Ok(Some(contents)) => match serde_json::from_str::<Vec<FavoriteRecord>>(&contents) {
                Ok(records) => dedupe(records),
                Err(e) => {
                    warn!("Favorites slot is corrupt, starting empty: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Favorites slot unreadable, starting empty: {}", e);
                Vec::new()
            }
        };

        debug!(count = records.len(), "Loaded favorites");

        Self {
            slot,
            records,
            event_bus: None,
        }
    }

    /// Announce saves on `event_bus`
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Whether a record with the same (Destination, Country) exists
    pub fn is_saved(&self, destination: &Destination) -> bool {
        self.records
            .iter()
            .any(|record| record.destination.same_place(destination))
    }

    /// Bookmark `destination` and persist the full collection
    ///
    /// The in-memory collection only changes once the slot write succeeds.
    pub fn save(&mut self, destination: &Destination) -> Result<SaveOutcome> {
        if self.is_saved(destination) {
            debug!(key = %destination.key(), "Destination already saved");
            return Ok(SaveOutcome::AlreadySaved);
        }

        let saved_at = Utc::now();
        let mut next = self.records.clone();
        next.push(FavoriteRecord::new(destination.clone(), saved_at));

        let contents = serde_json::to_string(&next)?;
        self.slot.write(&contents)?;
        self.records = next;

        info!(key = %destination.key(), "Saved destination");
        if let Some(bus) = &self.event_bus {
            bus.emit_lossy(SearchEvent::FavoriteSaved {
                destination: destination.name.clone(),
                country: destination.country.clone(),
                timestamp: saved_at,
            });
        }

        Ok(SaveOutcome::Saved)
    }

    /// Saved records in insertion order
    pub fn records(&self) -> &[FavoriteRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn dedupe(records: Vec<FavoriteRecord>) -> Vec<FavoriteRecord> {
    let total = records.len();
    let mut unique: Vec<FavoriteRecord> = Vec::with_capacity(total);
    for record in records {
        if !unique
            .iter()
            .any(|kept| kept.destination.same_place(&record.destination))
        {
            unique.push(record);
        }
    }
    if unique.len() < total {
        warn!(
            dropped = total - unique.len(),
            "Dropped duplicate favorites from slot"
        );
    }
    unique
}
