//! Persistence of canonical batches.
//!
//! Backends receive harvested frames, run them through the normalizer and
//! write the canonical layout. Every backend returns the number of rows it
//! wrote, and an empty batch is always a no-op.

mod database;
mod file;

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use hoops_core::{EntityKind, Frame, NormalizeError};
use thiserror::Error;

use crate::persist::PersistError;

pub use database::{DatabaseBackend, DatabaseStore};
pub use file::FileStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Replace,
    Append,
}

impl WriteMode {
    pub fn as_str(self) -> &'static str {
        match self {
            WriteMode::Replace => "replace",
            WriteMode::Append => "append",
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unable to open any store after attempting: {attempted}")]
    Unavailable {
        attempted: String,
        #[source]
        source: Option<sqlx::Error>,
    },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Primary database URL (`postgres://...` or `sqlite:...`); empty means none.
    pub url: String,
    /// Embedded database used when the primary cannot be reached.
    pub fallback_path: PathBuf,
    /// Namespace for PostgreSQL tables; ignored by SQLite.
    pub schema: Option<String>,
    pub season_table: String,
    pub schedule_table: String,
    pub boxscore_table: String,
    pub chunk_size: usize,
    pub connect_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            fallback_path: PathBuf::from("data/hoops.db"),
            schema: Some("basketball_hoops".to_string()),
            season_table: EntityKind::Unit.default_table().to_string(),
            schedule_table: EntityKind::Listing.default_table().to_string(),
            boxscore_table: EntityKind::Detail.default_table().to_string(),
            chunk_size: 1000,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl StoreConfig {
    pub fn table(&self, kind: EntityKind) -> &str {
        match kind {
            EntityKind::Unit => &self.season_table,
            EntityKind::Listing => &self.schedule_table,
            EntityKind::Detail => &self.boxscore_table,
        }
    }
}

#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Normalizes `frame` as `kind` and writes it; returns rows written.
    async fn save(&self, kind: EntityKind, frame: &Frame, mode: WriteMode)
        -> Result<usize, StoreError>;

    /// Human-readable location of the `kind` data, for run summaries.
    fn target(&self, kind: EntityKind) -> String;

    async fn save_units(&self, frame: &Frame, mode: WriteMode) -> Result<usize, StoreError> {
        self.save(EntityKind::Unit, frame, mode).await
    }

    async fn save_listings(&self, frame: &Frame, mode: WriteMode) -> Result<usize, StoreError> {
        self.save(EntityKind::Listing, frame, mode).await
    }

    async fn save_details(&self, frame: &Frame, mode: WriteMode) -> Result<usize, StoreError> {
        self.save(EntityKind::Detail, frame, mode).await
    }
}
