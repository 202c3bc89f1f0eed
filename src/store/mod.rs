pub mod keys;
pub mod migrate;
pub mod operations;
pub mod trees;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::Db;
use thiserror::Error;

#[derive(Debug)]
pub struct Store {
    db: Db,
    pub items: sled::Tree,
    pub items_by_scope: sled::Tree,
    pub attempts: sled::Tree,
    pub item_progress: sled::Tree,
    pub quiz_runs: sled::Tree,
    pub domain_mastery: sled::Tree,
    pub system_metrics: sled::Tree,
    pub config_versions: sled::Tree,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("not found: entity={entity}, key={key}")]
    NotFound { entity: String, key: String },
    #[error("invalid key segment `{field}`: {reason}")]
    InvalidKey { field: &'static str, reason: String },
    #[error("CAS retry exhausted after {attempts} attempts: entity={entity}, key={key}")]
    CasRetryExhausted {
        entity: String,
        key: String,
        attempts: u32,
    },
    #[error("validation error: {0}")]
    Validation(String),
    #[error("migration error at version {version}: {message}")]
    Migration { version: u32, message: String },
}

impl Store {
    pub fn open(sled_path: &str) -> Result<Self, StoreError> {
        let db = sled::open(sled_path)?;
        let items = db.open_tree(trees::ITEMS)?;
        let items_by_scope = db.open_tree(trees::ITEMS_BY_SCOPE)?;
        let attempts = db.open_tree(trees::ATTEMPTS)?;
        let item_progress = db.open_tree(trees::ITEM_PROGRESS)?;
        let quiz_runs = db.open_tree(trees::QUIZ_RUNS)?;
        let domain_mastery = db.open_tree(trees::DOMAIN_MASTERY)?;
        let system_metrics = db.open_tree(trees::SYSTEM_METRICS)?;
        let config_versions = db.open_tree(trees::CONFIG_VERSIONS)?;

        Ok(Self {
            db,
            items,
            items_by_scope,
            attempts,
            item_progress,
            quiz_runs,
            domain_mastery,
            system_metrics,
            config_versions,
        })
    }

    pub fn run_migrations(&self) -> Result<(), StoreError> {
        migrate::run(self)
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    pub fn raw_db(&self) -> &Db {
        &self.db
    }

    pub(crate) fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec(value)?)
    }

    pub(crate) fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Collapses a sled transaction error back into a `StoreError`.
pub(crate) fn map_tx_error(error: sled::transaction::TransactionError<StoreError>) -> StoreError {
    match error {
        sled::transaction::TransactionError::Abort(store_error) => store_error,
        sled::transaction::TransactionError::Storage(storage_error) => {
            StoreError::Sled(storage_error)
        }
    }
}
