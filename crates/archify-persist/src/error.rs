//! Error types for the persistence adapter
//!
//! Covers:
//! - Store read/write failures (quota, I/O, bad keys)
//! - Corrupt stored or supplied documents
//! - Illegal adapter state transitions
//! - Configuration loading

use crate::state::AdapterState;
use archify_scene::SceneError;
use std::path::PathBuf;

/// Key-value store failures
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Write would exceed the store's byte quota
    #[error("store quota exceeded: {needed} bytes needed, {available} available")]
    QuotaExceeded { needed: usize, available: usize },

    /// Underlying file system error
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Key cannot be mapped onto the backing medium
    #[error("invalid store key: {0:?}")]
    InvalidKey(String),
}

impl StoreError {
    /// Would retrying after the store frees space or recovers help
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::QuotaExceeded { .. } | StoreError::Io(_))
    }
}

/// Failures reading a document back from a store or caller
#[derive(Debug, thiserror::Error)]
pub enum RestoreError {
    /// Stored text is not JSON; the stored copy has been discarded
    #[error("corrupt document: {0}")]
    CorruptData(#[source] serde_json::Error),

    /// Store could not be read
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Rejected adapter state transition
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// `to` is not reachable from `from`
    #[error("illegal state transition: {from} -> {to}")]
    IllegalTransition { from: AdapterState, to: AdapterState },
}

/// Configuration loading failures
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`crate::AutosaveConfig`]
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values parsed but cannot be used
    #[error("invalid config: {0}")]
    Invalid(String),

    /// A custom allow-list was rejected
    #[error("invalid config: {0}")]
    AllowList(#[from] SceneError),
}

/// Top-level persistence error
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error(transparent)]
    Restore(#[from] RestoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Scene(#[from] SceneError),
}

impl PersistError {
    /// Was the document itself unreadable
    #[inline]
    #[must_use]
    pub fn is_corrupt_data(&self) -> bool {
        matches!(self, PersistError::Restore(RestoreError::CorruptData(_)))
    }
}

/// Result alias for persistence operations
pub type PersistResult<T> = Result<T, PersistError>;
