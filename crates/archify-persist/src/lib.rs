//! Archify persistence adapter
//!
//! Connects the scene sanitizer to durable storage and to the live editing
//! session.
//!
//! # Core Concepts
//!
//! - [`PersistenceAdapter`]: restore on startup, debounced autosave, sanitized
//!   imports
//! - [`KeyValueStore`]: async string store ([`MemoryStore`], [`FileStore`])
//! - [`DocumentSession`]: the live session documents are loaded into
//! - [`AdapterState`]: `Idle → Restoring → Ready ⇄ PendingWrite`
//!
//! # Example
//!
//! ```rust
//! use archify_persist::{LocalSession, MemoryStore, PersistenceAdapter};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), archify_persist::PersistError> {
//! let store = Arc::new(MemoryStore::new().with_entry("react-planner_v0", "{\"layers\":{}}"));
//! let adapter = PersistenceAdapter::new(store);
//! let session = Arc::new(LocalSession::new());
//!
//! let restored = adapter.bootstrap(session.as_ref()).await?;
//! assert!(restored.is_some());
//!
//! let autosave = adapter.autosave(session.clone());
//! autosave.stop();
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod adapter;
pub mod cache;
pub mod config;
pub mod debounce;
pub mod error;
pub mod session;
pub mod state;
pub mod store;

pub use adapter::{AutosaveHandle, PersistenceAdapter};
pub use cache::{CacheStats, ImportKey, SanitizeCache};
pub use config::{AutosaveConfig, DEFAULT_AUTOSAVE_KEY, DEFAULT_DEBOUNCE_MS, DEFAULT_HANDOFF_KEY};
pub use debounce::Debouncer;
pub use error::{ConfigError, PersistError, PersistResult, RestoreError, StateError, StoreError};
pub use session::{DocumentSession, LocalSession, SessionAction, SessionChange};
pub use state::{allowed_transitions, validate_transition, AdapterState};
pub use store::{FileStore, KeyValueStore, MemoryStore};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
