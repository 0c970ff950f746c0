//! Persistence adapter
//!
//! Glue between the sanitizer, a [`KeyValueStore`] and a live
//! [`DocumentSession`]:
//! - `restore` / `bootstrap`: read the autosave slot, sanitize, load
//! - `watch`: debounced write-back of the session's document on every change
//! - `import_external` / `take_handoff`: sanitize generated or imported
//!   documents before they reach the session
//!
//! Writes store the session's document verbatim. Only the read paths
//! sanitize.

use crate::cache::{ImportKey, SanitizeCache};
use crate::config::AutosaveConfig;
use crate::debounce::Debouncer;
use crate::error::{PersistError, PersistResult, RestoreError};
use crate::session::{DocumentSession, SessionAction};
use crate::state::{AdapterState, StateTracker};
use crate::store::KeyValueStore;
use archify_scene::{AllowList, Fingerprint, SceneDocument, Sanitizer};
use futures::StreamExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

struct AdapterInner {
    store: Arc<dyn KeyValueStore>,
    config: AutosaveConfig,
    restore_allow: AllowList,
    import_allow: AllowList,
    state: StateTracker,
    cache: SanitizeCache,
    /// Serializes writes; holds the fingerprint of the last successful one
    last_write: tokio::sync::Mutex<Option<Fingerprint>>,
}

/// Bridges a store and a live session
///
/// Cheap to clone; clones share state, cache and store.
#[derive(Clone)]
pub struct PersistenceAdapter {
    inner: Arc<AdapterInner>,
}

impl std::fmt::Debug for PersistenceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceAdapter")
            .field("store", &self.inner.store)
            .field("state", &self.inner.state.current())
            .field("autosave_key", &self.inner.config.autosave_key)
            .finish_non_exhaustive()
    }
}

impl PersistenceAdapter {
    /// Adapter over `store` with default configuration
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::build(store, AutosaveConfig::default())
    }

    /// Adapter over `store` with a validated configuration
    ///
    /// # Errors
    /// `PersistError::Config` if `config` does not validate.
    pub fn with_config(store: Arc<dyn KeyValueStore>, config: AutosaveConfig) -> PersistResult<Self> {
        config.validate()?;
        Ok(Self::build(store, config))
    }

    fn build(store: Arc<dyn KeyValueStore>, config: AutosaveConfig) -> Self {
        let inner = AdapterInner {
            store,
            restore_allow: config.restore_allow_list(),
            import_allow: config.import_allow_list(),
            state: StateTracker::new(),
            cache: SanitizeCache::new(config.cache_capacity),
            last_write: tokio::sync::Mutex::new(None),
            config,
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &AutosaveConfig {
        &self.inner.config
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> AdapterState {
        self.inner.state.current()
    }

    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.inner.store
    }

    #[inline]
    #[must_use]
    pub fn cache(&self) -> &SanitizeCache {
        &self.inner.cache
    }

    /// Read and sanitize the document stored under `key`
    ///
    /// `Ok(None)` if nothing is stored. Text that is not JSON is deleted from
    /// the store before `CorruptData` is returned.
    ///
    /// # Errors
    /// `RestoreError::CorruptData` for unparseable text, `RestoreError::Store`
    /// if the store cannot be read.
    pub async fn restore(&self, key: &str) -> Result<Option<SceneDocument>, RestoreError> {
        let Some(raw) = self.inner.store.get(key).await? else {
            tracing::debug!(key, "no stored document");
            return Ok(None);
        };

        let value: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "stored document is corrupt; discarding it");
                self.discard(key).await;
                return Err(RestoreError::CorruptData(e));
            }
        };

        let sanitized = Sanitizer::new(&self.inner.restore_allow).sanitize(&value);
        tracing::info!(
            key,
            layers = sanitized.document.layers.len(),
            removed = sanitized.report.removed_count(),
            "restored document"
        );
        Ok(Some(sanitized.document))
    }

    /// Startup: restore the autosave slot into `session`
    ///
    /// Ends `Ready` when a document was loaded or none was stored, `Idle`
    /// when the stored document was corrupt (and has been discarded).
    ///
    /// # Errors
    /// `PersistError::State` if called twice, `PersistError::Restore` if the
    /// store cannot be read.
    pub async fn bootstrap(&self, session: &dyn DocumentSession) -> PersistResult<Option<SceneDocument>> {
        self.inner.state.transition(AdapterState::Restoring)?;

        match self.restore(&self.inner.config.autosave_key).await {
            Ok(Some(document)) => {
                session
                    .dispatch(SessionAction::LoadDocument(document.clone()))
                    .await;
                self.inner.state.transition(AdapterState::Ready)?;
                Ok(Some(document))
            }
            Ok(None) => {
                self.inner.state.transition(AdapterState::Ready)?;
                Ok(None)
            }
            Err(RestoreError::CorruptData(_)) => {
                self.inner.state.transition(AdapterState::Idle)?;
                Ok(None)
            }
            Err(e) => {
                self.inner.state.transition(AdapterState::Idle)?;
                Err(e.into())
            }
        }
    }

    /// Autosave `session` to the configured key with the configured debounce
    #[must_use = "dropping the handle stops autosave"]
    pub fn autosave(&self, session: Arc<dyn DocumentSession>) -> AutosaveHandle {
        let key = self.inner.config.autosave_key.clone();
        self.watch(session, key, self.inner.config.debounce())
    }

    /// Write `session`'s document to `key` after each burst of changes
    ///
    /// Every change cancels the pending write and schedules a new one
    /// `debounce` later. Write failures are logged and dropped; the next
    /// change retries. Starting from `Idle` moves the adapter to `Ready`.
    #[must_use = "dropping the handle stops autosave"]
    pub fn watch(
        &self,
        session: Arc<dyn DocumentSession>,
        key: impl Into<String>,
        debounce: Duration,
    ) -> AutosaveHandle {
        let key: Arc<str> = Arc::from(key.into());
        if self.state() == AdapterState::Idle {
            if let Err(e) = self.inner.state.transition(AdapterState::Ready) {
                tracing::warn!(error = %e, "autosave started in an unexpected state");
            }
        }

        let debouncer = Arc::new(Debouncer::new(debounce));
        let mut changes = session.subscribe();
        let adapter = self.clone();
        let pending = Arc::clone(&debouncer);

        let task = tokio::spawn(async move {
            while let Some(change) = changes.next().await {
                tracing::trace!(revision = change.revision, "session changed");
                adapter.schedule_write(&session, &key, &pending);
            }
            tracing::debug!(key = %key, "session closed; autosave stopped");
        });

        tracing::debug!(debounce = ?debounce, "autosave started");
        AutosaveHandle {
            task,
            debouncer,
            adapter: self.clone(),
        }
    }

    fn schedule_write(&self, session: &Arc<dyn DocumentSession>, key: &Arc<str>, debouncer: &Debouncer) {
        let ticket = match self.inner.state.arm() {
            Ok(ticket) => ticket,
            Err(e) => {
                tracing::warn!(error = %e, "change ignored");
                return;
            }
        };

        let adapter = self.clone();
        let session = Arc::clone(session);
        let key = Arc::clone(key);
        debouncer.schedule(async move {
            adapter.write_back(session.as_ref(), &key).await;
            adapter.inner.state.settle(ticket);
        });
    }

    /// Serialize the session's current document and store it
    async fn write_back(&self, session: &dyn DocumentSession, key: &str) {
        let document = session.current_document().await;
        let text = match document.to_json_string() {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(key, error = %e, "document could not be encoded; write skipped");
                return;
            }
        };
        let fingerprint = Fingerprint::of_bytes(text.as_bytes());

        let mut last_write = self.inner.last_write.lock().await;
        if self.inner.config.skip_unchanged && *last_write == Some(fingerprint) {
            tracing::debug!(key, "document unchanged; write skipped");
            return;
        }

        match self.inner.store.set(key, &text).await {
            Ok(()) => {
                *last_write = Some(fingerprint);
                tracing::debug!(key, bytes = text.len(), fingerprint = %fingerprint.short(), "autosaved");
            }
            Err(e) => {
                tracing::warn!(key, error = %e, transient = e.is_transient(), "autosave write failed");
            }
        }
    }

    /// Sanitize a generated or imported document with the import allow-list
    ///
    /// Results are cached by content, so importing the same JSON twice runs
    /// the sanitizer once.
    pub async fn import_external(&self, raw: &Value) -> SceneDocument {
        let allow = &self.inner.import_allow;
        let sanitize = move || async move {
            let sanitized = Sanitizer::new(allow).sanitize(raw);
            tracing::info!(
                allow_list = %allow.name,
                layers = sanitized.document.layers.len(),
                removed = sanitized.report.removed_count(),
                "imported document"
            );
            sanitized.document
        };

        match Fingerprint::of_json(raw) {
            Ok(content) => {
                let key = ImportKey::new(content, allow.name.clone());
                let cached = self.inner.cache.get_or_insert_with(key, sanitize).await;
                SceneDocument::clone(&cached)
            }
            Err(e) => {
                tracing::debug!(error = %e, "import not cacheable");
                sanitize().await
            }
        }
    }

    /// Parse, then [`import_external`](Self::import_external)
    ///
    /// # Errors
    /// `RestoreError::CorruptData` if `raw` is not JSON.
    pub async fn import_external_str(&self, raw: &str) -> Result<SceneDocument, RestoreError> {
        let value: Value = serde_json::from_str(raw).map_err(RestoreError::CorruptData)?;
        Ok(self.import_external(&value).await)
    }

    /// Import `raw` and load it into `session`
    pub async fn load_external(&self, raw: &Value, session: &dyn DocumentSession) -> SceneDocument {
        let document = self.import_external(raw).await;
        session
            .dispatch(SessionAction::LoadDocument(document.clone()))
            .await;
        document
    }

    /// Consume the one-shot handoff key and load its document into `session`
    ///
    /// The key is deleted before its content is parsed, so a corrupt handoff
    /// is never retried.
    ///
    /// # Errors
    /// `PersistError::Store` if the key cannot be read, `PersistError::Restore`
    /// with `CorruptData` if its content is not JSON.
    pub async fn take_handoff(&self, session: &dyn DocumentSession) -> PersistResult<Option<SceneDocument>> {
        let key = &self.inner.config.handoff_key;
        let Some(raw) = self.inner.store.get(key).await? else {
            return Ok(None);
        };
        self.discard(key).await;

        let value: Value = serde_json::from_str(&raw).map_err(|e| {
            tracing::warn!(key = %key, error = %e, "handoff document is corrupt");
            PersistError::from(RestoreError::CorruptData(e))
        })?;
        Ok(Some(self.load_external(&value, session).await))
    }

    async fn discard(&self, key: &str) {
        if let Err(e) = self.inner.store.remove(key).await {
            tracing::warn!(key, error = %e, "could not delete stored document");
        }
    }
}

/// Running autosave subscription
///
/// Dropping the handle stops autosave and cancels a write still waiting
/// for its debounce delay. A cancelled write puts the adapter back in `Ready`.
#[derive(Debug)]
pub struct AutosaveHandle {
    task: JoinHandle<()>,
    debouncer: Arc<Debouncer>,
    adapter: PersistenceAdapter,
}

impl AutosaveHandle {
    /// Unsubscribe and cancel the pending write
    pub fn stop(self) {
        drop(self);
    }

    /// Is a write waiting for its debounce delay
    #[must_use]
    pub fn has_pending_write(&self) -> bool {
        self.debouncer.is_pending()
    }
}

impl Drop for AutosaveHandle {
    fn drop(&mut self) {
        self.task.abort();
        if self.debouncer.cancel() {
            self.adapter.inner.state.disarm();
            tracing::debug!("pending autosave write cancelled");
        }
    }
}
