//! Live document sessions
//!
//! The editing session owns the current document. The adapter loads
//! documents into it and listens for its change notifications.

use archify_scene::SceneDocument;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::RwLock;
use tokio::sync::broadcast;

/// Actions the adapter dispatches into a session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    /// Replace the session's document
    LoadDocument(SceneDocument),
}

/// Notification that the session's document changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionChange {
    /// Session-local change counter
    pub revision: u64,
}

/// A live editing session
#[async_trait]
pub trait DocumentSession: Send + Sync {
    /// Apply an action
    async fn dispatch(&self, action: SessionAction);

    /// Change notifications from now on; ends when the session closes
    fn subscribe(&self) -> BoxStream<'static, SessionChange>;

    /// Snapshot of the current document
    async fn current_document(&self) -> SceneDocument;
}

const CHANGE_CAPACITY: usize = 64;

#[derive(Debug, Default)]
struct LocalState {
    document: SceneDocument,
    revision: u64,
}

/// In-process session: a locked document plus a broadcast of changes
#[derive(Debug)]
pub struct LocalSession {
    state: RwLock<LocalState>,
    changes: broadcast::Sender<SessionChange>,
}

impl LocalSession {
    /// Session holding an empty document
    #[must_use]
    pub fn new() -> Self {
        Self::with_document(SceneDocument::new())
    }

    /// Session holding `document`
    #[must_use]
    pub fn with_document(document: SceneDocument) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            state: RwLock::new(LocalState {
                document,
                revision: 0,
            }),
            changes,
        }
    }

    /// Edit the document in place and notify subscribers
    ///
    /// Returns the new revision.
    pub fn update(&self, edit: impl FnOnce(&mut SceneDocument)) -> u64 {
        let revision = {
            let mut state = self.state.write();
            edit(&mut state.document);
            state.revision += 1;
            state.revision
        };
        // No subscribers is fine.
        let _ = self.changes.send(SessionChange { revision });
        revision
    }

    /// Current revision
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.state.read().revision
    }

    /// Synchronous snapshot
    #[must_use]
    pub fn document(&self) -> SceneDocument {
        self.state.read().document.clone()
    }
}

impl Default for LocalSession {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentSession for LocalSession {
    async fn dispatch(&self, action: SessionAction) {
        match action {
            SessionAction::LoadDocument(document) => {
                let revision = self.update(|current| *current = document);
                tracing::debug!(revision, "session loaded document");
            }
        }
    }

    fn subscribe(&self) -> BoxStream<'static, SessionChange> {
        let receiver = self.changes.subscribe();
        stream::unfold(receiver, |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(change) => return Some((change, receiver)),
                    // Later notifications are still queued; any one of them
                    // triggers a write of the latest document.
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "session change stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
        .boxed()
    }

    async fn current_document(&self) -> SceneDocument {
        self.document()
    }
}
