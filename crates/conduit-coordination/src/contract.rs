use async_trait::async_trait;
use conduit_core::Result;
use tokio::sync::mpsc;

use crate::token::SessionToken;

/// One change observed by a [`WatchStream`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Put { key: String, value: Vec<u8> },
    Deleted { key: String },
    /// Terminal: the subscribing session itself expired. No further changes
    /// follow. This resolves the open question of what a watch sees when
    /// its own session, not merely a key it's watching, goes away.
    SessionExpired,
}

/// A live subscription to changes under a key prefix.
#[derive(Debug)]
pub struct WatchStream {
    receiver: mpsc::UnboundedReceiver<Change>,
}

impl WatchStream {
    #[must_use]
    pub(crate) fn new(receiver: mpsc::UnboundedReceiver<Change>) -> Self {
        Self { receiver }
    }

    /// Await the next change. Returns `None` once the service drops this
    /// subscription (after emitting `SessionExpired`, or on service
    /// shutdown).
    pub async fn next(&mut self) -> Option<Change> {
        self.receiver.recv().await
    }
}

/// Keyed set store with watch/subscribe semantics, consumed to implement
/// transient route registrations and logical-endpoint-to-physical-address
/// mapping (spec §6). Every key is owned by a session; session expiry
/// removes the keys it owns and terminates watches it opened.
#[async_trait]
pub trait CoordinationService: Send + Sync {
    async fn put(&self, key: String, value: Vec<u8>, owner: SessionToken) -> Result<()>;

    async fn delete(&self, key: String) -> Result<()>;

    async fn get(&self, key: String) -> Result<Option<Vec<u8>>>;

    /// Subscribe to changes under `prefix`. `subscriber` ties the
    /// subscription's lifetime to a session: when that session expires the
    /// stream receives a final [`Change::SessionExpired`] and then ends.
    async fn watch(&self, prefix: String, subscriber: SessionToken) -> Result<WatchStream>;

    /// Remove every key owned by `session` and end every watch it opened.
    async fn expire_session(&self, session: SessionToken) -> Result<()>;
}
