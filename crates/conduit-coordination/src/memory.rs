use std::sync::Arc;

use async_trait::async_trait;
use conduit_core::{AHashMap, Result};
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use crate::contract::{Change, CoordinationService, WatchStream};
use crate::token::SessionToken;

struct Watcher {
    prefix: String,
    subscriber: SessionToken,
    sender: mpsc::UnboundedSender<Change>,
}

#[derive(Default)]
struct State {
    entries: AHashMap<String, (Vec<u8>, SessionToken)>,
    watchers: Vec<Watcher>,
}

impl State {
    fn notify(&mut self, change: &Change, key: &str) {
        self.watchers.retain(|w| {
            if key.starts_with(&w.prefix) {
                w.sender.send(change.clone()).is_ok()
            } else {
                true
            }
        });
    }
}

/// Single-process reference implementation of [`CoordinationService`],
/// sufficient for hosting one `conduit-runtime` process and for the rest of
/// the workspace's tests. A distributed coordination backend is a contract
/// consumer's concern, out of scope here.
#[derive(Clone, Default)]
pub struct InMemoryCoordinationService {
    state: Arc<Mutex<State>>,
}

impl InMemoryCoordinationService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CoordinationService for InMemoryCoordinationService {
    async fn put(&self, key: String, value: Vec<u8>, owner: SessionToken) -> Result<()> {
        let mut state = self.state.lock().await;
        state.entries.insert(key.clone(), (value.clone(), owner));
        state.notify(&Change::Put { key: key.clone(), value }, &key);
        Ok(())
    }

    async fn delete(&self, key: String) -> Result<()> {
        let mut state = self.state.lock().await;
        state.entries.remove(&key);
        state.notify(&Change::Deleted { key: key.clone() }, &key);
        Ok(())
    }

    async fn get(&self, key: String) -> Result<Option<Vec<u8>>> {
        let state = self.state.lock().await;
        Ok(state.entries.get(&key).map(|(v, _)| v.clone()))
    }

    async fn watch(&self, prefix: String, subscriber: SessionToken) -> Result<WatchStream> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock().await;
        state.watchers.push(Watcher {
            prefix,
            subscriber,
            sender: tx,
        });
        Ok(WatchStream::new(rx))
    }

    async fn expire_session(&self, session: SessionToken) -> Result<()> {
        let mut state = self.state.lock().await;

        let expired_keys: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, (_, owner))| *owner == session)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired_keys {
            state.entries.remove(key);
        }
        for key in &expired_keys {
            state.notify(&Change::Deleted { key: key.clone() }, key);
        }

        let (owned, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut state.watchers)
            .into_iter()
            .partition(|w| w.subscriber == session);
        state.watchers = rest;
        for watcher in owned {
            if watcher.sender.send(Change::SessionExpired).is_err() {
                debug!(session = %session, "watcher dropped before session-expiry notice");
            }
        }
        Ok(())
    }
}
