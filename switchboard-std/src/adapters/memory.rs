//! In-process distributor.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use switchboard_core::{Distributor, DistributorError, QueueListener};

#[derive(Default)]
struct MemoryState {
    values: HashMap<String, String>,
    lists: HashMap<String, Vec<String>>,
    listeners: HashMap<String, Vec<QueueListener>>,
    pending: HashMap<String, VecDeque<Bytes>>,
}

/// A [`Distributor`] held entirely in memory.
///
/// Several routers sharing one instance behave like processes of one fleet.
/// Payloads enqueued on a queue nobody listens to are buffered and handed to
/// the first listener. Listeners run synchronously inside `enqueue`, outside
/// the internal lock.
#[derive(Default)]
pub struct MemoryDistributor {
    state: Mutex<MemoryState>,
}

impl MemoryDistributor {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current scalar value at `key`.
    pub fn value(&self, key: &str) -> Option<String> {
        self.state.lock().values.get(key).cloned()
    }

    /// Current items of the list at `key`.
    pub fn list(&self, key: &str) -> Vec<String> {
        self.state.lock().lists.get(key).cloned().unwrap_or_default()
    }

    /// Payloads buffered on a queue with no listener.
    pub fn pending(&self, queue: &str) -> usize {
        self.state.lock().pending.get(queue).map_or(0, VecDeque::len)
    }

    /// Listeners subscribed to `queue`.
    pub fn listener_count(&self, queue: &str) -> usize {
        self.state.lock().listeners.get(queue).map_or(0, Vec::len)
    }
}

#[async_trait]
impl Distributor for MemoryDistributor {
    async fn listen(&self, queue: &str, listener: QueueListener) -> Result<(), DistributorError> {
        let backlog = {
            let mut state = self.state.lock();
            state
                .listeners
                .entry(queue.to_owned())
                .or_default()
                .push(listener.clone());
            state.pending.remove(queue).unwrap_or_default()
        };
        for payload in backlog {
            listener(payload);
        }
        Ok(())
    }

    async fn enqueue(&self, queue: &str, payload: Bytes) -> Result<(), DistributorError> {
        let listeners = {
            let mut state = self.state.lock();
            match state.listeners.get(queue) {
                Some(listeners) if !listeners.is_empty() => listeners.clone(),
                _ => {
                    state
                        .pending
                        .entry(queue.to_owned())
                        .or_default()
                        .push_back(payload);
                    return Ok(());
                }
            }
        };
        for listener in listeners {
            listener(payload.clone());
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, DistributorError> {
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), DistributorError> {
        self.state
            .lock()
            .values
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), DistributorError> {
        self.state.lock().values.remove(key);
        Ok(())
    }

    async fn add_list_item(&self, key: &str, item: &str) -> Result<(), DistributorError> {
        let mut state = self.state.lock();
        let list = state.lists.entry(key.to_owned()).or_default();
        if !list.iter().any(|existing| existing == item) {
            list.push(item.to_owned());
        }
        Ok(())
    }

    async fn remove_list_item(&self, key: &str, item: &str) -> Result<(), DistributorError> {
        let mut state = self.state.lock();
        if let Some(list) = state.lists.get_mut(key) {
            list.retain(|existing| existing != item);
            if list.is_empty() {
                state.lists.remove(key);
            }
        }
        Ok(())
    }

    async fn get_list_items(&self, key: &str) -> Result<Vec<String>, DistributorError> {
        Ok(self.list(key))
    }
}
