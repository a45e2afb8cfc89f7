//! Testing utilities for switchboard.
//!
//! This module provides doubles for the two collaborators a router talks to,
//! so routes and fan-out can be tested without a transport or a real store.
//!
//! # Features
//!
//! - [`RecordingConnection`]: A connection that keeps every frame written to it
//! - [`RecordingDistributor`]: A distributor decorator that logs every call and
//!   can be told to fail

use crate::adapters::MemoryDistributor;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use switchboard_core::{Connection, Distributor, DistributorError, QueueListener};

// ============================================================================
// Recording Connection
// ============================================================================

/// A connection that records every frame it is asked to send.
///
/// Clones share the same record, so keep one clone for assertions and hand
/// another to the router.
///
/// # Example
///
/// ```rust,ignore
/// let conn = RecordingConnection::new("c1");
/// router.attach(Arc::new(conn.clone())).await?;
///
/// router.dispatch(message, Arc::new(conn.clone())).await;
/// assert_eq!(conn.messages()[0]["status"], 200);
/// ```
#[derive(Clone)]
pub struct RecordingConnection {
    id: Arc<str>,
    frames: Arc<Mutex<Vec<Bytes>>>,
    accepting: Arc<AtomicBool>,
}

impl RecordingConnection {
    /// Create a connection with the given id that accepts every frame.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Arc::from(id.into()),
            frames: Arc::new(Mutex::new(Vec::new())),
            accepting: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Make `send` report failure (without recording) until re-enabled.
    pub fn set_accepting(&self, accepting: bool) {
        self.accepting.store(accepting, Ordering::SeqCst);
    }

    /// Every frame sent so far.
    pub fn frames(&self) -> Vec<Bytes> {
        self.frames.lock().clone()
    }

    /// Frames parsed as JSON. Frames that are not JSON are skipped.
    pub fn messages(&self) -> Vec<Value> {
        self.frames
            .lock()
            .iter()
            .filter_map(|frame| serde_json::from_slice(frame).ok())
            .collect()
    }

    /// Number of frames sent.
    pub fn count(&self) -> usize {
        self.frames.lock().len()
    }

    /// Forget recorded frames.
    pub fn clear(&self) {
        self.frames.lock().clear();
    }
}

impl Connection for RecordingConnection {
    fn id(&self) -> &str {
        &self.id
    }

    fn send(&self, frame: Bytes) -> bool {
        if !self.accepting.load(Ordering::SeqCst) {
            return false;
        }
        self.frames.lock().push(frame);
        true
    }
}

impl std::fmt::Debug for RecordingConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingConnection")
            .field("id", &self.id)
            .field("frames", &self.count())
            .finish()
    }
}

// ============================================================================
// Recording Distributor
// ============================================================================

/// One call observed by a [`RecordingDistributor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DistributorCall {
    /// `listen(queue, _)`
    Listen {
        /// Queue subscribed to.
        queue: String,
    },
    /// `enqueue(queue, payload)`
    Enqueue {
        /// Target queue.
        queue: String,
        /// Payload as enqueued.
        payload: Bytes,
    },
    /// `get(key)`
    Get {
        /// Key read.
        key: String,
    },
    /// `set(key, value)`
    Set {
        /// Key written.
        key: String,
        /// Value written.
        value: String,
    },
    /// `delete(key)`
    Delete {
        /// Key deleted.
        key: String,
    },
    /// `add_list_item(key, item)`
    AddListItem {
        /// List key.
        key: String,
        /// Item added.
        item: String,
    },
    /// `remove_list_item(key, item)`
    RemoveListItem {
        /// List key.
        key: String,
        /// Item removed.
        item: String,
    },
    /// `get_list_items(key)`
    GetListItems {
        /// List key.
        key: String,
    },
}

impl DistributorCall {
    fn target(&self) -> &str {
        match self {
            DistributorCall::Listen { queue } | DistributorCall::Enqueue { queue, .. } => queue,
            DistributorCall::Get { key }
            | DistributorCall::Set { key, .. }
            | DistributorCall::Delete { key }
            | DistributorCall::AddListItem { key, .. }
            | DistributorCall::RemoveListItem { key, .. }
            | DistributorCall::GetListItems { key } => key,
        }
    }
}

/// A distributor that records every call before forwarding it.
///
/// Calls whose key or queue starts with a prefix registered through
/// [`fail_keys`](RecordingDistributor::fail_keys) are recorded and then fail
/// with a backend error instead of being forwarded.
///
/// # Example
///
/// ```rust,ignore
/// let store = RecordingDistributor::in_memory();
/// let router = ServerRouter::builder()
///     .distributor(Arc::new(store.clone()))
///     .build()
///     .await?;
///
/// // ...
/// assert!(store.enqueued("server-messages:p2").len() == 1);
/// ```
#[derive(Clone)]
pub struct RecordingDistributor {
    inner: Arc<dyn Distributor>,
    calls: Arc<Mutex<Vec<DistributorCall>>>,
    failing: Arc<Mutex<Vec<String>>>,
}

impl RecordingDistributor {
    /// Record calls made to `inner`.
    pub fn new(inner: Arc<dyn Distributor>) -> Self {
        Self {
            inner,
            calls: Arc::new(Mutex::new(Vec::new())),
            failing: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Record calls made to a fresh [`MemoryDistributor`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryDistributor::new()))
    }

    /// Fail every later call whose key or queue starts with `prefix`.
    pub fn fail_keys(&self, prefix: impl Into<String>) {
        self.failing.lock().push(prefix.into());
    }

    /// Stop injecting failures.
    pub fn clear_failures(&self) {
        self.failing.lock().clear();
    }

    /// Every call made so far.
    pub fn calls(&self) -> Vec<DistributorCall> {
        self.calls.lock().clone()
    }

    /// Number of calls made.
    pub fn count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Forget recorded calls.
    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    /// Payloads enqueued on `queue`, in order, including failed attempts.
    pub fn enqueued(&self, queue: &str) -> Vec<Bytes> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                DistributorCall::Enqueue { queue: q, payload } if q == queue => {
                    Some(payload.clone())
                }
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: DistributorCall) -> Result<(), DistributorError> {
        let fails = self
            .failing
            .lock()
            .iter()
            .any(|prefix| call.target().starts_with(prefix.as_str()));
        let target = call.target().to_owned();
        self.calls.lock().push(call);
        if fails {
            return Err(DistributorError::Backend(
                format!("injected failure for `{target}`").into(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Distributor for RecordingDistributor {
    async fn listen(&self, queue: &str, listener: QueueListener) -> Result<(), DistributorError> {
        self.record(DistributorCall::Listen {
            queue: queue.to_owned(),
        })?;
        self.inner.listen(queue, listener).await
    }

    async fn enqueue(&self, queue: &str, payload: Bytes) -> Result<(), DistributorError> {
        self.record(DistributorCall::Enqueue {
            queue: queue.to_owned(),
            payload: payload.clone(),
        })?;
        self.inner.enqueue(queue, payload).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, DistributorError> {
        self.record(DistributorCall::Get {
            key: key.to_owned(),
        })?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), DistributorError> {
        self.record(DistributorCall::Set {
            key: key.to_owned(),
            value: value.to_owned(),
        })?;
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), DistributorError> {
        self.record(DistributorCall::Delete {
            key: key.to_owned(),
        })?;
        self.inner.delete(key).await
    }

    async fn add_list_item(&self, key: &str, item: &str) -> Result<(), DistributorError> {
        self.record(DistributorCall::AddListItem {
            key: key.to_owned(),
            item: item.to_owned(),
        })?;
        self.inner.add_list_item(key, item).await
    }

    async fn remove_list_item(&self, key: &str, item: &str) -> Result<(), DistributorError> {
        self.record(DistributorCall::RemoveListItem {
            key: key.to_owned(),
            item: item.to_owned(),
        })?;
        self.inner.remove_list_item(key, item).await
    }

    async fn get_list_items(&self, key: &str) -> Result<Vec<String>, DistributorError> {
        self.record(DistributorCall::GetListItems {
            key: key.to_owned(),
        })?;
        self.inner.get_list_items(key).await
    }
}
