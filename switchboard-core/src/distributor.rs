//! Fleet-wide coordination seam.
//!
//! A distributor is the pub/sub and key/list store every process in the fleet
//! shares. The router uses it for two things:
//!
//! - **Membership records**: which groups a connection joined
//!   (`my-groups:<connId>`), which processes hold members of a group
//!   (`group-servers:<groupId>`), and which process holds a connection
//!   (`i:<connId>`).
//! - **Inbound queues**: each process listens on `i:<processId>` and
//!   `server-messages:<processId>` for frames other processes forward to it.
//!
//! Implementations are external (Redis, NATS, ...). `switchboard-std` ships an
//! in-process `MemoryDistributor` for tests and single-node deployments.

use crate::error::DistributorError;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

/// Callback invoked with each payload enqueued on a listened queue.
///
/// Listeners are synchronous: delivering to local connections never awaits.
pub type QueueListener = Arc<dyn Fn(Bytes) + Send + Sync>;

/// Pub/sub queues plus a key/value and key/list store.
///
/// Operations are treated as always available: the router neither retries
/// nor backs off, and a failure surfaces to the caller as an ordinary error.
#[async_trait]
pub trait Distributor: Send + Sync + 'static {
    /// Subscribe `listener` to every payload enqueued on `queue`.
    async fn listen(&self, queue: &str, listener: QueueListener) -> Result<(), DistributorError>;

    /// Publish a payload to `queue`.
    async fn enqueue(&self, queue: &str, payload: Bytes) -> Result<(), DistributorError>;

    /// Read a scalar value.
    async fn get(&self, key: &str) -> Result<Option<String>, DistributorError>;

    /// Write a scalar value.
    async fn set(&self, key: &str, value: &str) -> Result<(), DistributorError>;

    /// Delete a scalar value. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), DistributorError>;

    /// Add `item` to the list at `key`.
    ///
    /// Lists have set semantics: adding an item already present is a no-op.
    async fn add_list_item(&self, key: &str, item: &str) -> Result<(), DistributorError>;

    /// Remove `item` from the list at `key`. Removing a missing item is a no-op.
    async fn remove_list_item(&self, key: &str, item: &str) -> Result<(), DistributorError>;

    /// All items of the list at `key`, in insertion order. Missing lists are empty.
    async fn get_list_items(&self, key: &str) -> Result<Vec<String>, DistributorError>;

    /// Add several items to the list at `key`.
    async fn add_list_items(&self, key: &str, items: &[String]) -> Result<(), DistributorError> {
        for item in items {
            self.add_list_item(key, item).await?;
        }
        Ok(())
    }

    /// Remove several items from the list at `key`.
    async fn remove_list_items(&self, key: &str, items: &[String]) -> Result<(), DistributorError> {
        for item in items {
            self.remove_list_item(key, item).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Implements only the required methods, recording list writes.
    #[derive(Default)]
    struct ListLog {
        ops: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Distributor for ListLog {
        async fn listen(&self, _: &str, _: QueueListener) -> Result<(), DistributorError> {
            Ok(())
        }

        async fn enqueue(&self, _: &str, _: Bytes) -> Result<(), DistributorError> {
            Ok(())
        }

        async fn get(&self, _: &str) -> Result<Option<String>, DistributorError> {
            Ok(None)
        }

        async fn set(&self, _: &str, _: &str) -> Result<(), DistributorError> {
            Ok(())
        }

        async fn delete(&self, _: &str) -> Result<(), DistributorError> {
            Ok(())
        }

        async fn add_list_item(&self, key: &str, item: &str) -> Result<(), DistributorError> {
            if item == "bad" {
                return Err(DistributorError::QueueClosed(key.to_owned()));
            }
            self.ops.lock().unwrap().push(format!("+{key}/{item}"));
            Ok(())
        }

        async fn remove_list_item(&self, key: &str, item: &str) -> Result<(), DistributorError> {
            self.ops.lock().unwrap().push(format!("-{key}/{item}"));
            Ok(())
        }

        async fn get_list_items(&self, _: &str) -> Result<Vec<String>, DistributorError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn batch_operations_default_to_single_item_calls() {
        let store = ListLog::default();
        let items = ["a".to_owned(), "b".to_owned()];
        store.add_list_items("k", &items).await.unwrap();
        store.remove_list_items("k", &items[..1]).await.unwrap();

        assert_eq!(*store.ops.lock().unwrap(), ["+k/a", "+k/b", "-k/a"]);
    }

    #[tokio::test]
    async fn batch_add_stops_at_first_failure() {
        let store = ListLog::default();
        let items = ["a".to_owned(), "bad".to_owned(), "c".to_owned()];
        assert!(store.add_list_items("k", &items).await.is_err());
        assert_eq!(*store.ops.lock().unwrap(), ["+k/a"]);
    }
}
