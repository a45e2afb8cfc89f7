//! Builder for [`ServerRouter`].

use super::ServerRouter;
use crate::{
    adapters::{JsonCodec, MemoryDistributor},
    config::RouterConfig,
    hub::Hub,
};
use std::sync::Arc;
use switchboard_core::{Codec, Distributor, SwitchboardError};

/// Configures and builds a [`ServerRouter`].
///
/// Defaults: a fresh UUIDv7 process id, [`JsonCodec`], and a private
/// [`MemoryDistributor`] (a fleet of one).
#[derive(Default)]
pub struct ServerRouterBuilder {
    config: RouterConfig,
    distributor: Option<Arc<dyn Distributor>>,
    codec: Option<Arc<dyn Codec>>,
}

impl ServerRouterBuilder {
    /// Start from the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// Set this process's id.
    pub fn server_id(mut self, server_id: impl Into<String>) -> Self {
        self.config.server_id = server_id.into();
        self
    }

    /// Coordinate through `distributor`.
    pub fn distributor(mut self, distributor: Arc<dyn Distributor>) -> Self {
        self.distributor = Some(distributor);
        self
    }

    /// Encode and decode with `codec`.
    pub fn codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Build the router and subscribe to its inbound queues.
    pub async fn build(self) -> Result<ServerRouter, SwitchboardError> {
        let distributor: Arc<dyn Distributor> = match self.distributor {
            Some(distributor) => distributor,
            None => {
                tracing::debug!("no distributor configured, using a private in-memory one");
                Arc::new(MemoryDistributor::new())
            }
        };
        let codec: Arc<dyn Codec> = match self.codec {
            Some(codec) => codec,
            None => Arc::new(JsonCodec),
        };

        let hub = Arc::new(Hub::new(self.config.server_id.clone(), distributor));
        hub.listen().await?;
        tracing::info!(server_id = %self.config.server_id, "server router ready");

        Ok(ServerRouter::from_parts(self.config, hub, codec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{DistributorCall, RecordingDistributor};

    #[tokio::test]
    async fn build_subscribes_both_queues() {
        let store = RecordingDistributor::in_memory();
        let router = ServerRouterBuilder::new()
            .server_id("edge-1")
            .distributor(Arc::new(store.clone()))
            .build()
            .await
            .unwrap();

        assert_eq!(router.server_id(), "edge-1");
        assert_eq!(
            store.calls(),
            [
                DistributorCall::Listen {
                    queue: "i:edge-1".into()
                },
                DistributorCall::Listen {
                    queue: "server-messages:edge-1".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn build_fails_when_subscription_fails() {
        let store = RecordingDistributor::in_memory();
        store.fail_keys("server-messages:");
        let result = ServerRouterBuilder::new()
            .distributor(Arc::new(store))
            .build()
            .await;
        assert!(matches!(result, Err(SwitchboardError::Hub(_))));
    }

    #[tokio::test]
    async fn defaults_generate_a_server_id() {
        let router = ServerRouterBuilder::new().build().await.unwrap();
        assert!(!router.server_id().is_empty());
    }
}
