//! # Server Router
//!
//! The process-side router. It owns the route table for messages arriving
//! from connections, the [`Hub`] that routes replies across the fleet, and the
//! codec both directions are encoded with.
//!
//! # Example
//!
//! ```rust,ignore
//! let router = ServerRouter::builder()
//!     .server_id("edge-1")
//!     .distributor(store)
//!     .build()
//!     .await?;
//!
//! router.get("/rooms/:id", handlers![|req: Request, res: Response| async move {
//!     let room = req.param("id").unwrap_or_default().to_owned();
//!     res.join_group(&room).await?;
//!     res.group(&room).send("joined").await?;
//!     Ok(())
//! }])?;
//!
//! router.attach(connection.clone()).await?;
//! router.receive(&bytes, connection).await;
//! ```
//!
//! # Error Policy
//!
//! The first handler error stops dispatch of that message and is answered on
//! the originating connection:
//!
//! | Error                       | Reply status        | Reply data      |
//! |-----------------------------|---------------------|-----------------|
//! | [`HandlerError::Api`]       | the error's status  | its message     |
//! | [`HandlerError::Unexpected`]| 500                 | `null`          |

mod builder;
mod handler;

pub use builder::ServerRouterBuilder;
pub use handler::{RouteHandler, SharedRouteHandler, handler};

use crate::{
    config::RouterConfig,
    directory::SharedConnection,
    hub::Hub,
    response::{Response, SendOptions},
    routing::{DispatchOutcome, HandlerId, RouteHandle, Routes},
};
use serde_json::Value;
use std::sync::Arc;
use switchboard_core::{Codec, HandlerError, HubError, InboundMessage, RouteError, Verb, status};
use tracing::Instrument;

/// Routes messages from connections to handlers, and replies back out.
pub struct ServerRouter {
    config: RouterConfig,
    routes: Routes<dyn RouteHandler>,
    hub: Arc<Hub>,
    codec: Arc<dyn Codec>,
}

impl ServerRouter {
    /// Start configuring a router.
    pub fn builder() -> ServerRouterBuilder {
        ServerRouterBuilder::new()
    }

    pub(crate) fn from_parts(config: RouterConfig, hub: Arc<Hub>, codec: Arc<dyn Codec>) -> Self {
        Self {
            config,
            routes: Routes::new(),
            hub,
            codec,
        }
    }

    /// This process's id.
    pub fn server_id(&self) -> &str {
        &self.config.server_id
    }

    /// The configuration this router was built with.
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// The membership and delivery layer.
    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// The wire format.
    pub fn codec(&self) -> &Arc<dyn Codec> {
        &self.codec
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Register `handlers` for `verb` messages whose path matches `pattern`.
    pub fn route<I>(
        &self,
        verb: Verb,
        pattern: &str,
        handlers: I,
    ) -> Result<RouteHandle, RouteError>
    where
        I: IntoIterator<Item = SharedRouteHandler>,
    {
        self.routes.register(verb, pattern, handlers)
    }

    /// Register handlers for `GET`.
    pub fn get<I>(&self, pattern: &str, handlers: I) -> Result<RouteHandle, RouteError>
    where
        I: IntoIterator<Item = SharedRouteHandler>,
    {
        self.route(Verb::Get, pattern, handlers)
    }

    /// Register handlers for `POST`.
    pub fn post<I>(&self, pattern: &str, handlers: I) -> Result<RouteHandle, RouteError>
    where
        I: IntoIterator<Item = SharedRouteHandler>,
    {
        self.route(Verb::Post, pattern, handlers)
    }

    /// Register handlers for `PUT`.
    pub fn put<I>(&self, pattern: &str, handlers: I) -> Result<RouteHandle, RouteError>
    where
        I: IntoIterator<Item = SharedRouteHandler>,
    {
        self.route(Verb::Put, pattern, handlers)
    }

    /// Register handlers for `PATCH`.
    pub fn patch<I>(&self, pattern: &str, handlers: I) -> Result<RouteHandle, RouteError>
    where
        I: IntoIterator<Item = SharedRouteHandler>,
    {
        self.route(Verb::Patch, pattern, handlers)
    }

    /// Register handlers for `DELETE`.
    pub fn delete<I>(&self, pattern: &str, handlers: I) -> Result<RouteHandle, RouteError>
    where
        I: IntoIterator<Item = SharedRouteHandler>,
    {
        self.route(Verb::Delete, pattern, handlers)
    }

    /// Register handlers for `META`.
    pub fn meta<I>(&self, pattern: &str, handlers: I) -> Result<RouteHandle, RouteError>
    where
        I: IntoIterator<Item = SharedRouteHandler>,
    {
        self.route(Verb::Meta, pattern, handlers)
    }

    /// Record later registrations under `name`.
    pub fn start_chain(&self, name: &str) {
        self.routes.start_chain(name);
    }

    /// Stop recording registrations.
    pub fn end_chain(&self) {
        self.routes.end_chain();
    }

    /// Remove every route recorded under `name`. Returns how many were removed.
    pub fn clear_chain(&self, name: &str) -> usize {
        self.routes.clear_chain(name)
    }

    /// The chain currently recording, if any.
    pub fn active_chain(&self) -> Option<String> {
        self.routes.active_chain()
    }

    /// Names of every recorded chain.
    pub fn chain_names(&self) -> Vec<String> {
        self.routes.chain_names()
    }

    /// Remove one route.
    pub fn remove_route(&self, verb: Verb, route: RouteHandle) -> bool {
        self.routes.remove_route(verb, route)
    }

    /// Remove one handler, keeping its route.
    pub fn remove_handler(&self, verb: Verb, handler: HandlerId) -> bool {
        self.routes.remove_handler(verb, handler)
    }

    /// Number of routes registered for `verb`.
    pub fn route_count(&self, verb: Verb) -> usize {
        self.routes.route_count(verb)
    }

    // ------------------------------------------------------------------
    // Connections
    // ------------------------------------------------------------------

    /// Make a connection reachable from every process.
    pub async fn attach(&self, connection: SharedConnection) -> Result<(), HubError> {
        self.hub.attach(connection).await
    }

    /// Forget a connection: leave its groups, drop it locally, and delete its
    /// owner record.
    pub async fn detach(&self, connection_id: &str) -> Result<(), HubError> {
        self.hub.detach(connection_id).await
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Decode raw transport bytes and dispatch them.
    ///
    /// Undecodable input is logged and dropped, returning `None`.
    pub async fn receive(
        &self,
        bytes: &[u8],
        connection: SharedConnection,
    ) -> Option<DispatchOutcome> {
        match self.codec.decode_message(bytes) {
            Ok(message) => Some(self.dispatch(message, connection).await),
            Err(err) => {
                tracing::warn!(
                    connection_id = connection.id(),
                    error = %err,
                    "undecodable message dropped"
                );
                None
            }
        }
    }

    /// Run every handler matching `message`, one at a time.
    ///
    /// All handlers of one message share a single origin-bound [`Response`].
    /// A handler error stops dispatch and is answered per the error policy.
    pub async fn dispatch(
        &self,
        message: InboundMessage,
        connection: SharedConnection,
    ) -> DispatchOutcome {
        let span = tracing::info_span!(
            "dispatch",
            verb = %message.verb,
            path = %message.path,
            connection_id = connection.id(),
        );
        let message = Arc::new(message);

        async move {
            let response = Response::new(
                connection,
                Arc::clone(&message),
                Arc::clone(&self.hub),
                Arc::clone(&self.codec),
            );
            let (outcome, result) = self
                .routes
                .dispatch(&message, |handler, request| {
                    let response = response.clone();
                    async move { handler.call(request, response).await }
                })
                .await;

            if let Err(err) = result {
                reply_with_error(&response, err).await;
            }
            tracing::trace!(
                routes = outcome.routes_matched,
                handlers = outcome.handlers_run,
                status = ?outcome.status,
                "dispatched"
            );
            outcome
        }
        .instrument(span)
        .await
    }
}

async fn reply_with_error(response: &Response, err: HandlerError) {
    let (code, data) = match err {
        HandlerError::Api(api) => {
            tracing::debug!(status = api.status, message = %api.message, "handler rejected message");
            (api.status, Value::String(api.message))
        }
        HandlerError::Unexpected(source) => {
            tracing::error!(error = %source, "handler failed");
            (status::INTERNAL_SERVER_ERROR, Value::Null)
        }
    };
    if let Err(err) = response.send_with(data, SendOptions::new().status(code)).await {
        tracing::warn!(error = %err, "error reply not delivered");
    }
}

impl std::fmt::Debug for ServerRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerRouter")
            .field("server_id", &self.config.server_id)
            .field("hub", &self.hub)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{adapters::MemoryDistributor, handlers, testing::RecordingConnection};
    use parking_lot::Mutex;
    use switchboard_core::{ApiError, Request};

    async fn router() -> ServerRouter {
        ServerRouter::builder()
            .server_id("p1")
            .distributor(Arc::new(MemoryDistributor::new()))
            .build()
            .await
            .unwrap()
    }

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> SharedRouteHandler {
        let log = Arc::clone(log);
        handler(move |_req: Request, _res: Response| {
            log.lock().push(name);
            async { Ok(()) }
        })
    }

    #[tokio::test]
    async fn status_set_by_one_handler_binds_the_next() {
        let router = router().await;
        let conn = RecordingConnection::new("c1");
        router
            .post(
                "/x",
                handlers![
                    |_req: Request, res: Response| async move {
                        res.status(status::CREATED)?;
                        Ok(())
                    },
                    |_req: Request, res: Response| async move {
                        res.status(status::OK)?;
                        res.send("unreachable").await?;
                        Ok(())
                    },
                ],
            )
            .unwrap();

        let outcome = router
            .dispatch(InboundMessage::new(Verb::Post, "/x"), Arc::new(conn.clone()))
            .await;

        assert_eq!(outcome.handlers_run, 2);
        assert!(!outcome.is_completed());
        let reply = &conn.messages()[0];
        assert_eq!(reply["status"], 500);
        assert_eq!(reply["data"], Value::Null);
    }

    #[tokio::test]
    async fn api_errors_reply_with_their_status_and_message() {
        let router = router().await;
        let conn = RecordingConnection::new("c1");
        let log = Arc::new(Mutex::new(Vec::new()));
        router
            .get(
                "/secret",
                [
                    handler(|_req: Request, res: Response| async move {
                        res.status(status::OK)?;
                        Err(HandlerError::from(ApiError::forbidden("members only")))
                    }),
                    recorder(&log, "after"),
                ],
            )
            .unwrap();

        router
            .dispatch(
                InboundMessage::new(Verb::Get, "/secret").with_request_id("r-9"),
                Arc::new(conn.clone()),
            )
            .await;

        let reply = &conn.messages()[0];
        assert_eq!(reply["status"], 403);
        assert_eq!(reply["data"], "members only");
        assert_eq!(reply["respondingMessageId"], "r-9");
        assert!(log.lock().is_empty());
    }

    #[tokio::test]
    async fn receive_decodes_and_drops_garbage() {
        let router = router().await;
        let log = Arc::new(Mutex::new(Vec::new()));
        router.meta("/ping", [recorder(&log, "ping")]).unwrap();
        let conn: SharedConnection = Arc::new(RecordingConnection::new("c1"));

        assert!(router.receive(b"{not json", conn.clone()).await.is_none());
        let outcome = router
            .receive(br#"{"verb":"META","path":"/ping"}"#, conn)
            .await
            .unwrap();

        assert!(outcome.is_completed());
        assert_eq!(*log.lock(), ["ping"]);
    }

    #[tokio::test]
    async fn removing_a_handler_keeps_its_route() {
        let router = router().await;
        let log = Arc::new(Mutex::new(Vec::new()));
        let route = router
            .put("/doc/:id", [recorder(&log, "a"), recorder(&log, "b")])
            .unwrap();

        assert!(router.remove_handler(Verb::Put, route.handler(0)));
        router
            .dispatch(
                InboundMessage::new(Verb::Put, "/doc/1"),
                Arc::new(RecordingConnection::new("c1")),
            )
            .await;

        assert_eq!(*log.lock(), ["b"]);
        assert_eq!(router.route_count(Verb::Put), 1);
    }
}
