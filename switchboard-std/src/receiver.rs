//! # Connection-side Router
//!
//! A [`Receiver`] runs on the client end of a connection and dispatches the
//! frames a server pushes to it: group broadcasts, individual messages, and
//! anything else that is not a reply to the client's own requests.
//!
//! It shares the route table, pattern syntax, and chain lifecycle of the
//! server router. What differs is the failure policy: a handler error stops
//! dispatch of that frame and is otherwise swallowed. An optional hook set
//! with [`Receiver::with_error_hook`] observes swallowed errors.
//!
//! ```rust,ignore
//! let receiver = Receiver::new();
//! receiver.post("/rooms/:id/messages", [receive_handler(|req: Request| async move {
//!     chat_view.append(req.param("id"), req.data()).await?;
//!     Ok(())
//! })])?;
//!
//! while let Some(frame) = socket.next().await {
//!     receiver.receive(&frame).await;
//! }
//! ```

use crate::{
    adapters::JsonCodec,
    routing::{DispatchOutcome, HandlerId, RouteHandle, Routes},
};
use futures::future::BoxFuture;
use std::{future::Future, sync::Arc};
use switchboard_core::{BoxError, Codec, InboundMessage, Request, RouteError, Verb};
use tracing::Instrument;

/// A handler for frames a server pushed to this connection.
///
/// Closures `Fn(Request) -> impl Future<Output = Result<(), BoxError>>`
/// implement this trait.
pub trait ReceiveHandler: Send + Sync + 'static {
    /// Handle one frame.
    fn call(&self, request: Request) -> BoxFuture<'_, Result<(), BoxError>>;
}

impl<F, Fut> ReceiveHandler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    fn call(&self, request: Request) -> BoxFuture<'_, Result<(), BoxError>> {
        Box::pin(self(request))
    }
}

/// A registered connection-side handler.
pub type SharedReceiveHandler = Arc<dyn ReceiveHandler>;

/// Box a closure for registration on a [`Receiver`].
pub fn receive_handler<F, Fut>(f: F) -> SharedReceiveHandler
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    Arc::new(f)
}

/// Observer for errors the receiver swallows.
pub type ErrorHook = Arc<dyn Fn(&InboundMessage, &BoxError) + Send + Sync>;

/// Routes frames pushed by a server to connection-side handlers.
pub struct Receiver {
    routes: Routes<dyn ReceiveHandler>,
    codec: Arc<dyn Codec>,
    on_error: Option<ErrorHook>,
}

impl Default for Receiver {
    fn default() -> Self {
        Self::new()
    }
}

impl Receiver {
    /// A receiver decoding JSON frames, with no error hook.
    pub fn new() -> Self {
        Self::with_codec(Arc::new(JsonCodec))
    }

    /// A receiver decoding frames with `codec`.
    pub fn with_codec(codec: Arc<dyn Codec>) -> Self {
        Self {
            routes: Routes::new(),
            codec,
            on_error: None,
        }
    }

    /// Observe errors that stop dispatch. They are still not propagated.
    pub fn with_error_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&InboundMessage, &BoxError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(hook));
        self
    }

    /// Register `handlers` for `verb` frames whose path matches `pattern`.
    pub fn route<I>(
        &self,
        verb: Verb,
        pattern: &str,
        handlers: I,
    ) -> Result<RouteHandle, RouteError>
    where
        I: IntoIterator<Item = SharedReceiveHandler>,
    {
        self.routes.register(verb, pattern, handlers)
    }

    /// Register handlers for `GET`.
    pub fn get<I>(&self, pattern: &str, handlers: I) -> Result<RouteHandle, RouteError>
    where
        I: IntoIterator<Item = SharedReceiveHandler>,
    {
        self.route(Verb::Get, pattern, handlers)
    }

    /// Register handlers for `POST`.
    pub fn post<I>(&self, pattern: &str, handlers: I) -> Result<RouteHandle, RouteError>
    where
        I: IntoIterator<Item = SharedReceiveHandler>,
    {
        self.route(Verb::Post, pattern, handlers)
    }

    /// Register handlers for `PUT`.
    pub fn put<I>(&self, pattern: &str, handlers: I) -> Result<RouteHandle, RouteError>
    where
        I: IntoIterator<Item = SharedReceiveHandler>,
    {
        self.route(Verb::Put, pattern, handlers)
    }

    /// Register handlers for `PATCH`.
    pub fn patch<I>(&self, pattern: &str, handlers: I) -> Result<RouteHandle, RouteError>
    where
        I: IntoIterator<Item = SharedReceiveHandler>,
    {
        self.route(Verb::Patch, pattern, handlers)
    }

    /// Register handlers for `DELETE`.
    pub fn delete<I>(&self, pattern: &str, handlers: I) -> Result<RouteHandle, RouteError>
    where
        I: IntoIterator<Item = SharedReceiveHandler>,
    {
        self.route(Verb::Delete, pattern, handlers)
    }

    /// Register handlers for `META`.
    pub fn meta<I>(&self, pattern: &str, handlers: I) -> Result<RouteHandle, RouteError>
    where
        I: IntoIterator<Item = SharedReceiveHandler>,
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

    /// Decode a frame and dispatch it. Undecodable input is logged and dropped.
    pub async fn receive(&self, bytes: &[u8]) -> Option<DispatchOutcome> {
        match self.codec.decode_message(bytes) {
            Ok(message) => Some(self.dispatch(message).await),
            Err(err) => {
                tracing::warn!(error = %err, "undecodable frame dropped");
                None
            }
        }
    }

    /// Run every handler matching `message`, one at a time.
    ///
    /// Replies to this connection's own requests are ignored. The first
    /// handler error stops dispatch and is not propagated.
    pub async fn dispatch(&self, message: InboundMessage) -> DispatchOutcome {
        let span = tracing::info_span!("dispatch", verb = %message.verb, path = %message.path);
        let message = Arc::new(message);

        async move {
            let (outcome, result) = self
                .routes
                .dispatch(&message, |handler, request| async move {
                    handler.call(request).await
                })
                .await;

            if let Err(err) = result {
                tracing::debug!(error = %err, "receive handler failed, dispatch stopped");
                if let Some(hook) = &self.on_error {
                    hook(message.as_ref(), &err);
                }
            }
            outcome
        }
        .instrument(span)
        .await
    }
}

impl std::fmt::Debug for Receiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Receiver")
            .field("chains", &self.routes.chain_names())
            .field("error_hook", &self.on_error.is_some())
            .finish_non_exhaustive()
    }
}
