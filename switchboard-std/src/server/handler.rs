//! Server-side route handlers.

use crate::response::Response;
use futures::future::BoxFuture;
use std::{future::Future, sync::Arc};
use switchboard_core::{HandlerError, Request};

/// A handler for messages arriving at a server process.
///
/// Closures `Fn(Request, Response) -> impl Future<Output = Result<(), HandlerError>>`
/// implement this trait. Implement it directly for handlers that carry
/// state:
///
/// ```rust,ignore
/// struct Audit { log: Arc<AuditLog> }
///
/// impl RouteHandler for Audit {
///     fn call(&self, req: Request, _res: Response) -> BoxFuture<'_, Result<(), HandlerError>> {
///         Box::pin(async move {
///             self.log.record(req.path()).await;
///             Ok(())
///         })
///     }
/// }
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `RouteHandler`",
    label = "missing `RouteHandler` implementation",
    note = "Handlers take `(Request, Response)` and return a future of `Result<(), HandlerError>`."
)]
pub trait RouteHandler: Send + Sync + 'static {
    /// Handle one message.
    fn call(&self, request: Request, response: Response) -> BoxFuture<'_, Result<(), HandlerError>>;
}

impl<F, Fut> RouteHandler for F
where
    F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    fn call(&self, request: Request, response: Response) -> BoxFuture<'_, Result<(), HandlerError>> {
        Box::pin(self(request, response))
    }
}

/// A registered server handler.
pub type SharedRouteHandler = Arc<dyn RouteHandler>;

/// Box a closure for registration.
pub fn handler<F, Fut>(f: F) -> SharedRouteHandler
where
    F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    Arc::new(f)
}

/// Box several handlers for one registration.
///
/// ```rust,ignore
/// router.get("/rooms/:id", handlers![authorize, join_room])?;
/// ```
#[macro_export]
macro_rules! handlers {
    () => { ::std::vec::Vec::<$crate::server::SharedRouteHandler>::new() };
    ($($handler:expr),+ $(,)?) => {
        ::std::vec![$($crate::server::handler($handler)),+]
    };
}
