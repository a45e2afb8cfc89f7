//! # switchboard - Verb + Path Routing for a Fleet of Servers
//!
//! `switchboard` routes messages arriving on persistent connections to
//! handlers registered by verb and path pattern, and lets handlers reply to
//! the sender, to a named group, or to any single connection, wherever in a
//! horizontally scaled fleet that connection happens to be attached.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use switchboard::prelude::*;
//!
//! let router = ServerRouter::builder()
//!     .server_id("edge-1")
//!     .distributor(shared_store)
//!     .build()
//!     .await?;
//!
//! router.get("/rooms/:id", handlers![|req: Request, res: Response| async move {
//!     let room = req.param("id").unwrap_or_default().to_owned();
//!     res.join_group(&room).await?;
//!     res.group(&room).status(status::OK)?.send("joined").await?;
//!     Ok(())
//! }])?;
//!
//! // Per connection, from the transport:
//! router.attach(connection.clone()).await?;
//! router.receive(&bytes, connection.clone()).await;
//! router.detach(connection.id()).await?;
//! ```
//!
//! ## Crates
//!
//! - `switchboard-core`: vocabulary types, collaborator traits, errors
//! - `switchboard-std`: routing engine, hub, routers, adapters, test doubles
//! - `switchboard`: this facade

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub use switchboard_core::{
    // Errors
    ApiError,
    BoxError,
    // Seams
    Codec,
    CodecError,
    Connection,
    ConnectionId,
    Distributor,
    DistributorError,
    EnvelopeError,
    HandlerError,
    // Messages
    Headers,
    HubError,
    InboundMessage,
    Params,
    QueueListener,
    ReplyFrame,
    Request,
    ResponseError,
    RouteError,
    SwitchboardError,
    // Verbs
    Verb,
    VerbParseError,
    status,
};

pub use switchboard_std::{
    config::RouterConfig,
    handlers,
    hub::{Delivery, Hub},
    receiver::{ErrorHook, ReceiveHandler, Receiver, SharedReceiveHandler, receive_handler},
    response::{Response, Scope, SendOptions},
    routing::{DispatchOutcome, DispatchStatus, HandlerId, RouteHandle},
    server::{RouteHandler, ServerRouter, ServerRouterBuilder, SharedRouteHandler, handler},
};

/// Reference implementations of the collaborator seams.
pub mod adapters {
    #![allow(clippy::wildcard_imports)]
    pub use switchboard_std::adapters::*;
}

/// Cross-process envelope framing.
pub mod envelope {
    pub use switchboard_std::envelope::{Envelope, MAX_TARGET_LEN, frame};
}

/// Testing utilities.
pub mod testing {
    #![allow(clippy::wildcard_imports)]
    pub use switchboard_std::testing::*;
}

/// Prelude module - common imports for switchboard.
///
/// # Usage
///
/// ```rust,ignore
/// use switchboard::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Errors
        ApiError,
        BoxError,
        HandlerError,
        // Collaborators
        Connection,
        Distributor,
        // Messages
        InboundMessage,
        Request,
        Verb,
        status,
        // Routers
        Receiver,
        Response,
        RouterConfig,
        SendOptions,
        ServerRouter,
        handler,
        handlers,
        receive_handler,
    };
}
