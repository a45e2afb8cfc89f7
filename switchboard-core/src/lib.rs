//! # switchboard-core
//!
//! Core types and collaborator traits for the switchboard message router.
//!
//! This crate has minimal dependencies and is meant to be imported by
//! transport adapters and distributor backends that don't need the full
//! `switchboard-std` implementation.
//!
//! # Vocabulary
//!
//! - [`Verb`] - The closed set of message methods used as the dispatch key
//! - [`InboundMessage`] - What a connection delivers to a router
//! - [`ReplyFrame`] - What a router hands to the codec when replying
//! - [`Request`] - An inbound message plus the path parameters a route captured
//!
//! # Collaborator Seams
//!
//! The router never owns sockets, wire formats, or the fleet-wide store. It
//! reaches them through three traits:
//!
//! - [`Connection`] - A stable identifier plus a byte-send primitive
//! - [`Codec`] - Turns messages into bytes and back
//! - [`Distributor`] - Pub/sub queues and a key/list store shared by the fleet
//!
//! # Error Types
//!
//! - [`SwitchboardError`] - Top-level error type
//! - [`HandlerError`] - What route handlers return
//! - [`ApiError`] - An intentional, status-carrying application error

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod codec;
mod connection;
mod distributor;
mod error;
mod message;
mod request;
pub mod status;
mod verb;

// Re-exports
pub use codec::Codec;
pub use connection::{Connection, ConnectionId};
pub use distributor::{Distributor, QueueListener};
pub use error::{
    ApiError, BoxError, CodecError, DistributorError, EnvelopeError, HandlerError, HubError,
    ResponseError, RouteError, SwitchboardError,
};
pub use message::{Headers, InboundMessage, ReplyFrame};
pub use request::{Params, Request};
pub use verb::{Verb, VerbParseError};
