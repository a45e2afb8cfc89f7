//! Error types for switchboard.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`SwitchboardError`] - Top-level error type for router setup
//! - [`RouteError`] - Errors registering routes
//! - [`EnvelopeError`] - Malformed cross-process envelopes
//! - [`CodecError`] - Encoding and decoding failures
//! - [`DistributorError`] - Failures of the fleet-wide store
//! - [`HubError`] - Failures of a group/individual routing step
//! - [`ResponseError`] - Misuse or failure of a response builder
//! - [`ApiError`] / [`HandlerError`] - What route handlers return

use crate::status;
use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for setting a router up.
///
/// Building a router and registering its routes both convert into this, so
/// startup code can use one `?` chain.
#[derive(Error, Debug)]
pub enum SwitchboardError {
    /// A route could not be registered.
    #[error("route error: {0}")]
    Route(#[from] RouteError),

    /// The hub could not subscribe to its inbound queues.
    #[error("hub error: {0}")]
    Hub(#[from] HubError),
}

/// Errors that can occur while registering routes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// The pattern could not be compiled.
    #[error("invalid route pattern `{pattern}`: {reason}")]
    InvalidPattern {
        /// The pattern as registered.
        pattern: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Errors framing or unframing a cross-process envelope.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    /// Targets must be at least one byte long.
    #[error("envelope target is empty")]
    EmptyTarget,

    /// Targets must fit the one-byte length prefix.
    #[error("envelope target is {0} bytes, the limit is 255")]
    TargetTooLong(usize),

    /// The frame ended before the declared target did.
    #[error("envelope truncated: target needs {needed} bytes, {available} available")]
    Truncated {
        /// Bytes the length prefix promised.
        needed: usize,
        /// Bytes actually present after the prefix.
        available: usize,
    },

    /// The target bytes are not UTF-8.
    #[error("envelope target is not valid UTF-8")]
    InvalidTarget(#[source] std::str::Utf8Error),
}

/// Errors raised by a [`Codec`](crate::Codec).
#[derive(Error, Debug)]
pub enum CodecError {
    /// A frame could not be encoded.
    #[error("failed to encode frame")]
    Encode(#[source] BoxError),

    /// Bytes could not be decoded into a message.
    #[error("failed to decode message")]
    Decode(#[source] BoxError),
}

/// Errors raised by a [`Distributor`](crate::Distributor).
#[derive(Error, Debug)]
pub enum DistributorError {
    /// The backing store reported a failure.
    #[error("distributor backend failure")]
    Backend(#[source] BoxError),

    /// The queue can no longer accept or deliver payloads.
    #[error("queue `{0}` is closed")]
    QueueClosed(String),
}

/// Errors raised by one step of the group/individual routing protocol.
#[derive(Error, Debug)]
pub enum HubError {
    /// A membership record or queue operation failed.
    #[error(transparent)]
    Distributor(#[from] DistributorError),

    /// The target could not be framed.
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
}

/// Errors raised by a response builder.
#[derive(Error, Debug)]
pub enum ResponseError {
    /// `status` was called on a builder that already has one.
    #[error("cannot overwrite status {current} with {attempted}")]
    StatusAlreadySet {
        /// The status already set.
        current: u16,
        /// The status the caller tried to set.
        attempted: u16,
    },

    /// A connection-bound helper was called on a group or individual builder.
    #[error("response is not bound to a connection")]
    NotConnectionBound,

    /// The reply could not be encoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The reply could not be routed.
    #[error(transparent)]
    Hub(#[from] HubError),
}

impl From<DistributorError> for ResponseError {
    fn from(err: DistributorError) -> Self {
        ResponseError::Hub(HubError::Distributor(err))
    }
}

/// An application error a handler raises on purpose.
///
/// The server router turns it into a reply to the originating connection with
/// the given status and the message as payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ApiError {
    /// Status sent with the error reply.
    pub status: u16,
    /// Payload of the error reply.
    pub message: String,
}

impl ApiError {
    /// Create an application error with an explicit status.
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 400.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(status::BAD_REQUEST, message)
    }

    /// 401.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(status::UNAUTHORIZED, message)
    }

    /// 403.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(status::FORBIDDEN, message)
    }

    /// 404.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(status::NOT_FOUND, message)
    }

    /// 409.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(status::CONFLICT, message)
    }
}

/// The error type of server-side route handlers.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// An intentional failure, replied to the origin with its own status.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Anything else. Replied to the origin as a bare 500 and logged.
    #[error(transparent)]
    Unexpected(BoxError),
}

impl HandlerError {
    /// Wrap any error as unexpected.
    pub fn unexpected<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        HandlerError::Unexpected(Box::new(err))
    }

    /// The application error, if this is one.
    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            HandlerError::Api(err) => Some(err),
            HandlerError::Unexpected(_) => None,
        }
    }
}

// Convenience conversions so handlers can use `?` on every layer.
impl From<BoxError> for HandlerError {
    fn from(err: BoxError) -> Self {
        HandlerError::Unexpected(err)
    }
}

impl From<ResponseError> for HandlerError {
    fn from(err: ResponseError) -> Self {
        HandlerError::unexpected(err)
    }
}

impl From<HubError> for HandlerError {
    fn from(err: HubError) -> Self {
        HandlerError::unexpected(err)
    }
}

impl From<DistributorError> for HandlerError {
    fn from(err: DistributorError) -> Self {
        HandlerError::unexpected(err)
    }
}

impl From<CodecError> for HandlerError {
    fn from(err: CodecError) -> Self {
        HandlerError::unexpected(err)
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        HandlerError::unexpected(err)
    }
}
