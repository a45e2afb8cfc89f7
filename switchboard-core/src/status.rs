//! HTTP-style status codes carried on reply frames.

/// Success. The default status of a reply.
pub const OK: u16 = 200;
/// Resource created.
pub const CREATED: u16 = 201;
/// Accepted for later processing.
pub const ACCEPTED: u16 = 202;
/// Success with no payload.
pub const NO_CONTENT: u16 = 204;
/// Malformed or invalid request.
pub const BAD_REQUEST: u16 = 400;
/// Caller is not authenticated.
pub const UNAUTHORIZED: u16 = 401;
/// Caller is not allowed.
pub const FORBIDDEN: u16 = 403;
/// Nothing at this path.
pub const NOT_FOUND: u16 = 404;
/// State conflict.
pub const CONFLICT: u16 = 409;
/// Unexpected failure. Used for every error that is not an [`ApiError`].
///
/// [`ApiError`]: crate::ApiError
pub const INTERNAL_SERVER_ERROR: u16 = 500;
/// Dependency unavailable.
pub const SERVICE_UNAVAILABLE: u16 = 503;
