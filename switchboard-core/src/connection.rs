//! Transport-level connection seam.

use bytes::Bytes;

/// Stable identifier of a connection across the fleet.
pub type ConnectionId = String;

/// A persistent bidirectional connection owned by the transport layer.
///
/// The router never creates or closes connections; it indexes them by
/// [`id`](Connection::id) and writes encoded frames through
/// [`send`](Connection::send).
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `Connection`",
    label = "missing `Connection` implementation",
    note = "Connections must expose a stable `id` and a `send` primitive."
)]
pub trait Connection: Send + Sync + 'static {
    /// Identifier, unique across every process in the fleet.
    fn id(&self) -> &str;

    /// Write an encoded frame to the peer.
    ///
    /// Returns `false` if the transport could not accept the frame (closed or
    /// backed up). Delivery is best-effort; callers log and move on.
    fn send(&self, frame: Bytes) -> bool;
}
