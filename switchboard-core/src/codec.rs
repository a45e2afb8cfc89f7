//! Message encoding seam.

use crate::{
    error::CodecError,
    message::{InboundMessage, ReplyFrame},
};
use bytes::Bytes;

/// Converts frames to bytes and bytes to messages.
///
/// The router is agnostic to the wire format; both ends of a connection must
/// agree on the codec, and every process in the fleet must use the same one,
/// since encoded frames are forwarded verbatim inside envelopes.
pub trait Codec: Send + Sync + 'static {
    /// Encode a reply for the wire.
    fn encode_reply(&self, frame: &ReplyFrame) -> Result<Bytes, CodecError>;

    /// Decode a message received from the wire.
    fn decode_message(&self, bytes: &[u8]) -> Result<InboundMessage, CodecError>;
}
