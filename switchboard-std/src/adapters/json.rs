//! JSON wire format.

use bytes::Bytes;
use switchboard_core::{Codec, CodecError, InboundMessage, ReplyFrame};

/// Encodes frames as JSON objects with camelCase field names.
///
/// ```json
/// {"verb":"GET","path":"/rooms/42","headers":{},"status":200,
///  "respondingMessageId":"r-1","data":"joined"}
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode_reply(&self, frame: &ReplyFrame) -> Result<Bytes, CodecError> {
        serde_json::to_vec(frame)
            .map(Bytes::from)
            .map_err(|err| CodecError::Encode(Box::new(err)))
    }

    fn decode_message(&self, bytes: &[u8]) -> Result<InboundMessage, CodecError> {
        serde_json::from_slice(bytes).map_err(|err| CodecError::Decode(Box::new(err)))
    }
}
