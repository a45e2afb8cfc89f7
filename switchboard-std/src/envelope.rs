//! Cross-process envelope.
//!
//! Frames forwarded through the distributor carry the id of their local
//! recipient (a group id or a connection id) in front of the encoded reply:
//!
//! ```text
//! +-----+---------------------+---------------------------+
//! |  L  |  target (L bytes)   |  encoded reply frame ...  |
//! +-----+---------------------+---------------------------+
//!  u8     UTF-8, 1..=255
//! ```
//!
//! This is the one bit-exact format in the system; every process in the fleet
//! must agree on it.

use bytes::{BufMut, Bytes, BytesMut};
use switchboard_core::EnvelopeError;

/// Longest target the one-byte length prefix can describe.
pub const MAX_TARGET_LEN: usize = u8::MAX as usize;

/// A payload addressed to a local recipient on another process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Group id or connection id.
    pub target: String,
    /// The already-encoded reply frame.
    pub payload: Bytes,
}

impl Envelope {
    /// Address `payload` to `target`.
    pub fn new(target: impl Into<String>, payload: Bytes) -> Self {
        Self {
            target: target.into(),
            payload,
        }
    }

    /// Serialize into a single contiguous frame.
    pub fn encode(&self) -> Result<Bytes, EnvelopeError> {
        frame(&self.target, &self.payload)
    }

    /// Split a frame into target and payload. The payload shares the input buffer.
    pub fn decode(frame: Bytes) -> Result<Self, EnvelopeError> {
        let (&len, _) = frame.split_first().ok_or(EnvelopeError::Truncated {
            needed: 1,
            available: 0,
        })?;
        let len = usize::from(len);
        if len == 0 {
            return Err(EnvelopeError::EmptyTarget);
        }
        let available = frame.len() - 1;
        if available < len {
            return Err(EnvelopeError::Truncated {
                needed: len,
                available,
            });
        }
        let target = std::str::from_utf8(&frame[1..=len])
            .map_err(EnvelopeError::InvalidTarget)?
            .to_owned();
        Ok(Self {
            target,
            payload: frame.slice(len + 1..),
        })
    }
}

/// Prefix `payload` with `target`.
pub fn frame(target: &str, payload: &[u8]) -> Result<Bytes, EnvelopeError> {
    let target = target.as_bytes();
    let len = match u8::try_from(target.len()) {
        Ok(0) => return Err(EnvelopeError::EmptyTarget),
        Ok(len) => len,
        Err(_) => return Err(EnvelopeError::TargetTooLong(target.len())),
    };

    let mut buf = BytesMut::with_capacity(1 + target.len() + payload.len());
    buf.put_u8(len);
    buf.put_slice(target);
    buf.put_slice(payload);
    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_length_target_payload() {
        let bytes = frame("42", b"{\"a\":1}").unwrap();
        assert_eq!(&bytes[..], b"\x0242{\"a\":1}");
    }

    #[test]
    fn round_trips_boundary_lengths() {
        for len in [1, 2, 254, MAX_TARGET_LEN] {
            let target = "g".repeat(len);
            let payload = Bytes::from_static(b"\x00\xffpayload");
            let envelope = Envelope::new(target.clone(), payload.clone());

            let decoded = Envelope::decode(envelope.encode().unwrap()).unwrap();
            assert_eq!(decoded.target, target);
            assert_eq!(decoded.payload, payload);
        }
    }

    #[test]
    fn multibyte_targets_count_bytes() {
        let target = "é".repeat(127);
        assert_eq!(target.len(), 254);
        let decoded = Envelope::decode(frame(&target, b"x").unwrap()).unwrap();
        assert_eq!(decoded.target, target);

        let too_long = "é".repeat(128);
        assert_eq!(frame(&too_long, b"x"), Err(EnvelopeError::TargetTooLong(256)));
    }

    #[test]
    fn empty_payload_is_allowed() {
        let decoded = Envelope::decode(frame("c1", b"").unwrap()).unwrap();
        assert_eq!(decoded.target, "c1");
        assert!(decoded.payload.is_empty());
    }

    #[test]
    fn rejects_empty_target() {
        assert_eq!(frame("", b"x"), Err(EnvelopeError::EmptyTarget));
        assert_eq!(
            Envelope::decode(Bytes::from_static(b"\x00abc")),
            Err(EnvelopeError::EmptyTarget)
        );
    }

    #[test]
    fn rejects_truncated_frames() {
        assert_eq!(
            Envelope::decode(Bytes::new()),
            Err(EnvelopeError::Truncated {
                needed: 1,
                available: 0
            })
        );
        assert_eq!(
            Envelope::decode(Bytes::from_static(b"\x05ab")),
            Err(EnvelopeError::Truncated {
                needed: 5,
                available: 2
            })
        );
    }

    #[test]
    fn rejects_non_utf8_targets() {
        let err = Envelope::decode(Bytes::from_static(b"\x01\xffrest")).unwrap_err();
        assert!(matches!(err, EnvelopeError::InvalidTarget(_)));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        /// Any UTF-8 target of 1..=255 bytes.
        ///
        /// Up to 63 arbitrary chars stay within 252 bytes; the ASCII arm
        /// reaches the 255 byte limit.
        fn target() -> impl Strategy<Value = String> {
            prop_oneof!["[a-zA-Z0-9:_-]{1,255}", "(?s).{1,63}"]
        }

        proptest! {
            #[test]
            fn round_trips_any_target_and_payload(
                target in target(),
                payload in proptest::collection::vec(any::<u8>(), 0..512),
            ) {
                prop_assume!(target.len() <= MAX_TARGET_LEN);
                let bytes = frame(&target, &payload).unwrap();
                prop_assert_eq!(bytes[0] as usize, target.len());

                let decoded = Envelope::decode(bytes).unwrap();
                prop_assert_eq!(decoded.target, target);
                prop_assert_eq!(&decoded.payload[..], &payload[..]);
            }
        }
    }
}
