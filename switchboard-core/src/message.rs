//! Inbound messages and outbound reply frames.

use crate::verb::Verb;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Message headers. Ordered so encoded frames are deterministic.
pub type Headers = BTreeMap<String, String>;

/// A message delivered by a connection.
///
/// On the server side this is a request from a client. On the connection side
/// it is a frame the server pushed; those carry a `status`, and replies to the
/// connection's own requests carry a `responding_message_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    /// Dispatch key.
    pub verb: Verb,
    /// Path matched against route patterns.
    pub path: String,
    /// Correlation id the sender expects echoed on the reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Set when this message is a reply rather than a request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responding_message_id: Option<String>,
    /// Status of a server-pushed frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Free-form headers.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: Headers,
    /// Payload.
    #[serde(default)]
    pub data: Value,
}

impl InboundMessage {
    /// Create a message with no correlation ids, headers, or payload.
    pub fn new(verb: Verb, path: impl Into<String>) -> Self {
        Self {
            verb,
            path: path.into(),
            request_id: None,
            responding_message_id: None,
            status: None,
            headers: Headers::new(),
            data: Value::Null,
        }
    }

    /// Set the correlation id.
    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    /// Mark this message as a reply to `id`.
    pub fn responding_to(mut self, id: impl Into<String>) -> Self {
        self.responding_message_id = Some(id.into());
        self
    }

    /// Add a header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the payload.
    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.data = data.into();
        self
    }

    /// Whether this message answers an earlier request.
    ///
    /// Replies are never dispatched to handlers.
    pub fn is_reply(&self) -> bool {
        self.responding_message_id.is_some()
    }
}

/// A finalized reply, ready for the codec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyFrame {
    /// Verb the receiving side dispatches on.
    pub verb: Verb,
    /// Path the receiving side matches.
    pub path: String,
    /// Headers.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: Headers,
    /// Status code.
    pub status: u16,
    /// The request id this frame answers. Only set on replies to the origin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responding_message_id: Option<String>,
    /// Payload.
    #[serde(default)]
    pub data: Value,
}

impl From<ReplyFrame> for InboundMessage {
    fn from(frame: ReplyFrame) -> Self {
        Self {
            verb: frame.verb,
            path: frame.path,
            request_id: None,
            responding_message_id: frame.responding_message_id,
            status: Some(frame.status),
            headers: frame.headers,
            data: frame.data,
        }
    }
}
