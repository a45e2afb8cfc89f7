//! What a route handler receives.

use crate::{message::InboundMessage, verb::Verb};
use serde_json::Value;
use std::{collections::BTreeMap, sync::Arc};

/// Path parameters captured by a route pattern, already percent-decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(BTreeMap<String, String>);

impl Params {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a parameter by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Insert a parameter, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Number of captured parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// An inbound message merged with the parameters one route captured.
///
/// Cloning is cheap: the message itself is shared between every route the
/// message matched.
#[derive(Debug, Clone)]
pub struct Request {
    message: Arc<InboundMessage>,
    params: Params,
}

impl Request {
    /// Pair a message with captured parameters.
    pub fn new(message: Arc<InboundMessage>, params: Params) -> Self {
        Self { message, params }
    }

    /// The original message.
    pub fn message(&self) -> &InboundMessage {
        &self.message
    }

    /// Shared handle to the original message.
    pub fn shared_message(&self) -> &Arc<InboundMessage> {
        &self.message
    }

    /// All captured parameters.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// A single captured parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// The message verb.
    pub fn verb(&self) -> Verb {
        self.message.verb
    }

    /// The message path.
    pub fn path(&self) -> &str {
        &self.message.path
    }

    /// The message payload.
    pub fn data(&self) -> &Value {
        &self.message.data
    }

    /// A message header.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.message.headers.get(key).map(String::as_str)
    }

    /// The correlation id, if the sender expects a reply.
    pub fn request_id(&self) -> Option<&str> {
        self.message.request_id.as_deref()
    }
}
