//! Per-message response builder.
//!
//! A [`Response`] is created for every inbound message and bound to the
//! connection that sent it. Handlers reply through it, or derive builders
//! bound to a group or to another connection:
//!
//! ```rust,ignore
//! router.get("/rooms/:id", [handler(|req: Request, res: Response| async move {
//!     let room = req.param("id").unwrap_or_default().to_owned();
//!     res.join_group(&room).await?;
//!     res.group(&room).status(200)?.send("joined").await?;
//!     Ok(())
//! })])?;
//! ```
//!
//! Clones of a builder share its state: a status set through one clone is
//! visible through all of them. [`group`](Response::group) and
//! [`to`](Response::to) start from a clean state instead.

use crate::{
    directory::SharedConnection,
    hub::{self, Delivery, Hub},
};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use switchboard_core::{
    Codec, CodecError, Headers, InboundMessage, ReplyFrame, ResponseError, Verb, status,
};

/// Who a builder's frames go to.
#[derive(Clone)]
pub enum Scope {
    /// The connection that sent the inbound message.
    Origin(SharedConnection),
    /// Every member of a group, on every process.
    Group(String),
    /// One connection, on whichever process holds it.
    Individual(String),
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Origin(connection) => f.debug_tuple("Origin").field(&connection.id()).finish(),
            Scope::Group(id) => f.debug_tuple("Group").field(id).finish(),
            Scope::Individual(id) => f.debug_tuple("Individual").field(id).finish(),
        }
    }
}

/// Per-send overrides. Unset fields fall back to the builder's values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SendOptions {
    /// Verb of the outbound frame.
    pub verb: Option<Verb>,
    /// Path of the outbound frame.
    pub path: Option<String>,
    /// Replaces the accumulated headers.
    pub headers: Option<Headers>,
    /// Status, bypassing the once-only rule.
    pub status: Option<u16>,
}

impl SendOptions {
    /// No overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the verb.
    pub fn verb(mut self, verb: Verb) -> Self {
        self.verb = Some(verb);
        self
    }

    /// Override the path.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Override the headers.
    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Override the status.
    pub fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

#[derive(Default)]
struct ResponseState {
    status: Option<u16>,
    headers: Headers,
}

struct ResponseInner {
    scope: Scope,
    message: Arc<InboundMessage>,
    hub: Arc<Hub>,
    codec: Arc<dyn Codec>,
    state: Mutex<ResponseState>,
}

/// Builds and sends replies for one inbound message.
#[derive(Clone)]
pub struct Response {
    inner: Arc<ResponseInner>,
}

impl Response {
    /// A builder bound to the connection that sent `message`.
    pub fn new(
        connection: SharedConnection,
        message: Arc<InboundMessage>,
        hub: Arc<Hub>,
        codec: Arc<dyn Codec>,
    ) -> Self {
        Self::scoped(Scope::Origin(connection), message, hub, codec)
    }

    fn scoped(
        scope: Scope,
        message: Arc<InboundMessage>,
        hub: Arc<Hub>,
        codec: Arc<dyn Codec>,
    ) -> Self {
        Self {
            inner: Arc::new(ResponseInner {
                scope,
                message,
                hub,
                codec,
                state: Mutex::new(ResponseState::default()),
            }),
        }
    }

    fn derive(&self, scope: Scope) -> Self {
        Self::scoped(
            scope,
            Arc::clone(&self.inner.message),
            Arc::clone(&self.inner.hub),
            Arc::clone(&self.inner.codec),
        )
    }

    /// Where this builder's frames go.
    pub fn scope(&self) -> &Scope {
        &self.inner.scope
    }

    /// The message being answered.
    pub fn message(&self) -> &InboundMessage {
        &self.inner.message
    }

    /// The hub routing this builder's frames.
    pub fn hub(&self) -> &Arc<Hub> {
        &self.inner.hub
    }

    /// The status set so far, if any.
    pub fn current_status(&self) -> Option<u16> {
        self.inner.state.lock().status
    }

    /// Set the reply status. Fails if one was already set.
    pub fn status(&self, code: u16) -> Result<&Self, ResponseError> {
        let mut state = self.inner.state.lock();
        if let Some(current) = state.status {
            return Err(ResponseError::StatusAlreadySet {
                current,
                attempted: code,
            });
        }
        state.status = Some(code);
        Ok(self)
    }

    /// Add a header. A later write to the same key wins.
    pub fn header(&self, key: impl Into<String>, value: impl Into<String>) -> &Self {
        self.inner.state.lock().headers.insert(key.into(), value.into());
        self
    }

    /// A fresh builder addressed to every member of `group_id`.
    pub fn group(&self, group_id: impl Into<String>) -> Response {
        self.derive(Scope::Group(group_id.into()))
    }

    /// A fresh builder addressed to connection `connection_id`.
    pub fn to(&self, connection_id: impl Into<String>) -> Response {
        self.derive(Scope::Individual(connection_id.into()))
    }

    /// Send `data` to this builder's scope.
    pub async fn send(&self, data: impl Serialize) -> Result<Delivery, ResponseError> {
        self.send_with(data, SendOptions::default()).await
    }

    /// Send `data` with per-field overrides.
    pub async fn send_with(
        &self,
        data: impl Serialize,
        options: SendOptions,
    ) -> Result<Delivery, ResponseError> {
        let data = serde_json::to_value(data).map_err(|err| CodecError::Encode(Box::new(err)))?;
        let frame = self.frame(data, options);
        let bytes = self.inner.codec.encode_reply(&frame)?;
        tracing::trace!(
            verb = %frame.verb,
            path = %frame.path,
            status = frame.status,
            scope = ?self.inner.scope,
            "sending reply"
        );

        let delivery = match &self.inner.scope {
            Scope::Origin(connection) => Delivery::Local {
                recipients: usize::from(hub::write(connection, bytes)),
            },
            Scope::Group(group_id) => self.inner.hub.send_to_group(group_id, bytes).await?,
            Scope::Individual(connection_id) => {
                self.inner.hub.send_to_individual(connection_id, bytes).await?
            }
        };
        Ok(delivery)
    }

    /// The frame `send_with` would produce.
    pub fn frame(&self, data: Value, options: SendOptions) -> ReplyFrame {
        let message = &self.inner.message;
        let state = self.inner.state.lock();
        let responding_message_id = match self.inner.scope {
            Scope::Origin(_) => message.request_id.clone(),
            Scope::Group(_) | Scope::Individual(_) => None,
        };
        ReplyFrame {
            verb: options.verb.unwrap_or(message.verb),
            path: options.path.unwrap_or_else(|| message.path.clone()),
            headers: options.headers.unwrap_or_else(|| state.headers.clone()),
            status: options.status.or(state.status).unwrap_or(status::OK),
            responding_message_id,
            data,
        }
    }

    fn origin(&self) -> Result<&SharedConnection, ResponseError> {
        match &self.inner.scope {
            Scope::Origin(connection) => Ok(connection),
            Scope::Group(_) | Scope::Individual(_) => Err(ResponseError::NotConnectionBound),
        }
    }

    /// Add the bound connection to a group.
    pub async fn join_group(&self, group_id: &str) -> Result<(), ResponseError> {
        let connection = self.origin()?;
        self.inner.hub.join_group(connection, group_id).await?;
        Ok(())
    }

    /// Add the bound connection to several groups.
    pub async fn join_groups<I>(&self, group_ids: I) -> Result<(), ResponseError>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let connection = self.origin()?;
        let group_ids: Vec<String> = group_ids.into_iter().map(Into::into).collect();
        self.inner.hub.join_groups(connection, &group_ids).await?;
        Ok(())
    }

    /// Remove the bound connection from a group.
    pub async fn leave_group(&self, group_id: &str) -> Result<(), ResponseError> {
        let connection = self.origin()?;
        self.inner.hub.leave_group(connection.id(), group_id).await?;
        Ok(())
    }

    /// Remove the bound connection from several groups.
    pub async fn leave_groups<I>(&self, group_ids: I) -> Result<(), ResponseError>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let connection = self.origin()?;
        let group_ids: Vec<String> = group_ids.into_iter().map(Into::into).collect();
        self.inner.hub.leave_groups(connection.id(), &group_ids).await?;
        Ok(())
    }

    /// Remove the bound connection from every group. Returns the groups left.
    pub async fn leave_all_groups(&self) -> Result<Vec<String>, ResponseError> {
        let connection = self.origin()?;
        Ok(self.inner.hub.leave_all_groups(connection.id()).await?)
    }

    /// The bound connection's groups, as recorded fleet-wide.
    pub async fn groups(&self) -> Result<Vec<String>, ResponseError> {
        let connection = self.origin()?;
        Ok(self.inner.hub.groups_of(connection.id()).await?)
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("scope", &self.inner.scope)
            .field("status", &self.current_status())
            .finish_non_exhaustive()
    }
}
