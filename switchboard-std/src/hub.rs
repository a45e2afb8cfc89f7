//! The group and individual routing protocol of one process.
//!
//! A [`Hub`] combines the local directories with the membership records kept
//! in the [`Distributor`] to decide, for each outbound frame, whether it can be
//! written to a local connection or has to be forwarded to the process that
//! holds the target.
//!
//! # Remote records
//!
//! | key                        | value                                     |
//! |----------------------------|-------------------------------------------|
//! | `i:<connId>`               | id of the process holding the connection  |
//! | `my-groups:<connId>`       | groups the connection joined              |
//! | `group-servers:<groupId>`  | processes with at least one local member  |
//!
//! Each process listens on `i:<processId>` for individual frames and on
//! `server-messages:<processId>` for group frames. Forwarded frames are
//! wrapped in an [`Envelope`](crate::envelope::Envelope) naming the local
//! recipient.
//!
//! `group-servers:<groupId>` only ever grows. A process that lost its last
//! member of a group still receives that group's frames and drops them.

use crate::{
    directory::{ConnectionDirectory, GroupDirectory, SharedConnection},
    envelope::{self, Envelope},
};
use bytes::Bytes;
use std::{
    collections::BTreeSet,
    sync::{Arc, Weak},
};
use switchboard_core::{Distributor, HubError, QueueListener};

/// Key and queue names shared by every process in the fleet.
pub mod keys {
    /// `i:<connId>`: the process holding a connection.
    pub fn connection_owner(connection_id: &str) -> String {
        format!("i:{connection_id}")
    }

    /// `my-groups:<connId>`: the groups a connection joined.
    pub fn connection_groups(connection_id: &str) -> String {
        format!("my-groups:{connection_id}")
    }

    /// `group-servers:<groupId>`: the processes holding members of a group.
    pub fn group_servers(group_id: &str) -> String {
        format!("group-servers:{group_id}")
    }

    /// `i:<processId>`: queue of individual frames for a process.
    pub fn individual_queue(server_id: &str) -> String {
        format!("i:{server_id}")
    }

    /// `server-messages:<processId>`: queue of group frames for a process.
    pub fn group_queue(server_id: &str) -> String {
        format!("server-messages:{server_id}")
    }
}

/// Where an outbound frame went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Written straight to local connections.
    Local {
        /// Connections that accepted the frame.
        recipients: usize,
    },
    /// Forwarded through the distributor.
    Forwarded {
        /// Processes a frame was enqueued for.
        processes: usize,
    },
    /// No process is known to hold the target.
    Unroutable,
}

/// Membership and delivery for the connections of one process.
pub struct Hub {
    server_id: String,
    distributor: Arc<dyn Distributor>,
    connections: ConnectionDirectory,
    groups: GroupDirectory,
}

impl Hub {
    /// Create a hub for process `server_id`.
    ///
    /// The hub receives nothing until [`listen`](Hub::listen) is called.
    pub fn new(server_id: impl Into<String>, distributor: Arc<dyn Distributor>) -> Self {
        Self {
            server_id: server_id.into(),
            distributor,
            connections: ConnectionDirectory::new(),
            groups: GroupDirectory::new(),
        }
    }

    /// This process's id.
    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    /// The fleet-wide store.
    pub fn distributor(&self) -> &Arc<dyn Distributor> {
        &self.distributor
    }

    /// Connections attached to this process.
    pub fn connections(&self) -> &ConnectionDirectory {
        &self.connections
    }

    /// Local group membership.
    pub fn groups(&self) -> &GroupDirectory {
        &self.groups
    }

    /// Subscribe to this process's two inbound queues.
    ///
    /// Listeners hold a weak reference, so a dropped hub stops delivering.
    pub async fn listen(self: &Arc<Self>) -> Result<(), HubError> {
        let hub = Arc::downgrade(self);
        let on_individual: QueueListener = Arc::new(move |frame| {
            if let Some(hub) = Weak::upgrade(&hub) {
                hub.deliver_individual_frame(frame);
            }
        });
        self.distributor
            .listen(&keys::individual_queue(&self.server_id), on_individual)
            .await?;

        let hub = Arc::downgrade(self);
        let on_group: QueueListener = Arc::new(move |frame| {
            if let Some(hub) = Weak::upgrade(&hub) {
                hub.deliver_group_frame(frame);
            }
        });
        self.distributor
            .listen(&keys::group_queue(&self.server_id), on_group)
            .await?;

        tracing::debug!(server_id = %self.server_id, "hub listening");
        Ok(())
    }

    /// Index a connection locally and record this process as its owner.
    pub async fn attach(&self, connection: SharedConnection) -> Result<(), HubError> {
        let key = keys::connection_owner(connection.id());
        if self.connections.add(connection).is_some() {
            tracing::debug!(%key, "connection re-attached");
        }
        self.distributor.set(&key, &self.server_id).await?;
        Ok(())
    }

    /// Leave every group, drop the local entry, and delete the owner record.
    ///
    /// Local cleanup always completes; the first remote failure is returned.
    pub async fn detach(&self, connection_id: &str) -> Result<(), HubError> {
        let left = self.leave_all_groups(connection_id).await;
        self.connections.remove(connection_id);
        let deleted = self
            .distributor
            .delete(&keys::connection_owner(connection_id))
            .await
            .map_err(HubError::from);

        let result = left.map(drop).and(deleted);
        if let Err(err) = &result {
            tracing::warn!(connection_id, error = %err, "remote cleanup failed on detach");
        }
        result
    }

    /// Add a connection to a group.
    ///
    /// Updates the local directory, then `my-groups:<connId>`, then
    /// `group-servers:<groupId>`. Every step is attempted; the first failure
    /// is returned and nothing is rolled back.
    pub async fn join_group(
        &self,
        connection: &SharedConnection,
        group_id: &str,
    ) -> Result<(), HubError> {
        self.groups.add(connection, group_id);
        let listed = self
            .distributor
            .add_list_item(&keys::connection_groups(connection.id()), group_id)
            .await;
        let advertised = self
            .distributor
            .add_list_item(&keys::group_servers(group_id), &self.server_id)
            .await;
        tracing::trace!(connection_id = connection.id(), group_id, "joined group");
        Ok(listed.and(advertised)?)
    }

    /// Add a connection to several groups, joining each in turn.
    pub async fn join_groups(
        &self,
        connection: &SharedConnection,
        group_ids: &[String],
    ) -> Result<(), HubError> {
        let mut first_err = None;
        for group_id in group_ids {
            if let Err(err) = self.join_group(connection, group_id).await {
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Remove a connection from a group.
    ///
    /// `group-servers:<groupId>` is left as is.
    pub async fn leave_group(&self, connection_id: &str, group_id: &str) -> Result<(), HubError> {
        self.groups.remove(connection_id, group_id);
        self.distributor
            .remove_list_item(&keys::connection_groups(connection_id), group_id)
            .await?;
        Ok(())
    }

    /// Remove a connection from several groups.
    pub async fn leave_groups(
        &self,
        connection_id: &str,
        group_ids: &[String],
    ) -> Result<(), HubError> {
        for group_id in group_ids {
            self.groups.remove(connection_id, group_id);
        }
        self.distributor
            .remove_list_items(&keys::connection_groups(connection_id), group_ids)
            .await?;
        Ok(())
    }

    /// Remove a connection from every group it belongs to.
    ///
    /// Covers both the remote group list and anything only the local reverse
    /// index knows about. The connection is absent locally afterwards even if
    /// the remote store fails. Returns the groups left, sorted.
    pub async fn leave_all_groups(&self, connection_id: &str) -> Result<Vec<String>, HubError> {
        let key = keys::connection_groups(connection_id);
        let remote = self.distributor.get_list_items(&key).await;
        let local = self.groups.remove_connection_everywhere(connection_id);

        let remote = remote?;
        let left: BTreeSet<String> = remote.iter().cloned().chain(local).collect();
        self.distributor.remove_list_items(&key, &remote).await?;
        Ok(left.into_iter().collect())
    }

    /// The remote group list of a connection.
    pub async fn groups_of(&self, connection_id: &str) -> Result<Vec<String>, HubError> {
        Ok(self
            .distributor
            .get_list_items(&keys::connection_groups(connection_id))
            .await?)
    }

    /// Forward an encoded frame to every process holding members of a group.
    ///
    /// Always goes through the distributor, including to this process. Every
    /// listed process is attempted; the first failure is returned.
    pub async fn send_to_group(&self, group_id: &str, frame: Bytes) -> Result<Delivery, HubError> {
        let processes = self
            .distributor
            .get_list_items(&keys::group_servers(group_id))
            .await?;
        let envelope = envelope::frame(group_id, &frame)?;

        let mut first_err = None;
        for process in &processes {
            let queue = keys::group_queue(process);
            if let Err(err) = self.distributor.enqueue(&queue, envelope.clone()).await {
                tracing::warn!(%queue, group_id, error = %err, "group frame not enqueued");
                first_err.get_or_insert(err);
            }
        }
        match first_err {
            Some(err) => Err(err.into()),
            None => Ok(Delivery::Forwarded {
                processes: processes.len(),
            }),
        }
    }

    /// Deliver an encoded frame to one connection wherever it is attached.
    ///
    /// A local connection is written to directly without touching the
    /// distributor.
    pub async fn send_to_individual(
        &self,
        connection_id: &str,
        frame: Bytes,
    ) -> Result<Delivery, HubError> {
        if let Some(connection) = self.connections.get(connection_id) {
            let recipients = usize::from(write(&connection, frame));
            return Ok(Delivery::Local { recipients });
        }

        let Some(owner) = self
            .distributor
            .get(&keys::connection_owner(connection_id))
            .await?
        else {
            tracing::warn!(connection_id, "no process holds connection, frame dropped");
            return Ok(Delivery::Unroutable);
        };

        let envelope = envelope::frame(connection_id, &frame)?;
        self.distributor
            .enqueue(&keys::individual_queue(&owner), envelope)
            .await?;
        Ok(Delivery::Forwarded { processes: 1 })
    }

    /// Unframe a group frame and write it to every local member.
    ///
    /// Returns the number of connections that accepted it.
    pub fn deliver_group_frame(&self, raw: Bytes) -> usize {
        let Some(Envelope { target, payload }) = unframe(raw, "group") else {
            return 0;
        };
        let members = self.groups.members(&target);
        if members.is_empty() {
            tracing::debug!(group_id = %target, "no local members, group frame dropped");
            return 0;
        }
        members
            .iter()
            .filter(|member| write(member, payload.clone()))
            .count()
    }

    /// Unframe an individual frame and write it to the local connection.
    ///
    /// Returns whether the connection accepted it.
    pub fn deliver_individual_frame(&self, raw: Bytes) -> bool {
        let Some(Envelope { target, payload }) = unframe(raw, "individual") else {
            return false;
        };
        match self.connections.get(&target) {
            Some(connection) => write(&connection, payload),
            None => {
                tracing::debug!(connection_id = %target, "connection gone, frame dropped");
                false
            }
        }
    }
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("server_id", &self.server_id)
            .field("connections", &self.connections.len())
            .finish_non_exhaustive()
    }
}

fn unframe(raw: Bytes, kind: &'static str) -> Option<Envelope> {
    match Envelope::decode(raw) {
        Ok(envelope) => Some(envelope),
        Err(err) => {
            tracing::warn!(kind, error = %err, "malformed frame dropped");
            None
        }
    }
}

pub(crate) fn write(connection: &SharedConnection, frame: Bytes) -> bool {
    let accepted = connection.send(frame);
    if !accepted {
        tracing::warn!(connection_id = connection.id(), "transport rejected frame");
    }
    accepted
}
