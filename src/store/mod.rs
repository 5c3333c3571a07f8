//! Remote channel-store abstraction.
//!
//! The voice server owns the channel tree; this module defines the minimal
//! client surface the rest of the crate consumes, plus the concrete clients:
//! an RPC client for the bridge in front of the voice server, and an
//! in-memory store the test-suite reconciles against.
//!
//! The store serializes its own mutations; callers here never coordinate
//! writes with each other.

mod memory;
mod rpc;

pub use memory::InMemoryChannelStore;
pub use rpc::{RpcChannelStore, RpcStoreConnector};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Remote-assigned channel identifier.
pub type ChannelId = i64;

/// Id of the implicit root; top-level channels carry it as their parent.
pub const ROOT_ID: ChannelId = -1;

/// Handle of a booted virtual server on the store.
pub type ServerHandle = i32;

/// A channel as the remote store reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    pub parent: ChannelId,
    /// Free-text tag; doubles as this system's ownership marker.
    #[serde(default)]
    pub description: String,
    /// Asked of the store so our channels vanish on server restart; the store
    /// accepts the flag but does not act on it.
    #[serde(default)]
    pub temporary: bool,
}

/// One node of a server's channel tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelTreeNode {
    pub channel: Channel,
    #[serde(default)]
    pub children: Vec<ChannelTreeNode>,
}

/// Client surface of the remote channel store.
#[async_trait]
pub trait ChannelStore: Send + Sync {
    /// Handles of the virtual servers currently booted on the store.
    async fn list_booted_server_handles(&self) -> Result<Vec<ServerHandle>, StoreError>;

    /// The full channel tree of one server, rooted at the unnamed root.
    async fn channel_tree(&self, server: ServerHandle) -> Result<ChannelTreeNode, StoreError>;

    /// Every channel on the server, keyed by id.
    async fn all_channels(
        &self,
        server: ServerHandle,
    ) -> Result<HashMap<ChannelId, Channel>, StoreError>;

    /// Create a channel under `parent`; the store assigns and returns the id.
    async fn add_channel(
        &self,
        server: ServerHandle,
        name: &str,
        parent: ChannelId,
    ) -> Result<ChannelId, StoreError>;

    /// Push updated channel attributes (description, temporary flag).
    async fn set_channel_state(
        &self,
        server: ServerHandle,
        channel: &Channel,
    ) -> Result<(), StoreError>;

    /// Delete a channel. The store deletes any subtree below it; callers gate
    /// on childlessness first.
    async fn remove_channel(&self, server: ServerHandle, id: ChannelId) -> Result<(), StoreError>;
}

/// Opens a store session. The control service connects per request, so this
/// is the seam for swapping the bridge client out (tests inject the in-memory
/// store through it).
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn ChannelStore>, StoreError>;
}

/// Connector that hands out clones of one already-built store.
pub struct SharedStoreConnector {
    store: Arc<dyn ChannelStore>,
}

impl SharedStoreConnector {
    pub fn new(store: Arc<dyn ChannelStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl StoreConnector for SharedStoreConnector {
    async fn connect(&self) -> Result<Arc<dyn ChannelStore>, StoreError> {
        Ok(Arc::clone(&self.store))
    }
}
