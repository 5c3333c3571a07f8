//! In-memory channel store.
//!
//! Mirrors the remote store's observable behavior: sequential id assignment,
//! the tree rebuilt from the flat channel map on every query, subtree
//! deletion on remove. Backs the test-suite; no voice server required.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::store::{Channel, ChannelId, ChannelStore, ChannelTreeNode, ServerHandle, ROOT_ID};

/// A single-server channel store held entirely in memory.
#[derive(Default)]
pub struct InMemoryChannelStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    channels: HashMap<ChannelId, Channel>,
    next_id: ChannelId,
    mutations: u64,
    removed: Vec<ChannelId>,
}

impl InMemoryChannelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a channel directly with an arbitrary description, the way a
    /// server administrator would create one outside this system.
    pub fn seed(&self, name: &str, parent: ChannelId, description: &str) -> ChannelId {
        let mut inner = self.lock();
        let id = inner.next_id + 1;
        inner.next_id = id;
        inner.channels.insert(
            id,
            Channel {
                id,
                name: name.to_string(),
                parent,
                description: description.to_string(),
                temporary: false,
            },
        );
        id
    }

    /// Number of channels currently on the store.
    pub fn len(&self) -> usize {
        self.lock().channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().channels.is_empty()
    }

    pub fn get(&self, id: ChannelId) -> Option<Channel> {
        self.lock().channels.get(&id).cloned()
    }

    /// Sorted snapshot of channel names, for assertions.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().channels.values().map(|c| c.name.clone()).collect();
        names.sort();
        names
    }

    /// Total add/set/remove calls seen so far.
    pub fn mutation_count(&self) -> u64 {
        self.lock().mutations
    }

    /// Ids passed to `remove_channel`, in call order.
    pub fn removed_ids(&self) -> Vec<ChannelId> {
        self.lock().removed.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("channel store lock poisoned")
    }
}

fn build_node(channels: &HashMap<ChannelId, Channel>, channel: Channel) -> ChannelTreeNode {
    let mut kids: Vec<&Channel> = channels.values().filter(|c| c.parent == channel.id).collect();
    // Store-returned order is id order here; sibling ties resolve to the
    // oldest channel first.
    kids.sort_by_key(|c| c.id);
    ChannelTreeNode {
        children: kids
            .into_iter()
            .cloned()
            .map(|c| build_node(channels, c))
            .collect(),
        channel,
    }
}

#[async_trait]
impl ChannelStore for InMemoryChannelStore {
    async fn list_booted_server_handles(&self) -> Result<Vec<ServerHandle>, StoreError> {
        Ok(vec![1])
    }

    async fn channel_tree(&self, _server: ServerHandle) -> Result<ChannelTreeNode, StoreError> {
        let inner = self.lock();
        let root = Channel {
            id: ROOT_ID,
            name: String::new(),
            parent: ROOT_ID,
            description: String::new(),
            temporary: false,
        };
        Ok(build_node(&inner.channels, root))
    }

    async fn all_channels(
        &self,
        _server: ServerHandle,
    ) -> Result<HashMap<ChannelId, Channel>, StoreError> {
        Ok(self.lock().channels.clone())
    }

    async fn add_channel(
        &self,
        _server: ServerHandle,
        name: &str,
        parent: ChannelId,
    ) -> Result<ChannelId, StoreError> {
        let mut inner = self.lock();
        inner.mutations += 1;
        let id = inner.next_id + 1;
        inner.next_id = id;
        inner.channels.insert(
            id,
            Channel {
                id,
                name: name.to_string(),
                parent,
                description: String::new(),
                temporary: false,
            },
        );
        Ok(id)
    }

    async fn set_channel_state(
        &self,
        _server: ServerHandle,
        channel: &Channel,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.mutations += 1;
        match inner.channels.get_mut(&channel.id) {
            Some(existing) => {
                existing.description = channel.description.clone();
                existing.temporary = channel.temporary;
                Ok(())
            }
            None => Err(StoreError::Protocol {
                reason: format!("unknown channel id {}", channel.id),
            }),
        }
    }

    async fn remove_channel(&self, _server: ServerHandle, id: ChannelId) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.mutations += 1;
        if !inner.channels.contains_key(&id) {
            return Err(StoreError::Protocol {
                reason: format!("unknown channel id {id}"),
            });
        }
        // The remote store drops the whole subtree when a channel goes.
        let mut doomed = vec![id];
        let mut frontier = vec![id];
        while let Some(parent) = frontier.pop() {
            let kids: Vec<ChannelId> = inner
                .channels
                .values()
                .filter(|c| c.parent == parent)
                .map(|c| c.id)
                .collect();
            doomed.extend(&kids);
            frontier.extend(kids);
        }
        for gone in &doomed {
            inner.channels.remove(gone);
        }
        inner.removed.push(id);
        Ok(())
    }
}
