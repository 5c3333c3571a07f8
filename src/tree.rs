//! Path-based reconciliation of the voice server's channel tree.
//!
//! Channels form a hierarchy addressed by slash-delimited paths
//! ("Region/Parcel/Plot"). Creation resolves or creates every missing
//! ancestor in order; removal walks from the deepest prefix toward the root,
//! deleting only channels this service created and only once they have no
//! children left.

use std::fmt;
use std::sync::Arc;

use crate::error::StoreError;
use crate::store::{Channel, ChannelId, ChannelStore, ChannelTreeNode, ServerHandle};

/// Description marker stamped on every channel this service creates.
/// Channels without it belong to the server administrator and are never
/// deleted here.
pub const OWNED_MARK: &str = "EC_VoiceChannel";

/// A slash-delimited channel path, root-relative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPath {
    segments: Vec<String>,
}

impl ChannelPath {
    /// Split a full channel name into segments. Empty input yields an empty
    /// path. Empty segments from doubled slashes are kept verbatim; name
    /// validation is the store's concern, not ours.
    pub fn parse(full_name: &str) -> Self {
        if full_name.is_empty() {
            return Self {
                segments: Vec::new(),
            };
        }
        Self {
            segments: full_name.split('/').map(str::to_string).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Rebuild the full channel name.
    pub fn join(&self) -> String {
        self.segments.join("/")
    }

    /// All prefixes, deepest first: `A/B/C` yields `A/B/C`, `A/B`, `A`.
    pub fn prefixes_deepest_first(&self) -> impl Iterator<Item = ChannelPath> + '_ {
        (1..=self.segments.len()).rev().map(move |len| ChannelPath {
            segments: self.segments[..len].to_vec(),
        })
    }
}

impl fmt::Display for ChannelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.join())
    }
}

/// Reconciles the remote channel tree with requested paths.
///
/// Every operation is a fresh conversation with the store; nothing is cached
/// between calls, so interleaved changes from other clients are picked up at
/// the next query. Multi-step sequences are not transactional: an
/// interrupted create or remove leaves a partial chain that the next
/// identical call completes.
pub struct ChannelTreeManager {
    store: Arc<dyn ChannelStore>,
    server: ServerHandle,
}

impl ChannelTreeManager {
    /// Bind to the first booted virtual server on the store.
    pub async fn connect(store: Arc<dyn ChannelStore>) -> Result<Self, StoreError> {
        let handles = store.list_booted_server_handles().await?;
        let server = handles.into_iter().next().ok_or(StoreError::NoBootedServer)?;
        Ok(Self { store, server })
    }

    /// Resolve a path to its channel, descending from the root one segment at
    /// a time. Exact, case-sensitive name match; the first matching sibling
    /// wins (the store is expected to keep sibling names unique). Creates
    /// nothing; an unmatched segment resolves the whole path to `None`.
    pub async fn resolve_by_path(
        &self,
        path: &ChannelPath,
    ) -> Result<Option<Channel>, StoreError> {
        let tree = self.store.channel_tree(self.server).await?;
        Ok(resolve_in_tree(&tree, path).cloned())
    }

    /// Create the channel at `path` plus any missing ancestors, shallowest
    /// first, each attached to its resolved-or-just-created parent and
    /// stamped with [`OWNED_MARK`]. Calling this twice with the same path
    /// creates nothing the second time.
    pub async fn get_or_create(&self, path: &ChannelPath) -> Result<(), StoreError> {
        if path.is_empty() {
            return Ok(());
        }
        let tree = self.store.channel_tree(self.server).await?;
        let mut parent = tree.channel.id;
        let mut cursor = Some(&tree);
        for segment in path.segments() {
            let existing = cursor.and_then(|node| {
                node.children
                    .iter()
                    .find(|child| child.channel.name == *segment)
            });
            match existing {
                Some(node) => {
                    parent = node.channel.id;
                    cursor = Some(node);
                }
                None => {
                    parent = self.create_marked(segment, parent).await?;
                    // Below a freshly created channel nothing exists yet.
                    cursor = None;
                }
            }
        }
        Ok(())
    }

    /// Remove the channel at `path`, then walk toward the root removing each
    /// ancestor this service created once it has become childless. Every
    /// prefix is checked independently; an unresolved, foreign, or still
    /// populated prefix is skipped, never an early exit. Nothing existing at
    /// a prefix is not an error.
    pub async fn remove(&self, path: &ChannelPath) -> Result<(), StoreError> {
        for prefix in path.prefixes_deepest_first() {
            let Some(channel) = self.resolve_by_path(&prefix).await? else {
                continue;
            };
            if channel.description != OWNED_MARK {
                continue;
            }
            if self.child_count(channel.id).await? > 0 {
                continue;
            }
            self.store.remove_channel(self.server, channel.id).await?;
        }
        Ok(())
    }

    async fn create_marked(&self, name: &str, parent: ChannelId) -> Result<ChannelId, StoreError> {
        let id = self.store.add_channel(self.server, name, parent).await?;
        let channel = Channel {
            id,
            name: name.to_string(),
            parent,
            description: OWNED_MARK.to_string(),
            temporary: true,
        };
        self.store.set_channel_state(self.server, &channel).await?;
        Ok(id)
    }

    /// Children are re-counted from a fresh listing on every call; remote
    /// structure can change between reconciliation steps.
    async fn child_count(&self, id: ChannelId) -> Result<usize, StoreError> {
        let channels = self.store.all_channels(self.server).await?;
        Ok(channels.values().filter(|c| c.parent == id).count())
    }
}

fn resolve_in_tree<'a>(root: &'a ChannelTreeNode, path: &ChannelPath) -> Option<&'a Channel> {
    let mut children = &root.children;
    let mut found: Option<&ChannelTreeNode> = None;
    for segment in path.segments() {
        found = children.iter().find(|node| node.channel.name == *segment);
        match found {
            Some(node) => children = &node.children,
            None => return None,
        }
    }
    found.map(|node| &node.channel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_on_slashes() {
        let path = ChannelPath::parse("A/B/C");
        assert_eq!(path.segments(), ["A", "B", "C"]);
    }

    #[test]
    fn parse_of_empty_input_is_empty() {
        assert!(ChannelPath::parse("").is_empty());
    }

    #[test]
    fn join_round_trips() {
        let path = ChannelPath::parse("Region/Parcel/Plot");
        assert_eq!(ChannelPath::parse(&path.join()), path);
    }

    #[test]
    fn prefixes_walk_deepest_first() {
        let path = ChannelPath::parse("A/B/C");
        let prefixes: Vec<String> = path.prefixes_deepest_first().map(|p| p.join()).collect();
        assert_eq!(prefixes, ["A/B/C", "A/B", "A"]);
    }

    #[test]
    fn empty_segments_are_preserved() {
        let path = ChannelPath::parse("A//B");
        assert_eq!(path.segments(), ["A", "", "B"]);
        assert_eq!(path.join(), "A//B");
    }
}
