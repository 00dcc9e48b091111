//! The database of observed peers.
//!
//! `NodeDb` itself holds no lock: it lives inside the radio's single state
//! mutex together with the subscriber set and the packet-id counter, so a
//! mutation and its `last_heard` stamp are one atomic step from any
//! observer's point of view.

use std::collections::HashMap;

use fauxmesh_proto::NodeInfo;

fn unix_now() -> u32 {
    chrono::Utc::now().timestamp() as u32
}

/// Keyed store of everything heard about each peer.
#[derive(Debug, Default)]
pub struct NodeDb {
    nodes: HashMap<u32, NodeInfo>,
}

impl NodeDb {
    /// Create an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-modify-write the entry for `node_id`, creating it if absent.
    /// `last_heard` is stamped with the current time after the mutation.
    pub fn update(&mut self, node_id: u32, mutate: impl FnOnce(&mut NodeInfo)) {
        let entry = self.nodes.entry(node_id).or_insert_with(|| NodeInfo {
            num: node_id,
            ..Default::default()
        });
        mutate(entry);
        entry.last_heard = unix_now();
    }

    /// Deep copies of every entry. Iteration order is unspecified but stable
    /// within one snapshot.
    pub fn snapshot(&self) -> Vec<NodeInfo> {
        self.nodes.values().cloned().collect()
    }

    /// Number of known peers.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no peer has been heard yet.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
