//! Node identity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RadioError;

/// 32-bit identifier of a mesh node.
///
/// The canonical string form is `!` followed by eight lowercase hex digits,
/// e.g. `!12345678`. The all-ones value addresses every node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    /// The broadcast identifier addressing all nodes.
    pub const BROADCAST: NodeId = NodeId(0xffff_ffff);

    /// Wrap a raw 32-bit identifier.
    pub const fn new(id: u32) -> Self {
        NodeId(id)
    }

    /// Generate a random, non-zero, non-broadcast identifier.
    pub fn random() -> Self {
        loop {
            let id = rand::random::<u32>();
            if id != 0 && id != Self::BROADCAST.0 {
                return NodeId(id);
            }
        }
    }

    /// The raw 32-bit value.
    pub const fn to_u32(self) -> u32 {
        self.0
    }

    /// Whether this is the all-nodes broadcast identifier.
    pub const fn is_broadcast(self) -> bool {
        self.0 == Self::BROADCAST.0
    }

    /// The last four hex digits of the identifier, used in default names.
    fn hex_suffix(self) -> String {
        format!("{:04x}", self.0 & 0xffff)
    }

    /// Default full display name, `Meshtastic` plus the hex suffix.
    pub fn default_long_name(self) -> String {
        format!("Meshtastic {}", self.hex_suffix())
    }

    /// Default short display name, the hex suffix alone.
    pub fn default_short_name(self) -> String {
        self.hex_suffix()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "!{:08x}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        NodeId(id)
    }
}

impl FromStr for NodeId {
    type Err = RadioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix('!')
            .ok_or_else(|| RadioError::InvalidConfig(format!("node id missing '!': {s:?}")))?;
        let id = u32::from_str_radix(hex, 16)
            .map_err(|_| RadioError::InvalidConfig(format!("node id is not hex: {s:?}")))?;
        Ok(NodeId(id))
    }
}
