//! Channel configuration and lookup.

use serde::{Deserialize, Serialize};

use crate::crypto::{self, DEFAULT_PSK};
use crate::error::{RadioError, Result};

/// One mesh channel: a name and a pre-shared key.
///
/// The key field accepts three forms:
/// - empty - the channel is cleartext;
/// - a single byte - a key index: `0` means cleartext, `1` the default key,
///   and any larger value the default key with its final byte substituted by
///   the index;
/// - 16, 24 or 32 bytes - used directly as the AES key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Channel name as it appears in topic paths and envelopes.
    pub name: String,
    /// Configured pre-shared key, before index expansion.
    pub psk: Vec<u8>,
}

impl Channel {
    /// Create a channel from a name and a configured key.
    pub fn new(name: impl Into<String>, psk: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            psk: psk.into(),
        }
    }

    /// Create a channel carrying the well-known default key.
    pub fn with_default_psk(name: impl Into<String>) -> Self {
        Self::new(name, DEFAULT_PSK)
    }

    /// The effective AES key after index expansion; `None` for a cleartext
    /// channel.
    pub fn resolved_psk(&self) -> Option<Vec<u8>> {
        match self.psk.as_slice() {
            [] | [0] => None,
            [index] => {
                let mut key = DEFAULT_PSK.to_vec();
                if *index > 1 {
                    key[15] = *index;
                }
                Some(key)
            }
            key => Some(key.to_vec()),
        }
    }

    /// The 8-bit on-air digest of this channel, computed over the resolved
    /// key. Cleartext channels have no hash.
    pub fn hash(&self) -> Result<u32> {
        let key = self.resolved_psk().ok_or(RadioError::EmptyKey)?;
        crypto::channel_hash(&self.name, &key)
    }
}

/// The ordered channel list of a radio. Immutable once built; element 0 is
/// the primary channel, the only one the radio decrypts and beacons on.
#[derive(Clone, Debug)]
pub struct ChannelRegistry {
    channels: Vec<Channel>,
}

impl ChannelRegistry {
    /// Build a registry from an ordered, non-empty channel list.
    pub fn new(channels: Vec<Channel>) -> Result<Self> {
        if channels.is_empty() {
            return Err(RadioError::InvalidConfig(
                "channel list must be non-empty".into(),
            ));
        }
        Ok(Self { channels })
    }

    /// The stock public channels, each carrying the default key.
    pub fn well_known() -> Self {
        Self {
            channels: ["LongFast", "LongSlow", "VLongSlow"]
                .into_iter()
                .map(Channel::with_default_psk)
                .collect(),
        }
    }

    /// The primary channel.
    pub fn primary(&self) -> &Channel {
        &self.channels[0]
    }

    /// Find a channel by name.
    pub fn lookup(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.name == name)
    }

    /// All channels, primary first.
    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_requires_a_channel() {
        assert!(matches!(
            ChannelRegistry::new(vec![]),
            Err(RadioError::InvalidConfig(_))
        ));
    }

    #[test]
    fn first_channel_is_primary() {
        let registry = ChannelRegistry::new(vec![
            Channel::with_default_psk("LongFast"),
            Channel::new("Private", [0xAB; 32]),
        ])
        .unwrap();
        assert_eq!(registry.primary().name, "LongFast");
        assert_eq!(registry.lookup("Private").unwrap().psk, vec![0xAB; 32]);
        assert!(registry.lookup("Missing").is_none());
    }

    #[test]
    fn short_key_expands_against_default() {
        assert_eq!(Channel::new("c", []).resolved_psk(), None);
        assert_eq!(Channel::new("c", [0]).resolved_psk(), None);
        assert_eq!(
            Channel::new("c", [1]).resolved_psk(),
            Some(DEFAULT_PSK.to_vec())
        );

        let expanded = Channel::new("c", [7]).resolved_psk().unwrap();
        assert_eq!(&expanded[..15], &DEFAULT_PSK[..15]);
        assert_eq!(expanded[15], 7);

        let full = vec![0x55; 24];
        assert_eq!(Channel::new("c", full.clone()).resolved_psk(), Some(full));
    }

    #[test]
    fn hash_uses_resolved_key() {
        let indexed = Channel::new("LongFast", [1]);
        let explicit = Channel::with_default_psk("LongFast");
        assert_eq!(indexed.hash().unwrap(), explicit.hash().unwrap());

        assert!(matches!(
            Channel::new("LongFast", []).hash(),
            Err(RadioError::EmptyKey)
        ));
    }

    #[test]
    fn well_known_channels_carry_default_key() {
        let registry = ChannelRegistry::well_known();
        assert_eq!(registry.primary().name, "LongFast");
        for channel in registry.iter() {
            assert_eq!(channel.resolved_psk(), Some(DEFAULT_PSK.to_vec()));
        }
    }
}
