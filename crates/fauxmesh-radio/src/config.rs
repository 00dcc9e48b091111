//! Radio configuration.
//!
//! All options are fixed before the radio starts; nothing here is mutated at
//! runtime. The broker handle is passed to `Radio::new` separately, so this
//! struct stays plain data and (de)serializes cleanly.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::channel::Channel;
use crate::error::{RadioError, Result};
use crate::node::NodeId;

/// Configuration of one emulated radio.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RadioConfig {
    /// Identity of this node.
    pub node_id: NodeId,

    /// Full display name; derived from the node id when empty.
    #[serde(default)]
    pub long_name: String,

    /// Short display name; derived from the node id when empty.
    #[serde(default)]
    pub short_name: String,

    /// Ordered channel list; must be non-empty, element 0 is the primary.
    pub channels: Vec<Channel>,

    /// Interval between identity broadcasts; zero disables them.
    #[serde(with = "humantime_serde", default)]
    pub node_info_interval: Duration,

    /// Interval between position broadcasts; zero disables them.
    #[serde(with = "humantime_serde", default)]
    pub position_interval: Duration,

    /// Broadcast latitude, degrees times 1e7.
    #[serde(default)]
    pub lat_i: i32,

    /// Broadcast longitude, degrees times 1e7.
    #[serde(default)]
    pub lon_i: i32,

    /// Broadcast altitude, metres above mean sea level.
    #[serde(default)]
    pub altitude: i32,

    /// Address to serve the client stream protocol on; `None` disables the
    /// TCP listener.
    #[serde(default)]
    pub tcp_listen_addr: Option<String>,
}

impl RadioConfig {
    /// Start building a configuration for the given identity.
    pub fn builder(node_id: NodeId) -> RadioConfigBuilder {
        RadioConfigBuilder::new(node_id)
    }

    /// Check requiredness and fill in derived defaults.
    pub(crate) fn validate(&mut self) -> Result<()> {
        if self.node_id.to_u32() == 0 {
            return Err(RadioError::InvalidConfig("node_id is required".into()));
        }
        if self.channels.is_empty() {
            return Err(RadioError::InvalidConfig(
                "channels must be non-empty".into(),
            ));
        }
        if self.long_name.is_empty() {
            self.long_name = self.node_id.default_long_name();
        }
        if self.short_name.is_empty() {
            self.short_name = self.node_id.default_short_name();
        }
        Ok(())
    }
}

/// Builder for [`RadioConfig`].
#[derive(Debug)]
pub struct RadioConfigBuilder {
    config: RadioConfig,
}

impl RadioConfigBuilder {
    /// Create a builder with everything but the identity defaulted.
    pub fn new(node_id: NodeId) -> Self {
        Self {
            config: RadioConfig {
                node_id,
                long_name: String::new(),
                short_name: String::new(),
                channels: Vec::new(),
                node_info_interval: Duration::ZERO,
                position_interval: Duration::ZERO,
                lat_i: 0,
                lon_i: 0,
                altitude: 0,
                tcp_listen_addr: None,
            },
        }
    }

    /// Set the display names.
    pub fn names(mut self, long: impl Into<String>, short: impl Into<String>) -> Self {
        self.config.long_name = long.into();
        self.config.short_name = short.into();
        self
    }

    /// Append a channel; the first appended becomes the primary.
    pub fn channel(mut self, channel: Channel) -> Self {
        self.config.channels.push(channel);
        self
    }

    /// Enable identity broadcasts at the given cadence.
    pub fn node_info_interval(mut self, interval: Duration) -> Self {
        self.config.node_info_interval = interval;
        self
    }

    /// Enable position broadcasts at the given cadence.
    pub fn position_interval(mut self, interval: Duration) -> Self {
        self.config.position_interval = interval;
        self
    }

    /// Set the broadcast position.
    pub fn position(mut self, lat_i: i32, lon_i: i32, altitude: i32) -> Self {
        self.config.lat_i = lat_i;
        self.config.lon_i = lon_i;
        self.config.altitude = altitude;
        self
    }

    /// Serve the client stream protocol on a TCP address.
    pub fn tcp_listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.tcp_listen_addr = Some(addr.into());
        self
    }

    /// Finish building.
    pub fn build(self) -> RadioConfig {
        self.config
    }
}

// Custom serde module for Duration with humantime
mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = humantime::format_duration(*duration).to_string();
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_produces_valid_config() {
        let mut config = RadioConfig::builder(NodeId::new(0x1234_5678))
            .channel(Channel::with_default_psk("LongFast"))
            .node_info_interval(Duration::from_secs(60))
            .position(515014760, -1406340, 2)
            .tcp_listen_addr("127.0.0.1:4403")
            .build();

        config.validate().unwrap();
        assert_eq!(config.long_name, "Meshtastic 5678");
        assert_eq!(config.short_name, "5678");
        assert_eq!(config.channels[0].name, "LongFast");
    }

    #[test]
    fn explicit_names_are_kept() {
        let mut config = RadioConfig::builder(NodeId::new(1))
            .names("Basestation", "BASE")
            .channel(Channel::with_default_psk("LongFast"))
            .build();
        config.validate().unwrap();
        assert_eq!(config.long_name, "Basestation");
        assert_eq!(config.short_name, "BASE");
    }

    #[test]
    fn rejects_missing_requirements() {
        let mut no_channels = RadioConfig::builder(NodeId::new(1)).build();
        assert!(matches!(
            no_channels.validate(),
            Err(RadioError::InvalidConfig(_))
        ));

        let mut zero_id = RadioConfig::builder(NodeId::new(0))
            .channel(Channel::with_default_psk("LongFast"))
            .build();
        assert!(matches!(
            zero_id.validate(),
            Err(RadioError::InvalidConfig(_))
        ));
    }
}
