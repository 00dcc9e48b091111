//! The framed client protocol: messages crossing the length-prefixed stream
//! between a client application and the radio, plus the configuration
//! surface exchanged during the initial handshake.

use crate::enums::HardwareModel;
use crate::mesh::{MeshPacket, NodeInfo};

/// Client → radio message.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ToRadio {
    #[prost(oneof = "to_radio::PayloadVariant", tags = "1, 3, 4, 7")]
    pub payload_variant: Option<to_radio::PayloadVariant>,
}

pub mod to_radio {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum PayloadVariant {
        /// A packet the client wants sent over the mesh.
        #[prost(message, tag = "1")]
        Packet(super::MeshPacket),
        /// Request for the configuration handshake; the radio echoes the
        /// nonce back as `ConfigCompleteId` once the dump is finished.
        #[prost(uint32, tag = "3")]
        WantConfigId(u32),
        /// The client is leaving; the radio closes the stream.
        #[prost(bool, tag = "4")]
        Disconnect(bool),
        /// Keepalive, no response expected.
        #[prost(message, tag = "7")]
        Heartbeat(super::Heartbeat),
    }
}

/// Keepalive carrying no payload.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Heartbeat {}

/// Radio → client message.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FromRadio {
    /// Stream-local sequence number, unused by the emulated radio.
    #[prost(uint32, tag = "1")]
    pub id: u32,
    #[prost(oneof = "from_radio::PayloadVariant", tags = "2, 3, 4, 5, 7, 10, 13")]
    pub payload_variant: Option<from_radio::PayloadVariant>,
}

pub mod from_radio {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum PayloadVariant {
        /// A packet witnessed on the mesh, or a synthesized reply.
        #[prost(message, tag = "2")]
        Packet(super::MeshPacket),
        /// Identity of the radio itself; first handshake message.
        #[prost(message, tag = "3")]
        MyInfo(super::MyNodeInfo),
        /// One known peer (or the radio itself) from the node database.
        #[prost(message, tag = "4")]
        NodeInfo(super::NodeInfo),
        /// One configuration section.
        #[prost(message, tag = "5")]
        Config(super::Config),
        /// Echo of the `WantConfigId` nonce; the handshake is complete.
        #[prost(uint32, tag = "7")]
        ConfigCompleteId(u32),
        /// One configured channel.
        #[prost(message, tag = "10")]
        Channel(super::Channel),
        /// Device capability metadata; second handshake message.
        #[prost(message, tag = "13")]
        Metadata(super::DeviceMetadata),
    }
}

/// Identity of the radio a client has connected to.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MyNodeInfo {
    /// The radio's own node id.
    #[prost(uint32, tag = "1")]
    pub my_node_num: u32,
    /// Number of reboots observed on this device.
    #[prost(uint32, tag = "8")]
    pub reboot_count: u32,
    /// Minimum client application version this radio speaks to.
    #[prost(uint32, tag = "11")]
    pub min_app_version: u32,
}

/// Capability metadata of the device.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeviceMetadata {
    /// Firmware version string.
    #[prost(string, tag = "1")]
    pub firmware_version: String,
    /// Version of the persisted device state layout.
    #[prost(uint32, tag = "2")]
    pub device_state_version: u32,
    /// Whether the device supports a remote shutdown.
    #[prost(bool, tag = "3")]
    pub can_shutdown: bool,
    /// Whether the device has WiFi hardware.
    #[prost(bool, tag = "4")]
    pub has_wifi: bool,
    /// Whether the device has Bluetooth hardware.
    #[prost(bool, tag = "5")]
    pub has_bluetooth: bool,
    /// Whether the device has wired Ethernet.
    #[prost(bool, tag = "6")]
    pub has_ethernet: bool,
    /// Hardware the device runs on.
    #[prost(enumeration = "HardwareModel", tag = "9")]
    pub hw_model: i32,
}

/// One channel as presented to clients.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Channel {
    /// Position in the channel table; index 0 is the primary.
    #[prost(int32, tag = "1")]
    pub index: i32,
    /// The channel's settings; `None` when the channel is unconfigured.
    #[prost(message, optional, tag = "2")]
    pub settings: Option<ChannelSettings>,
    /// How the channel participates in the mesh.
    #[prost(enumeration = "channel::Role", tag = "3")]
    pub role: i32,
}

pub mod channel {
    /// How a channel participates in the mesh.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Role {
        /// The channel is not in use.
        Disabled = 0,
        /// The channel all broadcasts go out on.
        Primary = 1,
        /// An additional listening channel.
        Secondary = 2,
    }
}

/// Settings of one channel.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChannelSettings {
    /// Pre-shared key; empty means cleartext.
    #[prost(bytes = "vec", tag = "2")]
    pub psk: Vec<u8>,
    /// Channel name.
    #[prost(string, tag = "3")]
    pub name: String,
}

/// One section of the device configuration.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Config {
    #[prost(oneof = "config::PayloadVariant", tags = "1")]
    pub payload_variant: Option<config::PayloadVariant>,
}

pub mod config {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum PayloadVariant {
        /// Device-level behavior settings.
        #[prost(message, tag = "1")]
        Device(DeviceConfig),
    }

    /// Device-level behavior settings.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct DeviceConfig {
        /// Whether the serial console is available.
        #[prost(bool, tag = "2")]
        pub serial_enabled: bool,
        /// Interval between identity broadcasts, in seconds.
        #[prost(uint32, tag = "7")]
        pub node_info_broadcast_secs: u32,
    }
}

/// Administrative request or response carried on the admin port.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AdminMessage {
    #[prost(oneof = "admin_message::PayloadVariant", tags = "1, 2")]
    pub payload_variant: Option<admin_message::PayloadVariant>,
}

pub mod admin_message {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum PayloadVariant {
        /// Request for the channel at `index - 1`.
        #[prost(uint32, tag = "1")]
        GetChannelRequest(u32),
        /// The requested channel.
        #[prost(message, tag = "2")]
        GetChannelResponse(super::Channel),
    }
}
