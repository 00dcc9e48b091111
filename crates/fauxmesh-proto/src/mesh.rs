//! The on-air transport unit, its application payloads, and the MQTT-side
//! service envelope.

use crate::enums::{HardwareModel, PortNum};

/// A single packet crossing the mesh, either as cleartext ([`Data`]) or as an
/// AES-CTR ciphertext blob.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MeshPacket {
    /// Sending node.
    #[prost(fixed32, tag = "1")]
    pub from: u32,
    /// Destination node; `0xffffffff` addresses all nodes.
    #[prost(fixed32, tag = "2")]
    pub to: u32,
    /// Channel hash disambiguating channels on-air.
    #[prost(uint32, tag = "3")]
    pub channel: u32,
    /// Payload, tagged by encryption state.
    #[prost(oneof = "mesh_packet::PayloadVariant", tags = "4, 5")]
    pub payload_variant: Option<mesh_packet::PayloadVariant>,
    /// Sender-assigned packet id, monotonic within the sender's lifetime.
    #[prost(fixed32, tag = "6")]
    pub id: u32,
    /// Receive timestamp in unix seconds, if known.
    #[prost(fixed32, tag = "7")]
    pub rx_time: u32,
    /// Remaining mesh hops before the packet is dropped.
    #[prost(uint32, tag = "9")]
    pub hop_limit: u32,
    /// Whether the sender requests an acknowledgement.
    #[prost(bool, tag = "10")]
    pub want_ack: bool,
}

pub mod mesh_packet {
    /// Cleartext or ciphertext payload of a [`MeshPacket`](super::MeshPacket).
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum PayloadVariant {
        /// Decoded application payload.
        #[prost(message, tag = "4")]
        Decoded(super::Data),
        /// AES-CTR ciphertext of an encoded [`Data`](super::Data).
        #[prost(bytes, tag = "5")]
        Encrypted(Vec<u8>),
    }
}

/// Decoded application payload of a mesh packet.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Data {
    /// Port selecting how `payload` is interpreted.
    #[prost(enumeration = "PortNum", tag = "1")]
    pub portnum: i32,
    /// Application payload bytes.
    #[prost(bytes = "vec", tag = "2")]
    pub payload: Vec<u8>,
    /// Whether the sender expects a response on the same port.
    #[prost(bool, tag = "3")]
    pub want_response: bool,
    /// Packet id of the request this payload responds to, if any.
    #[prost(uint32, tag = "6")]
    pub request_id: u32,
}

impl Data {
    /// The payload's port as a typed enum, `UnknownApp` for unrecognized
    /// values.
    pub fn port(&self) -> PortNum {
        PortNum::try_from(self.portnum).unwrap_or(PortNum::UnknownApp)
    }
}

/// Identity record broadcast by a node and stored per peer.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct User {
    /// Canonical node id string, `!` followed by eight lowercase hex digits.
    #[prost(string, tag = "1")]
    pub id: String,
    /// Full display name.
    #[prost(string, tag = "2")]
    pub long_name: String,
    /// Short display name, at most four characters.
    #[prost(string, tag = "3")]
    pub short_name: String,
    /// Hardware the node runs on.
    #[prost(enumeration = "HardwareModel", tag = "5")]
    pub hw_model: i32,
}

/// Geographic position report.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Position {
    /// Latitude in degrees multiplied by 1e7.
    #[prost(sfixed32, optional, tag = "1")]
    pub latitude_i: Option<i32>,
    /// Longitude in degrees multiplied by 1e7.
    #[prost(sfixed32, optional, tag = "2")]
    pub longitude_i: Option<i32>,
    /// Altitude in metres above mean sea level.
    #[prost(int32, optional, tag = "3")]
    pub altitude: Option<i32>,
    /// Unix seconds at which the fix was taken.
    #[prost(fixed32, tag = "4")]
    pub time: u32,
}

/// Mesh routing control payload.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Routing {
    #[prost(oneof = "routing::Variant", tags = "1, 2, 3")]
    pub variant: Option<routing::Variant>,
}

pub mod routing {
    /// Reasons a routing operation failed.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Error {
        /// Delivered without error.
        None = 0,
        /// No route to the destination was found.
        NoRoute = 1,
        /// A node along the route refused the packet.
        GotNak = 2,
        /// The route timed out.
        Timeout = 3,
    }

    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Variant {
        /// Request to discover a route.
        #[prost(message, tag = "1")]
        RouteRequest(super::RouteDiscovery),
        /// Reply listing the discovered route.
        #[prost(message, tag = "2")]
        RouteReply(super::RouteDiscovery),
        /// Failure report for an earlier request.
        #[prost(enumeration = "Error", tag = "3")]
        ErrorReason(i32),
    }
}

/// The node ids traversed during route discovery.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RouteDiscovery {
    #[prost(fixed32, repeated, tag = "1")]
    pub route: Vec<u32>,
}

/// Telemetry report carrying one metrics family.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Telemetry {
    /// Unix seconds at which the reading was taken.
    #[prost(fixed32, tag = "1")]
    pub time: u32,
    #[prost(oneof = "telemetry::Variant", tags = "2, 3")]
    pub variant: Option<telemetry::Variant>,
}

pub mod telemetry {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Variant {
        /// Battery, radio utilization and uptime readings.
        #[prost(message, tag = "2")]
        DeviceMetrics(super::DeviceMetrics),
        /// Environmental sensor readings.
        #[prost(message, tag = "3")]
        EnvironmentMetrics(super::EnvironmentMetrics),
    }
}

impl Telemetry {
    /// The device-metrics family of this report, if that is what it carries.
    pub fn device_metrics(&self) -> Option<&DeviceMetrics> {
        match &self.variant {
            Some(telemetry::Variant::DeviceMetrics(m)) => Some(m),
            _ => None,
        }
    }
}

/// Battery, radio utilization and uptime readings.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeviceMetrics {
    /// Battery charge, 0–100 (or >100 when powered).
    #[prost(uint32, tag = "1")]
    pub battery_level: u32,
    /// Battery voltage.
    #[prost(float, tag = "2")]
    pub voltage: f32,
    /// Fraction of channel time in use, percent.
    #[prost(float, tag = "3")]
    pub channel_utilization: f32,
    /// Fraction of airtime spent transmitting, percent.
    #[prost(float, tag = "4")]
    pub air_util_tx: f32,
    /// Seconds since boot.
    #[prost(uint32, tag = "5")]
    pub uptime_seconds: u32,
}

/// Environmental sensor readings.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EnvironmentMetrics {
    /// Temperature in degrees Celsius.
    #[prost(float, tag = "1")]
    pub temperature: f32,
    /// Relative humidity, percent.
    #[prost(float, tag = "2")]
    pub relative_humidity: f32,
    /// Barometric pressure in hPa.
    #[prost(float, tag = "3")]
    pub barometric_pressure: f32,
}

/// Everything a node knows about one peer.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NodeInfo {
    /// The peer's node id.
    #[prost(uint32, tag = "1")]
    pub num: u32,
    /// Last identity record heard from the peer.
    #[prost(message, optional, tag = "2")]
    pub user: Option<User>,
    /// Last position heard from the peer.
    #[prost(message, optional, tag = "3")]
    pub position: Option<Position>,
    /// Signal-to-noise ratio of the last receipt.
    #[prost(float, tag = "4")]
    pub snr: f32,
    /// Unix seconds at which the peer was last heard.
    #[prost(fixed32, tag = "5")]
    pub last_heard: u32,
    /// Last device metrics heard from the peer.
    #[prost(message, optional, tag = "6")]
    pub device_metrics: Option<DeviceMetrics>,
}

/// MQTT-side wrapper pairing a channel name and gateway identity with a mesh
/// packet.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ServiceEnvelope {
    /// The wrapped packet.
    #[prost(message, optional, tag = "1")]
    pub packet: Option<MeshPacket>,
    /// Name of the channel the packet was heard on.
    #[prost(string, tag = "3")]
    pub channel_id: String,
    /// Canonical id string of the gateway that uplinked the packet.
    #[prost(string, tag = "4")]
    pub gateway_id: String,
}
