//! Mesh protobuf schema types for the fauxmesh emulated radio.
//!
//! These are hand-written [`prost`] message types carrying the field numbers
//! of the upstream Meshtastic schema, so bytes encoded here interoperate with
//! real nodes on the wire. Only the portion of the schema the emulated radio
//! speaks is present:
//!
//! - [`MeshPacket`] / [`Data`] - the on-air transport unit and its decoded
//!   application payload.
//! - [`ServiceEnvelope`] - the MQTT-side wrapper pairing a channel name and
//!   gateway identity with a packet.
//! - [`ToRadio`] / [`FromRadio`] - the framed client protocol spoken over
//!   TCP or a serial-like stream.
//! - [`AdminMessage`], [`Channel`], [`Config`] - the configuration surface a
//!   client sees during and after its initial handshake.
//!
//! Consumers treat these as opaque typed values; all policy lives in the
//! radio crate.

mod enums;
mod mesh;
mod radio;

pub use enums::{HardwareModel, PortNum};
pub use mesh::{
    mesh_packet, routing, telemetry, Data, DeviceMetrics, EnvironmentMetrics, MeshPacket,
    NodeInfo, Position, RouteDiscovery, Routing, ServiceEnvelope, Telemetry, User,
};
pub use radio::{
    admin_message, channel, config, from_radio, to_radio, AdminMessage, Channel, ChannelSettings,
    Config, DeviceMetadata, FromRadio, Heartbeat, MyNodeInfo, ToRadio,
};
