//! Shared enumerations of the mesh schema.

/// Application port numbers selecting how a [`Data`](crate::Data) payload is
/// interpreted. Values match the upstream `portnums.proto`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum PortNum {
    /// Deprecated / unset.
    UnknownApp = 0,
    /// UTF-8 text message.
    TextMessageApp = 1,
    /// Remote GPIO control.
    RemoteHardwareApp = 2,
    /// Position report.
    PositionApp = 3,
    /// User / node identity record.
    NodeinfoApp = 4,
    /// Mesh routing control traffic.
    RoutingApp = 5,
    /// Administrative requests and responses.
    AdminApp = 6,
    /// Device telemetry (metrics, environment).
    TelemetryApp = 67,
}

/// Hardware models a node may report. Subset of the upstream enum; the
/// emulated radio always reports [`HardwareModel::PrivateHw`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum HardwareModel {
    /// Unknown or unreported hardware.
    Unset = 0,
    /// LILYGO TTGO LoRa V2.
    TloraV2 = 1,
    /// LILYGO T-Beam.
    Tbeam = 4,
    /// RAK WisBlock 4631.
    Rak4631 = 9,
    /// Private or emulated hardware.
    PrivateHw = 255,
}
