//! An emulated mesh-radio node.
//!
//! This crate impersonates a physical low-power mesh radio by bridging two
//! asymmetric interfaces: an MQTT broker carrying the mesh's wire messages,
//! and a framed length-prefixed stream over TCP or an in-memory pipe through
//! which a client application issues commands and receives mesh traffic as
//! if talking to real hardware over a serial line.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                           Radio                              │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │  ┌───────────┐   ┌────────────────┐   ┌──────────────────┐   │
//! │  │ MqttClient│◄─►│  bridge core   │◄─►│ stream sessions  │   │
//! │  │ (broker)  │   │                │   │ (TCP / in-memory)│   │
//! │  └───────────┘   │ ChannelRegistry│   └──────────────────┘   │
//! │                  │ NodeDb         │   ┌──────────────────┐   │
//! │                  │ crypto         │◄──│ beacon scheduler │   │
//! │                  └────────────────┘   └──────────────────┘   │
//! │                                                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Inbound broker envelopes fan out to every connected session and, on the
//! primary channel, are decrypted and folded into the node database.
//! Sessions speak the `ToRadio`/`FromRadio` protocol behind `0x94 0xC3`
//! length-prefixed framing; the scheduler broadcasts identity and position
//! beacons at the configured cadences.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use fauxmesh_radio::{Channel, NodeId, Radio, RadioConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # fn broker() -> Arc<dyn fauxmesh_radio::MqttClient> { unimplemented!() }
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RadioConfig::builder(NodeId::random())
//!         .channel(Channel::with_default_psk("LongFast"))
//!         .node_info_interval(Duration::from_secs(300))
//!         .position_interval(Duration::from_secs(300))
//!         .position(515014760, -1406340, 2)
//!         .tcp_listen_addr("127.0.0.1:4403")
//!         .build();
//!
//!     let radio = Radio::new(config, broker())?;
//!     radio.run(CancellationToken::new()).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod channel;
pub mod config;
pub mod crypto;
pub mod error;
pub mod framing;
pub mod mqtt;
pub mod node;
pub mod nodedb;
pub mod radio;

mod session;

pub mod test_utils;

pub use channel::{Channel, ChannelRegistry};
pub use config::{RadioConfig, RadioConfigBuilder};
pub use error::{RadioError, Result};
pub use framing::{FrameReader, FrameWriter, MAX_FRAME_PAYLOAD, START1, START2};
pub use mqtt::{MessageHandler, MqttClient, MqttMessage};
pub use node::NodeId;
pub use nodedb::NodeDb;
pub use radio::{Radio, DEVICE_STATE_VERSION, FIRMWARE_VERSION, MIN_APP_VERSION};
