//! The MQTT seam the radio consumes.
//!
//! The broker client itself is an external collaborator; the radio only
//! needs connect, per-channel subscribe with a handler callback, and
//! publish. Handlers run on whatever thread the client library delivers
//! messages from and therefore must not block: the radio's handler is
//! synchronous, lock-scoped work plus non-blocking queue pushes.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

/// One message crossing the broker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MqttMessage {
    /// Full topic the message was published on.
    pub topic: String,
    /// Raw payload bytes, normally an encoded `ServiceEnvelope`.
    pub payload: Vec<u8>,
}

/// Callback invoked for each message delivered on a subscription.
///
/// Must not block; the client library's delivery threading is opaque.
pub type MessageHandler = Arc<dyn Fn(MqttMessage) + Send + Sync>;

/// Broker transport handle.
#[async_trait]
pub trait MqttClient: Send + Sync {
    /// Establish the broker connection.
    async fn connect(&self) -> Result<()>;

    /// Subscribe to a channel's topic, delivering each message to `handler`.
    async fn subscribe(&self, channel: &str, handler: MessageHandler) -> Result<()>;

    /// Publish a message.
    async fn publish(&self, msg: MqttMessage) -> Result<()>;

    /// The full topic for a channel: the broker's topic root joined with the
    /// channel name.
    fn topic_for_channel(&self, channel: &str) -> String;
}
