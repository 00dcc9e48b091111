//! Test doubles for exercising the radio without a broker.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{RadioError, Result};
use crate::mqtt::{MessageHandler, MqttClient, MqttMessage};

/// In-memory stand-in for the broker client.
///
/// Records every publish and lets a test inject broker-delivered messages
/// straight into the handlers a radio registered.
pub struct MockMqttClient {
    root: String,
    fail_connect: bool,
    handlers: Mutex<HashMap<String, MessageHandler>>,
    published: Mutex<Vec<MqttMessage>>,
}

impl MockMqttClient {
    /// Create a mock rooted at the conventional `msh` topic prefix.
    pub fn new() -> Self {
        Self::with_root("msh")
    }

    /// Create a mock with an explicit topic root.
    pub fn with_root(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            fail_connect: false,
            handlers: Mutex::new(HashMap::new()),
            published: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock whose `connect` fails, for transport-fatal paths.
    pub fn failing() -> Self {
        Self {
            fail_connect: true,
            ..Self::new()
        }
    }

    /// Everything published so far.
    pub fn published(&self) -> Vec<MqttMessage> {
        self.published.lock().unwrap().clone()
    }

    /// Deliver a broker message to the handler subscribed for `channel`, as
    /// the client library would from its own thread. Panics if nothing is
    /// subscribed, which in a test means the radio never started.
    pub fn inject(&self, channel: &str, payload: Vec<u8>) {
        let topic = self.topic_for_channel(channel);
        let handler = {
            let handlers = self.handlers.lock().unwrap();
            handlers
                .get(channel)
                .unwrap_or_else(|| panic!("no subscription for channel {channel:?}"))
                .clone()
        };
        handler(MqttMessage { topic, payload });
    }

    /// Names of the channels currently subscribed.
    pub fn subscribed_channels(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for MockMqttClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MqttClient for MockMqttClient {
    async fn connect(&self) -> Result<()> {
        if self.fail_connect {
            return Err(RadioError::Transport("connection refused".into()));
        }
        Ok(())
    }

    async fn subscribe(&self, channel: &str, handler: MessageHandler) -> Result<()> {
        self.handlers
            .lock()
            .unwrap()
            .insert(channel.to_string(), handler);
        Ok(())
    }

    async fn publish(&self, msg: MqttMessage) -> Result<()> {
        self.published.lock().unwrap().push(msg);
        Ok(())
    }

    fn topic_for_channel(&self, channel: &str) -> String {
        format!("{}/{}", self.root, channel)
    }
}
