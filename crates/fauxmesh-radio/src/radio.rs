//! The radio core: lifecycle owner composing the MQTT bridge, stream
//! sessions and the beacon scheduler.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use prost::Message;
use tokio::io::DuplexStream;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use fauxmesh_proto::{
    admin_message, channel::Role, config, from_radio, mesh_packet, AdminMessage, Channel,
    ChannelSettings, Config, Data, DeviceMetadata, FromRadio, HardwareModel, MeshPacket,
    MyNodeInfo, NodeInfo, PortNum, Position, Routing, ServiceEnvelope, Telemetry, User,
};

use crate::channel::ChannelRegistry;
use crate::config::RadioConfig;
use crate::crypto;
use crate::error::{RadioError, Result};
use crate::mqtt::{MqttClient, MqttMessage};
use crate::node::NodeId;
use crate::nodedb::NodeDb;
use crate::session;

/// Minimum client application version the radio reports.
pub const MIN_APP_VERSION: u32 = 30200;
/// Firmware version string the radio reports.
pub const FIRMWARE_VERSION: &str = "2.2.19-fake";
/// Persisted-state layout version the radio reports.
pub const DEVICE_STATE_VERSION: u32 = 22;

/// Capacity of each session's outbound queue. Fan-out never blocks on a
/// slow client: a full queue drops the message for that subscriber only.
const SUBSCRIBER_QUEUE_CAP: usize = 64;

/// Size of the in-memory pipe returned by [`Radio::conn`].
const CONN_PIPE_CAP: usize = 4096;

fn unix_now() -> u32 {
    chrono::Utc::now().timestamp() as u32
}

/// An emulated mesh node: impersonates a physical radio towards stream
/// clients while speaking the mesh over an MQTT broker.
///
/// Cheap to clone; all clones drive the same radio.
#[derive(Clone)]
pub struct Radio {
    inner: Arc<RadioInner>,
}

/// The one concurrency domain of the radio: node database, subscriber set
/// and packet-id counter share a single mutex, held only for lock-scoped
/// work, never across I/O.
struct RadioState {
    node_db: NodeDb,
    subscribers: HashMap<u64, mpsc::Sender<FromRadio>>,
    next_subscriber_id: u64,
    packet_id: u32,
}

pub(crate) struct RadioInner {
    cfg: RadioConfig,
    channels: ChannelRegistry,
    mqtt: Arc<dyn MqttClient>,
    state: Mutex<RadioState>,
}

impl Radio {
    /// Create a radio from a validated configuration and a broker handle.
    pub fn new(mut cfg: RadioConfig, mqtt: Arc<dyn MqttClient>) -> Result<Radio> {
        cfg.validate()?;
        let channels = ChannelRegistry::new(cfg.channels.clone())?;

        let mut node_db = NodeDb::new();
        // The radio itself is an ordinary database entry, so the handshake
        // needs no special case for it.
        let self_user = User {
            id: cfg.node_id.to_string(),
            long_name: cfg.long_name.clone(),
            short_name: cfg.short_name.clone(),
            hw_model: HardwareModel::PrivateHw as i32,
        };
        node_db.update(cfg.node_id.to_u32(), |n| n.user = Some(self_user));

        Ok(Radio {
            inner: Arc::new(RadioInner {
                cfg,
                channels,
                mqtt,
                state: Mutex::new(RadioState {
                    node_db,
                    subscribers: HashMap::new(),
                    next_subscriber_id: 0,
                    packet_id: 0,
                }),
            }),
        })
    }

    /// Run the radio until `cancel` fires or a subtask fails fatally.
    ///
    /// Connects to the broker, subscribes every configured channel, starts
    /// the beacon schedulers and the TCP listener, then supervises. On the
    /// way out every subtask is cancelled and joined before returning.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let inner = &self.inner;
        inner.mqtt.connect().await?;

        for channel in inner.channels.iter() {
            debug!(channel = %channel.name, "subscribing to mqtt for channel");
            let handler_inner = Arc::clone(inner);
            inner
                .mqtt
                .subscribe(
                    &channel.name,
                    Arc::new(move |msg| handler_inner.handle_mqtt_message(msg)),
                )
                .await?;
        }

        let tasks_cancel = cancel.child_token();
        let mut tasks: JoinSet<Result<()>> = JoinSet::new();

        if !inner.cfg.node_info_interval.is_zero() {
            tasks.spawn(beacon_loop(
                Arc::clone(inner),
                tasks_cancel.clone(),
                inner.cfg.node_info_interval,
                Beacon::NodeInfo,
            ));
        }
        if !inner.cfg.position_interval.is_zero() {
            tasks.spawn(beacon_loop(
                Arc::clone(inner),
                tasks_cancel.clone(),
                inner.cfg.position_interval,
                Beacon::Position,
            ));
        }
        if let Some(addr) = inner.cfg.tcp_listen_addr.clone() {
            tasks.spawn(listen_tcp(Arc::clone(inner), tasks_cancel.clone(), addr));
        }

        let mut outcome = Ok(());
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                joined = tasks.join_next() => match joined {
                    // Nothing left to supervise; wait for cancellation.
                    None => {
                        cancel.cancelled().await;
                        break;
                    }
                    Some(Ok(Ok(()))) => continue,
                    Some(Ok(Err(e))) => {
                        error!(error = %e, "radio subtask failed");
                        outcome = Err(e);
                        break;
                    }
                    Some(Err(e)) => {
                        error!(error = %e, "radio subtask panicked");
                        outcome = Err(RadioError::Transport(e.to_string()));
                        break;
                    }
                },
            }
        }

        tasks_cancel.cancel();
        while tasks.join_next().await.is_some() {}
        outcome
    }

    /// An in-memory stream endpoint connected to this radio, for in-process
    /// clients. The radio-side session runs until the endpoint is dropped or
    /// `cancel` fires.
    pub fn conn(&self, cancel: CancellationToken) -> DuplexStream {
        let (client_end, radio_end) = tokio::io::duplex(CONN_PIPE_CAP);
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            if let Err(e) = session::run(inner, radio_end, cancel).await {
                warn!(error = %e, "in-memory session ended with error");
            }
        });
        client_end
    }

    /// Take the next packet id. Strictly monotonic and greater than zero for
    /// the lifetime of the radio; restarts from 1 on a new process.
    pub fn next_packet_id(&self) -> u32 {
        self.inner.next_packet_id()
    }

    /// Deep copies of the current node database entries.
    pub fn nodes(&self) -> Vec<NodeInfo> {
        self.inner.state.lock().unwrap().node_db.snapshot()
    }

    /// This radio's node identity.
    pub fn node_id(&self) -> NodeId {
        self.inner.cfg.node_id
    }
}

impl RadioInner {
    pub(crate) fn next_packet_id(&self) -> u32 {
        let mut state = self.state.lock().unwrap();
        state.packet_id += 1;
        state.packet_id
    }

    /// Register a session's outbound queue. Returns the subscriber id used
    /// for removal, the sender the session's own reader enqueues replies on,
    /// and the receiver its writer drains.
    pub(crate) fn register_subscriber(
        &self,
    ) -> (u64, mpsc::Sender<FromRadio>, mpsc::Receiver<FromRadio>) {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE_CAP);
        let mut state = self.state.lock().unwrap();
        let id = state.next_subscriber_id;
        state.next_subscriber_id += 1;
        state.subscribers.insert(id, tx.clone());
        (id, tx, rx)
    }

    pub(crate) fn remove_subscriber(&self, id: u64) {
        self.state.lock().unwrap().subscribers.remove(&id);
    }

    /// Enqueue a message on every active session. Never blocks: a full
    /// queue drops the message for that subscriber, a closed one is removed.
    fn fan_out(&self, msg: &FromRadio) {
        let mut state = self.state.lock().unwrap();
        let mut gone = Vec::new();
        for (&id, tx) in &state.subscribers {
            match tx.try_send(msg.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(subscriber = id, "subscriber queue full, dropping message");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => gone.push(id),
            }
        }
        for id in gone {
            state.subscribers.remove(&id);
        }
    }

    /// Handle one broker delivery. Runs on the MQTT client's delivery
    /// thread, so everything here is non-blocking.
    pub(crate) fn handle_mqtt_message(&self, msg: MqttMessage) {
        if let Err(e) = self.try_handle_mqtt_message(msg) {
            warn!(error = %e, "failed to handle incoming mqtt message");
        }
    }

    fn try_handle_mqtt_message(&self, msg: MqttMessage) -> Result<()> {
        let envelope = ServiceEnvelope::decode(msg.payload.as_slice())?;
        let Some(packet) = envelope.packet else {
            return Err(RadioError::MalformedEnvelope("no packet".into()));
        };

        // Every witnessed packet reaches every client, whatever its channel.
        self.fan_out(&FromRadio {
            id: 0,
            payload_variant: Some(from_radio::PayloadVariant::Packet(packet.clone())),
        });

        let primary = self.channels.primary();
        if envelope.channel_id != primary.name {
            return Ok(());
        }

        debug!(channel = %envelope.channel_id, from = packet.from, "service envelope on primary channel");
        let key = primary.resolved_psk().unwrap_or_default();
        let data = crypto::try_decode(&packet, &key)?;

        match data.port() {
            PortNum::NodeinfoApp => {
                let user = User::decode(data.payload.as_slice())?;
                info!(from = packet.from, id = %user.id, "received NodeInfo");
                self.update_node(packet.from, |n| n.user = Some(user));
            }
            PortNum::PositionApp => {
                let position = Position::decode(data.payload.as_slice())?;
                info!(from = packet.from, "received Position");
                self.update_node(packet.from, |n| n.position = Some(position));
            }
            PortNum::TelemetryApp => {
                let telemetry = Telemetry::decode(data.payload.as_slice())?;
                if let Some(metrics) = telemetry.device_metrics().cloned() {
                    info!(from = packet.from, "received Telemetry device metrics");
                    self.update_node(packet.from, |n| n.device_metrics = Some(metrics));
                }
            }
            PortNum::TextMessageApp => {
                info!(from = packet.from, text = %String::from_utf8_lossy(&data.payload), "received TextMessage");
            }
            PortNum::RoutingApp => {
                let routing = Routing::decode(data.payload.as_slice())?;
                info!(from = packet.from, ?routing, "received Routing");
            }
            port => {
                debug!(from = packet.from, ?port, "received unhandled app payload");
            }
        }
        Ok(())
    }

    fn update_node(&self, node_id: u32, mutate: impl FnOnce(&mut NodeInfo)) {
        self.state.lock().unwrap().node_db.update(node_id, mutate);
    }

    /// Stamp a fresh packet id on `packet`, wrap it in a service envelope
    /// for the primary channel and publish it gatewayed by this node.
    pub(crate) async fn send_packet(&self, mut packet: MeshPacket) -> Result<()> {
        packet.id = self.next_packet_id();

        let primary = self.channels.primary();
        let envelope = ServiceEnvelope {
            packet: Some(packet),
            channel_id: primary.name.clone(),
            gateway_id: self.cfg.node_id.to_string(),
        };
        let topic = format!(
            "{}/{}",
            self.mqtt.topic_for_channel(&primary.name),
            self.cfg.node_id
        );
        self.mqtt
            .publish(MqttMessage {
                topic,
                payload: envelope.encode_to_vec(),
            })
            .await
    }

    fn self_user(&self) -> User {
        User {
            id: self.cfg.node_id.to_string(),
            long_name: self.cfg.long_name.clone(),
            short_name: self.cfg.short_name.clone(),
            hw_model: HardwareModel::PrivateHw as i32,
        }
    }

    async fn broadcast_node_info(&self) -> Result<()> {
        info!("broadcasting NodeInfo");
        let payload = self.self_user().encode_to_vec();
        self.send_packet(MeshPacket {
            from: self.cfg.node_id.to_u32(),
            to: NodeId::BROADCAST.to_u32(),
            payload_variant: Some(mesh_packet::PayloadVariant::Decoded(Data {
                portnum: PortNum::NodeinfoApp as i32,
                payload,
                ..Default::default()
            })),
            ..Default::default()
        })
        .await
    }

    async fn broadcast_position(&self) -> Result<()> {
        info!("broadcasting Position");
        let position = Position {
            latitude_i: Some(self.cfg.lat_i),
            longitude_i: Some(self.cfg.lon_i),
            altitude: Some(self.cfg.altitude),
            time: unix_now(),
        };
        self.send_packet(MeshPacket {
            from: self.cfg.node_id.to_u32(),
            to: NodeId::BROADCAST.to_u32(),
            payload_variant: Some(mesh_packet::PayloadVariant::Decoded(Data {
                portnum: PortNum::PositionApp as i32,
                payload: position.encode_to_vec(),
                ..Default::default()
            })),
            ..Default::default()
        })
        .await
    }

    /// The configuration dump answering `WantConfigId`, in the order clients
    /// rely on: identity, metadata, the node database (this radio first),
    /// the primary channel, device config, completion echo.
    pub(crate) fn handshake_messages(&self, config_id: u32) -> Vec<FromRadio> {
        let mut nodes = self.state.lock().unwrap().node_db.snapshot();
        let self_num = self.cfg.node_id.to_u32();
        nodes.sort_by_key(|n| n.num != self_num);

        let mut messages = Vec::with_capacity(nodes.len() + 5);
        messages.push(from_radio_msg(from_radio::PayloadVariant::MyInfo(MyNodeInfo {
            my_node_num: self_num,
            reboot_count: 0,
            min_app_version: MIN_APP_VERSION,
        })));
        messages.push(from_radio_msg(from_radio::PayloadVariant::Metadata(
            DeviceMetadata {
                firmware_version: FIRMWARE_VERSION.to_string(),
                device_state_version: DEVICE_STATE_VERSION,
                can_shutdown: true,
                has_wifi: true,
                has_bluetooth: true,
                has_ethernet: false,
                hw_model: HardwareModel::PrivateHw as i32,
            },
        )));
        for node in nodes {
            messages.push(from_radio_msg(from_radio::PayloadVariant::NodeInfo(node)));
        }
        messages.push(from_radio_msg(from_radio::PayloadVariant::Channel(Channel {
            index: 0,
            settings: Some(ChannelSettings::default()),
            role: Role::Primary as i32,
        })));
        messages.push(from_radio_msg(from_radio::PayloadVariant::Config(Config {
            payload_variant: Some(config::PayloadVariant::Device(config::DeviceConfig {
                serial_enabled: true,
                node_info_broadcast_secs: self.cfg.node_info_interval.as_secs() as u32,
            })),
        })));
        messages.push(from_radio_msg(from_radio::PayloadVariant::ConfigCompleteId(
            config_id,
        )));
        messages
    }

    /// The reply to an admin `GetChannelRequest`.
    ///
    /// Deliberately reports channel 0 as `Disabled` even though the
    /// handshake advertises it as primary; stock clients depend on this
    /// exact shape to consider themselves connected.
    pub(crate) fn get_channel_response(&self, request_id: u32) -> FromRadio {
        let response = AdminMessage {
            payload_variant: Some(admin_message::PayloadVariant::GetChannelResponse(Channel {
                index: 0,
                settings: Some(ChannelSettings::default()),
                role: Role::Disabled as i32,
            })),
        };
        let self_num = self.cfg.node_id.to_u32();
        from_radio_msg(from_radio::PayloadVariant::Packet(MeshPacket {
            id: self.next_packet_id(),
            from: self_num,
            to: self_num,
            payload_variant: Some(mesh_packet::PayloadVariant::Decoded(Data {
                portnum: PortNum::AdminApp as i32,
                payload: response.encode_to_vec(),
                request_id,
                ..Default::default()
            })),
            ..Default::default()
        }))
    }
}

fn from_radio_msg(variant: from_radio::PayloadVariant) -> FromRadio {
    FromRadio {
        id: 0,
        payload_variant: Some(variant),
    }
}

#[derive(Clone, Copy, Debug)]
enum Beacon {
    NodeInfo,
    Position,
}

/// Broadcast one beacon kind forever, starting immediately. A failed
/// publish costs one tick, never the scheduler.
async fn beacon_loop(
    inner: Arc<RadioInner>,
    cancel: CancellationToken,
    period: Duration,
    beacon: Beacon,
) -> Result<()> {
    let mut ticker = tokio::time::interval(period);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            _ = ticker.tick() => {
                let result = match beacon {
                    Beacon::NodeInfo => inner.broadcast_node_info().await,
                    Beacon::Position => inner.broadcast_position().await,
                };
                if let Err(e) = result {
                    warn!(error = %e, ?beacon, "failed to broadcast beacon");
                }
            }
        }
    }
}

/// Accept stream clients until cancelled; every session gets its own task
/// and all of them are joined before the listener returns.
async fn listen_tcp(
    inner: Arc<RadioInner>,
    cancel: CancellationToken,
    addr: String,
) -> Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "listening for tcp connections");

    let mut sessions: JoinSet<()> = JoinSet::new();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!(peer = %peer, "accepted stream client");
                    let session_inner = Arc::clone(&inner);
                    let session_cancel = cancel.clone();
                    sessions.spawn(async move {
                        if let Err(e) = session::run(session_inner, stream, session_cancel).await {
                            warn!(error = %e, "session ended with error");
                        }
                    });
                }
                Err(e) => warn!(error = %e, "failed to accept connection"),
            },
            Some(_) = sessions.join_next(), if !sessions.is_empty() => {}
        }
    }

    while sessions.join_next().await.is_some() {}
    Ok(())
}
