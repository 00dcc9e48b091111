//! End-to-end tests for the emulated radio: a mock broker on one side, real
//! framed stream clients on the other.

use std::sync::Arc;
use std::time::Duration;

use prost::Message;
use tokio::io::{DuplexStream, ReadHalf, WriteHalf};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use fauxmesh_proto::{
    admin_message, channel::Role, config, from_radio, mesh_packet, to_radio, AdminMessage, Data,
    FromRadio, MeshPacket, PortNum, Position, ServiceEnvelope, ToRadio, User,
};
use fauxmesh_radio::crypto::{xor_crypt, DEFAULT_PSK};
use fauxmesh_radio::test_utils::MockMqttClient;
use fauxmesh_radio::{
    Channel, FrameReader, FrameWriter, NodeId, Radio, RadioConfig, RadioError, MIN_APP_VERSION,
};

const TEST_NODE: u32 = 0x1234_5678;
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

fn test_config() -> RadioConfig {
    RadioConfig::builder(NodeId::new(TEST_NODE))
        .channel(Channel::with_default_psk("LongFast"))
        .node_info_interval(Duration::from_secs(60))
        .build()
}

/// A framed stream client talking to an in-memory radio endpoint.
struct TestClient {
    reader: FrameReader<ReadHalf<DuplexStream>>,
    writer: FrameWriter<WriteHalf<DuplexStream>>,
}

impl TestClient {
    fn connect(radio: &Radio, cancel: &CancellationToken) -> Self {
        let (read_half, write_half) = tokio::io::split(radio.conn(cancel.clone()));
        Self {
            reader: FrameReader::new(read_half),
            writer: FrameWriter::new(write_half),
        }
    }

    async fn send(&mut self, msg: &ToRadio) {
        self.writer.write_frame(msg).await.expect("write frame");
    }

    async fn recv(&mut self) -> FromRadio {
        timeout(RECV_TIMEOUT, self.reader.read_frame())
            .await
            .expect("timed out waiting for a frame")
            .expect("read frame")
    }

    /// Request configuration and collect every message up to and including
    /// the completion echo.
    async fn handshake(&mut self, config_id: u32) -> Vec<FromRadio> {
        self.send(&ToRadio {
            payload_variant: Some(to_radio::PayloadVariant::WantConfigId(config_id)),
        })
        .await;

        let mut messages = Vec::new();
        loop {
            let msg = self.recv().await;
            let done = matches!(
                &msg.payload_variant,
                Some(from_radio::PayloadVariant::ConfigCompleteId(id)) if *id == config_id
            );
            messages.push(msg);
            if done {
                return messages;
            }
        }
    }
}

/// Start `run` in the background and wait until the broker subscriptions
/// exist, so injected messages cannot race the setup.
async fn start_radio(radio: &Radio, mqtt: &Arc<MockMqttClient>, cancel: &CancellationToken) {
    let run_radio = radio.clone();
    let run_cancel = cancel.clone();
    tokio::spawn(async move { run_radio.run(run_cancel).await });

    timeout(RECV_TIMEOUT, async {
        while mqtt.subscribed_channels().is_empty() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("radio never subscribed");
}

#[tokio::test]
async fn handshake_messages_arrive_in_order() {
    let radio = Radio::new(test_config(), Arc::new(MockMqttClient::new())).unwrap();
    let cancel = CancellationToken::new();
    let mut client = TestClient::connect(&radio, &cancel);

    let messages = client.handshake(0xCAFE).await;
    use from_radio::PayloadVariant as V;
    let variants: Vec<&V> = messages
        .iter()
        .map(|m| m.payload_variant.as_ref().unwrap())
        .collect();

    assert!(matches!(variants[0], V::MyInfo(info)
        if info.my_node_num == TEST_NODE && info.min_app_version == MIN_APP_VERSION));
    assert!(matches!(variants[1], V::Metadata(meta)
        if meta.firmware_version == "2.2.19-fake" && meta.device_state_version == 22));
    assert!(matches!(variants[2], V::NodeInfo(node) if node.num == TEST_NODE));
    assert!(matches!(variants[3], V::Channel(channel)
        if channel.index == 0 && channel.role == Role::Primary as i32));
    assert!(matches!(variants[4], V::Config(cfg) if matches!(
        &cfg.payload_variant,
        Some(config::PayloadVariant::Device(device)) if device.node_info_broadcast_secs == 60
    )));
    assert!(matches!(variants[5], V::ConfigCompleteId(0xCAFE)));
    assert_eq!(variants.len(), 6);

    cancel.cancel();
}

#[tokio::test]
async fn envelope_fans_out_to_every_session_once() {
    let mqtt = Arc::new(MockMqttClient::new());
    let radio = Radio::new(test_config(), mqtt.clone()).unwrap();
    let cancel = CancellationToken::new();
    start_radio(&radio, &mqtt, &cancel).await;

    let mut first = TestClient::connect(&radio, &cancel);
    let mut second = TestClient::connect(&radio, &cancel);
    // The completed handshake proves each session is registered.
    first.handshake(1).await;
    second.handshake(2).await;

    let envelope = ServiceEnvelope {
        packet: Some(MeshPacket {
            id: 4242,
            from: 0xBB,
            to: NodeId::BROADCAST.to_u32(),
            payload_variant: Some(mesh_packet::PayloadVariant::Decoded(Data {
                portnum: PortNum::TextMessageApp as i32,
                payload: b"hello mesh".to_vec(),
                ..Default::default()
            })),
            ..Default::default()
        }),
        channel_id: "LongFast".into(),
        gateway_id: "!000000bb".into(),
    };
    mqtt.inject("LongFast", envelope.encode_to_vec());

    for client in [&mut first, &mut second] {
        let msg = client.recv().await;
        let Some(from_radio::PayloadVariant::Packet(packet)) = msg.payload_variant else {
            panic!("expected a packet fan-out");
        };
        assert_eq!(packet.id, 4242);
    }

    // Exactly one delivery per session.
    let extra = timeout(Duration::from_millis(50), first.reader.read_frame::<FromRadio>()).await;
    assert!(extra.is_err(), "unexpected second delivery");

    cancel.cancel();
}

#[tokio::test]
async fn beacons_publish_node_info_on_the_primary_channel() {
    let mqtt = Arc::new(MockMqttClient::new());
    let config = RadioConfig::builder(NodeId::new(TEST_NODE))
        .channel(Channel::with_default_psk("LongFast"))
        .node_info_interval(Duration::from_millis(10))
        .build();
    let radio = Radio::new(config, mqtt.clone()).unwrap();
    let cancel = CancellationToken::new();
    start_radio(&radio, &mqtt, &cancel).await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();

    let published = mqtt.published();
    assert!(
        published.len() >= 5,
        "expected at least 5 beacons, got {}",
        published.len()
    );
    for msg in &published {
        assert_eq!(msg.topic, "msh/LongFast/!12345678");
        let envelope = ServiceEnvelope::decode(msg.payload.as_slice()).unwrap();
        assert_eq!(envelope.channel_id, "LongFast");
        assert_eq!(envelope.gateway_id, "!12345678");

        let packet = envelope.packet.unwrap();
        assert!(packet.id > 0);
        let Some(mesh_packet::PayloadVariant::Decoded(data)) = packet.payload_variant else {
            panic!("beacon payload should be cleartext");
        };
        assert_eq!(data.port(), PortNum::NodeinfoApp);
        let user = User::decode(data.payload.as_slice()).unwrap();
        assert_eq!(user.id, "!12345678");
    }

    // Packet ids are strictly monotonic across beacons.
    let ids: Vec<u32> = published
        .iter()
        .map(|m| {
            ServiceEnvelope::decode(m.payload.as_slice())
                .unwrap()
                .packet
                .unwrap()
                .id
        })
        .collect();
    assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
}

#[tokio::test]
async fn encrypted_position_updates_the_node_db() {
    let mqtt = Arc::new(MockMqttClient::new());
    let radio = Radio::new(test_config(), mqtt.clone()).unwrap();
    let cancel = CancellationToken::new();
    start_radio(&radio, &mqtt, &cancel).await;

    let position = Position {
        latitude_i: Some(515014760),
        longitude_i: Some(-1406340),
        altitude: Some(2),
        ..Default::default()
    };
    let data = Data {
        portnum: PortNum::PositionApp as i32,
        payload: position.encode_to_vec(),
        ..Default::default()
    };
    let ciphertext = xor_crypt(&data.encode_to_vec(), &DEFAULT_PSK, 1, 0xAA).unwrap();
    let envelope = ServiceEnvelope {
        packet: Some(MeshPacket {
            id: 1,
            from: 0xAA,
            to: NodeId::BROADCAST.to_u32(),
            payload_variant: Some(mesh_packet::PayloadVariant::Encrypted(ciphertext)),
            ..Default::default()
        }),
        channel_id: "LongFast".into(),
        gateway_id: "!000000aa".into(),
    };
    mqtt.inject("LongFast", envelope.encode_to_vec());

    let entry = radio
        .nodes()
        .into_iter()
        .find(|n| n.num == 0xAA)
        .expect("node 0xAA should be in the database");
    assert_eq!(entry.position.as_ref(), Some(&position));
    assert!(entry.last_heard > 0);

    cancel.cancel();
}

#[tokio::test]
async fn envelopes_on_other_channels_fan_out_but_skip_the_node_db() {
    let mqtt = Arc::new(MockMqttClient::new());
    let config = RadioConfig::builder(NodeId::new(TEST_NODE))
        .channel(Channel::with_default_psk("LongFast"))
        .channel(Channel::with_default_psk("LongSlow"))
        .build();
    let radio = Radio::new(config, mqtt.clone()).unwrap();
    let cancel = CancellationToken::new();
    start_radio(&radio, &mqtt, &cancel).await;
    timeout(RECV_TIMEOUT, async {
        while mqtt.subscribed_channels().len() < 2 {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("second channel never subscribed");
    assert_eq!(mqtt.subscribed_channels(), vec!["LongFast", "LongSlow"]);

    let mut client = TestClient::connect(&radio, &cancel);
    client.handshake(3).await;

    let user = User {
        id: "!000000cc".into(),
        long_name: "Secondary".into(),
        ..Default::default()
    };
    let envelope = ServiceEnvelope {
        packet: Some(MeshPacket {
            id: 9,
            from: 0xCC,
            payload_variant: Some(mesh_packet::PayloadVariant::Decoded(Data {
                portnum: PortNum::NodeinfoApp as i32,
                payload: user.encode_to_vec(),
                ..Default::default()
            })),
            ..Default::default()
        }),
        channel_id: "LongSlow".into(),
        gateway_id: "!000000cc".into(),
    };
    mqtt.inject("LongSlow", envelope.encode_to_vec());

    // The packet still reaches the client...
    let msg = client.recv().await;
    assert!(matches!(
        msg.payload_variant,
        Some(from_radio::PayloadVariant::Packet(p)) if p.id == 9
    ));
    // ...but only primary-channel traffic feeds the node database.
    assert!(radio.nodes().iter().all(|n| n.num != 0xCC));

    cancel.cancel();
}

#[tokio::test]
async fn get_channel_request_is_answered_with_the_request_id() {
    let radio = Radio::new(test_config(), Arc::new(MockMqttClient::new())).unwrap();
    let cancel = CancellationToken::new();
    let mut client = TestClient::connect(&radio, &cancel);

    let admin = AdminMessage {
        payload_variant: Some(admin_message::PayloadVariant::GetChannelRequest(1)),
    };
    client
        .send(&ToRadio {
            payload_variant: Some(to_radio::PayloadVariant::Packet(MeshPacket {
                id: 77,
                from: TEST_NODE,
                to: TEST_NODE,
                payload_variant: Some(mesh_packet::PayloadVariant::Decoded(Data {
                    portnum: PortNum::AdminApp as i32,
                    payload: admin.encode_to_vec(),
                    ..Default::default()
                })),
                ..Default::default()
            })),
        })
        .await;

    let msg = client.recv().await;
    let Some(from_radio::PayloadVariant::Packet(packet)) = msg.payload_variant else {
        panic!("expected a packet reply");
    };
    let Some(mesh_packet::PayloadVariant::Decoded(data)) = packet.payload_variant else {
        panic!("expected a decoded reply");
    };
    assert_eq!(data.port(), PortNum::AdminApp);
    assert_eq!(data.request_id, 77);

    let admin = AdminMessage::decode(data.payload.as_slice()).unwrap();
    let Some(admin_message::PayloadVariant::GetChannelResponse(channel)) = admin.payload_variant
    else {
        panic!("expected GetChannelResponse");
    };
    assert_eq!(channel.index, 0);
    assert_eq!(channel.role, Role::Disabled as i32);

    cancel.cancel();
}

#[tokio::test]
async fn client_packets_are_published_to_the_mesh() {
    let mqtt = Arc::new(MockMqttClient::new());
    let radio = Radio::new(test_config(), mqtt.clone()).unwrap();
    let cancel = CancellationToken::new();
    start_radio(&radio, &mqtt, &cancel).await;

    let mut client = TestClient::connect(&radio, &cancel);
    client.handshake(5).await;

    client
        .send(&ToRadio {
            payload_variant: Some(to_radio::PayloadVariant::Packet(MeshPacket {
                from: TEST_NODE,
                to: 0x9147_3062,
                payload_variant: Some(mesh_packet::PayloadVariant::Decoded(Data {
                    portnum: PortNum::TextMessageApp as i32,
                    payload: b"from the client".to_vec(),
                    ..Default::default()
                })),
                ..Default::default()
            })),
        })
        .await;

    timeout(RECV_TIMEOUT, async {
        while mqtt.published().is_empty() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("client packet never published");

    let published = mqtt.published();
    let envelope = ServiceEnvelope::decode(published[0].payload.as_slice()).unwrap();
    assert_eq!(envelope.channel_id, "LongFast");
    assert_eq!(envelope.gateway_id, "!12345678");
    let packet = envelope.packet.unwrap();
    assert!(packet.id > 0);
    assert_eq!(packet.to, 0x9147_3062);

    cancel.cancel();
}

#[tokio::test]
async fn disconnect_closes_the_stream() {
    let radio = Radio::new(test_config(), Arc::new(MockMqttClient::new())).unwrap();
    let cancel = CancellationToken::new();
    let mut client = TestClient::connect(&radio, &cancel);
    client.handshake(6).await;

    client
        .send(&ToRadio {
            payload_variant: Some(to_radio::PayloadVariant::Disconnect(true)),
        })
        .await;

    let result = timeout(RECV_TIMEOUT, client.reader.read_frame::<FromRadio>())
        .await
        .expect("radio never closed the stream");
    assert!(matches!(result, Err(RadioError::StreamClosed)));

    cancel.cancel();
}

#[tokio::test]
async fn malformed_frames_do_not_kill_the_session() {
    use tokio::io::AsyncWriteExt;

    let radio = Radio::new(test_config(), Arc::new(MockMqttClient::new())).unwrap();
    let cancel = CancellationToken::new();

    let (read_half, mut write_half) = tokio::io::split(radio.conn(cancel.clone()));
    let mut reader = FrameReader::new(read_half);

    // Debug noise, then a well-formed frame whose payload is not a valid
    // ToRadio, then real traffic.
    write_half.write_all(b"DEBUG spurious output\r\n").await.unwrap();
    write_half
        .write_all(&fauxmesh_radio::framing::frame_payload(&[0x1A, 0xFF]))
        .await
        .unwrap();
    let mut writer = FrameWriter::new(write_half);
    writer
        .write_frame(&ToRadio {
            payload_variant: Some(to_radio::PayloadVariant::WantConfigId(0xBEEF)),
        })
        .await
        .unwrap();

    // The handshake still completes.
    let first = timeout(RECV_TIMEOUT, reader.read_frame::<FromRadio>())
        .await
        .expect("timed out")
        .expect("read frame");
    assert!(matches!(
        first.payload_variant,
        Some(from_radio::PayloadVariant::MyInfo(_))
    ));

    cancel.cancel();
}

#[tokio::test]
async fn cancellation_stops_the_radio() {
    let mqtt = Arc::new(MockMqttClient::new());
    let config = RadioConfig::builder(NodeId::new(TEST_NODE))
        .channel(Channel::with_default_psk("LongFast"))
        .node_info_interval(Duration::from_secs(3600))
        .position_interval(Duration::from_secs(3600))
        .build();
    let radio = Radio::new(config, mqtt.clone()).unwrap();

    let cancel = CancellationToken::new();
    let run_radio = radio.clone();
    let run_cancel = cancel.clone();
    let handle = tokio::spawn(async move { run_radio.run(run_cancel).await });

    // Both schedulers fire immediately on startup.
    timeout(RECV_TIMEOUT, async {
        while mqtt.published().len() < 2 {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("startup beacons never published");

    cancel.cancel();
    let result = timeout(RECV_TIMEOUT, handle)
        .await
        .expect("run did not return after cancellation")
        .expect("run task panicked");
    assert!(result.is_ok());
}
