//! Per-client stream sessions.
//!
//! Each accepted stream runs two tasks until either exits: a reader decoding
//! `ToRadio` frames and a writer draining the session's outbound queue. The
//! queue is the only path to the stream's write half; handshake and admin
//! replies from the reader go through it too, so client-observed ordering is
//! the enqueue order.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use prost::Message;

use fauxmesh_proto::{
    admin_message, to_radio, AdminMessage, FromRadio, MeshPacket, PortNum, ToRadio,
};

use crate::error::{RadioError, Result};
use crate::framing::{FrameReader, FrameWriter};
use crate::radio::RadioInner;

/// Drive one client session to completion.
///
/// The subscriber registration is removed when the session ends, however it
/// ends; cancellation tears down both halves.
pub(crate) async fn run<S>(
    radio: Arc<RadioInner>,
    stream: S,
    cancel: CancellationToken,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let (subscriber_id, replies, mut outbound) = radio.register_subscriber();

    let result = tokio::select! {
        r = reader_loop(&radio, read_half, &replies) => r,
        r = writer_loop(write_half, &mut outbound) => r,
        _ = cancel.cancelled() => Ok(()),
    };

    radio.remove_subscriber(subscriber_id);
    result
}

async fn reader_loop<R: AsyncRead + Unpin>(
    radio: &RadioInner,
    reader: R,
    replies: &mpsc::Sender<FromRadio>,
) -> Result<()> {
    let mut frames = FrameReader::new(reader);
    loop {
        let msg: ToRadio = match frames.read_frame().await {
            Ok(msg) => msg,
            Err(RadioError::StreamClosed) => return Ok(()),
            Err(e) if e.is_frame_recoverable() => {
                warn!(error = %e, "dropping undecodable frame");
                continue;
            }
            Err(e) => return Err(e),
        };

        match msg.payload_variant {
            Some(to_radio::PayloadVariant::Disconnect(_)) => {
                // Clients expect the radio to close the stream on disconnect.
                info!("client disconnected");
                return Ok(());
            }
            Some(to_radio::PayloadVariant::WantConfigId(config_id)) => {
                debug!(config_id, "client requested configuration");
                for reply in radio.handshake_messages(config_id) {
                    replies
                        .send(reply)
                        .await
                        .map_err(|_| RadioError::ChannelClosed)?;
                }
            }
            Some(to_radio::PayloadVariant::Packet(packet)) => {
                handle_packet(radio, packet, replies).await?;
            }
            // Heartbeats and future variants are ignored.
            _ => {}
        }
    }
}

async fn writer_loop<W: AsyncWrite + Unpin>(
    writer: W,
    outbound: &mut mpsc::Receiver<FromRadio>,
) -> Result<()> {
    let mut frames = FrameWriter::new(writer);
    while let Some(msg) = outbound.recv().await {
        frames.write_frame(&msg).await?;
    }
    Ok(())
}

/// Dispatch a packet the client handed us: admin requests are answered on
/// the stream, anything else goes out over the mesh.
async fn handle_packet(
    radio: &RadioInner,
    packet: MeshPacket,
    replies: &mpsc::Sender<FromRadio>,
) -> Result<()> {
    let decoded_admin = match &packet.payload_variant {
        Some(fauxmesh_proto::mesh_packet::PayloadVariant::Decoded(data))
            if data.port() == PortNum::AdminApp =>
        {
            match AdminMessage::decode(data.payload.as_slice()) {
                Ok(admin) => Some(admin),
                Err(e) => {
                    warn!(error = %e, "dropping undecodable admin message");
                    return Ok(());
                }
            }
        }
        _ => None,
    };

    let Some(admin) = decoded_admin else {
        // A mesh-bound packet from the client; publish failures only cost
        // this one packet.
        if let Err(e) = radio.send_packet(packet).await {
            warn!(error = %e, "failed to publish client packet");
        }
        return Ok(());
    };

    match admin.payload_variant {
        Some(admin_message::PayloadVariant::GetChannelRequest(index)) => {
            info!(index, request_id = packet.id, "answering GetChannelRequest");
            let reply = radio.get_channel_response(packet.id);
            replies
                .send(reply)
                .await
                .map_err(|_| RadioError::ChannelClosed)?;
        }
        other => {
            debug!(?other, "ignoring unhandled admin request");
        }
    }
    Ok(())
}
