//! Client side of the relay channel.
//!
//! The link is best-effort in both directions: outbound snapshots are
//! fire-and-forget, inbound updates arrive unordered and at most once.
//! When the relay is not running the client simply stays local-only.

use cast_proto::protocol::{ClientMessage, Message, PlayerState, RelayMessage, PROTOCOL_VERSION};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::event::AppEvent;

pub struct RelayLink {
    tx: mpsc::UnboundedSender<PlayerState>,
}

impl RelayLink {
    /// Dial the relay and start the reader/writer tasks.  Inbound sibling
    /// snapshots surface as [`AppEvent::Remote`] on `events`.
    pub async fn connect(
        addr: &str,
        events: mpsc::UnboundedSender<AppEvent>,
    ) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        info!("connected to relay at {}", addr);
        let (read_half, write_half) = stream.into_split();

        let (tx, rx) = mpsc::unbounded_channel::<PlayerState>();
        tokio::spawn(writer_task(write_half, rx));
        tokio::spawn(reader_task(read_half, events));

        Ok(Self { tx })
    }

    /// Channel the player broadcasts snapshots into.
    pub fn sender(&self) -> mpsc::UnboundedSender<PlayerState> {
        self.tx.clone()
    }
}

async fn writer_task(
    mut writer: tokio::net::tcp::OwnedWriteHalf,
    mut rx: mpsc::UnboundedReceiver<PlayerState>,
) {
    while let Some(state) = rx.recv().await {
        let msg = Message::Client(ClientMessage::PlayerState { state });
        let encoded = match msg.encode() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("failed to encode snapshot: {}", e);
                continue;
            }
        };
        if let Err(e) = writer.write_all(&encoded).await {
            warn!("relay write failed, going local-only: {}", e);
            break;
        }
    }
}

async fn reader_task(
    mut reader: tokio::net::tcp::OwnedReadHalf,
    events: mpsc::UnboundedSender<AppEvent>,
) {
    let mut tmp = [0u8; 4096];
    let mut buf: Vec<u8> = Vec::new();
    let mut greeted = false;

    loop {
        match reader.read(&mut tmp).await {
            Ok(0) => {
                info!("relay closed the connection");
                break;
            }
            Ok(n) => {
                buf.extend_from_slice(&tmp[..n]);
                loop {
                    if buf.len() < 4 {
                        break;
                    }
                    let frame_len =
                        u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
                    if buf.len() < 4 + frame_len {
                        break;
                    }
                    match Message::decode(&buf) {
                        Ok((msg, consumed)) => {
                            buf.drain(..consumed);
                            match msg {
                                Message::Relay(RelayMessage::Hello { protocol_version }) => {
                                    greeted = true;
                                    if protocol_version != PROTOCOL_VERSION {
                                        warn!(
                                            "relay speaks protocol {} but we speak {}, disconnecting",
                                            protocol_version, PROTOCOL_VERSION
                                        );
                                        let _ = events.send(AppEvent::RelayClosed);
                                        return;
                                    }
                                }
                                Message::Relay(RelayMessage::PlayerStateUpdate { state }) => {
                                    if !greeted {
                                        warn!("snapshot before HELLO, ignoring");
                                        continue;
                                    }
                                    let _ = events.send(AppEvent::Remote(state));
                                }
                                Message::Client(_) => {
                                    // Relays never send client messages.
                                }
                            }
                        }
                        Err(e) => {
                            warn!("dropping undecodable relay frame: {}", e);
                            buf.drain(..4 + frame_len);
                        }
                    }
                }
            }
            Err(e) => {
                warn!("relay read error: {}", e);
                break;
            }
        }
    }
    let _ = events.send(AppEvent::RelayClosed);
}
