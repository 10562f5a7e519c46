use cast_proto::protocol::{ClientMessage, Message, PlayerState, RelayMessage, PROTOCOL_VERSION};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// A snapshot in flight: which client sent it and its payload.  The relay
/// never inspects the state — it only fans it out.
#[derive(Debug, Clone)]
struct RelayedState {
    source: usize,
    state: PlayerState,
}

/// Depth of the fan-out queue per client.  A receiver that falls further
/// behind than this drops the missed snapshots; a newer one always follows.
const FANOUT_DEPTH: usize = 64;

pub async fn bind(addr: &str) -> anyhow::Result<TcpListener> {
    let listener = TcpListener::bind(addr).await?;
    info!("relay listening at {}", listener.local_addr()?);
    Ok(listener)
}

pub fn start_server(listener: TcpListener) -> tokio::task::JoinHandle<()> {
    tokio::spawn(run(listener))
}

/// Accept loop.  Each client gets its own fan-out subscription so a slow or
/// dead peer never stalls the others.
pub async fn run(listener: TcpListener) {
    let (fanout_tx, _) = broadcast::channel::<RelayedState>(FANOUT_DEPTH);

    let mut client_id = 0usize;
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                client_id += 1;
                let id = client_id;
                info!("client {} connected from {}", id, peer);

                // Subscribe before handing off so a snapshot published by an
                // earlier client cannot slip past a just-accepted one.
                let rx = fanout_tx.subscribe();
                let tx = fanout_tx.clone();
                tokio::spawn(async move {
                    handle_client(stream, id, tx, rx).await;
                    info!("client {} disconnected", id);
                });
            }
            Err(e) => {
                error!("failed to accept connection: {}", e);
            }
        }
    }
}

async fn handle_client(
    stream: TcpStream,
    client_id: usize,
    fanout_tx: broadcast::Sender<RelayedState>,
    mut fanout_rx: broadcast::Receiver<RelayedState>,
) {
    let (mut read_half, mut write_half) = stream.into_split();
    let mut tmp = [0u8; 4096];
    let mut read_buf: Vec<u8> = Vec::new();

    // Version gate on connect.  No state snapshot follows — the relay holds
    // none; clients restore from their durable store.
    let hello = Message::Relay(RelayMessage::Hello {
        protocol_version: PROTOCOL_VERSION,
    });
    if let Ok(encoded) = hello.encode() {
        if write_half.write_all(&encoded).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            result = read_half.read(&mut tmp) => {
                match result {
                    Ok(0) => {
                        info!("client {} closed connection", client_id);
                        break;
                    }
                    Ok(n) => {
                        read_buf.extend_from_slice(&tmp[..n]);

                        loop {
                            if read_buf.len() < 4 {
                                break;
                            }
                            let frame_len = u32::from_be_bytes([
                                read_buf[0], read_buf[1], read_buf[2], read_buf[3],
                            ]) as usize;
                            if read_buf.len() < 4 + frame_len {
                                break;
                            }
                            match Message::decode(&read_buf) {
                                Ok((Message::Client(ClientMessage::PlayerState { state }), consumed)) => {
                                    read_buf.drain(..consumed);
                                    // No receivers is fine — a lone client
                                    // broadcasts into the void.
                                    let _ = fanout_tx.send(RelayedState {
                                        source: client_id,
                                        state,
                                    });
                                }
                                Ok((_, consumed)) => {
                                    read_buf.drain(..consumed);
                                }
                                Err(e) => {
                                    warn!("client {}: dropping undecodable frame: {}", client_id, e);
                                    read_buf.drain(..4 + frame_len);
                                }
                            }
                        }
                    }
                    Err(e) => {
                        error!("read error from client {}: {}", client_id, e);
                        break;
                    }
                }
            }

            msg = fanout_rx.recv() => {
                match msg {
                    Ok(relayed) => {
                        // Never echo a snapshot back at its publisher.
                        if relayed.source == client_id {
                            continue;
                        }
                        let update = Message::Relay(RelayMessage::PlayerStateUpdate {
                            state: relayed.state,
                        });
                        if let Ok(encoded) = update.encode() {
                            if write_half.write_all(&encoded).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        // At-most-once: the missed snapshots are gone.
                        warn!("client {} missed {} snapshots", client_id, n);
                    }
                    Err(_) => break,
                }
            }
        }
    }
}
