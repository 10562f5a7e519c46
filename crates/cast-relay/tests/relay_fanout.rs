//! Integration tests for the relay fan-out.
//!
//! The relay promises unordered, at-most-once delivery to every connected
//! client except the publisher.  These tests drive a real listener on an
//! ephemeral loopback port.

use std::time::Duration;

use cast_proto::protocol::{ClientMessage, Message, PlayerState, RelayMessage, PROTOCOL_VERSION};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

const RECV_WINDOW: Duration = Duration::from_secs(2);
const SILENCE_WINDOW: Duration = Duration::from_millis(300);

struct TestClient {
    stream: TcpStream,
    buf: Vec<u8>,
}

impl TestClient {
    async fn connect(addr: std::net::SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let mut client = Self {
            stream,
            buf: Vec::new(),
        };
        // Every connection starts with a HELLO version gate.
        match client.recv().await {
            Message::Relay(RelayMessage::Hello { protocol_version }) => {
                assert_eq!(protocol_version, PROTOCOL_VERSION);
            }
            other => panic!("expected HELLO, got {:?}", other),
        }
        client
    }

    async fn send_state(&mut self, state: PlayerState) {
        let msg = Message::Client(ClientMessage::PlayerState { state });
        self.stream.write_all(&msg.encode().unwrap()).await.unwrap();
    }

    async fn recv(&mut self) -> Message {
        timeout(RECV_WINDOW, async {
            loop {
                if let Ok((msg, consumed)) = Message::decode(&self.buf) {
                    self.buf.drain(..consumed);
                    return msg;
                }
                let mut tmp = [0u8; 4096];
                let n = self.stream.read(&mut tmp).await.unwrap();
                assert_ne!(n, 0, "relay closed the connection");
                self.buf.extend_from_slice(&tmp[..n]);
            }
        })
        .await
        .expect("timed out waiting for a relay message")
    }

    /// Assert nothing arrives within a short window.
    async fn assert_silent(&mut self) {
        let mut tmp = [0u8; 16];
        let read = timeout(SILENCE_WINDOW, self.stream.read(&mut tmp)).await;
        assert!(
            read.is_err() || matches!(read, Ok(Ok(0))),
            "expected silence, but bytes arrived"
        );
    }
}

async fn start_relay() -> std::net::SocketAddr {
    let listener = cast_relay::socket::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    cast_relay::socket::start_server(listener);
    addr
}

fn snapshot(title: &str) -> PlayerState {
    PlayerState {
        src: format!("https://cdn.example.org/{title}.mp3"),
        title: title.to_string(),
        is_playing: true,
        ..PlayerState::default()
    }
}

#[tokio::test]
async fn siblings_receive_update_but_publisher_does_not() {
    let addr = start_relay().await;

    let mut publisher = TestClient::connect(addr).await;
    let mut sibling_a = TestClient::connect(addr).await;
    let mut sibling_b = TestClient::connect(addr).await;

    publisher.send_state(snapshot("morning-news")).await;

    for sibling in [&mut sibling_a, &mut sibling_b] {
        match sibling.recv().await {
            Message::Relay(RelayMessage::PlayerStateUpdate { state }) => {
                assert_eq!(state.title, "morning-news");
                assert!(state.is_playing);
            }
            other => panic!("expected PLAYER_STATE_UPDATE, got {:?}", other),
        }
    }

    publisher.assert_silent().await;
}

#[tokio::test]
async fn lone_client_broadcasts_into_the_void() {
    let addr = start_relay().await;
    let mut only = TestClient::connect(addr).await;

    only.send_state(snapshot("solo")).await;
    only.assert_silent().await;

    // The connection is still usable afterwards.
    only.send_state(snapshot("solo-again")).await;
    only.assert_silent().await;
}

#[tokio::test]
async fn relay_survives_a_disconnecting_client() {
    let addr = start_relay().await;

    let mut publisher = TestClient::connect(addr).await;
    let leaver = TestClient::connect(addr).await;
    let mut stayer = TestClient::connect(addr).await;

    drop(leaver);
    // Give the relay a moment to notice the closed socket.
    tokio::time::sleep(Duration::from_millis(100)).await;

    publisher.send_state(snapshot("still-here")).await;
    match stayer.recv().await {
        Message::Relay(RelayMessage::PlayerStateUpdate { state }) => {
            assert_eq!(state.title, "still-here");
        }
        other => panic!("expected PLAYER_STATE_UPDATE, got {:?}", other),
    }
}

#[tokio::test]
async fn undecodable_frame_is_dropped_not_fatal() {
    let addr = start_relay().await;

    let mut publisher = TestClient::connect(addr).await;
    let mut sibling = TestClient::connect(addr).await;

    // A well-framed but meaningless payload: length header + junk JSON.
    let junk = b"{\"kind\":\"NO_SUCH_KIND\"}";
    let mut frame = (junk.len() as u32).to_be_bytes().to_vec();
    frame.extend_from_slice(junk);
    publisher.stream.write_all(&frame).await.unwrap();

    // The relay drops the frame and keeps serving this client.
    publisher.send_state(snapshot("after-junk")).await;
    match sibling.recv().await {
        Message::Relay(RelayMessage::PlayerStateUpdate { state }) => {
            assert_eq!(state.title, "after-junk");
        }
        other => panic!("expected PLAYER_STATE_UPDATE, got {:?}", other),
    }
}
