use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current protocol version.  Bump this when the wire format changes in a
/// breaking way.  Clients check this against the relay's HELLO on connect and
/// refuse to talk to an incompatible relay.
pub const PROTOCOL_VERSION: u32 = 1;

/// One playable episode, as the player consumes it.  The sync layer treats
/// the list as an opaque snapshot; ordering is the loader's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub title: String,
    /// Publication date, normalized to UTC.  Unparseable upstream dates are
    /// pinned to the Unix epoch so they sort last.
    pub date: DateTime<Utc>,
    /// Canonical media URL (`episode_raw_url` when the upstream payload has
    /// it, `audio_url` otherwise).
    pub audio_url: String,
    /// Upstream episode identifier; keys description fetches.
    #[serde(default)]
    pub ilpost_id: Option<String>,
    #[serde(default)]
    pub duration_secs: Option<u32>,
}

/// The serializable snapshot of playback/UI state.  Persisted under the
/// `player_state` slice and broadcast to sibling clients through the relay.
///
/// Serialized field names match the historical `playerState` JSON blob.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub current_time: f64,
    pub src: String,
    pub title: String,
    #[serde(default)]
    pub podcast_id: Option<String>,
    /// `None` means no current selection: either nothing is loaded or a
    /// standalone URL outside any list is playing (prev/next disabled).
    #[serde(default)]
    pub episode_index: Option<usize>,
    #[serde(default)]
    pub episodes: Vec<Episode>,
    pub is_playing: bool,
    pub is_minimized: bool,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub background_image: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl PlayerState {
    /// True when a list selection exists and points inside `episodes`.
    pub fn has_selection(&self) -> bool {
        matches!(self.episode_index, Some(i) if i < self.episodes.len())
    }

    /// Drop an out-of-range selection.  Snapshots cross process boundaries,
    /// so the index invariant is re-established on every restore.
    pub fn validate_selection(&mut self) {
        if let Some(i) = self.episode_index {
            if i >= self.episodes.len() {
                self.episode_index = None;
            }
        }
    }

    pub fn has_prev(&self) -> bool {
        matches!(self.episode_index, Some(i) if i > 0 && !self.episodes.is_empty())
    }

    pub fn has_next(&self) -> bool {
        matches!(self.episode_index, Some(i) if i + 1 < self.episodes.len())
    }
}

/// Messages sent from a client to the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ClientMessage {
    /// Broadcast request: the sender's full state snapshot, to be forwarded
    /// to every other connected client.
    #[serde(rename = "PLAYER_STATE")]
    PlayerState { state: PlayerState },
}

/// Messages sent from the relay to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum RelayMessage {
    /// Sent once on connect.  Version gate only — the relay holds no state
    /// and replays nothing; restore-on-startup comes from the durable store.
    #[serde(rename = "HELLO")]
    Hello { protocol_version: u32 },
    /// A sibling client's snapshot.  Unordered, at-most-once; no ack.
    #[serde(rename = "PLAYER_STATE_UPDATE")]
    PlayerStateUpdate { state: PlayerState },
}

/// Wrapper for socket communication.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    Client(ClientMessage),
    Relay(RelayMessage),
}

impl Message {
    pub fn encode(&self) -> anyhow::Result<Vec<u8>> {
        let json = serde_json::to_vec(self)?;
        let len = json.len() as u32;
        let mut result = Vec::with_capacity(4 + json.len());
        result.extend_from_slice(&len.to_be_bytes());
        result.extend_from_slice(&json);
        Ok(result)
    }

    pub fn decode(data: &[u8]) -> anyhow::Result<(Self, usize)> {
        if data.len() < 4 {
            anyhow::bail!("Insufficient data for length header");
        }
        let len = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
        if data.len() < 4 + len {
            anyhow::bail!("Insufficient data for message");
        }
        let msg: Self = serde_json::from_slice(&data[4..4 + len])?;
        Ok((msg, 4 + len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> PlayerState {
        PlayerState {
            current_time: 12.5,
            src: "https://cdn.example.org/ep1.mp3".into(),
            title: "Episode one".into(),
            podcast_id: Some("42".into()),
            episode_index: Some(0),
            episodes: vec![Episode {
                title: "Episode one".into(),
                date: Utc::now(),
                audio_url: "https://cdn.example.org/ep1.mp3".into(),
                ilpost_id: Some("ep-1".into()),
                duration_secs: Some(1800),
            }],
            is_playing: true,
            is_minimized: false,
            cover_image: None,
            background_image: None,
            description: None,
        }
    }

    #[test]
    fn test_message_encode_decode() {
        let msg = Message::Client(ClientMessage::PlayerState {
            state: sample_state(),
        });
        let encoded = msg.encode().unwrap();
        let (decoded, len) = Message::decode(&encoded).unwrap();
        assert_eq!(len, encoded.len());
        match decoded {
            Message::Client(ClientMessage::PlayerState { state }) => {
                assert_eq!(state.episode_index, Some(0));
                assert_eq!(state.episodes.len(), 1);
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_update_encode_decode() {
        let msg = Message::Relay(RelayMessage::PlayerStateUpdate {
            state: sample_state(),
        });
        let encoded = msg.encode().unwrap();
        let (decoded, _) = Message::decode(&encoded).unwrap();
        match decoded {
            Message::Relay(RelayMessage::PlayerStateUpdate { state }) => {
                assert_eq!(state.src, "https://cdn.example.org/ep1.mp3");
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_wire_kind_names() {
        let msg = Message::Client(ClientMessage::PlayerState {
            state: PlayerState::default(),
        });
        let encoded = msg.encode().unwrap();
        let body = std::str::from_utf8(&encoded[4..]).unwrap();
        assert!(body.contains("\"kind\":\"PLAYER_STATE\""));

        let msg = Message::Relay(RelayMessage::Hello {
            protocol_version: PROTOCOL_VERSION,
        });
        let body = msg.encode().unwrap();
        let body = std::str::from_utf8(&body[4..]).unwrap();
        assert!(body.contains("\"kind\":\"HELLO\""));
    }

    #[test]
    fn test_decode_partial_frame() {
        let msg = Message::Relay(RelayMessage::Hello {
            protocol_version: PROTOCOL_VERSION,
        });
        let encoded = msg.encode().unwrap();
        assert!(Message::decode(&encoded[..2]).is_err());
        assert!(Message::decode(&encoded[..encoded.len() - 1]).is_err());
    }

    #[test]
    fn test_selection_invariant() {
        let mut state = sample_state();
        state.episode_index = Some(7);
        state.validate_selection();
        assert_eq!(state.episode_index, None);
        assert!(!state.has_prev());
        assert!(!state.has_next());

        let mut state = sample_state();
        state.validate_selection();
        assert_eq!(state.episode_index, Some(0));
    }

    #[test]
    fn test_prev_next_boundaries() {
        let mut state = sample_state();
        let mut second = state.episodes[0].clone();
        second.title = "Episode two".into();
        state.episodes.push(second);

        state.episode_index = Some(0);
        assert!(!state.has_prev());
        assert!(state.has_next());

        state.episode_index = Some(1);
        assert!(state.has_prev());
        assert!(!state.has_next());

        state.episode_index = None;
        assert!(!state.has_prev());
        assert!(!state.has_next());
    }
}
