//! The player core: owns the live `PlayerState`, persists it, and forwards
//! snapshots to sibling clients through the relay.
//!
//! Consistency model: the snapshot in the store is last-write-wins, sibling
//! copies are independent, and an open player ignores inbound sibling
//! updates entirely.  Every mutating action and a periodic tick call
//! [`save`](Player::save); persistence errors are logged and swallowed —
//! saving must never disturb playback.

use cast_proto::protocol::{Episode, PlayerState};
use cast_proto::store::StateStore;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::audio::AudioBackend;

const UNKNOWN_EPISODE: &str = "Unknown episode";

pub struct Player {
    state: PlayerState,
    /// True while the player bar is open in this client.
    visible: bool,
    store: StateStore<PlayerState>,
    backend: Box<dyn AudioBackend>,
    /// Relay forwarding channel; `None` when running local-only.
    relay: Option<mpsc::UnboundedSender<PlayerState>>,
}

impl Player {
    pub fn new(
        store: StateStore<PlayerState>,
        backend: Box<dyn AudioBackend>,
        relay: Option<mpsc::UnboundedSender<PlayerState>>,
    ) -> Self {
        Self {
            state: PlayerState::default(),
            visible: false,
            store,
            backend,
            relay,
        }
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        self.visible
    }

    pub fn position(&self) -> f64 {
        self.backend.position()
    }

    pub fn is_paused(&self) -> bool {
        self.backend.is_paused()
    }

    // ── save / restore / close ───────────────────────────────────────────────

    /// Snapshot live playback values, persist, and broadcast.  A no-op until
    /// the first playback action opens the player.
    pub fn save(&mut self) {
        if !self.visible {
            return;
        }
        self.state.current_time = self.backend.position();
        self.state.is_playing = !self.backend.is_paused();

        if let Err(e) = self.store.save(&self.state) {
            warn!("failed to persist player state: {}", e);
        }
        if let Some(relay) = &self.relay {
            let _ = relay.send(self.state.clone());
        }
    }

    /// Rehydrate from an explicit snapshot or, absent one, the durable
    /// store.  A missing, empty, or unreadable snapshot is a no-op.
    pub fn restore(&mut self, state: Option<PlayerState>) {
        let Some(mut state) = state.or_else(|| self.store.load()) else {
            return;
        };
        if state.src.is_empty() {
            return;
        }
        state.validate_selection();

        if let Err(e) = self.backend.load(&state.src) {
            warn!("failed to load media for restore: {}", e);
        }
        self.backend.seek(state.current_time);

        let resume = state.is_playing;
        self.state = state;
        self.visible = true;

        if resume {
            // Resume is attempted, not guaranteed.
            if let Err(e) = self.backend.play() {
                info!("resume prevented: {}", e);
            }
        }
    }

    /// A sibling client's snapshot arrived.  Applied only while the local
    /// player is closed; an open player keeps its own state.
    pub fn apply_remote(&mut self, state: PlayerState) {
        if self.visible {
            return;
        }
        self.restore(Some(state));
    }

    /// Stop playback, hide the bar, and delete the durable snapshot.
    pub fn close(&mut self) {
        self.backend.pause();
        self.backend.stop();
        self.visible = false;
        self.state = PlayerState::default();
        self.store.clear();
    }

    // ── playback actions ─────────────────────────────────────────────────────

    /// Play episode `index` of the current list.
    pub fn play_episode(&mut self, index: usize) {
        let Some(episode) = self.state.episodes.get(index) else {
            warn!("play_episode: index {} out of range", index);
            return;
        };
        let url = episode.audio_url.clone();
        let title = episode.title.clone();
        self.state.episode_index = Some(index);
        self.start_playback(&url, &title);
    }

    /// Play a bare URL outside any list; prev/next stay disabled.
    pub fn play_standalone(&mut self, url: &str, title: Option<&str>) {
        if url.is_empty() {
            warn!("play_standalone: no url given");
            return;
        }
        self.state.episode_index = None;
        let title = title.unwrap_or(UNKNOWN_EPISODE).to_string();
        self.start_playback(url, &title);
    }

    /// Adopt a freshly loaded episode list and play the entry matching
    /// `audio_url`.  An empty list or a URL not present in it degrades to
    /// standalone playback.
    pub fn play_from_list(
        &mut self,
        podcast_id: &str,
        episodes: Vec<Episode>,
        audio_url: &str,
        title: Option<&str>,
    ) {
        self.state.podcast_id = Some(podcast_id.to_string());

        if episodes.is_empty() {
            warn!("no episodes available, playing as standalone");
            self.state.episodes.clear();
            self.play_standalone(audio_url, title);
            return;
        }

        self.state.episodes = episodes;
        match self
            .state
            .episodes
            .iter()
            .position(|e| e.audio_url == audio_url)
        {
            Some(index) => self.play_episode(index),
            None => {
                warn!("episode not found in list, playing as standalone");
                self.play_standalone(audio_url, title);
            }
        }
    }

    /// Adopt a list and play its most recent entry.  Returns false when the
    /// list is empty so the caller can fall back to the legacy endpoint.
    pub fn play_latest(&mut self, podcast_id: &str, episodes: Vec<Episode>) -> bool {
        if episodes.is_empty() {
            return false;
        }
        self.state.podcast_id = Some(podcast_id.to_string());
        self.state.episodes = episodes;
        self.play_episode(0);
        true
    }

    pub fn play_prev(&mut self) {
        if let Some(index) = self.state.episode_index {
            if self.state.has_prev() {
                self.play_episode(index - 1);
            }
        }
    }

    pub fn play_next(&mut self) {
        if let Some(index) = self.state.episode_index {
            if self.state.has_next() {
                self.play_episode(index + 1);
            }
        }
    }

    /// Pause/resume toggle.  Both directions trigger a save, like the
    /// play/pause events they mirror.
    pub fn toggle_pause(&mut self) {
        if !self.visible {
            return;
        }
        if self.backend.is_paused() {
            if let Err(e) = self.backend.play() {
                info!("playback refused: {}", e);
            }
        } else {
            self.backend.pause();
        }
        self.save();
    }

    pub fn toggle_minimized(&mut self) {
        if !self.visible {
            return;
        }
        self.state.is_minimized = !self.state.is_minimized;
        self.save();
    }

    pub fn set_description(&mut self, html: Option<String>) {
        self.state.description =
            Some(html.unwrap_or_else(|| "<em>No description available</em>".to_string()));
    }

    pub fn set_cover(&mut self, url: &str) {
        if !url.is_empty() {
            self.state.cover_image = Some(url.to_string());
        }
    }

    fn start_playback(&mut self, url: &str, title: &str) {
        if let Err(e) = self.backend.load(url) {
            warn!("failed to load media: {}", e);
        }
        self.state.src = url.to_string();
        self.state.title = title.to_string();
        self.state.current_time = 0.0;
        self.state.description = None;
        self.visible = true;

        if let Err(e) = self.backend.play() {
            // The engine may refuse until it is ready; not surfaced.
            info!("playback refused: {}", e);
        }
        self.save();
    }
}
