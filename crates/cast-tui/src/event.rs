//! Events and actions flowing through the app loop.
//!
//! All external inputs — keys, relay messages, finished fetches, the save
//! tick — funnel into one `AppEvent` queue consumed by the single-owner
//! event loop.  Panes never mutate shared state; they return `Action`s.

use cast_proto::protocol::{Episode, PlayerState};
use crossterm::event::KeyEvent;

use crate::api::Podcast;

/// Why an episode list was requested; decides what happens when it lands.
#[derive(Debug, Clone)]
pub enum LoadIntent {
    /// Browsing into a podcast: show the episode pane.
    Browse,
    /// A play action: find `audio_url` in the list and play it.
    PlayUrl {
        audio_url: String,
        title: Option<String>,
    },
    /// The latest-episode action: play index 0, legacy fallback when empty.
    PlayLatest,
    /// Reload after a refresh/update completed; keep the current view.
    Reload,
}

#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    /// Periodic snapshot tick.
    Tick,
    /// A sibling client's snapshot, via the relay.
    Remote(PlayerState),
    RelayClosed,
    PodcastsLoaded {
        token: u64,
        podcasts: Vec<Podcast>,
    },
    EpisodesLoaded {
        /// Request generation; stale completions are discarded.
        generation: u64,
        token: u64,
        podcast_id: String,
        episodes: Vec<Episode>,
        intent: LoadIntent,
    },
    DescriptionLoaded {
        token: u64,
        episode_id: String,
        /// `None` when the episode has no description.
        html: Option<String>,
        failed: bool,
    },
    UpdateFinished {
        token: u64,
        podcast_id: String,
        success: bool,
    },
    RefreshFinished {
        token: u64,
        podcast_id: String,
        success: bool,
    },
    /// Legacy `/last` fallback resolved (or not).
    LatestResolved {
        token: u64,
        podcast_id: String,
        url: Option<String>,
    },
}

/// User intents produced by panes and dispatched by the app.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    OpenPodcast(usize),
    PlayLatestOf(usize),
    Back,
    PlayEpisode(usize),
    ToggleDescription(usize),
    ToggleShowMore,
    RefreshEpisode(usize),
    SearchChanged(String),
    PlayPause,
    NextEpisode,
    PrevEpisode,
    ClosePlayer,
    ToggleMinimize,
    CycleTheme,
    CopyEpisodeUrl,
    Quit,
    Noop,
}
