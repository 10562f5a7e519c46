//! App — single-owner event loop for all mutable state.
//!
//! Every external input funnels into one `AppEvent` queue: key presses,
//! relay messages, finished fetches, and the periodic save tick.  Panes
//! return `Action`s; only this loop mutates state.  Episode-list fetches
//! carry a generation token so a superseded response can never overwrite
//! newer state — requests themselves are never cancelled.

use std::time::Duration;

use cast_proto::store::StateStore;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Paragraph},
    DefaultTerminal, Frame,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::{Podcast, PodcastApi};
use crate::components::directory::DirectoryPane;
use crate::components::episode_list::EpisodePane;
use crate::components::player_bar;
use crate::descriptions::{Descriptions, FetchDecision};
use crate::event::{Action, AppEvent, LoadIntent};
use crate::loading::{LoadingTracker, UpdatePhase, UpdateStatus};
use crate::player::Player;
use crate::theme::Theme;
use crate::widgets::loading_bar;

/// Persisted UI preferences.  Like the old theme cookie, the record expires:
/// entries older than a year fall back to the default.
#[derive(Debug, Serialize, Deserialize)]
pub struct UiPrefs {
    pub theme: String,
}

pub const PREFS_MAX_AGE: Duration = Duration::from_secs(365 * 24 * 60 * 60);

const NO_DESCRIPTION: &str = "<em>No description available</em>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Directory,
    Episodes,
}

pub struct App {
    api: PodcastApi,
    player: Player,
    descriptions: Descriptions,
    fetch_bar: LoadingTracker,
    update_status: UpdateStatus,
    theme: Theme,
    prefs_store: StateStore<UiPrefs>,
    podcasts: Vec<Podcast>,
    directory: DirectoryPane,
    episode_pane: EpisodePane,
    view: View,
    /// Generation of the newest episode-list request; stale completions are
    /// discarded instead of applied.
    episode_generation: u64,
    status_line: Option<String>,
    events_tx: mpsc::UnboundedSender<AppEvent>,
    should_quit: bool,
}

impl App {
    pub fn new(
        api: PodcastApi,
        player: Player,
        prefs_store: StateStore<UiPrefs>,
        theme: Theme,
        events_tx: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            api,
            player,
            descriptions: Descriptions::default(),
            fetch_bar: LoadingTracker::default(),
            update_status: UpdateStatus::default(),
            theme,
            prefs_store,
            podcasts: Vec::new(),
            directory: DirectoryPane::new(),
            episode_pane: EpisodePane::new(),
            view: View::Directory,
            episode_generation: 0,
            status_line: None,
            events_tx,
            should_quit: false,
        }
    }

    pub async fn run(
        mut self,
        mut events_rx: mpsc::UnboundedReceiver<AppEvent>,
        mut terminal: DefaultTerminal,
    ) -> anyhow::Result<()> {
        self.spawn_podcast_load();
        // Pick up where any client of this machine left off.
        self.player.restore(None);

        loop {
            terminal.draw(|frame| self.draw(frame))?;

            let Some(event) = events_rx.recv().await else {
                break;
            };
            self.handle_event(event);

            // Coalesce whatever else is already queued before redrawing.
            while let Ok(event) = events_rx.try_recv() {
                self.handle_event(event);
            }

            if self.should_quit {
                break;
            }
        }

        // Final snapshot on the way out.
        self.player.save();
        Ok(())
    }

    // ── event handling ───────────────────────────────────────────────────────

    fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Key(key) => self.handle_key(key),
            AppEvent::Tick => self.player.save(),
            AppEvent::Remote(state) => self.player.apply_remote(state),
            AppEvent::RelayClosed => {
                info!("relay link closed, running local-only");
            }
            AppEvent::PodcastsLoaded { token, podcasts } => {
                self.fetch_bar.finish(token);
                if podcasts.is_empty() {
                    self.status_line = Some("No podcasts available".to_string());
                }
                self.podcasts = podcasts;
                self.directory.refresh(&self.podcasts);
            }
            AppEvent::EpisodesLoaded {
                generation,
                token,
                podcast_id,
                episodes,
                intent,
            } => {
                self.fetch_bar.finish(token);
                if generation != self.episode_generation {
                    debug!("dropping stale episode list (generation {})", generation);
                    return;
                }
                self.on_episodes_loaded(podcast_id, episodes, intent);
            }
            AppEvent::DescriptionLoaded {
                token,
                episode_id,
                html,
                failed,
            } => {
                self.fetch_bar.finish(token);
                self.on_description_loaded(&episode_id, html, failed);
            }
            AppEvent::UpdateFinished {
                token,
                podcast_id,
                success,
            } => {
                self.fetch_bar.finish(token);
                if success {
                    self.update_status.episodes_progress(1);
                    self.spawn_episode_load(podcast_id, LoadIntent::Reload);
                } else {
                    self.update_status.add_error("Error updating episodes");
                    self.update_status.finish();
                    self.status_line = Some("Error updating episodes".to_string());
                }
            }
            AppEvent::RefreshFinished {
                token,
                podcast_id,
                success,
            } => {
                self.fetch_bar.finish(token);
                if success {
                    self.spawn_episode_load(podcast_id, LoadIntent::Reload);
                } else {
                    self.status_line = Some("Error refreshing the episode".to_string());
                }
            }
            AppEvent::LatestResolved {
                token,
                podcast_id,
                url,
            } => {
                self.fetch_bar.finish(token);
                match url {
                    Some(url) => {
                        let title = self
                            .podcasts
                            .iter()
                            .find(|p| p.id == podcast_id)
                            .map(|p| p.title.clone());
                        self.player.play_standalone(&url, title.as_deref());
                    }
                    None => {
                        // The one alert-grade failure path.
                        self.status_line =
                            Some("Error loading the latest episode. Try again later.".to_string());
                    }
                }
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        self.status_line = None;

        // While typing a search, the box owns the keyboard.
        if self.view == View::Directory && self.directory.is_searching() {
            let actions = self.directory.handle_key(key);
            self.dispatch(actions);
            return;
        }

        // Global keys.
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                return;
            }
            KeyCode::Char('t') => {
                self.dispatch(vec![Action::CycleTheme]);
                return;
            }
            KeyCode::Char(' ') => {
                self.dispatch(vec![Action::PlayPause]);
                return;
            }
            KeyCode::Char('N') => {
                self.dispatch(vec![Action::NextEpisode]);
                return;
            }
            KeyCode::Char('P') => {
                self.dispatch(vec![Action::PrevEpisode]);
                return;
            }
            KeyCode::Char('x') => {
                self.dispatch(vec![Action::ClosePlayer]);
                return;
            }
            KeyCode::Char('m') => {
                self.dispatch(vec![Action::ToggleMinimize]);
                return;
            }
            KeyCode::Char('y') => {
                self.dispatch(vec![Action::CopyEpisodeUrl]);
                return;
            }
            _ => {}
        }

        let actions = match self.view {
            View::Directory => self.directory.handle_key(key),
            View::Episodes => self.episode_pane.handle_key(key),
        };
        self.dispatch(actions);
    }

    fn dispatch(&mut self, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::SearchChanged(query) => {
                    self.directory.set_query(query, &self.podcasts);
                }
                Action::OpenPodcast(index) => self.open_podcast(index),
                Action::PlayLatestOf(index) => self.play_latest_of(index),
                Action::Back => {
                    self.view = View::Directory;
                    self.descriptions.hide();
                }
                Action::PlayEpisode(index) => self.play_episode_row(index),
                Action::ToggleDescription(index) => self.toggle_description(index),
                Action::ToggleShowMore => {
                    let visible = self.descriptions.visible().map(|(id, _)| id.to_string());
                    if let Some(id) = visible {
                        self.descriptions.toggle_expanded(&id);
                    }
                }
                Action::RefreshEpisode(index) => self.refresh_episode(index),
                Action::PlayPause => self.player.toggle_pause(),
                Action::NextEpisode => {
                    self.player.play_next();
                    self.autoload_player_description();
                }
                Action::PrevEpisode => {
                    self.player.play_prev();
                    self.autoload_player_description();
                }
                Action::ClosePlayer => self.player.close(),
                Action::ToggleMinimize => self.player.toggle_minimized(),
                Action::CycleTheme => self.cycle_theme(),
                Action::CopyEpisodeUrl => self.copy_current_url(),
                Action::Quit => self.should_quit = true,
                Action::Noop => {}
            }
        }
    }

    // ── flows ────────────────────────────────────────────────────────────────

    fn open_podcast(&mut self, index: usize) {
        let Some(podcast) = self.podcasts.get(index).cloned() else {
            return;
        };
        self.view = View::Episodes;
        self.descriptions.hide();
        self.episode_pane.open(podcast.clone());
        self.spawn_episode_load(podcast.id.clone(), LoadIntent::Browse);

        // Stale copy on the backend: kick a background update, once.
        if podcast.needs_update {
            if let Some(p) = self.podcasts.get_mut(index) {
                p.needs_update = false;
            }
            self.update_status.start_episodes(1);
            self.spawn_update(podcast.id);
        }
    }

    fn play_latest_of(&mut self, index: usize) {
        let Some(podcast) = self.podcasts.get(index) else {
            return;
        };
        self.player.set_cover(&podcast.image);
        self.spawn_episode_load(podcast.id.clone(), LoadIntent::PlayLatest);
    }

    /// Play a row of the episode pane.  The list is re-fetched on every play
    /// action, so the snapshot adopted by the player is always current; the
    /// generation token protects against overlapping requests.
    fn play_episode_row(&mut self, index: usize) {
        let Some(episode) = self.episode_pane.episodes.get(index) else {
            return;
        };
        let Some(podcast) = self.episode_pane.podcast.clone() else {
            return;
        };
        self.player.set_cover(&podcast.image);
        let intent = LoadIntent::PlayUrl {
            audio_url: episode.audio_url.clone(),
            title: Some(episode.title.clone()),
        };
        self.spawn_episode_load(podcast.id, intent);
    }

    fn on_episodes_loaded(
        &mut self,
        podcast_id: String,
        episodes: Vec<cast_proto::protocol::Episode>,
        intent: LoadIntent,
    ) {
        // Keep the pane in sync whenever it is showing this podcast.
        if self
            .episode_pane
            .podcast
            .as_ref()
            .is_some_and(|p| p.id == podcast_id)
        {
            self.episode_pane.set_episodes(episodes.clone());
        }

        match intent {
            LoadIntent::Browse => {}
            LoadIntent::Reload => {
                if self.update_status.phase == UpdatePhase::Episodes {
                    self.update_status.finish();
                }
            }
            LoadIntent::PlayUrl { audio_url, title } => {
                self.player
                    .play_from_list(&podcast_id, episodes, &audio_url, title.as_deref());
                self.autoload_player_description();
            }
            LoadIntent::PlayLatest => {
                if self.player.play_latest(&podcast_id, episodes) {
                    self.autoload_player_description();
                } else {
                    warn!("no episodes for podcast {}, trying legacy endpoint", podcast_id);
                    self.spawn_latest_fallback(podcast_id);
                }
            }
        }
    }

    fn toggle_description(&mut self, index: usize) {
        let Some(episode) = self.episode_pane.episodes.get(index) else {
            return;
        };
        let Some(episode_id) = episode.ilpost_id.clone() else {
            self.status_line = Some("No description available for this episode".to_string());
            return;
        };
        let Some(podcast_id) = self.episode_pane.podcast.as_ref().map(|p| p.id.clone()) else {
            return;
        };

        if self.descriptions.request(&episode_id) == FetchDecision::Fetch {
            self.update_status.start_descriptions(1);
            self.spawn_description_load(podcast_id, episode_id);
        }
    }

    fn refresh_episode(&mut self, index: usize) {
        let Some(episode) = self.episode_pane.episodes.get(index) else {
            return;
        };
        let Some(episode_id) = episode.ilpost_id.clone() else {
            self.status_line = Some("This episode cannot be refreshed".to_string());
            return;
        };
        let Some(podcast_id) = self.episode_pane.podcast.as_ref().map(|p| p.id.clone()) else {
            return;
        };
        self.spawn_refresh(podcast_id, episode_id);
    }

    fn on_description_loaded(&mut self, episode_id: &str, html: Option<String>, failed: bool) {
        if failed {
            self.descriptions.insert_failed(episode_id);
            self.update_status.add_error("Error loading the description");
            self.status_line = Some("Error loading the description".to_string());
        } else {
            self.descriptions
                .insert_loaded(episode_id, html.clone().unwrap_or_else(|| NO_DESCRIPTION.to_string()));
            self.update_status.descriptions_progress(1);
        }
        if self.update_status.phase == UpdatePhase::Descriptions {
            self.update_status.finish();
        }

        // The playing episode's description also feeds the player snapshot.
        let state = self.player.state();
        let playing_id = state
            .episode_index
            .and_then(|i| state.episodes.get(i))
            .and_then(|e| e.ilpost_id.clone());
        if playing_id.as_deref() == Some(episode_id) && !failed {
            self.player.set_description(html);
        }
    }

    /// After a play action: fetch (or reuse) the description of the now
    /// playing episode for the player snapshot.
    fn autoload_player_description(&mut self) {
        let state = self.player.state();
        let Some(episode) = state.episode_index.and_then(|i| state.episodes.get(i)) else {
            return;
        };
        let Some(episode_id) = episode.ilpost_id.clone() else {
            return;
        };
        let Some(podcast_id) = state.podcast_id.clone() else {
            return;
        };

        if let Some(html) = self.descriptions.html_for(&episode_id) {
            let html = html.to_string();
            self.player.set_description(Some(html));
        } else if self.descriptions.begin_fetch(&episode_id) {
            self.spawn_description_load(podcast_id, episode_id);
        }
    }

    fn cycle_theme(&mut self) {
        self.theme = self.theme.next();
        let prefs = UiPrefs {
            theme: self.theme.name.to_string(),
        };
        if let Err(e) = self.prefs_store.save(&prefs) {
            warn!("failed to persist theme choice: {}", e);
        }
    }

    fn copy_current_url(&mut self) {
        if !self.player.is_open() {
            return;
        }
        let url = self.player.state().src.clone();
        match arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(url)) {
            Ok(()) => self.status_line = Some("Episode URL copied".to_string()),
            Err(e) => warn!("clipboard unavailable: {}", e),
        }
    }

    // ── fetch tasks ──────────────────────────────────────────────────────────

    fn spawn_podcast_load(&mut self) {
        let token = self.fetch_bar.begin();
        let api = self.api.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let podcasts = api.load_podcasts().await;
            let _ = tx.send(AppEvent::PodcastsLoaded { token, podcasts });
        });
    }

    fn spawn_episode_load(&mut self, podcast_id: String, intent: LoadIntent) {
        self.episode_generation += 1;
        let generation = self.episode_generation;
        let token = self.fetch_bar.begin();
        let api = self.api.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let episodes = api.load_episodes(&podcast_id).await;
            let _ = tx.send(AppEvent::EpisodesLoaded {
                generation,
                token,
                podcast_id,
                episodes,
                intent,
            });
        });
    }

    fn spawn_description_load(&mut self, podcast_id: String, episode_id: String) {
        let token = self.fetch_bar.begin();
        let api = self.api.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let (html, failed) = match api.fetch_description(&podcast_id, &episode_id).await {
                Ok(html) => (html, false),
                Err(e) => {
                    warn!("description fetch failed: {:#}", e);
                    (None, true)
                }
            };
            let _ = tx.send(AppEvent::DescriptionLoaded {
                token,
                episode_id,
                html,
                failed,
            });
        });
    }

    fn spawn_update(&mut self, podcast_id: String) {
        let token = self.fetch_bar.begin();
        let api = self.api.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let success = match api.update_podcast(&podcast_id).await {
                Ok(success) => success,
                Err(e) => {
                    warn!("podcast update failed: {:#}", e);
                    false
                }
            };
            let _ = tx.send(AppEvent::UpdateFinished {
                token,
                podcast_id,
                success,
            });
        });
    }

    fn spawn_refresh(&mut self, podcast_id: String, episode_id: String) {
        let token = self.fetch_bar.begin();
        let api = self.api.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let success = match api.refresh_episode(&podcast_id, &episode_id).await {
                Ok(()) => true,
                Err(e) => {
                    warn!("episode refresh failed: {:#}", e);
                    false
                }
            };
            let _ = tx.send(AppEvent::RefreshFinished {
                token,
                podcast_id,
                success,
            });
        });
    }

    fn spawn_latest_fallback(&mut self, podcast_id: String) {
        let token = self.fetch_bar.begin();
        let api = self.api.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let url = api.last_episode_url(&podcast_id).await;
            let _ = tx.send(AppEvent::LatestResolved {
                token,
                podcast_id,
                url,
            });
        });
    }

    // ── rendering ────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        frame.render_widget(
            Block::default().style(Style::default().bg(self.theme.bg)),
            area,
        );

        let bar_height = player_bar::height(&self.player);
        let chrome = 1 /* loading */ + 1 /* status */ + bar_height;
        let main = Rect::new(
            area.x,
            area.y,
            area.width,
            area.height.saturating_sub(chrome),
        );

        match self.view {
            View::Directory => {
                self.directory.draw(frame, main, &self.podcasts, &self.theme)
            }
            View::Episodes => self.episode_pane.draw(
                frame,
                main,
                &self.descriptions,
                self.player
                    .is_open()
                    .then(|| self.player.state().src.as_str()),
                &self.theme,
            ),
        }

        let mut y = main.y + main.height;
        if y < area.height {
            let loading_area = Rect::new(area.x, y, area.width, 1);
            loading_bar::draw_loading_bar(frame, loading_area, &self.fetch_bar, &self.theme);
            y += 1;
        }

        if bar_height > 0 && y + bar_height <= area.height {
            let bar_area = Rect::new(area.x, y, area.width, bar_height);
            player_bar::draw(frame, bar_area, &self.player, &self.theme);
            y += bar_height;
        }

        if y < area.height {
            let status_area = Rect::new(area.x, y, area.width, 1);
            let line = match &self.status_line {
                Some(message) => Line::from(Span::styled(
                    message.clone(),
                    self.theme.style_error(),
                )),
                None => Line::from(Span::styled(
                    " q quit · / search · enter open · p latest · t theme",
                    self.theme.style_muted(),
                )),
            };
            frame.render_widget(Paragraph::new(line), status_area);
        }

        loading_bar::draw_update_overlay(frame, main, &self.update_status, &self.theme);
    }
}
