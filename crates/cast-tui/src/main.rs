use cast_proto::config::Config;
use cast_proto::store::StateStore;
use crossterm::event::{Event, KeyEventKind};
use tokio::sync::mpsc;
use tracing::{info, warn};

use cast_tui::api::PodcastApi;
use cast_tui::app::{App, UiPrefs, PREFS_MAX_AGE};
use cast_tui::audio::{AudioBackend, MpvAudio, NullAudio};
use cast_tui::event::AppEvent;
use cast_tui::player::Player;
use cast_tui::relay_link::RelayLink;
use cast_tui::theme::Theme;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().unwrap_or_default();

    let state_dir = config.paths.state_dir.clone();
    std::fs::create_dir_all(&state_dir)?;
    let log_path = state_dir.join("tui.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // RUST_LOG overrides; default keeps HTTP client internals quiet.
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    eprintln!("castdeck log: {}", log_path.display());
    info!("castdeck starting…");

    let (events_tx, events_rx) = mpsc::unbounded_channel::<AppEvent>();

    // ── Relay channel (optional: absent relay means local-only) ──────────────
    let relay_sender = if config.relay.enabled {
        match RelayLink::connect(&config.relay_address(), events_tx.clone()).await {
            Ok(link) => Some(link.sender()),
            Err(e) => {
                info!("relay not reachable ({}), running local-only", e);
                None
            }
        }
    } else {
        None
    };

    // ── Audio engine ─────────────────────────────────────────────────────────
    let backend: Box<dyn AudioBackend> = match MpvAudio::spawn().await {
        Ok(mpv) => Box::new(mpv),
        Err(e) => {
            warn!("mpv unavailable ({}), running silent", e);
            Box::new(NullAudio::default())
        }
    };

    // ── Stores + theme preference (expires like the old cookie) ──────────────
    let player_store = StateStore::open(&state_dir, "player_state");
    let prefs_store: StateStore<UiPrefs> = StateStore::open(&state_dir, "ui_prefs");
    let theme = prefs_store
        .load_fresh(PREFS_MAX_AGE)
        .and_then(|prefs| Theme::by_name(&prefs.theme))
        .unwrap_or_default();

    let player = Player::new(player_store, backend, relay_sender);
    let api = PodcastApi::new(&config.api.base_url);

    // ── Input thread ─────────────────────────────────────────────────────────
    let key_tx = events_tx.clone();
    std::thread::spawn(move || loop {
        match crossterm::event::read() {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                if key_tx.send(AppEvent::Key(key)).is_err() {
                    break;
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!("input thread error: {}", e);
                break;
            }
        }
    });

    // ── Periodic snapshot tick ───────────────────────────────────────────────
    let tick_tx = events_tx.clone();
    let save_interval = std::time::Duration::from_secs(config.player.save_interval_secs.max(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(save_interval);
        loop {
            interval.tick().await;
            if tick_tx.send(AppEvent::Tick).is_err() {
                break;
            }
        }
    });

    // ── Run ──────────────────────────────────────────────────────────────────
    let terminal = ratatui::init();
    let app = App::new(api, player, prefs_store, theme, events_tx);
    let result = app.run(events_rx, terminal).await;
    ratatui::restore();
    result
}
