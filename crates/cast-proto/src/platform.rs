use std::path::PathBuf;

/// Loopback port the relay listens on by default.
pub const RELAY_TCP_PORT: u16 = 4789;

const RELAY_TCP_HOST: &str = "127.0.0.1";

pub fn relay_address() -> String {
    format!("{}:{}", RELAY_TCP_HOST, RELAY_TCP_PORT)
}

pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".local")
        .join("share")
        .join("castdeck")
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("castdeck")
}

pub fn cache_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".cache")
        .join("castdeck")
}

/// Path of the mpv IPC socket.  Per-user so two accounts on one machine do
/// not fight over it.
pub fn mpv_socket_name() -> String {
    let user = std::env::var("USER").unwrap_or_else(|_| "castdeck".to_string());
    format!(
        "{}/castdeck-mpv-{}.sock",
        std::env::temp_dir().display(),
        user
    )
}

pub fn mpv_socket_arg() -> String {
    format!("--input-ipc-server={}", mpv_socket_name())
}

/// Find the mpv binary: beside the current executable first (bundled
/// installs), then PATH.
pub fn find_mpv_binary() -> Option<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let local = dir.join("mpv");
            if local.exists() {
                return Some(local);
            }
        }
    }

    let path = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path) {
        let candidate = dir.join("mpv");
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}
