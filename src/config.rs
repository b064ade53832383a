//! Client-level configuration loading, including timeouts and the word pool.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};
use url::Url;

use crate::words;

/// Default location on disk where the client looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/client.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "MEETING_BINGO_CONFIG_PATH";
/// Environment variable that overrides the configured server URL.
const SERVER_URL_ENV: &str = "MEETING_BINGO_SERVER_URL";
/// Server origin used when nothing else is configured.
const DEFAULT_SERVER_URL: &str = "http://localhost:8080";

/// Connect budget for TCP/TLS setup.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Whole-request budget for REST calls.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Room-switch debounce window.
const DEFAULT_SWITCH_COOLDOWN: Duration = Duration::from_secs(3600);
/// Keepalive cadence on the persistent channel.
const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(30);
/// Broadcast ring size for the event hub.
const DEFAULT_EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the client.
pub struct ClientConfig {
    server_url: Url,
    connect_timeout: Duration,
    request_timeout: Duration,
    switch_cooldown: Duration,
    ping_interval: Duration,
    event_capacity: usize,
    word_pool: Vec<String>,
}

impl ClientConfig {
    /// Load the client configuration from disk, falling back to baked-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        server = %config.server_url,
                        "loaded client config"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        config.with_env_overrides()
    }

    /// HTTP origin of the game server.
    pub fn server_url(&self) -> &Url {
        &self.server_url
    }

    /// Connect budget for TCP/TLS setup on the REST channel.
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Whole-request budget for REST calls.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Debounce window for repeated room switches to the same meeting.
    pub fn switch_cooldown(&self) -> Duration {
        self.switch_cooldown
    }

    /// Keepalive cadence on the persistent channel.
    pub fn ping_interval(&self) -> Duration {
        self.ping_interval
    }

    /// Broadcast ring size for the event hub.
    pub fn event_capacity(&self) -> usize {
        self.event_capacity
    }

    /// Buzzword pool used to generate word grids.
    pub fn word_pool(&self) -> &[String] {
        &self.word_pool
    }

    /// Build a REST endpoint URL under the configured server origin.
    pub fn api_url(&self, path: &str) -> Url {
        let mut url = self.server_url.clone();
        url.set_path(path);
        url
    }

    /// Derive the persistent-channel endpoint for a room and player.
    ///
    /// Maps the configured `http`/`https` origin onto `ws`/`wss`.
    pub fn ws_url(&self, meeting_id: &str, player_id: &str) -> Url {
        let mut url = self.server_url.clone();
        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            _ => "ws",
        };
        // Both sides of the mapping are "special" schemes, so this cannot fail.
        let _ = url.set_scheme(scheme);
        url.set_path(&format!("/ws/{meeting_id}/{player_id}"));
        url
    }

    fn with_env_overrides(mut self) -> Self {
        if let Some(value) = env::var_os(SERVER_URL_ENV) {
            match value.to_str().map(Url::parse) {
                Some(Ok(url)) => {
                    info!(server = %url, "server URL overridden from environment");
                    self.server_url = url;
                }
                _ => warn!("ignoring unparseable {SERVER_URL_ENV} override"),
            }
        }
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: Url::parse(DEFAULT_SERVER_URL).expect("default server URL is valid"),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            switch_cooldown: DEFAULT_SWITCH_COOLDOWN,
            ping_interval: DEFAULT_PING_INTERVAL,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            word_pool: words::default_pool(),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    server_url: Option<String>,
    connect_timeout_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
    switch_cooldown_secs: Option<u64>,
    ping_interval_secs: Option<u64>,
    event_capacity: Option<usize>,
    words: Option<Vec<String>>,
}

impl From<RawConfig> for ClientConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = Self::default();
        let server_url = raw
            .server_url
            .and_then(|value| match Url::parse(&value) {
                Ok(url) => Some(url),
                Err(err) => {
                    warn!(url = %value, error = %err, "invalid server_url in config; using default");
                    None
                }
            })
            .unwrap_or(defaults.server_url);
        let word_pool = match raw.words {
            Some(words) if !words.is_empty() => words,
            _ => defaults.word_pool,
        };

        Self {
            server_url,
            connect_timeout: raw
                .connect_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
            request_timeout: raw
                .request_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            switch_cooldown: raw
                .switch_cooldown_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.switch_cooldown),
            ping_interval: raw
                .ping_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.ping_interval),
            event_capacity: raw.event_capacity.unwrap_or(defaults.event_capacity),
            word_pool,
        }
    }
}

#[cfg(test)]
impl ClientConfig {
    /// Point the client at an in-test server.
    pub(crate) fn with_server_url(mut self, url: Url) -> Self {
        self.server_url = url;
        self
    }

    /// Shrink the switch cooldown for debounce tests.
    pub(crate) fn with_switch_cooldown(mut self, cooldown: Duration) -> Self {
        self.switch_cooldown = cooldown;
        self
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
