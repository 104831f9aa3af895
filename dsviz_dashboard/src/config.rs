use crate::connection::BackoffPolicy;
use crate::error::ConfigError;
use std::path::Path;
use std::time::Duration;
use url::Url;

pub const WS_PATH: &str = "/ws";
pub const DEFAULT_PAGE_URL: &str = "http://127.0.0.1:8080/";

pub const HISTORY_CAP: usize = 100;
pub const LOG_DISPLAY_LIMIT: usize = 20;
pub const HIGHLIGHT_TTL: Duration = Duration::from_secs(2);
pub const RECENT_WINDOW: Duration = Duration::from_secs(5);
pub const TICK_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub endpoint: Url,
    pub backoff: BackoffPolicy,
    pub history_cap: usize,
    pub log_display_limit: usize,
    pub highlight_ttl: Duration,
    /// Log entries younger than this are flagged as recent.
    pub recent_window: Duration,
    pub tick_interval: Duration,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            endpoint: Url::parse("ws://127.0.0.1:8080/ws").expect("static url is valid"),
            backoff: BackoffPolicy::default(),
            history_cap: HISTORY_CAP,
            log_display_limit: LOG_DISPLAY_LIMIT,
            highlight_ttl: HIGHLIGHT_TTL,
            recent_window: RECENT_WINDOW,
            tick_interval: TICK_INTERVAL,
        }
    }
}

impl DashboardConfig {
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Loads `path` into the process environment, replacing variables that are
/// already set. A missing file is not an error.
pub fn load_env_file(path: &Path) -> bool {
    match dotenvy::from_path_override(path) {
        Ok(()) => true,
        Err(e) if e.not_found() => false,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable env file");
            false
        }
    }
}

pub fn parse_url(raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidUrl {
        url: raw.to_string(),
        source,
    })
}

/// Websocket endpoint for a dashboard served from `page`: same host and port,
/// `wss` when the page is `https`, fixed path. Websocket URLs pass through.
pub fn endpoint_for(page: &Url) -> Result<Url, ConfigError> {
    let scheme = match page.scheme() {
        "http" => "ws",
        "https" => "wss",
        "ws" | "wss" => return Ok(page.clone()),
        other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
    };

    let mut url = page.clone();
    url.set_scheme(scheme)
        .map_err(|_| ConfigError::UnsupportedScheme(page.scheme().to_string()))?;
    url.set_path(WS_PATH);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}
