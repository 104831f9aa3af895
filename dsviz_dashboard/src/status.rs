/// Lifecycle of the single server channel. Only the connection actor moves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Connected,
    Reconnecting {
        attempt: u32,
        max: u32,
    },
    Failed,
    Disconnected,
}

pub const DISCONNECTED_PLACEHOLDER: &str =
    "Disconnected from server. Click reconnect to try again.";

impl ConnectionState {
    pub fn label(&self) -> String {
        match self {
            ConnectionState::Idle => "Idle".to_string(),
            ConnectionState::Connecting => "Connecting...".to_string(),
            ConnectionState::Connected => "Connected".to_string(),
            ConnectionState::Reconnecting { attempt, max } => {
                format!("Reconnecting... ({attempt}/{max})")
            }
            ConnectionState::Failed => "Connection failed".to_string(),
            ConnectionState::Disconnected => "Disconnected".to_string(),
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

/// Everything the UI shows about the connection, derived from the last status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusView {
    pub text: String,
    pub css_class: String,
    pub reconnect_enabled: bool,
    pub placeholder: Option<&'static str>,
}

impl From<ConnectionState> for StatusView {
    fn from(state: ConnectionState) -> Self {
        let text = state.label();
        let css_class = text
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-");
        let connected = state.is_connected();
        Self {
            text,
            css_class,
            reconnect_enabled: !connected,
            placeholder: (!connected).then_some(DISCONNECTED_PLACEHOLDER),
        }
    }
}
