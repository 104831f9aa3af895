mod app;
mod app_state;
mod command;
mod config;
mod connection;
mod dispatcher;
mod error;
mod filter;
pub mod render;
mod router;
mod screen;
mod status;
mod store;
mod ws_actor;

pub use crate::app::Dashboard;
pub use crate::app_state::{ChannelEvent, UiCommand};
pub use crate::command::{UserAction, HELP};
pub use crate::config::{
    endpoint_for, load_env_file, parse_url, DashboardConfig, DEFAULT_PAGE_URL, HIGHLIGHT_TTL, HISTORY_CAP,
    LOG_DISPLAY_LIMIT, RECENT_WINDOW, TICK_INTERVAL, WS_PATH,
};
pub use crate::connection::{
    BackoffPolicy, ConnectionHandle, ConnectionMachine, Retry, StatusSink,
};
pub use crate::dispatcher::ViewDispatcher;
pub use crate::error::{CommandError, ConfigError, FrameError};
pub use crate::filter::FilterState;
pub use crate::router::{decode_frame, route, Routed};
pub use crate::screen::{block_text, Screen};
pub use crate::status::{ConnectionState, StatusView, DISCONNECTED_PLACEHOLDER};
pub use crate::store::{size_summary, LogEntry, StateStore, StructureSummary};
pub use crate::ws_actor::spawn as spawn_connection;
