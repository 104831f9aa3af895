use crate::app_state::ChannelEvent;
use crate::command::UserAction;
use crate::config::DashboardConfig;
use crate::connection::ConnectionHandle;
use crate::dispatcher::ViewDispatcher;
use crate::error::FrameError;
use crate::filter::FilterState;
use crate::router::{decode_frame, route, Routed};
use crate::screen::Screen;
use crate::status::{ConnectionState, StatusView};
use crate::store::StateStore;
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

/// Wires the connection, store and views together. Every external trigger
/// (channel event, user action, timer tick) enters through one method here,
/// and they are processed one at a time in arrival order.
pub struct Dashboard {
    store: StateStore,
    views: ViewDispatcher,
    status: ConnectionState,
    connection: ConnectionHandle,
    recent_window: Duration,
    recent_count: usize,
}

impl Dashboard {
    pub fn new(config: &DashboardConfig, filter: FilterState, connection: ConnectionHandle) -> Self {
        Self {
            store: StateStore::with_limits(config.history_cap, config.log_display_limit),
            views: ViewDispatcher::new(filter, config.highlight_ttl),
            status: ConnectionState::default(),
            connection,
            recent_window: config.recent_window,
            recent_count: 0,
        }
    }

    /// Returns true when anything visible changed.
    pub fn handle_channel_event(&mut self, event: ChannelEvent, now: Instant) -> bool {
        match event {
            ChannelEvent::Status(status) => {
                if status == self.status {
                    return false;
                }
                tracing::info!(%status, "connection status");
                self.status = status;
                true
            }
            ChannelEvent::Frame(text) => self.handle_frame(&text, now),
        }
    }

    /// Decode faults and unknown kinds are logged and leave every state untouched.
    pub fn handle_frame(&mut self, text: &str, now: Instant) -> bool {
        let msg = match decode_frame(text) {
            Ok(msg) => msg,
            Err(FrameError::UnknownKind(kind)) => {
                tracing::info!(%kind, "ignoring unknown message kind");
                return false;
            }
            Err(e) => {
                tracing::warn!(error = %e, len = text.len(), "dropping undecodable frame");
                return false;
            }
        };

        match route(&mut self.store, msg) {
            Routed::Reset => {
                self.views.clear();
                for snapshot in self.store.snapshots() {
                    self.views.update_snapshot(snapshot);
                }
            }
            Routed::Operation { target, updated } => {
                if let Some(snapshot) = updated {
                    self.views.update_snapshot(&snapshot);
                }
                if self.store.snapshot(&target).is_some() {
                    self.views.highlight(&target, now);
                }
            }
            Routed::Snapshot(snapshot) => {
                self.views.update_snapshot(&snapshot);
            }
        }
        true
    }

    /// Empties the store and every renderer cache together.
    pub fn clear(&mut self) {
        self.store.clear();
        self.views.clear();
    }

    pub fn reconnect(&self) {
        self.connection.reconnect();
    }

    pub fn set_filter(&mut self, filter: FilterState) {
        self.views.set_filter(filter);
    }

    pub fn request_snapshot(&self, id: &str) {
        self.connection.request_snapshot(id);
    }

    /// Returns false once the user asked to quit.
    pub fn handle_action(&mut self, action: UserAction) -> bool {
        match action {
            UserAction::Filter(filter) => self.set_filter(filter),
            UserAction::Clear => self.clear(),
            UserAction::Reconnect => self.reconnect(),
            UserAction::RequestSnapshot(id) => self.request_snapshot(&id),
            UserAction::Quit => return false,
        }
        true
    }

    /// Timer housekeeping: expires highlights and recent-log flags. Returns
    /// true when something visible changed.
    pub fn tick(&mut self, now: Instant, wall: DateTime<Utc>) -> bool {
        let expired = self.views.expire_highlights(now);
        let recent = self.recent_entries(wall);
        let recent_changed = recent != self.recent_count;
        self.recent_count = recent;
        !expired.is_empty() || recent_changed
    }

    fn recent_entries(&self, wall: DateTime<Utc>) -> usize {
        self.store
            .log_entries()
            .iter()
            .filter(|e| e.is_recent(wall, self.recent_window))
            .count()
    }

    pub fn status(&self) -> ConnectionState {
        self.status
    }

    pub fn status_view(&self) -> StatusView {
        StatusView::from(self.status)
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn views(&self) -> &ViewDispatcher {
        &self.views
    }

    pub fn connection(&self) -> &ConnectionHandle {
        &self.connection
    }

    pub fn screen(&self, now: Instant, wall: DateTime<Utc>) -> Screen<'_> {
        Screen {
            status: self.status_view(),
            filter: self.views.filter(),
            structures: self
                .store
                .structure_summaries()
                .into_iter()
                .map(|row| {
                    let lit = self.views.is_highlighted(&row.id, now);
                    (row, lit)
                })
                .collect(),
            log: self
                .store
                .log_entries()
                .into_iter()
                .map(|entry| {
                    let recent = entry.is_recent(wall, self.recent_window);
                    (entry, recent)
                })
                .collect(),
            panels: self.views.render(),
        }
    }
}
