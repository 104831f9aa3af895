use crate::status::ConnectionState;
use dsviz_protocol::ClientCommand;

/// Requests from the UI side to the connection actor.
#[derive(Debug, Clone, PartialEq)]
pub enum UiCommand {
    Connect,
    Disconnect,
    Reconnect,
    Send(ClientCommand),
}

/// Everything the connection actor reports back, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Status(ConnectionState),
    Frame(String),
}
