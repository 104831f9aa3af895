use std::net::SocketAddr;

pub const INBOUND_CAP: usize = 256;
pub const OUTBOUND_CAP: usize = 256;

pub type ClientId = u64;

pub enum InboundMsg {
    ClientConnected {
        client_id: ClientId,
        socket_addr: SocketAddr,
    },
    ClientDisconnected {
        client_id: ClientId,
    },
    Command {
        client_id: ClientId,
        cmd: ClientCommand,
    },
}

pub enum OutboundMsg {
    Broadcast { msg: ServerMessage },
    SendTo { client_id: ClientId, msg: ServerMessage },
    /// Sent verbatim to every client, for exercising client-side decoding.
    BroadcastRaw { text: String },
    /// Closes every open client socket.
    DropClients,
}

pub use dsviz_protocol::{ClientCommand, OperationRecord, ServerMessage};
