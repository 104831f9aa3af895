mod backend;
mod error;
mod main_loop;
mod net;
mod protocol;

pub use crate::backend::{Backend, BstNode, DemoStructure, Mutation};
pub use crate::error::{BackendError, ServerError};
pub use crate::main_loop::MainLoop;
pub use crate::net::NetworkThread;
pub use crate::protocol::{ClientId, InboundMsg, OutboundMsg, INBOUND_CAP, OUTBOUND_CAP};
