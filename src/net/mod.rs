//! Push channel plumbing
//!
//! - Protocol: Socket.IO / Engine.IO text frame codec
//! - Connection: reconnecting channel thread

pub mod connection;
pub mod protocol;

pub use connection::{ChannelEvent, Connection, ConnectionConfig, Outbox};
pub use protocol::{ClientEvent, ServerEvent};
