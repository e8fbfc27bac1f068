//! Wire-level types exchanged between client and server.

mod close;
mod messages;

pub use close::CloseCode;
pub use messages::{IceServer, InitMessage, PROTOCOL_VERSION};
