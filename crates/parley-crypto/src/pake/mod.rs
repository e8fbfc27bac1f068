//! CPace password-authenticated key exchange
//!
//! Exposes the three-call shape the handshake drives: `start` produces a
//! public message and an ownership-transferring state; `exchange` (run by
//! whichever side receives the first message) replies and finishes in one
//! step; `finish` consumes the initiator's state against the reply.

pub mod cpace;

pub use cpace::{exchange, finish, start, PakeState};
