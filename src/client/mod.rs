//! The `client` module defines one live participant of the room.
//!
//! A [`Connection`] is what the hub keeps in its membership set: an id, an
//! optional identity token, and the sending half of the participant's
//! bounded outbound queue. [`LeaveGuard`] releases the membership when the
//! connection's work is done.

pub mod connection;
pub mod guard;

pub use connection::{Connection, ConnectionId};
pub use guard::LeaveGuard;
