//! Frame codec for the gossip router's wire protocol.
//!
//! This crate is pure and reentrant: it only reads from byte slices
//! and writes into `BytesMut` buffers, never touching a socket.
//! Framing faults surface as [`Error`] for the caller (the session's
//! read loop) to act on.

pub mod address;
pub mod error;
pub mod ping;
pub mod primitive;
pub mod record;

pub use address::{LogicalAddress, PhysicalAddress};
pub use error::Error;
pub use ping::PingData;
pub use record::{Command, GossipRecord};
