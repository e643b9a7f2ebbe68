//! Connection lifecycle and the client endpoint.
//!
//! One dedicated reader (the thread that called `connect`), any number
//! of concurrent writers, and any number of interrupters share a single
//! connection through two locks: a state lock (state enum, socket
//! handle, outstanding-writes counter, with a broadcast condition
//! variable) and a write lock (the outbound stream). Neither lock is
//! ever held across blocking socket I/O, and no thread holds both at
//! once.

mod client;
mod state;

pub use client::WebSocket;
pub use state::ConnectionState;
