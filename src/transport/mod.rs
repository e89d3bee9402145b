//! Transport module - TCP connection setup.
//!
//! The protocol engine only needs a byte stream; anything implementing
//! [`Stream`] works, which is how tests drive sessions over in-memory pipes.

mod tcp;

pub use tcp::{connect, socket_addr, Stream, DEFAULT_API_PORT, DEFAULT_CONNECT_TIMEOUT};
