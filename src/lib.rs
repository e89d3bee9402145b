//! # routeros-client
//!
//! Async client for the RouterOS binary API.
//!
//! The API is a word/sentence protocol over TCP (port 8728): a word is a
//! length-prefixed byte string, a sentence is a run of words ended by an empty
//! word, and a command's response is a run of sentences ended by `!done`.
//!
//! ## Layers
//!
//! - [`protocol`]: length prefixes, sentences, responses (pure data)
//! - [`wire`]: reading and writing those over any async byte stream
//! - [`Session`]: connect, plain-text login, one command at a time
//! - [`ops`] / [`Router`]: PPP, pool and interface operations
//! - [`seed`]: bulk PPP secret creation from records
//!
//! ## Example
//!
//! ```ignore
//! use routeros_client::{ops, Session};
//!
//! #[tokio::main]
//! async fn main() -> routeros_client::Result<()> {
//!     let mut session = Session::builder("192.168.88.1")
//!         .credentials("admin", "secret")
//!         .connect()
//!         .await?;
//!     session.authenticate().await?;
//!
//!     for iface in ops::list_interfaces(&mut session).await? {
//!         println!("{}", iface["name"]);
//!     }
//!
//!     session.disconnect().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod ops;
pub mod protocol;
pub mod router;
pub mod seed;
pub mod transport;
pub mod wire;

mod session;

pub use config::SessionConfig;
pub use error::{ErrorKind, Result, RouterOsError};
pub use protocol::{AttributeMap, Outcome, Response, Sentence, Termination};
pub use router::{OpResult, OperationError, Router};
pub use session::{Session, SessionBuilder, SessionState, LOGIN_COMMAND};
