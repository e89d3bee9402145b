//! Wire module - async reading and writing of words, sentences and responses.
//!
//! Both halves are generic over tokio's `AsyncRead`/`AsyncWrite`, so the same
//! code drives a TCP stream, an in-memory duplex pipe or a byte slice.

mod reader;
mod writer;

pub use reader::WordReader;
pub use writer::{encode_sentence, write_batch, write_sentence, write_word, OutboundWord};
