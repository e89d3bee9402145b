//! Protocol module - word length prefixes, sentences and responses.
//!
//! This module holds the pure data side of the API protocol:
//! - Variable-length word prefix encoding/decoding
//! - Sentence struct with reply-marker and attribute accessors
//! - Response aggregation policy and outcome classification
//!
//! Reading and writing these over a stream lives in [`crate::wire`].

mod response;
mod sentence;
mod word;

pub use response::{Outcome, Response, Termination};
pub use sentence::{attribute_word, parse_attribute, reply, AttributeMap, ReplyKind, Sentence};
pub use word::{
    check_word_len, decode_length, encode_length, encode_payload_length, encode_word, markers,
    prefix_len, LengthPrefix, DEFAULT_MAX_WORD_LEN, FOUR_BYTE_LIMIT, MAX_PREFIX_SIZE,
    ONE_BYTE_LIMIT, THREE_BYTE_LIMIT, TWO_BYTE_LIMIT,
};
