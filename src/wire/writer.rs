//! Sentence writer.
//!
//! A sentence is encoded as one batch of words (each a length prefix plus
//! payload, then the empty terminator word) and written with scatter/gather
//! I/O, so a sentence reaches the transport in as few syscalls as possible.
//!
//! ```text
//! [prefix][command] [prefix][=k=v] ... [0x00]
//!  └──────── IoSlice per non-empty part ─────┘
//! ```

use std::io::IoSlice;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::{Result, RouterOsError};
use crate::protocol::{encode_length, encode_payload_length, LengthPrefix};

/// A word ready to be written: encoded prefix plus payload.
#[derive(Debug, Clone)]
pub struct OutboundWord {
    /// Encoded length prefix.
    pub prefix: LengthPrefix,
    /// Payload bytes (empty for the sentence terminator).
    pub payload: Bytes,
}

impl OutboundWord {
    /// Create an outbound word.
    ///
    /// Empty payloads are rejected: on the wire an empty word is the sentence
    /// terminator. Payloads too long to prefix are rejected as well.
    pub fn new(payload: Bytes) -> Result<Self> {
        if payload.is_empty() {
            return Err(RouterOsError::Protocol(
                "empty word inside a sentence".to_string(),
            ));
        }
        Ok(Self {
            prefix: encode_payload_length(payload.len())?,
            payload,
        })
    }

    /// The zero-length word that ends a sentence.
    #[inline]
    pub fn terminator() -> Self {
        Self {
            prefix: encode_length(0),
            payload: Bytes::new(),
        }
    }

    /// Total size on the wire (prefix + payload).
    #[inline]
    pub fn size(&self) -> usize {
        self.prefix.len() + self.payload.len()
    }
}

/// Encode `words` as a sentence batch, terminator included.
///
/// Fails before anything is written if any word is empty.
pub fn encode_sentence<I, W>(words: I) -> Result<Vec<OutboundWord>>
where
    I: IntoIterator<Item = W>,
    W: AsRef<[u8]>,
{
    let words = words.into_iter();
    let mut batch = Vec::with_capacity(words.size_hint().0 + 1);
    for word in words {
        batch.push(OutboundWord::new(Bytes::copy_from_slice(word.as_ref()))?);
    }
    batch.push(OutboundWord::terminator());
    Ok(batch)
}

/// Write one sentence: every word in order, then the empty terminator word.
pub async fn write_sentence<T, I, W>(writer: &mut T, words: I) -> Result<()>
where
    T: AsyncWrite + Unpin + ?Sized,
    I: IntoIterator<Item = W>,
    W: AsRef<[u8]>,
{
    let batch = encode_sentence(words)?;
    for word in &batch {
        tracing::trace!(len = word.payload.len(), "write word");
    }
    write_batch(writer, &batch).await
}

/// Write a single non-empty word (prefix + payload) with no terminator.
pub async fn write_word<T>(writer: &mut T, payload: &[u8]) -> Result<()>
where
    T: AsyncWrite + Unpin + ?Sized,
{
    let word = OutboundWord::new(Bytes::copy_from_slice(payload))?;
    write_batch(writer, std::slice::from_ref(&word)).await
}

/// Write a batch of words using scatter/gather I/O (write_vectored).
///
/// Partial writes continue from the exact byte where the previous call
/// stopped; the writer is flushed once at the end.
pub async fn write_batch<T>(writer: &mut T, batch: &[OutboundWord]) -> Result<()>
where
    T: AsyncWrite + Unpin + ?Sized,
{
    if batch.is_empty() {
        return Ok(());
    }

    let total_size: usize = batch.iter().map(OutboundWord::size).sum();
    let mut total_written = 0;

    while total_written < total_size {
        let slices = build_remaining_slices(batch, total_written);
        if slices.is_empty() {
            break;
        }

        let written = writer.write_vectored(&slices).await?;
        if written == 0 {
            return Err(RouterOsError::Io(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                "write_vectored returned 0",
            )));
        }

        total_written += written;
    }

    writer.flush().await?;
    Ok(())
}

/// Build IoSlice array for remaining data after `skip_bytes` were written.
fn build_remaining_slices(batch: &[OutboundWord], skip_bytes: usize) -> Vec<IoSlice<'_>> {
    let mut slices = Vec::with_capacity(batch.len() * 2);
    let mut offset = 0;

    for word in batch {
        let prefix_end = offset + word.prefix.len();
        if skip_bytes < prefix_end {
            let start = skip_bytes.saturating_sub(offset);
            slices.push(IoSlice::new(&word.prefix.as_bytes()[start..]));
        }
        offset = prefix_end;

        if !word.payload.is_empty() {
            let payload_end = offset + word.payload.len();
            if skip_bytes < payload_end {
                let start = skip_bytes.saturating_sub(offset);
                slices.push(IoSlice::new(&word.payload[start..]));
            }
            offset = payload_end;
        }
    }

    slices
}
