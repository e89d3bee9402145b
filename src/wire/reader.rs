//! Word, sentence and response reader.
//!
//! Reads are exact: the reader pulls one prefix byte, then the rest of the
//! prefix, then exactly the announced payload. It never consumes bytes past
//! the terminator of the sentence it is reading, so a response read stops at
//! its terminating sentence and leaves any following bytes in the stream.
//!
//! # Example
//!
//! ```
//! use routeros_client::protocol::Termination;
//! use routeros_client::wire::WordReader;
//!
//! # tokio_test_block_on(async {
//! let bytes: &[u8] = b"\x03!re\x0c=name=ether1\x00\x05!done\x00";
//! let mut reader = WordReader::new(bytes);
//! let response = reader.read_response(Termination::default()).await.unwrap();
//! assert_eq!(response.len(), 2);
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{Result, RouterOsError};
use crate::protocol::{
    check_word_len, decode_length, prefix_len, Response, Sentence, Termination,
    DEFAULT_MAX_WORD_LEN, MAX_PREFIX_SIZE,
};

/// Reader for the word protocol over any byte stream.
#[derive(Debug)]
pub struct WordReader<R> {
    inner: R,
    max_word_len: usize,
}

impl<R: AsyncRead + Unpin> WordReader<R> {
    /// Create a reader with the default word size limit (16 MiB).
    pub fn new(inner: R) -> Self {
        Self::with_max_word_len(inner, DEFAULT_MAX_WORD_LEN)
    }

    /// Create a reader with a custom word size limit.
    pub fn with_max_word_len(inner: R, max_word_len: usize) -> Self {
        Self {
            inner,
            max_word_len,
        }
    }

    /// Maximum accepted word length.
    pub fn max_word_len(&self) -> usize {
        self.max_word_len
    }

    /// Get a reference to the underlying stream.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Get a mutable reference to the underlying stream.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Consume the reader, returning the underlying stream.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Read a length prefix.
    ///
    /// Fails with [`RouterOsError::ConnectionClosed`] if the stream ends
    /// before the first byte, and with [`RouterOsError::IncompleteWord`] if it
    /// ends inside the prefix.
    pub async fn read_length(&mut self) -> Result<usize> {
        let mut buf = [0u8; MAX_PREFIX_SIZE];
        if self.fill(&mut buf[..1]).await? == 0 {
            return Err(RouterOsError::ConnectionClosed);
        }

        let size = prefix_len(buf[0])?;
        let received = 1 + self.fill(&mut buf[1..size]).await?;
        if received < size {
            return Err(RouterOsError::IncompleteWord {
                expected: size,
                received,
            });
        }

        let (len, _) = decode_length(&buf[..size])?.ok_or_else(|| {
            RouterOsError::Protocol("length prefix shorter than its marker".to_string())
        })?;
        check_word_len(len, self.max_word_len)
    }

    /// Read one word. An empty word is the sentence terminator.
    pub async fn read_word(&mut self) -> Result<Bytes> {
        let len = self.read_length().await?;
        if len == 0 {
            return Ok(Bytes::new());
        }

        let mut payload = BytesMut::zeroed(len);
        let received = self.fill(&mut payload).await?;
        if received < len {
            return Err(RouterOsError::IncompleteWord {
                expected: len,
                received,
            });
        }

        tracing::trace!(len, "read word");
        Ok(payload.freeze())
    }

    /// Read words up to (not including) the next empty word.
    ///
    /// An immediately empty word yields an empty sentence.
    pub async fn read_sentence(&mut self) -> Result<Sentence> {
        let mut words = Vec::new();
        loop {
            let word = self.read_word().await?;
            if word.is_empty() {
                return Ok(Sentence::new(words));
            }
            words.push(word);
        }
    }

    /// Read sentences until one ends the response under `termination`.
    ///
    /// The terminating sentence is included.
    pub async fn read_response(&mut self, termination: Termination) -> Result<Response> {
        let mut sentences = Vec::new();
        loop {
            let sentence = self.read_sentence().await?;
            let done = termination.is_terminal(&sentence);
            sentences.push(sentence);
            if done {
                tracing::debug!(sentences = sentences.len(), "response complete");
                return Ok(Response::new(sentences));
            }
        }
    }

    /// Read until `buf` is full or the stream ends; returns bytes read.
    async fn fill(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.inner.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(filled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::encode_word;

    fn sentence_bytes(words: &[&str]) -> Vec<u8> {
        let mut out = Vec::new();
        for word in words {
            out.extend_from_slice(&encode_word(word.as_bytes()).unwrap());
        }
        out.push(0);
        out
    }

    #[tokio::test]
    async fn test_read_single_word() {
        let mut reader = WordReader::new(&b"\x05!done"[..]);
        let word = reader.read_word().await.unwrap();
        assert_eq!(&word[..], b"!done");
    }

    #[tokio::test]
    async fn test_read_length_bands() {
        let data: &[u8] = &[0x7F, 0x80, 0x80, 0xC0, 0x40, 0x00, 0xE0, 0x20, 0x00, 0x00];
        let mut reader = WordReader::with_max_word_len(data, usize::MAX);
        assert_eq!(reader.read_length().await.unwrap(), 0x7F);
        assert_eq!(reader.read_length().await.unwrap(), 0x80);
        assert_eq!(reader.read_length().await.unwrap(), 0x4000);
        assert_eq!(reader.read_length().await.unwrap(), 0x20_0000);
    }

    #[tokio::test]
    async fn test_closed_before_prefix() {
        let mut reader = WordReader::new(&b""[..]);
        let err = reader.read_word().await.unwrap_err();
        assert!(matches!(err, RouterOsError::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_closed_inside_prefix() {
        let mut reader = WordReader::new(&[0xC0u8, 0x40][..]);
        let err = reader.read_word().await.unwrap_err();
        assert!(matches!(
            err,
            RouterOsError::IncompleteWord {
                expected: 3,
                received: 2
            }
        ));
    }

    #[tokio::test]
    async fn test_incomplete_word() {
        let mut reader = WordReader::new(&b"\x0a!do"[..]);
        let err = reader.read_word().await.unwrap_err();
        assert!(matches!(
            err,
            RouterOsError::IncompleteWord {
                expected: 10,
                received: 3
            }
        ));
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_oversized_word_rejected_before_read() {
        // Announces 0x0FFFFFFF bytes; nothing follows.
        let mut reader = WordReader::with_max_word_len(&[0xEFu8, 0xFF, 0xFF, 0xFF][..], 1024);
        let err = reader.read_word().await.unwrap_err();
        assert!(matches!(err, RouterOsError::WordTooLarge { max: 1024, .. }));
    }

    #[tokio::test]
    async fn test_control_byte_is_protocol_error() {
        let mut reader = WordReader::new(&[0xF8u8][..]);
        let err = reader.read_word().await.unwrap_err();
        assert!(matches!(err, RouterOsError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_read_sentence_stops_at_terminator() {
        let mut data = sentence_bytes(&["!re", "=name=ether1"]);
        data.extend(sentence_bytes(&["!done"]));
        let mut reader = WordReader::new(&data[..]);

        let first = reader.read_sentence().await.unwrap();
        assert_eq!(first.to_strings(), vec!["!re", "=name=ether1"]);

        let second = reader.read_sentence().await.unwrap();
        assert!(second.is_done());
    }

    #[tokio::test]
    async fn test_empty_sentence() {
        let mut reader = WordReader::new(&[0u8][..]);
        let sentence = reader.read_sentence().await.unwrap();
        assert!(sentence.is_empty());
    }

    #[tokio::test]
    async fn test_read_response_stops_after_done() {
        let mut data = sentence_bytes(&["!re", "=a=1"]);
        data.extend(sentence_bytes(&["!re", "=a=2"]));
        data.extend(sentence_bytes(&["!done"]));
        let trailing = sentence_bytes(&["!re", "=unread=1"]);
        data.extend(&trailing);

        let mut reader = WordReader::new(&data[..]);
        let response = reader.read_response(Termination::DoneOnly).await.unwrap();
        assert_eq!(response.len(), 3);
        assert!(response.sentences()[2].is_done());

        // Trailing bytes remain unread.
        assert_eq!(reader.get_ref(), &&trailing[..]);
    }

    #[tokio::test]
    async fn test_read_response_tolerates_empty_sentences() {
        let mut data = vec![0u8];
        data.extend(sentence_bytes(&["!done"]));
        let mut reader = WordReader::new(&data[..]);
        let response = reader.read_response(Termination::default()).await.unwrap();
        assert_eq!(response.len(), 2);
        assert!(response.sentences()[0].is_empty());
    }

    #[tokio::test]
    async fn test_trap_then_done_under_default_policy() {
        let mut data = sentence_bytes(&["!trap", "=message=bad"]);
        data.extend(sentence_bytes(&["!done"]));
        let mut reader = WordReader::new(&data[..]);
        let response = reader.read_response(Termination::default()).await.unwrap();
        assert_eq!(response.len(), 2);
    }

    #[tokio::test]
    async fn test_bare_trap_ends_any_marker_policy() {
        let data = sentence_bytes(&["!trap", "=message=bad"]);
        let mut reader = WordReader::new(&data[..]);
        let response = reader
            .read_response(Termination::AnyReplyMarker)
            .await
            .unwrap();
        assert_eq!(response.len(), 1);
        assert!(response.sentences()[0].is_trap());
    }

    #[tokio::test]
    async fn test_stream_end_mid_response() {
        let data = sentence_bytes(&["!re", "=a=1"]);
        let mut reader = WordReader::new(&data[..]);
        let err = reader
            .read_response(Termination::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RouterOsError::ConnectionClosed));
    }
}
