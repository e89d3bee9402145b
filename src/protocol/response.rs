//! Responses: the sentences a device sends back for one command.

use serde::{Deserialize, Serialize};

use super::sentence::{AttributeMap, ReplyKind, Sentence};
use crate::error::{Result, RouterOsError};

/// Which reply markers end a response.
///
/// The terminating sentence is always part of the response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Only `!done` ends a response.
    DoneOnly,
    /// `!done` or `!fatal` ends a response. Devices follow `!trap` with `!done`.
    #[default]
    DoneOrFatal,
    /// The first `!done`, `!trap` or `!fatal` ends a response.
    AnyReplyMarker,
}

impl Termination {
    /// Check if `sentence` ends the response under this policy.
    pub fn is_terminal(self, sentence: &Sentence) -> bool {
        match (self, sentence.reply_kind()) {
            (_, Some(ReplyKind::Done)) => true,
            (Self::DoneOrFatal | Self::AnyReplyMarker, Some(ReplyKind::Fatal)) => true,
            (Self::AnyReplyMarker, Some(ReplyKind::Trap)) => true,
            _ => false,
        }
    }
}

/// How a command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No error sentences.
    Done,
    /// At least one `!trap`, no `!fatal`.
    Trap,
    /// A `!fatal` was received.
    Fatal,
}

/// An ordered list of sentences, inclusive of the terminating one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    sentences: Vec<Sentence>,
}

impl Response {
    /// Wrap a list of sentences.
    pub fn new(sentences: Vec<Sentence>) -> Self {
        Self { sentences }
    }

    /// All sentences in arrival order.
    #[inline]
    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    /// Consume the response, returning its sentences.
    pub fn into_sentences(self) -> Vec<Sentence> {
        self.sentences
    }

    /// Number of sentences.
    #[inline]
    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    /// Check if no sentences were received.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    /// The first sentence.
    pub fn first(&self) -> Option<&Sentence> {
        self.sentences.first()
    }

    /// `!re` data rows in order.
    pub fn rows(&self) -> impl Iterator<Item = &Sentence> {
        self.sentences.iter().filter(|s| s.is_re())
    }

    /// Attribute maps of every `!re` row.
    pub fn records(&self) -> Vec<AttributeMap> {
        self.rows().map(Sentence::attributes).collect()
    }

    /// Classify the response by its error sentences.
    pub fn outcome(&self) -> Outcome {
        if self.sentences.iter().any(Sentence::is_fatal) {
            Outcome::Fatal
        } else if self.sentences.iter().any(Sentence::is_trap) {
            Outcome::Trap
        } else {
            Outcome::Done
        }
    }

    /// The first `!trap` sentence.
    pub fn trap(&self) -> Option<&Sentence> {
        self.sentences.iter().find(|s| s.is_trap())
    }

    /// The `!done` sentence, if the response ended with one.
    pub fn done(&self) -> Option<&Sentence> {
        self.sentences.iter().rev().find(|s| s.is_done())
    }

    /// The `=ret=` attribute of `!done` (id of a newly added object).
    pub fn done_ret(&self) -> Option<String> {
        self.done().and_then(|s| s.attribute("ret"))
    }

    /// Turn error replies into errors.
    ///
    /// `!fatal` becomes [`RouterOsError::Fatal`], `!trap` becomes
    /// [`RouterOsError::Trap`]; anything else is returned unchanged.
    pub fn into_result(self) -> Result<Self> {
        match self.outcome() {
            Outcome::Done => Ok(self),
            Outcome::Fatal => {
                let message = self
                    .sentences
                    .iter()
                    .find(|s| s.is_fatal())
                    .map(fatal_message)
                    .unwrap_or_default();
                Err(RouterOsError::Fatal { message })
            }
            Outcome::Trap => {
                let trap = self.trap();
                Err(RouterOsError::Trap {
                    category: trap.and_then(|s| s.attribute("category")),
                    message: trap
                        .and_then(|s| s.attribute("message"))
                        .unwrap_or_else(|| "command rejected".to_string()),
                })
            }
        }
    }

    /// Sentences as lists of lossy strings, for diagnostics.
    pub fn to_strings(&self) -> Vec<Vec<String>> {
        self.sentences.iter().map(Sentence::to_strings).collect()
    }
}

impl From<Vec<Sentence>> for Response {
    fn from(sentences: Vec<Sentence>) -> Self {
        Self::new(sentences)
    }
}

// `!fatal` carries its reason as a bare second word.
fn fatal_message(sentence: &Sentence) -> String {
    sentence
        .attribute("message")
        .or_else(|| {
            sentence
                .words()
                .get(1)
                .map(|w| String::from_utf8_lossy(w).into_owned())
        })
        .unwrap_or_default()
}
