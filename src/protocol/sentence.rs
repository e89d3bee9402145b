//! Sentence struct with typed accessors.
//!
//! A sentence is an ordered list of words terminated on the wire by an empty
//! word. The first word is a reply marker (`!re`, `!done`, `!trap`, `!fatal`)
//! or a command path; `=key=value` words carry one attribute each.
//!
//! # Example
//!
//! ```
//! use routeros_client::protocol::{ReplyKind, Sentence};
//!
//! let sentence = Sentence::from_words(["!re", "=name=ether1", "=type=ether"]);
//! assert_eq!(sentence.reply_kind(), Some(ReplyKind::Re));
//! assert_eq!(sentence.attribute("name").as_deref(), Some("ether1"));
//! ```

use std::collections::BTreeMap;

use bytes::Bytes;

/// Attribute name to value, as parsed from `=key=value` words.
pub type AttributeMap = BTreeMap<String, String>;

/// Reply marker words.
pub mod reply {
    /// Data row.
    pub const RE: &str = "!re";
    /// Successful end of a response.
    pub const DONE: &str = "!done";
    /// Command failed; more sentences (at least `!done`) follow.
    pub const TRAP: &str = "!trap";
    /// Session is being closed by the device.
    pub const FATAL: &str = "!fatal";
}

/// Kind of a reply sentence, taken from its first word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// `!re`
    Re,
    /// `!done`
    Done,
    /// `!trap`
    Trap,
    /// `!fatal`
    Fatal,
    /// Any other leading word (e.g. a command path).
    Other,
}

impl ReplyKind {
    /// Classify a leading word.
    pub fn from_word(word: &[u8]) -> Self {
        match word {
            b"!re" => Self::Re,
            b"!done" => Self::Done,
            b"!trap" => Self::Trap,
            b"!fatal" => Self::Fatal,
            _ => Self::Other,
        }
    }

    /// Returns true for `!trap` and `!fatal`.
    #[inline]
    pub fn is_error(self) -> bool {
        matches!(self, Self::Trap | Self::Fatal)
    }
}

/// Build the `=key=value` word for one attribute.
///
/// No escaping is performed.
pub fn attribute_word(key: &str, value: &str) -> String {
    let mut word = String::with_capacity(key.len() + value.len() + 2);
    word.push('=');
    word.push_str(key);
    word.push('=');
    word.push_str(value);
    word
}

/// Parse an attribute word into `(key, value)`.
///
/// The leading `=` is stripped and the rest is split on the first `=` only,
/// so values may themselves contain `=`. A word without a second `=` yields
/// an empty value. Words not starting with `=`, or with an empty key, are not
/// attributes.
///
/// ```
/// use routeros_client::protocol::parse_attribute;
///
/// assert_eq!(parse_attribute("=name=alice"), Some(("name", "alice")));
/// assert_eq!(
///     parse_attribute("=range=10.0.0.1-10.0.0.2=x"),
///     Some(("range", "10.0.0.1-10.0.0.2=x"))
/// );
/// assert_eq!(parse_attribute("!re"), None);
/// ```
pub fn parse_attribute(word: &str) -> Option<(&str, &str)> {
    let rest = word.strip_prefix('=')?;
    let (key, value) = rest.split_once('=').unwrap_or((rest, ""));
    if key.is_empty() {
        return None;
    }
    Some((key, value))
}

/// One sentence: an ordered list of words, terminator excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sentence {
    words: Vec<Bytes>,
}

impl Sentence {
    /// Create a sentence from already-owned words.
    pub fn new(words: Vec<Bytes>) -> Self {
        Self { words }
    }

    /// Create a sentence by copying each word.
    pub fn from_words<I, W>(words: I) -> Self
    where
        I: IntoIterator<Item = W>,
        W: AsRef<[u8]>,
    {
        Self {
            words: words
                .into_iter()
                .map(|w| Bytes::copy_from_slice(w.as_ref()))
                .collect(),
        }
    }

    /// All words in order.
    #[inline]
    pub fn words(&self) -> &[Bytes] {
        &self.words
    }

    /// Consume the sentence, returning its words.
    pub fn into_words(self) -> Vec<Bytes> {
        self.words
    }

    /// Number of words.
    #[inline]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Returns true for the empty (padding) sentence.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// The leading word, if any.
    #[inline]
    pub fn first_word(&self) -> Option<&[u8]> {
        self.words.first().map(|w| &w[..])
    }

    /// Reply kind of the leading word; `None` for an empty sentence.
    pub fn reply_kind(&self) -> Option<ReplyKind> {
        self.first_word().map(ReplyKind::from_word)
    }

    /// Check if this is a `!re` data row.
    #[inline]
    pub fn is_re(&self) -> bool {
        self.reply_kind() == Some(ReplyKind::Re)
    }

    /// Check if this is a `!done` sentence.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.reply_kind() == Some(ReplyKind::Done)
    }

    /// Check if this is a `!trap` sentence.
    #[inline]
    pub fn is_trap(&self) -> bool {
        self.reply_kind() == Some(ReplyKind::Trap)
    }

    /// Check if this is a `!fatal` sentence.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        self.reply_kind() == Some(ReplyKind::Fatal)
    }

    /// Parse every `=key=value` word into a map.
    ///
    /// Non-UTF-8 bytes are replaced lossily. Later duplicates win.
    pub fn attributes(&self) -> AttributeMap {
        let mut map = AttributeMap::new();
        for word in &self.words {
            let text = String::from_utf8_lossy(word);
            if let Some((key, value)) = parse_attribute(&text) {
                map.insert(key.to_string(), value.to_string());
            }
        }
        map
    }

    /// Look up a single attribute without building the whole map.
    pub fn attribute(&self, key: &str) -> Option<String> {
        self.words.iter().rev().find_map(|word| {
            let text = String::from_utf8_lossy(word);
            match parse_attribute(&text) {
                Some((k, v)) if k == key => Some(v.to_string()),
                _ => None,
            }
        })
    }

    /// Words as lossy UTF-8 strings, for diagnostics.
    pub fn to_strings(&self) -> Vec<String> {
        self.words
            .iter()
            .map(|w| String::from_utf8_lossy(w).into_owned())
            .collect()
    }
}

impl<W: AsRef<[u8]>> FromIterator<W> for Sentence {
    fn from_iter<I: IntoIterator<Item = W>>(iter: I) -> Self {
        Self::from_words(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_kind_classification() {
        assert_eq!(ReplyKind::from_word(b"!re"), ReplyKind::Re);
        assert_eq!(ReplyKind::from_word(b"!done"), ReplyKind::Done);
        assert_eq!(ReplyKind::from_word(b"!trap"), ReplyKind::Trap);
        assert_eq!(ReplyKind::from_word(b"!fatal"), ReplyKind::Fatal);
        assert_eq!(ReplyKind::from_word(b"/login"), ReplyKind::Other);
        assert_eq!(ReplyKind::from_word(b"!doneX"), ReplyKind::Other);
        assert!(ReplyKind::Trap.is_error());
        assert!(!ReplyKind::Done.is_error());
    }

    #[test]
    fn test_empty_sentence() {
        let sentence = Sentence::default();
        assert!(sentence.is_empty());
        assert_eq!(sentence.reply_kind(), None);
        assert!(!sentence.is_done());
        assert!(sentence.attributes().is_empty());
    }

    #[test]
    fn test_parse_attribute_splits_on_first_separator() {
        assert_eq!(parse_attribute("=name=alice"), Some(("name", "alice")));
        assert_eq!(
            parse_attribute("=range=10.0.0.1-10.0.0.2=x"),
            Some(("range", "10.0.0.1-10.0.0.2=x"))
        );
        assert_eq!(parse_attribute("=.id=*1A"), Some((".id", "*1A")));
        assert_eq!(parse_attribute("=comment="), Some(("comment", "")));
        assert_eq!(parse_attribute("=disabled"), Some(("disabled", "")));
    }

    #[test]
    fn test_parse_attribute_rejects_non_attributes() {
        assert_eq!(parse_attribute("!re"), None);
        assert_eq!(parse_attribute("name=alice"), None);
        assert_eq!(parse_attribute("=="), None);
        assert_eq!(parse_attribute(""), None);
    }

    #[test]
    fn test_attribute_word() {
        assert_eq!(attribute_word("name", "admin"), "=name=admin");
        assert_eq!(attribute_word("comment", "a=b"), "=comment=a=b");
    }

    #[test]
    fn test_sentence_attributes() {
        let sentence = Sentence::from_words(["!re", "=name=ether1", "=type=ether", ".tag=3"]);
        let attrs = sentence.attributes();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs["name"], "ether1");
        assert_eq!(attrs["type"], "ether");
        assert_eq!(sentence.attribute("type").as_deref(), Some("ether"));
        assert_eq!(sentence.attribute("mtu"), None);
    }

    #[test]
    fn test_sentence_collect_and_strings() {
        let sentence: Sentence = ["!trap", "=message=no such item"].into_iter().collect();
        assert!(sentence.is_trap());
        assert_eq!(sentence.len(), 2);
        assert_eq!(sentence.to_strings(), vec!["!trap", "=message=no such item"]);
        assert_eq!(sentence.first_word(), Some(&b"!trap"[..]));
    }

    #[test]
    fn test_binary_word_preserved() {
        let raw: Vec<u8> = (0..=255).collect();
        let sentence = Sentence::from_words([raw.clone()]);
        assert_eq!(&sentence.words()[0][..], &raw[..]);
        assert_eq!(sentence.reply_kind(), Some(ReplyKind::Other));
    }
}
