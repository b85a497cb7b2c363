//! Ordered header store carried by every message.
//!
//! Keys are case-sensitive and unique. A key present with an unset value is
//! distinct from an absent key and from a key holding an empty string; the
//! typed accessors on [`TransportMessage`](crate::TransportMessage) rely on
//! that distinction for the reserved keys.

use serde::{Deserialize, Serialize};

/// Reserved header keys.
///
/// These exact strings are part of the interoperability contract and must
/// stay stable across implementations. All six reserved keys exist on a
/// newly constructed message; only the id and correlation id are populated.
pub mod keys {
    pub const MESSAGE_ID: &str = "MessageId";
    pub const CORRELATION_ID: &str = "CorrelationId";
    pub const CONTENT_TYPE: &str = "ContentType";
    pub const REPLY_TO: &str = "ReplyTo";
    pub const MESSAGE_TYPE: &str = "MessageType";
    pub const MESSAGE_INTENT: &str = "MessageIntent";

    /// Prefix for failure-information headers carried to the dead-letter
    /// path. Matched case-insensitively on extraction.
    pub const FAILURE_PREFIX: &str = "Failures.";

    /// All reserved single-value keys, in the order they are seeded.
    pub const RESERVED: [&str; 6] = [
        MESSAGE_ID,
        CORRELATION_ID,
        CONTENT_TYPE,
        REPLY_TO,
        MESSAGE_TYPE,
        MESSAGE_INTENT,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct HeaderEntry {
    key: String,
    value: Option<String>,
}

/// Insertion-ordered mapping of header key to optional value.
///
/// Backed by a vector of entries: header sets are small (the reserved keys
/// plus a handful of transport properties) and deterministic iteration keeps
/// serialization and the dead-letter view stable. Lookup is a linear scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headers {
    entries: Vec<HeaderEntry>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value for `key`, if the key is present and its value is set.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .and_then(|e| e.value.as_deref())
    }

    /// Whether `key` is present, set or not.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|e| e.key == key)
    }

    /// Set `key` to `value`, replacing any previous value in place so the
    /// key keeps its original position.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.set_opt(key, Some(value.into()));
    }

    /// Set `key` to an optional value. `None` records the key as present
    /// but unset.
    pub fn set_opt(&mut self, key: impl Into<String>, value: Option<String>) {
        let key = key.into();
        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(entry) => entry.value = value,
            None => self.entries.push(HeaderEntry { key, value }),
        }
    }

    /// Remove `key` entirely, returning its value if one was set.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.entries.iter().position(|e| e.key == key)?;
        self.entries.remove(index).value
    }

    /// Iterate all pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries
            .iter()
            .map(|e| (e.key.as_str(), e.value.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of all headers whose key starts with `prefix`, matched
    /// case-insensitively. The original store is untouched.
    pub fn with_key_prefix(&self, prefix: &str) -> Headers {
        // Keys are arbitrary transport strings; compare bytes so a
        // multibyte character straddling the prefix length cannot panic.
        let entries = self
            .entries
            .iter()
            .filter(|e| {
                e.key.len() >= prefix.len()
                    && e.key.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
            })
            .cloned()
            .collect();
        Headers { entries }
    }
}
