//! Declared delivery semantics of a message.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Delivery semantics declared by the sender.
///
/// Stored in the `MessageIntent` reserved header as its string form. Parsing
/// is deliberately lenient: an absent, empty, or unrecognized value yields
/// [`MessageIntent::Unknown`] rather than failing the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageIntent {
    /// Point-to-point send to a single destination.
    Send,
    /// Broadcast to all interested subscribers.
    Publish,
    /// Correlated response to an earlier message.
    Reply,
    /// Intent was never declared or could not be recognized.
    Unknown,
}

impl MessageIntent {
    /// Parse the stored header string, case-insensitively.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some(s) if s.eq_ignore_ascii_case("send") => MessageIntent::Send,
            Some(s) if s.eq_ignore_ascii_case("publish") => MessageIntent::Publish,
            Some(s) if s.eq_ignore_ascii_case("reply") => MessageIntent::Reply,
            _ => MessageIntent::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageIntent::Send => "Send",
            MessageIntent::Publish => "Publish",
            MessageIntent::Reply => "Reply",
            MessageIntent::Unknown => "Unknown",
        }
    }
}

impl Default for MessageIntent {
    fn default() -> Self {
        MessageIntent::Unknown
    }
}

impl fmt::Display for MessageIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
