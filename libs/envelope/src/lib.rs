//! # Carrier Message Envelope
//!
//! Wire-agnostic envelope exchanged between a sender and a receiver: an
//! ordered header store with typed accessors over the reserved keys, a
//! lazily-materialized body payload, and the reconstruction path for
//! messages arriving from a physical transport.

pub mod address;
pub mod headers;
pub mod inbound;
pub mod intent;
pub mod message;

pub use address::Address;
pub use headers::{keys, Headers};
pub use inbound::InboundMessage;
pub use intent::MessageIntent;
pub use message::TransportMessage;

/// Envelope-level errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum EnvelopeError {
    /// Programmatic misuse: the body may be assigned at most once.
    #[error("body is already set on message {message_id}")]
    BodyAlreadySet { message_id: String },

    #[error("malformed address {input:?}: {reason}")]
    MalformedAddress { input: String, reason: &'static str },

    /// A reserved header holds a value that does not parse, where
    /// correctness is required (reply addresses matter for routing).
    #[error("malformed value for header '{key}': {reason}")]
    MalformedHeader { key: &'static str, reason: String },
}

impl EnvelopeError {
    /// Programmatic misuse, surfaced immediately to the caller and never
    /// worth retrying.
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, EnvelopeError::BodyAlreadySet { .. })
    }

    /// Unparsable input that must surface as a fault rather than a default.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            EnvelopeError::MalformedAddress { .. } | EnvelopeError::MalformedHeader { .. }
        )
    }

    pub fn malformed_address(input: impl Into<String>, reason: &'static str) -> Self {
        EnvelopeError::MalformedAddress {
            input: input.into(),
            reason,
        }
    }
}

/// Result type for envelope operations
pub type EnvelopeResult<T> = std::result::Result<T, EnvelopeError>;
