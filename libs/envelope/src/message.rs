//! The transport message envelope.

use crate::headers::{keys, Headers};
use crate::{Address, EnvelopeError, EnvelopeResult, InboundMessage, MessageIntent};
use bytes::BytesMut;
use uuid::Uuid;

/// The envelope: identity, correlation, content metadata, reply address,
/// message intent, and an opaque body payload.
///
/// Every typed property is a view onto one reserved header key; the header
/// store itself is exposed read-only and mutated only through these
/// accessors (plus [`set_header`](TransportMessage::set_header) for
/// non-reserved keys). The shape of the message never changes after
/// construction — only values do, and by convention not after the message
/// has been handed to a transport for send.
#[derive(Debug, Clone)]
pub struct TransportMessage {
    headers: Headers,
    body: Option<BytesMut>,
    delivery_count: u32,
}

impl TransportMessage {
    /// Fresh message created by sending code.
    ///
    /// The id is a 128-bit time-ordered random value (UUIDv7) rendered as
    /// its canonical string, so ids sort close to creation order. The
    /// correlation id starts equal to the id: a message correlates with
    /// itself until told otherwise.
    pub fn new() -> Self {
        let id = Uuid::now_v7().to_string();
        let mut headers = Headers::new();
        headers.set(keys::MESSAGE_ID, id.clone());
        headers.set(keys::CORRELATION_ID, id);
        headers.set_opt(keys::CONTENT_TYPE, None);
        headers.set_opt(keys::REPLY_TO, None);
        headers.set_opt(keys::MESSAGE_TYPE, None);
        headers.set_opt(keys::MESSAGE_INTENT, None);
        Self {
            headers,
            body: None,
            delivery_count: 0,
        }
    }

    /// Reconstruct an envelope from a transport-delivered message.
    ///
    /// The transport's well-known fields populate the reserved headers (a
    /// missing correlation id falls back to the message id). Every other
    /// transport property becomes an additional header entry, skipping any
    /// key whose value is already populated — so a property can fill an
    /// unset reserved key such as `MessageType`, but cannot clobber the id.
    pub fn from_inbound(inbound: InboundMessage) -> Self {
        let mut message = Self::new();
        let correlation_id = inbound
            .correlation_id
            .unwrap_or_else(|| inbound.id.clone());
        message.headers.set(keys::MESSAGE_ID, inbound.id);
        message.headers.set(keys::CORRELATION_ID, correlation_id);
        message
            .headers
            .set_opt(keys::CONTENT_TYPE, inbound.content_type);
        message.headers.set_opt(keys::REPLY_TO, inbound.reply_to);

        for (key, value) in inbound.properties {
            if message.headers.get(&key).is_none() {
                message.headers.set(key, value);
            }
        }

        message.delivery_count = inbound.delivery_count;
        message.body = Some(BytesMut::from(&inbound.body[..]));
        message
    }

    /// Immutable unique identifier, assigned at construction.
    pub fn id(&self) -> &str {
        self.headers
            .get(keys::MESSAGE_ID)
            .expect("message id is populated at construction")
    }

    pub fn correlation_id(&self) -> &str {
        self.headers
            .get(keys::CORRELATION_ID)
            .expect("correlation id is populated at construction")
    }

    pub fn set_correlation_id(&mut self, correlation_id: impl Into<String>) {
        self.headers.set(keys::CORRELATION_ID, correlation_id);
    }

    /// Declared body encoding, e.g. a MIME-like tag.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(keys::CONTENT_TYPE)
    }

    pub fn set_content_type(&mut self, content_type: impl Into<String>) {
        self.headers.set(keys::CONTENT_TYPE, content_type);
    }

    /// Logical type name used for deserialization dispatch.
    pub fn message_type(&self) -> Option<&str> {
        self.headers.get(keys::MESSAGE_TYPE)
    }

    pub fn set_message_type(&mut self, message_type: impl Into<String>) {
        self.headers.set(keys::MESSAGE_TYPE, message_type);
    }

    /// Declared delivery semantics. Absent or unrecognized header values
    /// yield [`MessageIntent::Unknown`], never an error.
    pub fn intent(&self) -> MessageIntent {
        MessageIntent::parse(self.headers.get(keys::MESSAGE_INTENT))
    }

    pub fn set_intent(&mut self, intent: MessageIntent) {
        self.headers.set(keys::MESSAGE_INTENT, intent.as_str());
    }

    /// Destination a response should be sent to.
    ///
    /// An unset header is `None`; a malformed stored value is a hard
    /// [`EnvelopeError::MalformedHeader`] fault, since address correctness
    /// matters for routing.
    pub fn reply_to(&self) -> EnvelopeResult<Option<Address>> {
        match self.headers.get(keys::REPLY_TO) {
            None => Ok(None),
            Some(raw) => Address::parse(raw)
                .map(Some)
                .map_err(|e| EnvelopeError::MalformedHeader {
                    key: keys::REPLY_TO,
                    reason: e.to_string(),
                }),
        }
    }

    pub fn set_reply_to(&mut self, address: &Address) {
        self.headers.set(keys::REPLY_TO, address.to_string());
    }

    /// Times this message has been presented for processing. Zero for fresh
    /// messages; transport-reported for reconstructed ones.
    pub fn delivery_count(&self) -> u32 {
        self.delivery_count
    }

    /// Read-only view of the full header store.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Set a non-reserved header. Reserved keys go through the typed
    /// accessors above.
    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.headers.set(key, value);
    }

    /// Writable body payload. If no body was ever assigned this creates and
    /// returns an empty buffer, so downstream code can always write into it
    /// without an existence check.
    pub fn body(&mut self) -> &mut BytesMut {
        self.body.get_or_insert_with(BytesMut::new)
    }

    /// Body bytes for reading; empty if no body was ever assigned.
    pub fn body_bytes(&self) -> &[u8] {
        self.body.as_deref().unwrap_or(&[])
    }

    /// Assign the body payload. The body may be set at most once per
    /// message instance; a second assignment is an
    /// [`EnvelopeError::BodyAlreadySet`] fault. Note that reading
    /// [`body`](TransportMessage::body) materializes an empty buffer, which
    /// counts as the one assignment.
    pub fn set_body(&mut self, body: impl Into<BytesMut>) -> EnvelopeResult<()> {
        if self.body.is_some() {
            return Err(EnvelopeError::BodyAlreadySet {
                message_id: self.id().to_string(),
            });
        }
        self.body = Some(body.into());
        Ok(())
    }

    /// Hand the body to a transport, leaving the message without one.
    pub fn take_body(&mut self) -> BytesMut {
        self.body.take().unwrap_or_default()
    }

    /// Read-only view of the failure-information headers, keyed by the
    /// reserved failure prefix (matched case-insensitively). Used when
    /// handing a message to a dead-letter path; the original headers are
    /// untouched.
    pub fn dead_letter_headers(&self) -> Headers {
        self.headers.with_key_prefix(keys::FAILURE_PREFIX)
    }
}

impl Default for TransportMessage {
    fn default() -> Self {
        Self::new()
    }
}
