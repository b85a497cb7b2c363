//! Raw inbound message as delivered by a transport-receive collaborator.

/// What a physical transport hands over when a message arrives: the broker's
/// own identity and metadata fields, an opaque property mapping, the delivery
/// count it reports, and the body bytes.
///
/// This is a plain data carrier; [`TransportMessage::from_inbound`]
/// (crate::TransportMessage::from_inbound) turns it into an envelope.
#[derive(Debug, Clone, Default)]
pub struct InboundMessage {
    pub id: String,
    pub correlation_id: Option<String>,
    pub content_type: Option<String>,
    pub reply_to: Option<String>,
    /// Transport properties beyond the well-known fields, in arrival order.
    pub properties: Vec<(String, String)>,
    /// Times this message has been presented for processing, as reported by
    /// the transport.
    pub delivery_count: u32,
    pub body: Vec<u8>,
}

impl InboundMessage {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.push((key.into(), value.into()));
        self
    }

    pub fn with_delivery_count(mut self, delivery_count: u32) -> Self {
        self.delivery_count = delivery_count;
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }
}
