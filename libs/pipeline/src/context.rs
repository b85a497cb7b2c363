//! Execution contexts passed through a pipeline run.
//!
//! Rather than an open type-keyed bag, the ambient values of a run form a
//! closed set of roles, one slot each. Required roles are populated at
//! construction and have infallible accessors; optional roles fail loudly
//! with [`PipelineError::MissingContextValue`] when accessed as required,
//! and expose `try_`-prefixed accessors for behaviors that can proceed
//! without them. Writing a role replaces the previous value (last write
//! wins). Each run owns its context exclusively.

use crate::PipelineError;
use envelope::{Address, EnvelopeResult, TransportMessage};
use std::fmt;
use tokio_util::sync::CancellationToken;

/// Names the ambient roles a context can carry; used in
/// [`PipelineError::MissingContextValue`] to say which one was absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextRole {
    Message,
    Cancellation,
    Destination,
    IncomingSnapshot,
}

impl fmt::Display for ContextRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContextRole::Message => "message",
            ContextRole::Cancellation => "cancellation",
            ContextRole::Destination => "destination",
            ContextRole::IncomingSnapshot => "incoming-snapshot",
        };
        f.write_str(name)
    }
}

/// Ambient values every pipeline context carries, regardless of direction.
pub trait PipelineContext: Send {
    /// The message this run is processing.
    fn message(&self) -> &TransportMessage;

    fn message_mut(&mut self) -> &mut TransportMessage;

    /// Cancellation signal for this run. Checked between behaviors and
    /// at suspension points.
    fn cancellation(&self) -> &CancellationToken;
}

/// Context for a message arriving from a transport.
#[derive(Debug)]
pub struct IncomingContext {
    message: TransportMessage,
    cancellation: CancellationToken,
    destination: Option<Address>,
    replies: Vec<TransportMessage>,
}

impl IncomingContext {
    /// Wrap one inbound message with a fresh, never-fired cancellation
    /// signal.
    pub fn new(message: TransportMessage) -> Self {
        Self::with_cancellation(message, CancellationToken::new())
    }

    pub fn with_cancellation(message: TransportMessage, cancellation: CancellationToken) -> Self {
        Self {
            message,
            cancellation,
            destination: None,
            replies: Vec::new(),
        }
    }

    /// Routing hint, required form.
    pub fn destination(&self) -> Result<&Address, PipelineError> {
        self.destination
            .as_ref()
            .ok_or(PipelineError::MissingContextValue(ContextRole::Destination))
    }

    pub fn try_destination(&self) -> Option<&Address> {
        self.destination.as_ref()
    }

    pub fn set_destination(&mut self, destination: Address) {
        self.destination = Some(destination);
    }

    /// Queue a reply produced by the application handler; the dispatcher
    /// drains these onto the outgoing pipeline after the run completes.
    pub fn push_reply(&mut self, reply: TransportMessage) {
        self.replies.push(reply);
    }

    pub fn take_replies(&mut self) -> Vec<TransportMessage> {
        std::mem::take(&mut self.replies)
    }

    pub fn into_message(self) -> TransportMessage {
        self.message
    }
}

impl PipelineContext for IncomingContext {
    fn message(&self) -> &TransportMessage {
        &self.message
    }

    fn message_mut(&mut self) -> &mut TransportMessage {
        &mut self.message
    }

    fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}

/// What an outgoing reply needs to remember about the message that
/// triggered it. A snapshot rather than a borrow, so the outgoing run owns
/// its context outright.
#[derive(Debug, Clone)]
pub struct IncomingSnapshot {
    pub message_id: String,
    pub correlation_id: String,
    pub reply_to: Option<Address>,
}

impl IncomingSnapshot {
    /// Capture correlation data from an incoming message. Fails if the
    /// stored reply address is malformed.
    pub fn capture(message: &TransportMessage) -> EnvelopeResult<Self> {
        Ok(Self {
            message_id: message.id().to_string(),
            correlation_id: message.correlation_id().to_string(),
            reply_to: message.reply_to()?,
        })
    }
}

/// Context for a message about to be handed to a transport.
#[derive(Debug)]
pub struct OutgoingContext {
    message: TransportMessage,
    cancellation: CancellationToken,
    destination: Option<Address>,
    incoming: Option<IncomingSnapshot>,
}

impl OutgoingContext {
    pub fn new(message: TransportMessage) -> Self {
        Self::with_cancellation(message, CancellationToken::new())
    }

    pub fn with_cancellation(message: TransportMessage, cancellation: CancellationToken) -> Self {
        Self {
            message,
            cancellation,
            destination: None,
            incoming: None,
        }
    }

    /// Context for a reply, carrying the triggering message's correlation
    /// snapshot.
    pub fn reply_to(
        message: TransportMessage,
        incoming: IncomingSnapshot,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            message,
            cancellation,
            destination: None,
            incoming: Some(incoming),
        }
    }

    pub fn destination(&self) -> Result<&Address, PipelineError> {
        self.destination
            .as_ref()
            .ok_or(PipelineError::MissingContextValue(ContextRole::Destination))
    }

    pub fn try_destination(&self) -> Option<&Address> {
        self.destination.as_ref()
    }

    pub fn set_destination(&mut self, destination: Address) {
        self.destination = Some(destination);
    }

    /// Correlated incoming snapshot, required form.
    pub fn incoming(&self) -> Result<&IncomingSnapshot, PipelineError> {
        self.incoming.as_ref().ok_or(PipelineError::MissingContextValue(
            ContextRole::IncomingSnapshot,
        ))
    }

    pub fn try_incoming(&self) -> Option<&IncomingSnapshot> {
        self.incoming.as_ref()
    }

    pub fn into_message(self) -> TransportMessage {
        self.message
    }
}

impl PipelineContext for OutgoingContext {
    fn message(&self) -> &TransportMessage {
        &self.message
    }

    fn message_mut(&mut self) -> &mut TransportMessage {
        &mut self.message
    }

    fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}
