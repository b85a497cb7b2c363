//! # Carrier Behavior Pipelines
//!
//! The extensible processing chain that inspects and transforms a message
//! envelope as it flows inbound (transport to application) and outbound
//! (application to transport). A pipeline is an ordered, immutable chain of
//! behaviors; each behavior may act before and after delegating to the
//! remainder of the chain, decline to continue (short-circuit), or fail
//! (fault). The chain definition is built once at startup and shared across
//! concurrent runs without synchronization.

pub mod behavior;
pub mod behaviors;
pub mod chain;
pub mod context;
pub mod test_utils;

pub use behavior::{Behavior, IncomingBehavior, Next, OutgoingBehavior, Terminal};
pub use behaviors::{CorrelationStamp, DeliveryCountLimit, DispatchStamp, IntentAudit};
pub use chain::{Pipeline, PipelineBuilder, PipelineOutcome, RunState};
pub use context::{
    ContextRole, IncomingContext, IncomingSnapshot, OutgoingContext, PipelineContext,
};

use envelope::EnvelopeError;

/// Faults a pipeline run can end in.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PipelineError {
    /// A behavior asked for an ambient value no one put in the context.
    /// This is a wiring error in the behavior chain, fatal to the run.
    #[error("required context value missing: {0}")]
    MissingContextValue(ContextRole),

    /// The run's cancellation signal fired. Reported distinctly so callers
    /// can decide not to dead-letter.
    #[error("run cancelled")]
    Cancelled,

    /// The terminal application handler raised an error.
    #[error("handler failed: {0}")]
    Handler(String),

    /// A behavior aborted the chain.
    #[error("behavior '{behavior}' failed: {reason}")]
    Behavior {
        behavior: &'static str,
        reason: String,
    },

    /// The transport-send collaborator at the outgoing terminal failed.
    /// `recoverable` carries the transport's own classification, so the
    /// dispatcher can choose redelivery over dead-lettering.
    #[error("transport send failed: {reason}")]
    Send { reason: String, recoverable: bool },

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
}

impl PipelineError {
    pub fn handler(reason: impl Into<String>) -> Self {
        PipelineError::Handler(reason.into())
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, PipelineError::Cancelled)
    }

    /// Stable tag for the failure-information headers.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::MissingContextValue(_) => "missing-context-value",
            PipelineError::Cancelled => "cancelled",
            PipelineError::Handler(_) => "handler-failure",
            PipelineError::Behavior { .. } => "behavior-failure",
            PipelineError::Send { .. } => "send-failure",
            PipelineError::Envelope(e) if e.is_invalid_state() => "invalid-state",
            PipelineError::Envelope(_) => "malformed",
        }
    }
}

/// Result type for behavior and terminal invocations
pub type PipelineResult = std::result::Result<(), PipelineError>;
