//! # Carrier Dispatcher
//!
//! Entry point between the physical transport and the behavior pipelines.
//! On receive it wraps the raw inbound message in a fresh incoming context,
//! runs the incoming chain, and answers the transport with an acknowledge,
//! negative-acknowledge, or dead-letter disposition. On send it wraps the
//! outgoing message and runs the outgoing chain down to the transport-send
//! collaborator.

pub mod config;
pub mod dispatcher;
pub mod handlers;
pub mod test_utils;
pub mod transport;

pub use config::{ConfigError, DispatcherSettings, MiddlewareConfig, PipelineSettings};
pub use dispatcher::{Dispatcher, DispatcherBuilder, Disposition};
pub use handlers::{HandlerRegistry, MessageHandler};
pub use transport::{TransportError, TransportSender};

use pipeline::PipelineError;

/// Failures reported to application code for outbound sends.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("outgoing pipeline faulted: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Result type for dispatch operations
pub type DispatchResult<T> = std::result::Result<T, DispatchError>;
