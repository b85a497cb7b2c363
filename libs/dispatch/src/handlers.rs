//! Handler registry collaborator: maps a message type to application code.

use async_trait::async_trait;
use envelope::TransportMessage;
use pipeline::{IncomingContext, PipelineContext, PipelineError, PipelineResult, Terminal};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Application callback for one logical message type.
///
/// Invoked as the terminal step of the incoming pipeline with the run's
/// context; any returned messages are enqueued as replies onto the outgoing
/// pipeline with correlation propagated.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(
        &self,
        ctx: &mut IncomingContext,
    ) -> Result<Vec<TransportMessage>, PipelineError>;
}

#[async_trait]
impl<F> MessageHandler for F
where
    F: Fn(&mut IncomingContext) -> Result<Vec<TransportMessage>, PipelineError> + Send + Sync,
{
    async fn handle(
        &self,
        ctx: &mut IncomingContext,
    ) -> Result<Vec<TransportMessage>, PipelineError> {
        self(ctx)
    }
}

/// Registry of handlers keyed by the `MessageType` header string.
///
/// Built once at startup and immutable thereafter, like the behavior
/// chains.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn MessageHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `message_type`, replacing any previous
    /// registration for that type.
    pub fn register(
        mut self,
        message_type: impl Into<String>,
        handler: impl MessageHandler + 'static,
    ) -> Self {
        self.handlers.insert(message_type.into(), Arc::new(handler));
        self
    }

    pub fn resolve(&self, message_type: &str) -> Option<Arc<dyn MessageHandler>> {
        self.handlers.get(message_type).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<_> = self.handlers.keys().collect();
        types.sort();
        f.debug_struct("HandlerRegistry")
            .field("message_types", &types)
            .finish()
    }
}

/// Terminal step of the incoming chain: resolve the handler for the
/// message's declared type, invoke it, and queue its replies on the
/// context.
#[derive(Debug)]
pub(crate) struct HandlerTerminal {
    registry: Arc<HandlerRegistry>,
}

impl HandlerTerminal {
    pub(crate) fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Terminal<IncomingContext> for HandlerTerminal {
    async fn call(&self, ctx: &mut IncomingContext) -> PipelineResult {
        let message_type = ctx
            .message()
            .message_type()
            .ok_or_else(|| PipelineError::handler("message declares no type"))?
            .to_string();

        let handler = self.registry.resolve(&message_type).ok_or_else(|| {
            PipelineError::handler(format!("no handler registered for '{message_type}'"))
        })?;

        let replies = handler.handle(ctx).await?;
        debug!(
            message_id = ctx.message().id(),
            message_type, replies = replies.len(),
            "handler completed"
        );
        for reply in replies {
            ctx.push_reply(reply);
        }
        Ok(())
    }
}
