//! Built-in behaviors for the common envelope-processing steps.

use crate::behavior::{Behavior, Next};
use crate::context::{IncomingContext, OutgoingContext, PipelineContext};
use crate::{PipelineError, PipelineResult};
use async_trait::async_trait;
use envelope::MessageIntent;
use tracing::{debug, warn};

/// Incoming dead-letter policy: fault the run once the transport has
/// presented the message more often than allowed, so the dispatcher routes
/// it to the dead-letter path instead of looping forever.
#[derive(Debug, Clone)]
pub struct DeliveryCountLimit {
    max_deliveries: u32,
}

impl DeliveryCountLimit {
    pub fn new(max_deliveries: u32) -> Self {
        Self { max_deliveries }
    }
}

#[async_trait]
impl Behavior<IncomingContext> for DeliveryCountLimit {
    async fn invoke(&self, ctx: &mut IncomingContext, next: Next<'_, IncomingContext>) -> PipelineResult {
        let delivery_count = ctx.message().delivery_count();
        if delivery_count > self.max_deliveries {
            warn!(
                message_id = ctx.message().id(),
                delivery_count, "delivery limit exceeded"
            );
            return Err(PipelineError::Behavior {
                behavior: "DeliveryCountLimit",
                reason: format!(
                    "presented {delivery_count} times, limit is {}",
                    self.max_deliveries
                ),
            });
        }
        next.run(ctx).await
    }

    fn name(&self) -> &'static str {
        "DeliveryCountLimit"
    }
}

/// Incoming audit step: traces what came in, and how the rest of the chain
/// fared, on the way back out.
#[derive(Debug, Clone, Default)]
pub struct IntentAudit;

#[async_trait]
impl Behavior<IncomingContext> for IntentAudit {
    async fn invoke(&self, ctx: &mut IncomingContext, next: Next<'_, IncomingContext>) -> PipelineResult {
        let intent = ctx.message().intent();
        debug!(
            message_id = ctx.message().id(),
            %intent,
            message_type = ctx.message().message_type().unwrap_or("<none>"),
            "message entering incoming chain"
        );
        let result = next.run(ctx).await;
        debug!(
            message_id = ctx.message().id(),
            faulted = result.is_err(),
            "message left incoming chain"
        );
        result
    }

    fn name(&self) -> &'static str {
        "IntentAudit"
    }
}

/// Outgoing correlation propagation for replies.
///
/// When the context carries a snapshot of the triggering incoming message,
/// the outgoing message adopts its correlation id, is stamped with `Reply`
/// intent, and — unless a routing hint was already set — is routed to the
/// triggering message's reply address.
#[derive(Debug, Clone, Default)]
pub struct CorrelationStamp;

#[async_trait]
impl Behavior<OutgoingContext> for CorrelationStamp {
    async fn invoke(&self, ctx: &mut OutgoingContext, next: Next<'_, OutgoingContext>) -> PipelineResult {
        if let Some(snapshot) = ctx.try_incoming().cloned() {
            ctx.message_mut().set_correlation_id(snapshot.correlation_id);
            ctx.message_mut().set_intent(MessageIntent::Reply);
            if ctx.try_destination().is_none() {
                if let Some(reply_to) = snapshot.reply_to {
                    ctx.set_destination(reply_to);
                }
            }
        }
        next.run(ctx).await
    }

    fn name(&self) -> &'static str {
        "CorrelationStamp"
    }
}

/// Outgoing header stamping: a message leaving without a declared intent is
/// a point-to-point send.
#[derive(Debug, Clone, Default)]
pub struct DispatchStamp;

#[async_trait]
impl Behavior<OutgoingContext> for DispatchStamp {
    async fn invoke(&self, ctx: &mut OutgoingContext, next: Next<'_, OutgoingContext>) -> PipelineResult {
        if ctx.message().intent() == MessageIntent::Unknown {
            ctx.message_mut().set_intent(MessageIntent::Send);
        }
        next.run(ctx).await
    }

    fn name(&self) -> &'static str {
        "DispatchStamp"
    }
}
