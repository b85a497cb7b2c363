//! The dispatcher: transport-facing entry point for both directions.

use crate::config::{DispatcherSettings, MiddlewareConfig};
use crate::handlers::{HandlerRegistry, HandlerTerminal};
use crate::transport::TransportSender;
use crate::{DispatchError, DispatchResult};
use async_trait::async_trait;
use envelope::headers::keys;
use envelope::{Address, Headers, InboundMessage, TransportMessage};
use pipeline::{
    Behavior, CorrelationStamp, DeliveryCountLimit, IncomingContext, IncomingSnapshot,
    IntentAudit, OutgoingContext, Pipeline, PipelineBuilder, PipelineContext, PipelineError,
    PipelineOutcome, PipelineResult, Terminal,
};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, warn};

/// What the dispatcher tells the transport-receive collaborator to do with
/// an inbound message.
#[derive(Debug)]
pub enum Disposition {
    /// Processing completed or deliberately short-circuited; the transport
    /// may discard its copy.
    Ack,
    /// Processing did not finish but the message is worth redelivering
    /// (cancellation, a send failure the transport reports recoverable).
    /// Redelivery policy belongs to the transport.
    Nack { reason: String },
    /// Processing failed unrecoverably; route the message to the
    /// dead-letter path with the captured failure headers.
    DeadLetter { headers: Headers, reason: String },
}

impl Disposition {
    pub fn is_ack(&self) -> bool {
        matches!(self, Disposition::Ack)
    }

    pub fn is_nack(&self) -> bool {
        matches!(self, Disposition::Nack { .. })
    }

    pub fn is_dead_letter(&self) -> bool {
        matches!(self, Disposition::DeadLetter { .. })
    }
}

/// Terminal step of the outgoing chain: hand the message and its resolved
/// destination to the transport-send collaborator.
#[derive(Debug)]
struct SendTerminal {
    sender: Arc<dyn TransportSender>,
}

#[async_trait]
impl Terminal<OutgoingContext> for SendTerminal {
    async fn call(&self, ctx: &mut OutgoingContext) -> PipelineResult {
        let destination = ctx.destination()?.clone();
        // The payload moves to the transport; behaviors unwinding after the
        // terminal see the message without its body.
        let body = ctx.message_mut().take_body();
        let mut message = ctx.message().clone();
        message.set_body(body)?;
        self.sender
            .send(message, destination)
            .await
            .map_err(|e| PipelineError::Send {
                recoverable: e.is_recoverable(),
                reason: e.to_string(),
            })
    }
}

/// Entry point that builds contexts, runs the pipelines, and reports each
/// run's terminal outcome to its caller.
///
/// The behavior chains and handler registry are fixed at build time;
/// concurrent dispatches share them read-only, and every dispatch gets its
/// own context.
#[derive(Debug)]
pub struct Dispatcher {
    settings: DispatcherSettings,
    incoming: Pipeline<IncomingContext>,
    outgoing: Pipeline<OutgoingContext>,
    handler_terminal: HandlerTerminal,
    send_terminal: SendTerminal,
}

impl Dispatcher {
    pub fn builder(registry: HandlerRegistry, sender: Arc<dyn TransportSender>) -> DispatcherBuilder {
        DispatcherBuilder::new(registry, sender)
    }

    /// Process one transport-delivered message and report its disposition.
    #[instrument(
        skip(self, inbound, cancellation),
        fields(dispatcher = %self.settings.name, message_id = %inbound.id)
    )]
    pub async fn dispatch_inbound(
        &self,
        inbound: InboundMessage,
        cancellation: CancellationToken,
    ) -> Disposition {
        let message = TransportMessage::from_inbound(inbound);
        let mut ctx = IncomingContext::with_cancellation(message, cancellation.clone());

        match self.incoming.run(&mut ctx, &self.handler_terminal).await {
            PipelineOutcome::Completed => match self.dispatch_replies(&mut ctx, cancellation).await
            {
                Ok(()) => {
                    debug!("inbound run completed");
                    Disposition::Ack
                }
                Err(DispatchError::Pipeline(e)) if is_redeliverable(&e) => {
                    warn!(error = %e, "reply dispatch did not finish, requesting redelivery");
                    Disposition::Nack {
                        reason: e.to_string(),
                    }
                }
                Err(DispatchError::Pipeline(e)) => self.dead_letter(ctx, e),
            },
            PipelineOutcome::ShortCircuited => {
                debug!("inbound run short-circuited");
                Disposition::Ack
            }
            PipelineOutcome::Faulted(e) if e.is_cancellation() => {
                warn!("inbound run cancelled");
                Disposition::Nack {
                    reason: e.to_string(),
                }
            }
            PipelineOutcome::Faulted(e) => self.dead_letter(ctx, e),
        }
    }

    /// Send one message on behalf of application code.
    #[instrument(
        skip(self, message, cancellation),
        fields(dispatcher = %self.settings.name, message_id = %message.id())
    )]
    pub async fn dispatch_outbound(
        &self,
        message: TransportMessage,
        destination: Address,
        cancellation: CancellationToken,
    ) -> DispatchResult<()> {
        let mut ctx = OutgoingContext::with_cancellation(message, cancellation);
        ctx.set_destination(destination);
        self.run_outgoing(&mut ctx).await
    }

    /// Drain handler replies onto the outgoing pipeline, correlated back to
    /// the triggering message.
    async fn dispatch_replies(
        &self,
        ctx: &mut IncomingContext,
        cancellation: CancellationToken,
    ) -> DispatchResult<()> {
        let replies = ctx.take_replies();
        if replies.is_empty() {
            return Ok(());
        }

        let snapshot = IncomingSnapshot::capture(ctx.message()).map_err(PipelineError::from)?;
        debug!(replies = replies.len(), "dispatching handler replies");
        for reply in replies {
            let mut reply_ctx =
                OutgoingContext::reply_to(reply, snapshot.clone(), cancellation.clone());
            self.run_outgoing(&mut reply_ctx).await?;
        }
        Ok(())
    }

    async fn run_outgoing(&self, ctx: &mut OutgoingContext) -> DispatchResult<()> {
        match self.outgoing.run(ctx, &self.send_terminal).await {
            PipelineOutcome::Completed | PipelineOutcome::ShortCircuited => Ok(()),
            PipelineOutcome::Faulted(e) => Err(e.into()),
        }
    }

    fn dead_letter(&self, mut ctx: IncomingContext, cause: PipelineError) -> Disposition {
        let message = ctx.message_mut();
        stamp_failure_headers(message, &cause);
        let headers = message.dead_letter_headers();
        error!(message_id = message.id(), error = %cause, "dead-lettering message");
        Disposition::DeadLetter {
            headers,
            reason: cause.to_string(),
        }
    }
}

/// Faults that a redelivery might resolve; everything else dead-letters.
/// A send the transport classifies unrecoverable (rejected outright) is as
/// final as any other fault.
fn is_redeliverable(error: &PipelineError) -> bool {
    matches!(
        error,
        PipelineError::Cancelled
            | PipelineError::Send {
                recoverable: true,
                ..
            }
    )
}

fn stamp_failure_headers(message: &mut TransportMessage, cause: &PipelineError) {
    let time_of_failure = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let delivery_count = message.delivery_count();
    message.set_header(failure_key("Reason"), cause.to_string());
    message.set_header(failure_key("ErrorKind"), cause.kind());
    message.set_header(failure_key("TimeOfFailure"), time_of_failure.to_string());
    message.set_header(failure_key("DeliveryCount"), delivery_count.to_string());
}

fn failure_key(suffix: &str) -> String {
    format!("{}{suffix}", keys::FAILURE_PREFIX)
}

/// Assembles a [`Dispatcher`]: behavior chains, handler registry, transport
/// sender, settings.
///
/// Two behaviors are always wired in: the delivery-count dead-letter policy
/// at the head of the incoming chain, and correlation propagation at the
/// head of the outgoing chain, so replies carry their conversation even
/// with an otherwise empty chain.
pub struct DispatcherBuilder {
    settings: DispatcherSettings,
    trace_behaviors: bool,
    registry: HandlerRegistry,
    sender: Arc<dyn TransportSender>,
    incoming: PipelineBuilder<IncomingContext>,
    outgoing: PipelineBuilder<OutgoingContext>,
}

impl DispatcherBuilder {
    pub fn new(registry: HandlerRegistry, sender: Arc<dyn TransportSender>) -> Self {
        Self {
            settings: DispatcherSettings::default(),
            trace_behaviors: false,
            registry,
            sender,
            incoming: PipelineBuilder::new(),
            outgoing: PipelineBuilder::new(),
        }
    }

    pub fn settings(mut self, settings: DispatcherSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn config(mut self, config: &MiddlewareConfig) -> Self {
        self.trace_behaviors = config.pipeline.trace_behaviors;
        self.settings(config.dispatcher.clone())
    }

    /// Append a behavior to the incoming chain, in registration order.
    pub fn incoming_behavior(
        mut self,
        behavior: impl Behavior<IncomingContext> + 'static,
    ) -> Self {
        self.incoming = self.incoming.register(behavior);
        self
    }

    /// Append a behavior to the outgoing chain, in registration order.
    pub fn outgoing_behavior(
        mut self,
        behavior: impl Behavior<OutgoingContext> + 'static,
    ) -> Self {
        self.outgoing = self.outgoing.register(behavior);
        self
    }

    pub fn build(self) -> Dispatcher {
        let mut incoming = self
            .incoming
            .register_first(DeliveryCountLimit::new(self.settings.max_deliveries));
        if self.trace_behaviors {
            incoming = incoming.register_first(IntentAudit);
        }
        let incoming = incoming.build();
        let outgoing = self.outgoing.register_first(CorrelationStamp).build();

        Dispatcher {
            settings: self.settings,
            incoming,
            outgoing,
            handler_terminal: HandlerTerminal::new(Arc::new(self.registry)),
            send_terminal: SendTerminal {
                sender: self.sender,
            },
        }
    }
}
