//! Shared harness for the end-to-end dispatcher tests.

use async_trait::async_trait;
use dispatch::test_utils::CollectorTransport;
use dispatch::{Dispatcher, HandlerRegistry};
use envelope::headers::keys;
use envelope::{InboundMessage, TransportMessage};
use pipeline::{Behavior, IncomingContext, Next, PipelineContext, PipelineError, PipelineResult};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

/// Install a subscriber honoring `RUST_LOG`; safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Inbound message carrying a declared type, ready for extra fields.
pub fn inbound(id: &str, message_type: &str) -> InboundMessage {
    InboundMessage::new(id).with_property(keys::MESSAGE_TYPE, message_type)
}

/// Handler that replies with the triggering message's body.
pub fn echo_handler(
    ctx: &mut IncomingContext,
) -> Result<Vec<TransportMessage>, PipelineError> {
    let mut reply = TransportMessage::new();
    reply.set_message_type("Echoed");
    reply.set_body(ctx.message().body_bytes())?;
    Ok(vec![reply])
}

/// Dispatcher wired with the echo handler and a collecting transport.
pub fn echo_dispatcher(message_type: &str) -> (Dispatcher, Arc<CollectorTransport>) {
    let transport = Arc::new(CollectorTransport::new());
    let dispatcher = Dispatcher::builder(
        HandlerRegistry::new().register(message_type, echo_handler),
        transport.clone(),
    )
    .build();
    (dispatcher, transport)
}

/// Behavior that yields for a few random milliseconds, to shake out
/// interleaving assumptions in concurrent dispatches.
#[derive(Debug, Clone)]
pub struct Jitter {
    max_millis: u64,
}

impl Jitter {
    pub fn up_to_millis(max_millis: u64) -> Self {
        Self { max_millis }
    }
}

#[async_trait]
impl Behavior<IncomingContext> for Jitter {
    async fn invoke(
        &self,
        ctx: &mut IncomingContext,
        next: Next<'_, IncomingContext>,
    ) -> PipelineResult {
        let millis = rand::thread_rng().gen_range(0..=self.max_millis);
        tokio::time::sleep(Duration::from_millis(millis)).await;
        next.run(ctx).await
    }

    fn name(&self) -> &'static str {
        "Jitter"
    }
}
