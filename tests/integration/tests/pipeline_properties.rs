//! Chain-of-responsibility properties observed through the dispatcher:
//! strict ordering, wrapping, short-circuit, and fault propagation.

use carrier_integration_tests::{inbound, init_tracing};
use dispatch::test_utils::CollectorTransport;
use dispatch::{Dispatcher, HandlerRegistry};
use envelope::TransportMessage;
use pipeline::test_utils::{CallLog, RecordingBehavior};
use pipeline::{IncomingContext, PipelineError};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn logging_handler(
    log: CallLog,
) -> impl Fn(&mut IncomingContext) -> Result<Vec<TransportMessage>, PipelineError> {
    move |_ctx| {
        log.record("handler");
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_behaviors_wrap_the_handler_in_registration_order() {
    init_tracing();
    let log = CallLog::new();
    let transport = Arc::new(CollectorTransport::new());
    let dispatcher = Dispatcher::builder(
        HandlerRegistry::new().register("Audit", logging_handler(log.clone())),
        transport,
    )
    .incoming_behavior(RecordingBehavior::wrapping("outer", log.clone()))
    .incoming_behavior(RecordingBehavior::wrapping("inner", log.clone()))
    .build();

    let disposition = dispatcher
        .dispatch_inbound(inbound("broker-1", "Audit"), CancellationToken::new())
        .await;

    assert!(disposition.is_ack());
    assert_eq!(
        log.entries(),
        vec!["outer:pre", "inner:pre", "handler", "inner:post", "outer:post"]
    );
}

#[tokio::test]
async fn test_short_circuit_acks_without_reaching_later_steps() {
    init_tracing();
    let log = CallLog::new();
    let transport = Arc::new(CollectorTransport::new());
    let dispatcher = Dispatcher::builder(
        HandlerRegistry::new().register("Audit", logging_handler(log.clone())),
        transport,
    )
    .incoming_behavior(RecordingBehavior::continuing("first", log.clone()))
    .incoming_behavior(RecordingBehavior::short_circuiting("dedup", log.clone()))
    .incoming_behavior(RecordingBehavior::continuing("unreached", log.clone()))
    .build();

    let disposition = dispatcher
        .dispatch_inbound(inbound("broker-2", "Audit"), CancellationToken::new())
        .await;

    assert!(disposition.is_ack());
    assert_eq!(log.entries(), vec!["first", "dedup"]);
}

#[tokio::test]
async fn test_behavior_fault_stops_the_chain_and_dead_letters() {
    init_tracing();
    let log = CallLog::new();
    let transport = Arc::new(CollectorTransport::new());
    let dispatcher = Dispatcher::builder(
        HandlerRegistry::new().register("Audit", logging_handler(log.clone())),
        transport,
    )
    .incoming_behavior(RecordingBehavior::continuing("first", log.clone()))
    .incoming_behavior(RecordingBehavior::failing("guard", log.clone()))
    .build();

    let disposition = dispatcher
        .dispatch_inbound(inbound("broker-3", "Audit"), CancellationToken::new())
        .await;

    assert!(disposition.is_dead_letter());
    assert_eq!(log.entries(), vec!["first", "guard"]);
}

#[tokio::test]
async fn test_chains_are_reused_unchanged_across_runs() {
    init_tracing();
    let log = CallLog::new();
    let transport = Arc::new(CollectorTransport::new());
    let dispatcher = Dispatcher::builder(
        HandlerRegistry::new().register("Audit", logging_handler(log.clone())),
        transport,
    )
    .incoming_behavior(RecordingBehavior::continuing("step", log.clone()))
    .build();

    for i in 0..3 {
        let disposition = dispatcher
            .dispatch_inbound(
                inbound(&format!("broker-{i}"), "Audit"),
                CancellationToken::new(),
            )
            .await;
        assert!(disposition.is_ack());
    }
    assert_eq!(
        log.entries(),
        vec!["step", "handler", "step", "handler", "step", "handler"]
    );
}
