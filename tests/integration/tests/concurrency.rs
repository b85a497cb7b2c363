//! Concurrent dispatches over one shared chain: every run owns its context,
//! so interleaving must never mix up correlation or bodies.

use carrier_integration_tests::{echo_handler, inbound, init_tracing, Jitter};
use dispatch::test_utils::CollectorTransport;
use dispatch::{Dispatcher, HandlerRegistry};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const DISPATCHES: usize = 64;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_interleaved_runs_keep_their_own_correlation() {
    init_tracing();
    let transport = Arc::new(CollectorTransport::new());
    let dispatcher = Arc::new(
        Dispatcher::builder(
            HandlerRegistry::new().register("EchoRequested", echo_handler),
            transport.clone(),
        )
        .incoming_behavior(Jitter::up_to_millis(5))
        .build(),
    );

    let mut tasks = Vec::with_capacity(DISPATCHES);
    for i in 0..DISPATCHES {
        let dispatcher = dispatcher.clone();
        tasks.push(tokio::spawn(async move {
            let raw = inbound(&format!("broker-{i}"), "EchoRequested")
                .with_reply_to("echoes")
                .with_body(format!("payload-{i}").into_bytes());
            dispatcher
                .dispatch_inbound(raw, CancellationToken::new())
                .await
        }));
    }

    for task in tasks {
        let disposition = task.await.unwrap();
        assert!(disposition.is_ack());
    }

    let sent = transport.sent();
    assert_eq!(sent.len(), DISPATCHES);

    // Each reply's body must belong to the conversation it correlates to.
    let mut seen = HashSet::new();
    for (reply, destination) in &sent {
        assert_eq!(destination.queue(), "echoes");
        let correlation = reply.correlation_id();
        let index = correlation
            .strip_prefix("broker-")
            .expect("correlation should carry the inbound id");
        assert_eq!(reply.body_bytes(), format!("payload-{index}").as_bytes());
        assert!(seen.insert(correlation.to_string()), "duplicate {correlation}");
    }
    assert_eq!(seen.len(), DISPATCHES);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancelling_one_run_leaves_the_others_alone() {
    init_tracing();
    let transport = Arc::new(CollectorTransport::new());
    let dispatcher = Arc::new(
        Dispatcher::builder(
            HandlerRegistry::new().register("EchoRequested", echo_handler),
            transport.clone(),
        )
        .incoming_behavior(Jitter::up_to_millis(5))
        .build(),
    );

    let mut tasks = Vec::with_capacity(DISPATCHES);
    for i in 0..DISPATCHES {
        let dispatcher = dispatcher.clone();
        let token = CancellationToken::new();
        if i % 2 == 0 {
            token.cancel();
        }
        tasks.push(tokio::spawn(async move {
            let raw = inbound(&format!("broker-{i}"), "EchoRequested")
                .with_reply_to("echoes");
            (i, dispatcher.dispatch_inbound(raw, token).await)
        }));
    }

    for task in tasks {
        let (i, disposition) = task.await.unwrap();
        if i % 2 == 0 {
            assert!(disposition.is_nack(), "run {i} should have been cancelled");
        } else {
            assert!(disposition.is_ack(), "run {i} should have completed");
        }
    }
    assert_eq!(transport.sent_count(), DISPATCHES / 2);
}
