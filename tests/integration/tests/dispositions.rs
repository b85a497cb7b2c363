//! End-to-end disposition contract: one inbound message in, one
//! acknowledge / negative-acknowledge / dead-letter answer out.

use carrier_integration_tests::{echo_dispatcher, inbound, init_tracing};
use dispatch::test_utils::CollectorTransport;
use dispatch::{Dispatcher, Disposition, HandlerRegistry, MiddlewareConfig};
use envelope::headers::keys;
use envelope::{MessageIntent, TransportMessage};
use pipeline::{IncomingContext, PipelineError};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_completed_round_trip_acks_and_replies() {
    init_tracing();
    let (dispatcher, transport) = echo_dispatcher("PingRequested");

    let raw = inbound("broker-1", "PingRequested")
        .with_correlation_id("conversation-a")
        .with_reply_to("pong@edge")
        .with_body(&b"ping"[..]);
    let disposition = dispatcher
        .dispatch_inbound(raw, CancellationToken::new())
        .await;

    assert!(disposition.is_ack());
    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    let (reply, destination) = &sent[0];
    assert_eq!(reply.body_bytes(), b"ping");
    assert_eq!(reply.correlation_id(), "conversation-a");
    assert_eq!(reply.intent(), MessageIntent::Reply);
    assert_eq!(destination.queue(), "pong");
    assert_eq!(destination.endpoint(), Some("edge"));
}

#[tokio::test]
async fn test_reply_correlates_to_inbound_id_when_no_correlation_given() {
    init_tracing();
    let (dispatcher, transport) = echo_dispatcher("PingRequested");

    let raw = inbound("broker-lonely", "PingRequested").with_reply_to("pong");
    dispatcher
        .dispatch_inbound(raw, CancellationToken::new())
        .await;

    let sent = transport.sent();
    assert_eq!(sent[0].0.correlation_id(), "broker-lonely");
}

#[tokio::test]
async fn test_handler_fault_dead_letters_with_failure_information() {
    init_tracing();
    let transport = Arc::new(CollectorTransport::new());
    let dispatcher = Dispatcher::builder(
        HandlerRegistry::new().register("OrderPlaced", |_: &mut IncomingContext| {
            Err(PipelineError::handler("ledger rejected the order"))
        }),
        transport.clone(),
    )
    .build();

    let disposition = dispatcher
        .dispatch_inbound(inbound("broker-2", "OrderPlaced"), CancellationToken::new())
        .await;

    match disposition {
        Disposition::DeadLetter { headers, reason } => {
            assert!(reason.contains("ledger rejected the order"));
            assert!(headers.get("Failures.Reason").is_some());
            assert_eq!(headers.get("Failures.ErrorKind"), Some("handler-failure"));
            assert!(headers.get("Failures.TimeOfFailure").is_some());
            assert_eq!(headers.get("Failures.DeliveryCount"), Some("0"));
        }
        other => panic!("expected dead-letter, got {other:?}"),
    }
    assert_eq!(transport.sent_count(), 0);
}

#[tokio::test]
async fn test_unrouteable_message_dead_letters() {
    init_tracing();
    let transport = Arc::new(CollectorTransport::new());
    let dispatcher = Dispatcher::builder(HandlerRegistry::new(), transport).build();

    let disposition = dispatcher
        .dispatch_inbound(inbound("broker-3", "NobodyHandlesThis"), CancellationToken::new())
        .await;
    assert!(disposition.is_dead_letter());

    let untyped = envelope::InboundMessage::new("broker-4");
    let disposition = dispatcher
        .dispatch_inbound(untyped, CancellationToken::new())
        .await;
    assert!(disposition.is_dead_letter());
}

#[tokio::test]
async fn test_cancellation_nacks_for_redelivery() {
    init_tracing();
    let (dispatcher, transport) = echo_dispatcher("PingRequested");

    let token = CancellationToken::new();
    token.cancel();
    let disposition = dispatcher
        .dispatch_inbound(inbound("broker-5", "PingRequested"), token)
        .await;

    assert!(disposition.is_nack());
    assert_eq!(transport.sent_count(), 0);
}

#[tokio::test]
async fn test_exhausted_deliveries_dead_letter_before_the_handler() {
    init_tracing();
    let transport = Arc::new(CollectorTransport::new());
    let config =
        MiddlewareConfig::from_toml_str("[dispatcher]\nmax_deliveries = 1\n").unwrap();
    let dispatcher = Dispatcher::builder(
        HandlerRegistry::new().register("PingRequested", |_: &mut IncomingContext| {
            panic!("handler must not run for an exhausted message")
        }),
        transport,
    )
    .config(&config)
    .build();

    let worn_out = inbound("broker-6", "PingRequested").with_delivery_count(2);
    let disposition = dispatcher
        .dispatch_inbound(worn_out, CancellationToken::new())
        .await;
    assert!(disposition.is_dead_letter());
}

#[tokio::test]
async fn test_transient_reply_send_failure_nacks() {
    init_tracing();
    let (dispatcher, transport) = echo_dispatcher("PingRequested");

    transport.disconnect_next_send();
    let raw = inbound("broker-7", "PingRequested").with_reply_to("pong");
    let disposition = dispatcher
        .dispatch_inbound(raw, CancellationToken::new())
        .await;
    assert!(disposition.is_nack());

    // The same message goes through once the transport recovers.
    let raw = inbound("broker-7", "PingRequested")
        .with_reply_to("pong")
        .with_delivery_count(1);
    let disposition = dispatcher
        .dispatch_inbound(raw, CancellationToken::new())
        .await;
    assert!(disposition.is_ack());
    assert_eq!(transport.sent_count(), 1);
}

#[tokio::test]
async fn test_outbound_send_reaches_the_transport() {
    init_tracing();
    let transport = Arc::new(CollectorTransport::new());
    let dispatcher = Dispatcher::builder(HandlerRegistry::new(), transport.clone()).build();

    let mut message = TransportMessage::new();
    message.set_message_type("PriceUpdated");
    message.set_header(keys::MESSAGE_INTENT, "Publish");
    dispatcher
        .dispatch_outbound(
            message,
            envelope::Address::with_endpoint("quotes", "market-data").unwrap(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0.intent(), MessageIntent::Publish);
    assert_eq!(sent[0].1.to_string(), "quotes@market-data");
}
