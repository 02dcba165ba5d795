//! # Integration Test Flows
//!
//! Drives the sender end to end over the in-memory transport.
//!
//! ## Flows Tested:
//!
//! 1. **Send → Subscribe**: built envelopes reach transport subscribers intact
//! 2. **Schedule → Cancel**: sequence numbers round-trip through the sender
//! 3. **Batch limits**: an oversized batch fails whole and delivers nothing
//! 4. **Concurrent dispatch**: one sender shared across tasks

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;
    use futures::future::join_all;
    use serde::{Deserialize, Serialize};
    use tokio::time::timeout;

    use shuttle_sender::{
        message_body, set_correlation_id, set_message_delay, set_message_id, set_message_ttl,
        set_schedule_at, InMemoryTransport, Operation, SendContext, Sender, SenderError,
        SenderOptions, TransportError,
    };
    use shuttle_telemetry::{PrometheusSenderMetrics, SenderMetrics};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct OrderPlaced {
        order_id: String,
        amount_cents: u64,
    }
    message_body!(OrderPlaced);

    #[derive(Debug, Serialize)]
    struct Refund {
        order_id: String,
    }
    message_body!(Refund => "billing.refund");

    fn order(amount_cents: u64) -> OrderPlaced {
        OrderPlaced {
            order_id: uuid::Uuid::new_v4().to_string(),
            amount_cents,
        }
    }

    /// Sender over a fresh in-memory transport with observable metrics.
    fn create_sender(
        transport: InMemoryTransport,
    ) -> (Sender<InMemoryTransport>, Arc<PrometheusSenderMetrics>) {
        let metrics = Arc::new(PrometheusSenderMetrics::new("flows").unwrap());
        let options = SenderOptions::default().metrics(metrics.clone() as Arc<dyn SenderMetrics>);
        (Sender::with_options(Arc::new(transport), options), metrics)
    }

    // =============================================================================
    // SEND → SUBSCRIBE
    // =============================================================================

    #[tokio::test]
    async fn test_sent_message_reaches_subscriber() {
        let (sender, metrics) = create_sender(InMemoryTransport::new());
        let mut sub = sender.transport().subscribe();
        let placed = order(4_200);
        let message_id = uuid::Uuid::new_v4().to_string();

        sender
            .send_message(
                &SendContext::background(),
                &placed,
                &[
                    set_message_id(message_id.clone()),
                    set_correlation_id("checkout-17"),
                    set_message_ttl(Duration::from_secs(60)),
                ],
            )
            .await
            .unwrap();

        let envelope = timeout(Duration::from_millis(100), sub.recv())
            .await
            .expect("timeout waiting for envelope")
            .expect("should receive envelope");

        assert_eq!(envelope.message_type(), Some("OrderPlaced"));
        assert_eq!(envelope.message_id, Some(message_id));
        assert_eq!(envelope.correlation_id.as_deref(), Some("checkout-17"));
        assert_eq!(envelope.time_to_live, Some(Duration::from_secs(60)));

        let decoded: OrderPlaced = serde_json::from_slice(&envelope.body).unwrap();
        assert_eq!(decoded, placed);
        assert_eq!(metrics.success_count(), 1);
        assert_eq!(metrics.failure_count(), 0);
    }

    #[tokio::test]
    async fn test_explicit_type_tag() {
        let (sender, _) = create_sender(InMemoryTransport::new());

        sender
            .send_message(
                &SendContext::background(),
                &Box::new(Refund {
                    order_id: "o-1".to_string(),
                }),
                &[],
            )
            .await
            .unwrap();

        let delivered = sender.transport().delivered();
        assert_eq!(delivered[0].message_type(), Some("billing.refund"));
    }

    #[tokio::test]
    async fn test_option_order_decides_schedule_time() {
        let (sender, _) = create_sender(InMemoryTransport::new());
        let ctx = SendContext::background();
        let at = Utc::now() + chrono::Duration::hours(3);

        let delay_then_at = sender
            .build_envelope(
                &ctx,
                &order(1),
                &[set_message_delay(Duration::from_secs(60)), set_schedule_at(at)],
            )
            .unwrap();
        assert_eq!(delay_then_at.scheduled_enqueue_time, Some(at));

        let before = Utc::now();
        let at_then_delay = sender
            .build_envelope(
                &ctx,
                &order(1),
                &[set_schedule_at(at), set_message_delay(Duration::from_secs(60))],
            )
            .unwrap();
        let scheduled = at_then_delay.scheduled_enqueue_time.unwrap();
        assert!(scheduled >= before + chrono::Duration::seconds(60));
        assert!(scheduled <= Utc::now() + chrono::Duration::seconds(60));
    }

    // =============================================================================
    // SCHEDULE → CANCEL
    // =============================================================================

    #[tokio::test]
    async fn test_schedule_then_cancel() {
        let (sender, metrics) = create_sender(InMemoryTransport::new());
        let ctx = SendContext::background();
        let at = Utc::now() + chrono::Duration::minutes(10);

        let envelopes = vec![
            sender.build_envelope(&ctx, &order(1), &[]).unwrap(),
            sender.build_envelope(&ctx, &order(2), &[]).unwrap(),
            sender.build_envelope(&ctx, &order(3), &[]).unwrap(),
        ];
        let seqs = sender.schedule_messages(&ctx, envelopes, at).await.unwrap();
        assert_eq!(seqs, vec![1, 2, 3]);
        assert!(sender.transport().scheduled().iter().all(|m| m.enqueue_at == at));

        sender
            .cancel_scheduled_messages(&ctx, vec![seqs[0], seqs[2]])
            .await
            .unwrap();

        let remaining = sender.transport().scheduled();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].sequence_number, 2);
        assert_eq!(metrics.success_count(), 2);
    }

    #[tokio::test]
    async fn test_cancel_unknown_sequence_number() {
        let (sender, metrics) = create_sender(InMemoryTransport::new());

        let err = sender
            .cancel_scheduled_messages(&SendContext::background(), vec![404])
            .await
            .unwrap_err();

        assert_eq!(err.operation(), Some(Operation::CancelScheduledMessages));
        assert!(matches!(err.transport_error(), Some(TransportError::Rejected(_))));
        assert!(err.to_string().starts_with("failed to cancel scheduled messages: "));
        assert_eq!(metrics.failure_count(), 1);
    }

    // =============================================================================
    // BATCHES
    // =============================================================================

    #[tokio::test]
    async fn test_batch_delivered_in_order() {
        let (sender, _) = create_sender(InMemoryTransport::new());
        let ctx = SendContext::background();
        let orders: Vec<_> = (1..=5).map(order).collect();
        let envelopes = orders
            .iter()
            .map(|o| sender.build_envelope(&ctx, o, &[]))
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        sender.send_message_batch(&ctx, envelopes).await.unwrap();

        let amounts: Vec<u64> = sender
            .transport()
            .delivered()
            .iter()
            .map(|e| serde_json::from_slice::<OrderPlaced>(&e.body).unwrap().amount_cents)
            .collect();
        assert_eq!(amounts, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_oversized_batch_delivers_nothing() {
        let (sender, metrics) = create_sender(InMemoryTransport::with_limits(16, 256));
        let ctx = SendContext::background();
        let envelopes = (0..10)
            .map(|i| sender.build_envelope(&ctx, &order(i), &[]))
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        let err = sender.send_message_batch(&ctx, envelopes).await.unwrap_err();

        assert!(matches!(
            err,
            SenderError::BatchAppend(TransportError::MessageTooLarge { .. })
        ));
        assert!(sender.transport().delivered().is_empty());
        assert_eq!(metrics.failure_count(), 1);
        assert_eq!(metrics.success_count(), 0);
    }

    #[tokio::test]
    async fn test_closed_transport_fails_batch_creation() {
        let transport = InMemoryTransport::new();
        transport.close();
        let (sender, metrics) = create_sender(transport);

        let err = sender
            .send_message_batch(&SendContext::background(), vec![])
            .await
            .unwrap_err();

        assert_eq!(err.operation(), Some(Operation::CreateBatch));
        assert_eq!(err.transport_error(), Some(&TransportError::Closed));
        assert_eq!(metrics.failure_count(), 1);
    }

    // =============================================================================
    // CONCURRENT DISPATCH
    // =============================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sends_share_one_sender() {
        let (sender, metrics) = create_sender(InMemoryTransport::new());
        let sender = Arc::new(sender);

        let handles = (0..50u64).map(|i| {
            let sender = Arc::clone(&sender);
            tokio::spawn(async move {
                sender
                    .send_message(&SendContext::background(), &order(i), &[])
                    .await
            })
        });

        for result in join_all(handles).await {
            result.unwrap().unwrap();
        }

        assert_eq!(sender.transport().delivered().len(), 50);
        assert_eq!(metrics.success_count(), 50);
        assert_eq!(metrics.failure_count(), 0);
    }
}
