//! Long-lived AMQP consumer loop.
//!
//! Deliveries are processed one at a time. A delivery is acknowledged only
//! after [`process_message`] has written the final status; store failures
//! leave it to the broker to redeliver, after a backoff pause so an outage
//! does not turn into a redelivery storm.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use lapin::message::Delivery;
use lapin::options::{
    BasicAckOptions, BasicCancelOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions,
};
use lapin::types::FieldTable;
use lapin::Channel;
use textq_queue::reconnect::{wait_for_channel, Backoff};
use textq_queue::{QueueConnectionManager, TASK_QUEUE};
use textq_store::StatusStore;
use tokio_util::sync::CancellationToken;

use crate::config::WorkerConfig;
use crate::processor::{process_message, Outcome, ProcessError};

/// Broker-side fate of a delivery once processing has returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Final status is written: `basic.ack`.
    Ack,
    /// Poison message: `basic.nack` without requeue.
    Drop,
    /// Nothing durable happened: `basic.nack` with requeue.
    Requeue,
}

impl Disposition {
    pub fn of(result: &Result<Outcome, ProcessError>) -> Self {
        match result {
            Ok(Outcome::Ack) => Disposition::Ack,
            Ok(Outcome::Reject(_)) => Disposition::Drop,
            Err(ProcessError::Store(_)) => Disposition::Requeue,
        }
    }
}

pub struct Consumer {
    store: Arc<dyn StatusStore>,
    manager: Arc<QueueConnectionManager>,
    backoff: Backoff,
    prefetch: u16,
    consumer_tag: String,
}

impl Consumer {
    pub fn new(
        store: Arc<dyn StatusStore>,
        manager: Arc<QueueConnectionManager>,
        config: &WorkerConfig,
    ) -> Self {
        Self {
            store,
            manager,
            backoff: Backoff::default(),
            prefetch: config.prefetch,
            consumer_tag: config.consumer_tag.clone(),
        }
    }

    /// Consume until the cancellation token is triggered.
    ///
    /// A dropped connection ends the current consume stream; the loop then
    /// waits for a fresh channel with exponential backoff and resubscribes.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            queue = TASK_QUEUE,
            prefetch = self.prefetch,
            consumer_tag = %self.consumer_tag,
            "Task consumer started",
        );

        loop {
            let Some(channel) = wait_for_channel(&self.manager, &self.backoff, &cancel).await
            else {
                break;
            };

            match self.consume(&channel, &cancel).await {
                Ok(()) if cancel.is_cancelled() => break,
                Ok(()) => tracing::warn!("Delivery stream ended, resubscribing"),
                Err(e) => tracing::error!(error = %e, "Consumer channel failed, resubscribing"),
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.backoff.initial) => {}
            }
        }

        tracing::info!("Task consumer shutting down");
    }

    async fn consume(&self, channel: &Channel, cancel: &CancellationToken) -> lapin::Result<()> {
        channel
            .basic_qos(self.prefetch, BasicQosOptions::default())
            .await?;

        let mut deliveries = channel
            .basic_consume(
                TASK_QUEUE,
                &self.consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        // Pause before the last requeue; reset once the store answers again.
        let mut requeue_pause: Option<Duration> = None;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    // Unacked deliveries go back to the queue when the
                    // channel closes.
                    let _ = channel
                        .basic_cancel(&self.consumer_tag, BasicCancelOptions::default())
                        .await;
                    return Ok(());
                }
                next = deliveries.next() => next,
            };

            match next {
                Some(delivery) => self.handle(delivery?, &mut requeue_pause, cancel).await?,
                None => return Ok(()),
            }
        }
    }

    async fn handle(
        &self,
        delivery: Delivery,
        requeue_pause: &mut Option<Duration>,
        cancel: &CancellationToken,
    ) -> lapin::Result<()> {
        let result = process_message(self.store.as_ref(), delivery.data.as_slice()).await;

        match Disposition::of(&result) {
            Disposition::Ack => {
                *requeue_pause = None;
                delivery.ack(BasicAckOptions::default()).await
            }
            Disposition::Drop => {
                *requeue_pause = None;
                if let Ok(Outcome::Reject(reason)) = &result {
                    tracing::warn!(
                        delivery_tag = delivery.delivery_tag,
                        reason = %reason,
                        "Dropping poison message",
                    );
                }
                delivery
                    .nack(BasicNackOptions {
                        requeue: false,
                        ..Default::default()
                    })
                    .await
            }
            Disposition::Requeue => {
                let pause = self.backoff.after(*requeue_pause);
                *requeue_pause = Some(pause);
                if let Err(e) = &result {
                    tracing::error!(
                        delivery_tag = delivery.delivery_tag,
                        error = %e,
                        pause_ms = pause.as_millis() as u64,
                        "Task processing failed, requeueing after pause",
                    );
                }

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(pause) => {}
                }

                delivery
                    .nack(BasicNackOptions {
                        requeue: true,
                        ..Default::default()
                    })
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use textq_queue::AmqpConfig;
    use textq_store::{MemoryStore, StoreError};

    use super::*;

    fn unreachable_config() -> WorkerConfig {
        WorkerConfig {
            redis: textq_store::redis::RedisConfig {
                url: "redis://127.0.0.1:1".into(),
                key_prefix: String::new(),
            },
            amqp: AmqpConfig {
                host: "127.0.0.1".into(),
                port: 1,
                connect_timeout: Duration::from_secs(1),
                ..Default::default()
            },
            prefetch: 1,
            consumer_tag: "test-consumer".into(),
        }
    }

    #[test]
    fn finished_task_is_acked() {
        assert_eq!(Disposition::of(&Ok(Outcome::Ack)), Disposition::Ack);
    }

    #[test]
    fn poison_message_is_dropped_not_requeued() {
        let result = Ok(Outcome::Reject("body is not JSON".into()));
        assert_eq!(Disposition::of(&result), Disposition::Drop);
    }

    #[test]
    fn store_outage_is_requeued_never_acked() {
        let result = Err(ProcessError::Store(StoreError::Backend {
            message: "connection refused".into(),
        }));
        assert_eq!(Disposition::of(&result), Disposition::Requeue);
    }

    #[test]
    fn repeated_store_outages_slow_down_requeues() {
        let backoff = Backoff::default();
        let first = backoff.after(None);
        let second = backoff.after(Some(first));
        let third = backoff.after(Some(second));

        assert!(first > Duration::ZERO, "requeue must never be immediate");
        assert!(first < second && second < third);
    }

    #[tokio::test]
    async fn cancelled_run_returns_without_broker() {
        let config = unreachable_config();
        let manager = Arc::new(QueueConnectionManager::new(config.amqp.clone()));
        let consumer = Consumer::new(Arc::new(MemoryStore::new()), manager, &config);

        let cancel = CancellationToken::new();
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(5), consumer.run(cancel))
            .await
            .expect("run must return once cancelled");
    }

    #[tokio::test]
    async fn cancel_while_waiting_for_broker_stops_run() {
        let config = unreachable_config();
        let manager = Arc::new(QueueConnectionManager::new(config.amqp.clone()));
        let consumer = Consumer::new(Arc::new(MemoryStore::new()), manager, &config);

        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            canceller.cancel();
        });

        tokio::time::timeout(Duration::from_secs(10), consumer.run(cancel))
            .await
            .expect("run must return once cancelled");
    }
}
