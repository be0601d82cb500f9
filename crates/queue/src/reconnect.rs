//! Exponential backoff for broker reconnects and redelivery pacing.
//!
//! Long-lived consumers call [`wait_for_channel`] whenever they need a
//! channel and the broker may be down. It keeps asking the
//! [`QueueConnectionManager`] with growing pauses until a channel is
//! available or the [`CancellationToken`] is triggered. The same [`Backoff`]
//! paces requeues while the status store is unreachable.

use std::time::Duration;

use lapin::Channel;
use tokio_util::sync::CancellationToken;

use crate::manager::QueueConnectionManager;

/// Growing pause between attempts: `initial`, then multiplied by `factor`
/// each step, never above `max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
    pub factor: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(30),
            factor: 2,
        }
    }
}

impl Backoff {
    /// Pause to use after `previous`; `None` means this is the first failure.
    pub fn after(&self, previous: Option<Duration>) -> Duration {
        match previous {
            None => self.initial.min(self.max),
            Some(previous) => previous.saturating_mul(self.factor).min(self.max),
        }
    }
}

/// Wait until the manager hands out a channel.
///
/// Returns `None` if `cancel` fires first.
pub async fn wait_for_channel(
    manager: &QueueConnectionManager,
    backoff: &Backoff,
    cancel: &CancellationToken,
) -> Option<Channel> {
    let mut pause = None;
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("Channel wait cancelled");
                return None;
            }
            channel = manager.get_channel() => {
                if let Some(channel) = channel {
                    if attempt > 1 {
                        tracing::info!(attempt, "Broker channel restored");
                    }
                    return Some(channel);
                }
            }
        }

        let delay = backoff.after(pause);
        pause = Some(delay);
        tracing::warn!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            "Broker unavailable, retrying",
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
