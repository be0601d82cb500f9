use textq_queue::AmqpConfig;
use textq_store::redis::RedisConfig;

/// Default number of unacknowledged deliveries per worker.
const DEFAULT_PREFETCH: u16 = 1;

/// Worker process configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Status store connection.
    pub redis: RedisConfig,
    /// Work queue broker connection.
    pub amqp: AmqpConfig,
    /// `basic.qos` prefetch count (default: `1`).
    pub prefetch: u16,
    /// Consumer tag shown in the broker's management UI.
    pub consumer_tag: String,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var               | Default               |
    /// |-----------------------|-----------------------|
    /// | `WORKER_PREFETCH`     | `1`                   |
    /// | `WORKER_CONSUMER_TAG` | `textq-worker-<pid>`  |
    ///
    /// See [`RedisConfig::from_env`] and [`AmqpConfig::from_env`] for the
    /// connection variables.
    pub fn from_env() -> Self {
        let prefetch: u16 = std::env::var("WORKER_PREFETCH")
            .unwrap_or_else(|_| DEFAULT_PREFETCH.to_string())
            .parse()
            .expect("WORKER_PREFETCH must be a valid u16");
        assert!(prefetch > 0, "WORKER_PREFETCH must be at least 1");

        let consumer_tag = std::env::var("WORKER_CONSUMER_TAG")
            .unwrap_or_else(|_| format!("textq-worker-{}", std::process::id()));

        Self {
            redis: RedisConfig::from_env(),
            amqp: AmqpConfig::from_env(),
            prefetch,
            consumer_tag,
        }
    }
}
