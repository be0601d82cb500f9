use std::time::Duration;

use lapin::uri::{AMQPAuthority, AMQPUri, AMQPUserInfo};

/// Default time allowed for a single connect attempt.
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Broker connection settings.
///
/// All fields have defaults matching a stock local RabbitMQ.
#[derive(Debug, Clone)]
pub struct AmqpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub vhost: String,
    pub connect_timeout: Duration,
}

impl Default for AmqpConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 5672,
            user: "guest".into(),
            password: "guest".into(),
            vhost: "/".into(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

impl AmqpConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default     |
    /// |-----------------------------|-------------|
    /// | `RABBITMQ_HOST`             | `localhost` |
    /// | `RABBITMQ_PORT`             | `5672`      |
    /// | `RABBITMQ_USER`             | `guest`     |
    /// | `RABBITMQ_PASS`             | `guest`     |
    /// | `RABBITMQ_VHOST`            | `/`         |
    /// | `AMQP_CONNECT_TIMEOUT_SECS` | `5`         |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port: u16 = std::env::var("RABBITMQ_PORT")
            .unwrap_or_else(|_| defaults.port.to_string())
            .parse()
            .expect("RABBITMQ_PORT must be a valid u16");

        let connect_timeout_secs: u64 = std::env::var("AMQP_CONNECT_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_CONNECT_TIMEOUT_SECS.to_string())
            .parse()
            .expect("AMQP_CONNECT_TIMEOUT_SECS must be a valid u64");

        Self {
            host: std::env::var("RABBITMQ_HOST").unwrap_or(defaults.host),
            port,
            user: std::env::var("RABBITMQ_USER").unwrap_or(defaults.user),
            password: std::env::var("RABBITMQ_PASS").unwrap_or(defaults.password),
            vhost: std::env::var("RABBITMQ_VHOST").unwrap_or(defaults.vhost),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
        }
    }

    /// Broker address built field by field, so credentials and vhost are
    /// passed through verbatim whatever characters they contain.
    pub fn amqp_uri(&self) -> AMQPUri {
        AMQPUri {
            authority: AMQPAuthority {
                userinfo: AMQPUserInfo {
                    username: self.user.clone(),
                    password: self.password.clone(),
                },
                host: self.host.clone(),
                port: self.port,
            },
            vhost: self.vhost.clone(),
            ..Default::default()
        }
    }

    /// The URI with the password masked, for logging.
    pub fn redacted_uri(&self) -> String {
        format!(
            "amqp://{}:***@{}:{}/{}",
            self.user,
            self.host,
            self.port,
            self.vhost.replace('/', "%2f"),
        )
    }
}
