//! Long-polling message relay.
//!
//! Producers push small messages addressed to a user id; consumers long-poll
//! for the next message addressed to them. Each user gets a [`UserQueue`]
//! from the [`Registry`] on first reference.
//!
//! Nothing is persisted: a restart loses every queued message.
//!
//! # Example
//!
//! ```rust,ignore
//! let relay = Relay::new(RelayConfig::default());
//!
//! let receipt = relay.push("pebble-42", "Build", "main is green").await;
//! assert_eq!(receipt.dropped, 0);
//!
//! // Waits up to the pull timeout for a message
//! match relay.pull("pebble-42").await {
//!     PullOutcome::Delivered { message, .. } => println!("{}", message.title),
//!     PullOutcome::TimedOut => {}
//! }
//! ```

mod message;
mod queue;
mod registry;

pub use message::{Delivery, Message, PullOutcome, PushReceipt};
pub use queue::{QueueSnapshot, UserQueue};
pub use registry::{Registry, RegistryStats};

use std::time::Duration;

use tokio::time::Instant;

use crate::metrics::{RegistryMetrics, RelayMetrics};

/// Default number of messages buffered per user
pub const DEFAULT_CAPACITY: usize = 100;

/// Default long-poll deadline
pub const DEFAULT_PULL_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the relay
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Maximum number of messages buffered per user
    pub capacity: usize,
    /// How long a pull waits before timing out
    pub pull_timeout: Duration,
    /// Message seeded into every newly created user queue
    pub welcome: Message,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            pull_timeout: DEFAULT_PULL_TIMEOUT,
            welcome: Message::new("message title", "Here's my message to you!"),
        }
    }
}

/// Push/pull entry points over a process-lifetime [`Registry`].
pub struct Relay {
    registry: Registry,
    config: RelayConfig,
}

impl Relay {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            registry: Registry::new(config.capacity, config.welcome.clone()),
            config,
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Queue a message for `user_id`, evicting the oldest queued messages if
    /// the user's buffer is full.
    pub async fn push(&self, user_id: &str, title: &str, body: &str) -> PushReceipt {
        let queue = self.registry.resolve(user_id);
        let dropped = queue.push(Message::new(title, body)).await;

        RelayMetrics::record_push(dropped);
        if dropped > 0 {
            tracing::warn!(
                user_id = %user_id,
                dropped = dropped,
                "Dropped oldest messages from full queue"
            );
        } else {
            tracing::debug!(user_id = %user_id, "Message queued");
        }

        PushReceipt { dropped }
    }

    /// Wait for the next message for `user_id`, up to the pull timeout.
    pub async fn pull(&self, user_id: &str) -> PullOutcome {
        let started = Instant::now();
        let queue = self.registry.resolve(user_id);

        let outcome = queue.pull_until(started + self.config.pull_timeout).await;

        let waited = started.elapsed();
        RelayMetrics::record_pull(outcome.label(), waited);
        tracing::debug!(
            user_id = %user_id,
            outcome = outcome.label(),
            waited_ms = waited.as_millis() as u64,
            "Pull completed"
        );

        outcome
    }

    /// Aggregate registry stats and refresh the registry gauges.
    pub async fn stats(&self) -> RegistryStats {
        let stats = self.registry.stats().await;
        RegistryMetrics::set_totals(stats.queued_messages, stats.waiting_pullers);
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready, task};

    fn relay_with_capacity(capacity: usize) -> Relay {
        Relay::new(RelayConfig {
            capacity,
            ..Default::default()
        })
    }

    async fn pull_title(relay: &Relay, user_id: &str) -> Option<String> {
        relay.pull(user_id).await.into_message().map(|m| m.title)
    }

    #[tokio::test]
    async fn test_first_pull_returns_welcome() {
        let relay = Relay::new(RelayConfig::default());

        let outcome = relay.pull("new-user").await;
        assert_eq!(
            outcome,
            PullOutcome::Delivered {
                message: Message::new("message title", "Here's my message to you!"),
                via: Delivery::Primary,
            }
        );
    }

    #[tokio::test]
    async fn test_push_then_pull_round_trip() {
        let relay = Relay::new(RelayConfig::default());
        // Consume the welcome message first
        relay.pull("user-1").await;

        let receipt = relay.push("user-1", "t", "m").await;
        assert_eq!(receipt, PushReceipt { dropped: 0 });

        let message = relay.pull("user-1").await.into_message().unwrap();
        assert_eq!(message, Message::new("t", "m"));
    }

    #[tokio::test]
    async fn test_overflow_evicts_oldest() {
        let relay = relay_with_capacity(3);
        relay.pull("user-1").await;

        let mut last = PushReceipt::default();
        for i in 0..4 {
            last = relay.push("user-1", &format!("m{}", i), "").await;
        }
        assert!(last.dropped >= 1);

        let mut titles = Vec::new();
        for _ in 0..3 {
            titles.push(pull_title(&relay, "user-1").await.unwrap());
        }
        assert_eq!(titles, vec!["m1", "m2", "m3"]);
    }

    #[tokio::test]
    async fn test_seed_counts_toward_capacity() {
        let relay = relay_with_capacity(3);

        // welcome + m0 + m1 fill the buffer; m2 evicts the welcome message
        assert_eq!(relay.push("user-1", "m0", "").await.dropped, 0);
        assert_eq!(relay.push("user-1", "m1", "").await.dropped, 0);
        assert_eq!(relay.push("user-1", "m2", "").await.dropped, 1);
        assert_eq!(relay.registry().len(), 1);

        assert_eq!(pull_title(&relay, "user-1").await.unwrap(), "m0");
    }

    #[tokio::test]
    async fn test_users_are_isolated() {
        let relay = Relay::new(RelayConfig::default());
        relay.pull("alice").await;
        relay.pull("bob").await;

        relay.push("alice", "for alice", "").await;

        let mut bob = task::spawn(relay.pull("bob"));
        assert_pending!(bob.poll());

        assert_eq!(pull_title(&relay, "alice").await.unwrap(), "for alice");
        assert_pending!(bob.poll());
    }

    #[tokio::test]
    async fn test_push_wakes_single_waiting_pull() {
        let relay = Relay::new(RelayConfig::default());
        relay.pull("user-1").await;

        let mut pull = task::spawn(relay.pull("user-1"));
        assert_pending!(pull.poll());

        relay.push("user-1", "wake", "up").await;

        let outcome = assert_ready!(pull.poll());
        assert_eq!(outcome.into_message(), Some(Message::new("wake", "up")));
    }

    #[tokio::test]
    async fn test_empty_strings_are_ordinary_values() {
        let relay = Relay::new(RelayConfig::default());
        relay.pull("").await;

        assert_eq!(relay.push("", "", "").await.dropped, 0);
        assert_eq!(relay.pull("").await.into_message(), Some(Message::new("", "")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pull_times_out_after_thirty_seconds() {
        let relay = Relay::new(RelayConfig::default());
        relay.pull("user-1").await;

        let mut pull = task::spawn(relay.pull("user-1"));
        assert_pending!(pull.poll());

        tokio::time::advance(Duration::from_secs(29)).await;
        assert_pending!(pull.poll());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(assert_ready!(pull.poll()), PullOutcome::TimedOut);
    }

    #[tokio::test]
    async fn test_stats_reflect_queues() {
        let relay = relay_with_capacity(5);
        relay.push("a", "1", "").await;
        relay.push("b", "1", "").await;

        let stats = relay.stats().await;
        assert_eq!(stats.users, 2);
        // welcome + one push each
        assert_eq!(stats.queued_messages, 4);
        assert_eq!(stats.waiting_pullers, 0);
    }
}
