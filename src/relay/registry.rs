use std::sync::Arc;

use dashmap::DashMap;

use super::message::Message;
use super::queue::{QueueSnapshot, UserQueue};
use crate::metrics::RegistryMetrics;

/// Registry totals, aggregated over every user queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub users: usize,
    pub queued_messages: usize,
    pub waiting_pullers: usize,
}

/// Maps user ids to their queues.
///
/// Queues are created lazily on first reference, seeded with the welcome
/// message, and live for as long as the registry does. The map lock is only
/// held for the lookup-or-create itself, never across a queue operation.
pub struct Registry {
    /// user_id -> UserQueue
    queues: DashMap<String, Arc<UserQueue>>,
    capacity: usize,
    welcome: Message,
}

impl Registry {
    pub fn new(capacity: usize, welcome: Message) -> Self {
        Self {
            queues: DashMap::new(),
            capacity,
            welcome,
        }
    }

    /// Return the queue for `user_id`, creating and seeding it if needed.
    pub fn resolve(&self, user_id: &str) -> Arc<UserQueue> {
        if let Some(queue) = self.queues.get(user_id) {
            return queue.value().clone();
        }

        self.queues
            .entry(user_id.to_string())
            .or_insert_with(|| {
                RegistryMetrics::record_user_registered();
                tracing::info!(user_id = %user_id, "User queue created");
                Arc::new(UserQueue::seeded(self.capacity, self.welcome.clone()))
            })
            .value()
            .clone()
    }

    /// Number of users with a queue.
    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    pub async fn stats(&self) -> RegistryStats {
        // Collect first so no shard lock is held across an await
        let queues: Vec<Arc<UserQueue>> = self.queues.iter().map(|r| r.value().clone()).collect();

        let mut stats = RegistryStats {
            users: queues.len(),
            ..Default::default()
        };
        for queue in queues {
            let QueueSnapshot { queued, waiting } = queue.snapshot().await;
            stats.queued_messages += queued;
            stats.waiting_pullers += waiting;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::Instant;

    fn welcome() -> Message {
        Message::new("message title", "Here's my message to you!")
    }

    #[test]
    fn test_resolve_returns_same_queue() {
        let registry = Registry::new(10, welcome());

        let a = registry.resolve("user-1");
        let b = registry.resolve("user-1");
        let c = registry.resolve("user-2");

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_new_queue_is_seeded_once() {
        let registry = Registry::new(10, welcome());

        registry.resolve("user-1");
        registry.resolve("user-1");

        let stats = registry.stats().await;
        assert_eq!(stats.users, 1);
        assert_eq!(stats.queued_messages, 1);

        let deadline = Instant::now() + Duration::from_secs(30);
        let message = registry
            .resolve("user-1")
            .pull_until(deadline)
            .await
            .into_message()
            .unwrap();
        assert_eq!(message, welcome());
    }

    #[tokio::test]
    async fn test_concurrent_resolve_creates_one_queue() {
        let registry = Arc::new(Registry::new(10, welcome()));

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.resolve("shared") })
            })
            .collect();

        let mut queues = Vec::new();
        for handle in handles {
            queues.push(handle.await.unwrap());
        }

        assert_eq!(registry.len(), 1);
        assert!(queues.iter().all(|q| Arc::ptr_eq(q, &queues[0])));
        assert_eq!(registry.stats().await.queued_messages, 1);
    }
}
