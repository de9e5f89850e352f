//! Per-user queue: a bounded primary buffer plus hand-off slots for waiters.
//!
//! Every mutation of a queue (evict-then-enqueue on push, dequeue-then-forward
//! on pull, waiter registration) happens under that queue's own lock, so
//! different users never contend with each other.
//!
//! The alternate path is a set of per-waiter `oneshot` slots rather than one
//! shared channel. A puller that takes a message from the primary buffer hands
//! a copy to the earliest-registered puller still waiting on the same user.
//! A puller leaves the waiter set under the queue lock before it returns, so a
//! forwarded copy can never land on a poll that already completed.

use std::collections::VecDeque;

use tokio::sync::{oneshot, Mutex, Notify};
use tokio::time::Instant;
use uuid::Uuid;

use super::message::{Delivery, Message, PullOutcome};
use crate::metrics::RelayMetrics;

/// A pull currently blocked on this queue.
struct Waiter {
    id: Uuid,
    slot: oneshot::Sender<Message>,
}

struct QueueState {
    primary: VecDeque<Message>,
    waiters: VecDeque<Waiter>,
}

impl QueueState {
    fn remove_waiter(&mut self, id: Uuid) {
        self.waiters.retain(|w| w.id != id);
    }

    /// Hand a copy of `message` to the earliest waiter still listening.
    /// Waiters whose pull was dropped are discarded along the way.
    fn forward(&mut self, message: &Message) -> bool {
        while let Some(waiter) = self.waiters.pop_front() {
            if waiter.slot.send(message.clone()).is_ok() {
                return true;
            }
        }
        false
    }
}

/// Point-in-time view of a queue, used for stats and metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub queued: usize,
    pub waiting: usize,
}

pub struct UserQueue {
    state: Mutex<QueueState>,
    /// Signalled after every push so blocked pullers re-check the buffer.
    available: Notify,
    capacity: usize,
}

impl UserQueue {
    /// Create an empty queue holding at most `capacity` messages.
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                primary: VecDeque::with_capacity(capacity.min(128)),
                waiters: VecDeque::new(),
            }),
            available: Notify::new(),
            capacity,
        }
    }

    /// Create a queue preloaded with a single welcome message.
    pub fn seeded(capacity: usize, welcome: Message) -> Self {
        let mut queue = Self::new(capacity);
        queue.state.get_mut().primary.push_back(welcome);
        queue
    }

    /// Enqueue `message`, evicting the oldest entries while the buffer is full.
    ///
    /// Returns the number of evicted messages.
    pub async fn push(&self, message: Message) -> usize {
        let mut state = self.state.lock().await;

        let mut dropped = 0;
        while state.primary.len() >= self.capacity {
            if state.primary.pop_front().is_none() {
                break;
            }
            dropped += 1;
        }
        state.primary.push_back(message);
        drop(state);

        self.available.notify_waiters();
        dropped
    }

    /// Wait until a message can be delivered or `deadline` passes.
    pub async fn pull_until(&self, deadline: Instant) -> PullOutcome {
        let waiter_id = Uuid::new_v4();
        let (slot, mut handoff) = oneshot::channel();
        let mut slot = Some(slot);
        let mut handoff_open = true;

        let timeout = tokio::time::sleep_until(deadline);
        tokio::pin!(timeout);

        loop {
            // Arm the notification before inspecting the buffer so a push
            // landing between the check and the wait is not missed.
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state.lock().await;

                if let Ok(message) = handoff.try_recv() {
                    return PullOutcome::Delivered {
                        message,
                        via: Delivery::Alternate,
                    };
                }

                if let Some(message) = state.primary.pop_front() {
                    state.remove_waiter(waiter_id);
                    if state.forward(&message) {
                        RelayMetrics::record_forwarded();
                        tracing::debug!("Forwarded message to a concurrent puller");
                    }
                    return PullOutcome::Delivered {
                        message,
                        via: Delivery::Primary,
                    };
                }

                if let Some(slot) = slot.take() {
                    state.waiters.retain(|w| !w.slot.is_closed());
                    state.waiters.push_back(Waiter {
                        id: waiter_id,
                        slot,
                    });
                }
            }

            tokio::select! {
                _ = &mut notified => {}
                received = &mut handoff, if handoff_open => match received {
                    Ok(message) => {
                        return PullOutcome::Delivered {
                            message,
                            via: Delivery::Alternate,
                        };
                    }
                    Err(_) => handoff_open = false,
                },
                _ = &mut timeout => {
                    let mut state = self.state.lock().await;
                    state.remove_waiter(waiter_id);
                    // A forward may have raced the deadline; it already left
                    // the primary buffer, so deliver it rather than lose it.
                    if let Ok(message) = handoff.try_recv() {
                        return PullOutcome::Delivered {
                            message,
                            via: Delivery::Alternate,
                        };
                    }
                    return PullOutcome::TimedOut;
                }
            }
        }
    }

    pub async fn snapshot(&self) -> QueueSnapshot {
        let state = self.state.lock().await;
        QueueSnapshot {
            queued: state.primary.len(),
            waiting: state.waiters.iter().filter(|w| !w.slot.is_closed()).count(),
        }
    }
}
