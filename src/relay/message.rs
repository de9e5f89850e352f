//! Relay value types: the message itself and the results of push and pull.

use serde::Serialize;

/// A notification addressed to a single user.
///
/// Messages are plain values: they are never mutated after construction and
/// two messages with the same title and body are interchangeable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub title: String,
    #[serde(rename = "message")]
    pub body: String,
}

impl Message {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Which path delivered a pulled message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The puller dequeued the message from the user's primary buffer.
    Primary,
    /// Another puller of the same user dequeued the message and handed a
    /// copy to this waiter.
    Alternate,
}

impl Delivery {
    pub fn as_str(&self) -> &'static str {
        match self {
            Delivery::Primary => "primary",
            Delivery::Alternate => "alternate",
        }
    }
}

/// Terminal state of a single long poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    Delivered { message: Message, via: Delivery },
    TimedOut,
}

impl PullOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            PullOutcome::Delivered { via, .. } => via.as_str(),
            PullOutcome::TimedOut => "timeout",
        }
    }

    /// The delivered message, if any.
    pub fn into_message(self) -> Option<Message> {
        match self {
            PullOutcome::Delivered { message, .. } => Some(message),
            PullOutcome::TimedOut => None,
        }
    }
}

/// Result of a push: the message is always accepted, possibly at the cost of
/// older queued messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PushReceipt {
    /// Number of queued messages evicted to make room.
    pub dropped: usize,
}
