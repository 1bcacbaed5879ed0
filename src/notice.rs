use std::collections::VecDeque;

use serde::{Serialize, Serializer};

/// Transient message surface. Only the front message is visible; later
/// messages wait until the visible one is dismissed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoticeQueue {
    pending: VecDeque<String>,
}

impl NoticeQueue {
    pub fn current(&self) -> Option<&str> {
        self.pending.front().map(String::as_str)
    }

    /// Returns a copy with `message` queued. A message identical to the last
    /// queued one is not repeated.
    pub fn pushed(&self, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut next = self.clone();
        if next.pending.back() != Some(&message) {
            next.pending.push_back(message);
        }
        next
    }

    pub fn dismissed(&self) -> Self {
        let mut next = self.clone();
        next.pending.pop_front();
        next
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Serialize for NoticeQueue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.current().serialize(serializer)
    }
}
