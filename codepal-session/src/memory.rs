use std::collections::VecDeque;
use std::time::Duration;

use codepal_core::{Content, CoreError, Result};
use serde::Serialize;
use tokio::time::Instant;
use tracing::trace;

/// Messages kept per session unless configured otherwise.
pub const DEFAULT_MAX_MESSAGES: usize = 10;

/// A bounded, ordered window of recent messages, oldest first.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMemory {
    max_messages: usize,
    messages: VecDeque<Content>,
    #[serde(skip)]
    last_active: Instant,
}

impl Default for ChatMemory {
    fn default() -> Self {
        Self { max_messages: DEFAULT_MAX_MESSAGES, messages: VecDeque::new(), last_active: Instant::now() }
    }
}

impl ChatMemory {
    /// Create an empty window holding at most `max_messages` messages.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Session`] if `max_messages` is zero.
    pub fn new(max_messages: usize) -> Result<Self> {
        if max_messages == 0 {
            return Err(CoreError::Session("max_messages must be greater than zero".into()));
        }
        Ok(Self { max_messages, messages: VecDeque::with_capacity(max_messages), last_active: Instant::now() })
    }

    /// Append a message, evicting the oldest ones to stay within the bound.
    pub fn add(&mut self, message: Content) {
        self.last_active = Instant::now();
        self.messages.push_back(message);
        while self.messages.len() > self.max_messages {
            if let Some(evicted) = self.messages.pop_front() {
                trace!(role = %evicted.role, "evicted message from chat memory");
            }
        }
    }

    /// Append a completed exchange.
    pub fn add_exchange(&mut self, user: Content, assistant: Content) {
        self.add(user);
        self.add(assistant);
    }

    /// The retained messages, oldest first.
    pub fn messages(&self) -> Vec<Content> {
        self.messages.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    pub fn clear(&mut self) {
        self.last_active = Instant::now();
        self.messages.clear();
    }

    /// Time since the window was created or last changed.
    pub fn idle_for(&self) -> Duration {
        self.last_active.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacity_rejected() {
        assert!(matches!(ChatMemory::new(0), Err(CoreError::Session(_))));
    }

    #[test]
    fn evicts_oldest_first() {
        let mut memory = ChatMemory::new(3).unwrap();
        for i in 0..5 {
            memory.add(Content::user(format!("m{i}")));
        }
        let texts: Vec<String> = memory.messages().iter().map(Content::text).collect();
        assert_eq!(texts, vec!["m2", "m3", "m4"]);
    }

    #[test]
    fn exchange_keeps_user_before_assistant() {
        let mut memory = ChatMemory::default();
        memory.add_exchange(Content::user("hi"), Content::model("hello"));
        let roles: Vec<String> = memory.messages().into_iter().map(|c| c.role).collect();
        assert_eq!(roles, vec!["user", "model"]);
        assert_eq!(memory.max_messages(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn adding_resets_idle_time() {
        let mut memory = ChatMemory::default();
        tokio::time::advance(Duration::from_secs(90)).await;
        assert!(memory.idle_for() >= Duration::from_secs(90));

        memory.add(Content::user("still here"));
        assert!(memory.idle_for() < Duration::from_secs(1));
    }
}
