//! # codepal-session
//!
//! Conversation memory keyed by memory id.
//!
//! A [`ChatMemory`] is a FIFO window of the most recent messages; once it
//! holds `max_messages` entries, adding one evicts the oldest. A
//! [`ChatMemoryStore`] hands out one [`ChatMemory`] per memory id behind a
//! `tokio::sync::Mutex`, so holding the lock for a whole turn serialises
//! turns of the same session while other sessions proceed.
//! [`spawn_idle_sweeper`] drops sessions that have gone quiet.

mod memory;
mod store;

pub use memory::{ChatMemory, DEFAULT_MAX_MESSAGES};
pub use store::{ChatMemoryStore, DEFAULT_MEMORY_ID, MIN_SWEEP_PERIOD, SessionHandle, spawn_idle_sweeper};
