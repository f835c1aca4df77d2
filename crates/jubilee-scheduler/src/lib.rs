//! # Jubilee Scheduler
//!
//! Recurring jobs that drive birthday announcements and presence rotation.
//! Tokio timers only — no job queue, no external scheduler.
//!
//! ## Architecture
//! ```text
//! SchedulerEngine (starts after the platform READY signal)
//!   ├── daily check:    sleep until next local midnight, then every 24h
//!   │                     → announce today's matches (@everyone template)
//!   ├── upcoming check: sleep until next local midnight, then every 24h
//!   │                     → announce tomorrow's matches (mention template)
//!   └── presence:       every 60s, round-robin Online → Idle → Dnd
//! ```
//!
//! The midnight alignment and the month+day target computation are pure
//! functions ([`clock`]), kept apart from the timer mechanism so they test
//! without any clock at all.

pub mod announce;
pub mod clock;
pub mod engine;
pub mod presence;

pub use announce::{AnnounceKind, Notifier};
pub use engine::SchedulerEngine;
pub use presence::PresenceCycle;
