//! # Jubilee Consent
//! Consent-gated birthday registration.
//!
//! A registration attempt walks one state machine:
//! `Requested → AwaitingConsent → {Accepted | Declined | TimedOut | Invalid}`.
//! No record is written until the requester reacts ✅ on the consent prompt.
//!
//! Reaction waiting is modeled as an explicit pending-session registry plus
//! a cancellable timer, not a blocking wait inside the gateway callback —
//! the whole flow runs against the `Platform` trait and paused tokio time
//! in tests.

mod flow;
mod session;

pub use flow::ConsentFlow;
pub use session::{ConsentOutcome, ConsentRegistry};

use std::time::Duration;

pub const ACCEPT_EMOJI: &str = "✅";
pub const DECLINE_EMOJI: &str = "❌";

/// How long the requester has to react on the consent prompt.
pub const CONSENT_TIMEOUT: Duration = Duration::from_secs(60);

/// Lifetime of transient status notices before self-deletion.
pub const NOTICE_TTL: Duration = Duration::from_secs(5);
