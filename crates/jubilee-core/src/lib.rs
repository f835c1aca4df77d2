//! # Jubilee Core
//! Shared types for the birthday bot: error taxonomy, configuration,
//! the `BirthDate` value type, and the messaging platform trait.

pub mod config;
pub mod date;
pub mod error;
pub mod platform;

pub use config::Config;
pub use date::{BirthDate, MonthDay};
pub use error::{Error, Result};
pub use platform::{CommandEvent, Event, Platform, Presence, ReactionEvent};
