//! Error types for `cadence-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  /// Malformed recurrence parameters; never recovered automatically.
  #[error("invalid recurrence rule: {0}")]
  Validation(String),

  #[error("unknown timezone: {0:?}")]
  UnknownTimezone(String),

  #[error("recurrence rule not found: {0}")]
  RuleNotFound(Uuid),

  #[error("event not found: {0}")]
  EventNotFound(Uuid),

  #[error("base event missing for recurrence rule {0}")]
  BaseEventNotFound(Uuid),

  #[error("event {0} already belongs to a recurrence rule")]
  AlreadyRecurring(Uuid),

  #[error("occurrence expansion failed: {0}")]
  Expansion(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
