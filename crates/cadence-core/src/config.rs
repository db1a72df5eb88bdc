//! Engine configuration.
//!
//! Deserialised by the binary from its config file; every field has a
//! default so an empty `[engine]` table is valid.

use serde::{Deserialize, Serialize};

use crate::{
  describe::Locale,
  expand::{DISPLAY_LIMIT, RECONCILE_LIMIT},
};

/// What reconciliation does when a rule's base event is gone.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum MissingBaseEvent {
  /// Treat as "nothing to materialise" and return no instances.
  #[default]
  Skip,
  /// Fail with [`crate::Error::BaseEventNotFound`].
  Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Horizon for `apply_recurrence` when the caller passes no limit.
  pub reconcile_limit:    usize,
  /// Horizon for previews when the caller passes no limit.
  pub display_limit:      usize,
  pub missing_base_event: MissingBaseEvent,
  /// Locale for rule descriptions.
  pub locale:             Locale,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      reconcile_limit:    RECONCILE_LIMIT,
      display_limit:      DISPLAY_LIMIT,
      missing_base_event: MissingBaseEvent::default(),
      locale:             Locale::default(),
    }
  }
}
