//! Clinical precedence between procedures.
//!
//! A dependency states that one procedure must be completed in an earlier
//! visit than another, with a recommended gap in days. Dependencies are
//! derived per planning run and never persisted.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Recommended gap between two visits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingWindow {
    /// Minimum days after the prerequisite visit.
    pub min_days: u32,
    /// Maximum days after the prerequisite visit.
    pub max_days: u32,
    /// Clinical reason for the gap.
    pub reason: String,
}

impl TimingWindow {
    pub fn new(min_days: u32, max_days: u32, reason: impl Into<String>) -> Self {
        Self {
            min_days,
            max_days,
            reason: reason.into(),
        }
    }

    /// Raises the minimum to at least `min_days`, widening the maximum if needed.
    pub fn with_floor(mut self, min_days: u32) -> Self {
        self.min_days = self.min_days.max(min_days);
        self.max_days = self.max_days.max(self.min_days);
        self
    }
}

impl fmt::Display for TimingWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{} days ({})", self.min_days, self.max_days, self.reason)
    }
}

/// Procedure `after_id` cannot be performed until `before_id` is done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub before_id: String,
    pub after_id: String,
    pub window: TimingWindow,
}

impl Dependency {
    pub fn new(
        before_id: impl Into<String>,
        after_id: impl Into<String>,
        window: TimingWindow,
    ) -> Self {
        Self {
            before_id: before_id.into(),
            after_id: after_id.into(),
            window,
        }
    }
}
