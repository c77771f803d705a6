//! Ordering rules for procedures.
//!
//! Each plan variant sorts procedures differently before packing. Sort keys
//! are expressed as dispatching rules composed by a [`RuleEngine`], and the
//! result is then made precedence-consistent by [`order_by_precedence`].
//!
//! # Usage
//!
//! ```
//! use dental_sequencing::dispatching::{rules, EvaluationMode, RuleEngine};
//!
//! // Phased: priority first, cheaper procedures break ties.
//! let phased = RuleEngine::new()
//!     .with_rule(rules::PriorityRank)
//!     .with_tie_breaker(rules::LowestCost);
//!
//! // Insurance-optimized: weighted blend of priority and coverage.
//! let insurance = RuleEngine::new()
//!     .with_mode(EvaluationMode::Weighted)
//!     .with_weighted_rule(rules::PriorityRank, 0.7)
//!     .with_weighted_rule(rules::CoverageRatio, 0.3);
//! ```

mod engine;
mod precedence;
pub mod rules;

pub use engine::{EvaluationMode, RuleEngine, TieBreaker};
pub use precedence::order_by_precedence;

use crate::models::Procedure;
use std::fmt::Debug;

/// Score returned by an ordering rule.
///
/// Lower scores = scheduled earlier.
pub type RuleScore = f64;

/// A rule that scores procedures for ordering.
///
/// # Score Convention
/// **Lower score = earlier.** Rules that rank "more is better" negate.
pub trait DispatchingRule: Send + Sync + Debug {
    /// Rule name (e.g., "PRIORITY").
    fn name(&self) -> &'static str;

    /// Scores a procedure; lower is scheduled earlier.
    fn evaluate(&self, procedure: &Procedure) -> RuleScore;

    /// Rule description.
    fn description(&self) -> &'static str {
        self.name()
    }
}
