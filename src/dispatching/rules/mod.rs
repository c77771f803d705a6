//! Built-in ordering rules.
//!
//! # Score Convention
//! All rules return lower scores for procedures that should come first.

use super::{DispatchingRule, RuleScore};
use crate::models::Procedure;

/// Highest clinical priority first.
///
/// Score is the negated priority rank (urgent = -4 .. low = -1).
#[derive(Debug, Clone, Copy)]
pub struct PriorityRank;

impl DispatchingRule for PriorityRank {
    fn name(&self) -> &'static str {
        "PRIORITY"
    }

    fn evaluate(&self, procedure: &Procedure) -> RuleScore {
        -(procedure.priority.rank() as f64)
    }

    fn description(&self) -> &'static str {
        "Highest priority first"
    }
}

/// Best insurance coverage first.
///
/// Score is `-10 * coverage / cost`, so the ratio sits on the same 0..10
/// scale as the priority rank when the two are blended.
#[derive(Debug, Clone, Copy)]
pub struct CoverageRatio;

impl DispatchingRule for CoverageRatio {
    fn name(&self) -> &'static str {
        "COVERAGE"
    }

    fn evaluate(&self, procedure: &Procedure) -> RuleScore {
        -10.0 * procedure.coverage_ratio()
    }

    fn description(&self) -> &'static str {
        "Best coverage-to-cost ratio first"
    }
}

/// Cheapest procedure first.
#[derive(Debug, Clone, Copy)]
pub struct LowestCost;

impl DispatchingRule for LowestCost {
    fn name(&self) -> &'static str {
        "COST"
    }

    fn evaluate(&self, procedure: &Procedure) -> RuleScore {
        procedure.cost
    }

    fn description(&self) -> &'static str {
        "Lowest cost first"
    }
}
