//! Per-variant packing strategies.

use super::Substitution;
use crate::dispatching::{rules, EvaluationMode, RuleEngine, TieBreaker};
use crate::models::PlanVariant;
use crate::scheduler::PackingLimits;

/// Procedures costing more than this get their own visit in the
/// insurance-optimized variant, spreading them across benefit periods.
pub const HIGH_COST_THRESHOLD: f64 = 1000.0;

/// Extra months the phased variant allows between treatment phases.
pub const PHASED_BUFFER_MONTHS: u32 = 4;

/// Parameters distinguishing one plan variant from another.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantStrategy {
    pub variant: PlanVariant,
    pub substitution: Substitution,
    pub max_procedures_per_visit: usize,
    pub max_visits: u32,
    pub isolate_cost_above: Option<f64>,
    pub split_on_priority_change: bool,
    pub extra_months: u32,
}

impl VariantStrategy {
    pub fn for_variant(variant: PlanVariant) -> Self {
        match variant {
            PlanVariant::QualityFirst => Self {
                variant,
                substitution: Substitution::HigherCost,
                max_procedures_per_visit: 3,
                max_visits: 6,
                isolate_cost_above: None,
                split_on_priority_change: false,
                extra_months: 0,
            },
            PlanVariant::InsuranceOptimized => Self {
                variant,
                substitution: Substitution::BestCoverageRatio,
                max_procedures_per_visit: 2,
                max_visits: 8,
                isolate_cost_above: Some(HIGH_COST_THRESHOLD),
                split_on_priority_change: false,
                extra_months: 0,
            },
            PlanVariant::Phased => Self {
                variant,
                substitution: Substitution::None,
                max_procedures_per_visit: 1,
                max_visits: 12,
                isolate_cost_above: None,
                split_on_priority_change: true,
                extra_months: PHASED_BUFFER_MONTHS,
            },
        }
    }

    /// Sort order applied before packing. Ties fall back to the original
    /// sequence number.
    pub fn engine(&self) -> RuleEngine {
        let engine = match self.variant {
            PlanVariant::QualityFirst => RuleEngine::new().with_rule(rules::PriorityRank),
            PlanVariant::InsuranceOptimized => RuleEngine::new()
                .with_mode(EvaluationMode::Weighted)
                .with_weighted_rule(rules::PriorityRank, 0.7)
                .with_weighted_rule(rules::CoverageRatio, 0.3),
            PlanVariant::Phased => RuleEngine::new()
                .with_rule(rules::PriorityRank)
                .with_tie_breaker(rules::LowestCost),
        };
        engine.with_final_tie_breaker(TieBreaker::BySequence)
    }

    /// Packing limits under a per-visit cap of `max_appointment_minutes`.
    pub fn limits(&self, max_appointment_minutes: u32) -> PackingLimits {
        let mut limits = PackingLimits::new(max_appointment_minutes)
            .with_max_procedures_per_visit(self.max_procedures_per_visit)
            .with_max_visits(self.max_visits);
        if let Some(threshold) = self.isolate_cost_above {
            limits = limits.with_isolate_cost_above(threshold);
        }
        if self.split_on_priority_change {
            limits = limits.with_priority_phases();
        }
        limits
    }

    /// Completion estimate in months for a plan with `visit_count` visits.
    pub fn estimated_months(&self, visit_count: u32) -> u32 {
        let base = match visit_count {
            0..=2 => 1,
            3..=4 => 2,
            5..=6 => 3,
            7..=8 => 4,
            n => n.div_ceil(2),
        };
        base + self.extra_months
    }
}
