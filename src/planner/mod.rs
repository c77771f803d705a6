//! Treatment plan variant generation.
//!
//! A [`PlanGenerator`] runs the full pipeline once per [`PlanVariant`]:
//!
//! 1. Validate the request
//! 2. Prepare independent clones of the procedures
//! 3. Substitute alternatives (variant-specific) and re-estimate durations
//! 4. Resolve clinical dependencies
//! 5. Sort (variant-specific) and make the order precedence-consistent
//! 6. Pack into visits under the variant's limits
//! 7. Order same-tooth endodontic/prosthodontic pairs, then finalize
//! 8. Check plan invariants and aggregate costs
//!
//! Variants never share procedure values, so they can be generated
//! independently or in parallel.
//!
//! # Example
//!
//! ```
//! use dental_sequencing::models::{ClinicalDomain, PlanRequest, PlanVariant, Procedure};
//! use dental_sequencing::planner::PlanGenerator;
//!
//! let request = PlanRequest::new("patient-1", "dr-1").with_procedures(vec![
//!     Procedure::new("f1", "D2391", ClinicalDomain::Restorative).with_name("Composite #3"),
//!     Procedure::new("f2", "D2391", ClinicalDomain::Restorative).with_name("Composite #14"),
//! ]);
//!
//! let plans = PlanGenerator::default().generate_all(&request).unwrap();
//! assert_eq!(plans.len(), 3);
//! assert_eq!(plans[0].variant, PlanVariant::QualityFirst);
//! assert_eq!(plans[0].visit_count, 1);
//! assert_eq!(plans[2].visit_count, 2); // phased: one per visit
//! ```

mod same_tooth;
mod strategy;
mod substitution;

pub use strategy::{VariantStrategy, HIGH_COST_THRESHOLD, PHASED_BUFFER_MONTHS};
pub use substitution::Substitution;

use tracing::{debug, info};

use crate::constraints::ConstraintResolver;
use crate::dispatching::order_by_precedence;
use crate::duration::DurationEstimator;
use crate::error::PlanningError;
use crate::models::{Appointment, PlanRequest, PlanVariant, SchedulingConstraints, TreatmentPlan};
use crate::scheduler::{finalize_visits, prepare_procedures, VisitPacker};
use crate::validation::{check_plan, validate_dependencies, validate_request};

/// Generates treatment plan variants for a request.
#[derive(Debug, Clone, Default)]
pub struct PlanGenerator {
    constraints: SchedulingConstraints,
    estimator: DurationEstimator,
}

impl PlanGenerator {
    pub fn new(constraints: SchedulingConstraints) -> Self {
        Self {
            constraints,
            estimator: DurationEstimator::new(),
        }
    }

    /// Replaces the duration estimator (e.g. with practice-specific overrides).
    pub fn with_estimator(mut self, estimator: DurationEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn constraints(&self) -> &SchedulingConstraints {
        &self.constraints
    }

    pub fn estimator(&self) -> &DurationEstimator {
        &self.estimator
    }

    /// Generates all variants, in [`PlanVariant::ALL`] order.
    pub fn generate_all(&self, request: &PlanRequest) -> Result<Vec<TreatmentPlan>, PlanningError> {
        PlanVariant::ALL
            .iter()
            .map(|&variant| self.generate(request, variant))
            .collect()
    }

    /// Generates one plan variant.
    ///
    /// # Errors
    /// - `InvalidInput` when the request or constraints are rejected
    /// - `InvariantViolation` when the packed plan fails its checks
    pub fn generate(
        &self,
        request: &PlanRequest,
        variant: PlanVariant,
    ) -> Result<TreatmentPlan, PlanningError> {
        validate_request(request, &self.constraints)?;
        let strategy = VariantStrategy::for_variant(variant);

        let mut procedures = prepare_procedures(request, &self.constraints, &self.estimator);
        for p in &mut procedures {
            if strategy.substitution.apply(p) {
                p.estimated_minutes = Some(self.estimator.estimate(&p.code));
            }
        }

        let resolver = ConstraintResolver::new()
            .with_min_days_between_visits(self.constraints.min_days_between_visits);
        let dependencies = resolver.resolve(&procedures);
        validate_dependencies(&dependencies)?;
        debug!(%variant, dependencies = dependencies.len(), "dependencies resolved");

        let ordered = order_by_precedence(strategy.engine().sort(&procedures), &dependencies);

        let max_minutes = self.constraints.effective_max_minutes();
        let packer = VisitPacker::from_constraints(strategy.limits(max_minutes), &self.constraints);
        let mut visits = packer.pack(&ordered, &dependencies);

        let swaps =
            same_tooth::order_same_tooth_pairs(&mut visits, &resolver, &dependencies, max_minutes);
        if swaps > 0 {
            finalize_visits(&mut visits, self.constraints.mobility);
        }

        check_plan(&visits, procedures.len(), &dependencies, &resolver, max_minutes)?;

        let plan = self.assemble(request, &strategy, visits);
        info!(
            plan = %plan.id,
            visits = plan.visit_count,
            total_cost = plan.total_cost,
            out_of_pocket = plan.out_of_pocket,
            "plan generated"
        );
        Ok(plan)
    }

    fn assemble(
        &self,
        request: &PlanRequest,
        strategy: &VariantStrategy,
        appointments: Vec<Appointment>,
    ) -> TreatmentPlan {
        let procedures: Vec<_> = appointments
            .iter()
            .flat_map(|a| a.procedures.iter().cloned())
            .collect();

        let total_cost: f64 = procedures.iter().map(|p| p.cost).sum();
        let total_coverage: f64 = procedures
            .iter()
            .map(|p| p.insurance_coverage.min(p.cost))
            .sum();
        let visit_count = appointments.len() as u32;

        TreatmentPlan {
            id: format!("{}-{}", request.patient_id, strategy.variant.slug()),
            patient_id: request.patient_id.clone(),
            doctor_id: request.doctor_id.clone(),
            variant: strategy.variant,
            title: strategy.variant.title().to_string(),
            procedures,
            appointments,
            total_cost,
            total_coverage,
            out_of_pocket: total_cost - total_coverage,
            visit_count,
            estimated_months: strategy.estimated_months(visit_count),
        }
    }
}
