//! Request preparation.
//!
//! Planning never touches the caller's procedures. Each run works on clones
//! normalized here: ordered by original sequence, coverage clamped to cost,
//! urgent overrides applied and durations annotated.

use tracing::debug;

use crate::duration::DurationEstimator;
use crate::models::{PlanRequest, Priority, Procedure, SchedulingConstraints};

/// Returns normalized clones of the request's procedures.
pub fn prepare_procedures(
    request: &PlanRequest,
    constraints: &SchedulingConstraints,
    estimator: &DurationEstimator,
) -> Vec<Procedure> {
    let mut procedures: Vec<Procedure> = request
        .procedures
        .iter()
        .cloned()
        .map(|mut p| {
            if p.insurance_coverage > p.cost {
                debug!(
                    procedure = %p.id,
                    cost = p.cost,
                    coverage = p.insurance_coverage,
                    "coverage exceeds cost, clamping"
                );
                p.insurance_coverage = p.cost;
            }
            if constraints.is_urgent_override(&p.id) && p.priority != Priority::Urgent {
                debug!(procedure = %p.id, from = ?p.priority, "urgent override");
                p.priority = Priority::Urgent;
            }
            for alternative in &mut p.alternatives {
                if alternative.insurance_coverage > alternative.cost {
                    alternative.insurance_coverage = alternative.cost;
                }
            }
            p
        })
        .collect();

    procedures.sort_by_key(|p| p.sequence);
    estimator.annotate(&mut procedures);
    procedures
}
