//! Greedy visit packer.
//!
//! # Algorithm
//!
//! Single pass over procedures in the given order, keeping one open visit:
//!
//! 1. If any prerequisite of the procedure is already placed, close the
//!    open visit even when it has room. The new visit starts with the
//!    procedure and records the latest prerequisite's visit and the
//!    dependency's timing window.
//! 2. Otherwise split when the procedure would push the visit past the cap
//!    (treatment + setup), or conflicts with anything already in the visit.
//! 3. Variant limits split further: procedures per visit, isolated
//!    high-cost procedures, priority phase changes. These soft splits stop
//!    once the visit budget is reached; hard splits (1, 2) never stop.
//! 4. Append the procedure, track the visit's priority and provider.
//! 5. Close the last visit, then finalize durations and notes.
//!
//! Placement is never revisited. The result is always valid but can use
//! more visits than an exhaustive search would.
//!
//! # Complexity
//! O(n²) compatibility checks in the worst case (n = procedures).
//!
//! # Reference
//! Coffman, Garey & Johnson (1996), "Approximation algorithms for bin
//! packing: a survey" (Next-Fit)

use std::collections::HashMap;
use std::mem;

use tracing::{debug, warn};

use super::finalize::finalize_visits;
use super::input::prepare_procedures;
use crate::constraints::{ConstraintResolver, DependencyMap};
use crate::dispatching::{order_by_precedence, rules, RuleEngine, TieBreaker};
use crate::duration::{DurationEstimator, SETUP_OVERHEAD_MINUTES};
use crate::error::PlanningError;
use crate::models::{
    Appointment, ClinicalDomain, MobilityLevel, PatientPreferences, PlanRequest, Priority,
    Procedure, Provider, SchedulingConstraints,
};
use crate::validation::{check_plan, validate_dependencies, validate_request};

/// Variant-specific packing limits.
#[derive(Debug, Clone, PartialEq)]
pub struct PackingLimits {
    /// Cap on treatment + setup minutes per visit.
    pub max_appointment_minutes: u32,
    /// Soft cap on procedures per visit.
    pub max_procedures_per_visit: Option<usize>,
    /// Visit budget; soft splits stop once it is reached.
    pub max_visits: Option<u32>,
    /// Procedures costing more than this get a visit of their own.
    pub isolate_cost_above: Option<f64>,
    /// Start a new visit whenever the priority level changes.
    pub split_on_priority_change: bool,
}

impl PackingLimits {
    /// Limits with only a duration cap.
    pub fn new(max_appointment_minutes: u32) -> Self {
        Self {
            max_appointment_minutes,
            max_procedures_per_visit: None,
            max_visits: None,
            isolate_cost_above: None,
            split_on_priority_change: false,
        }
    }

    pub fn with_max_procedures_per_visit(mut self, max: usize) -> Self {
        self.max_procedures_per_visit = Some(max);
        self
    }

    pub fn with_max_visits(mut self, max: u32) -> Self {
        self.max_visits = Some(max);
        self
    }

    pub fn with_isolate_cost_above(mut self, threshold: f64) -> Self {
        self.isolate_cost_above = Some(threshold);
        self
    }

    pub fn with_priority_phases(mut self) -> Self {
        self.split_on_priority_change = true;
        self
    }

    fn isolates(&self, procedure: &Procedure) -> bool {
        self.isolate_cost_above
            .is_some_and(|threshold| procedure.cost > threshold)
    }
}

/// Why a visit was closed before adding a procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SplitReason {
    Dependency,
    Duration,
    Incompatible,
    VisitFull,
    HighCost,
    PriorityPhase,
}

impl SplitReason {
    /// Hard splits protect clinical validity and are never relaxed.
    fn is_hard(&self) -> bool {
        matches!(self, Self::Dependency | Self::Duration | Self::Incompatible)
    }
}

/// Greedy visit packer.
///
/// # Example
///
/// ```
/// use dental_sequencing::models::{ClinicalDomain, PlanRequest, Priority, Procedure, SchedulingConstraints};
/// use dental_sequencing::scheduler::VisitPacker;
///
/// let request = PlanRequest::new("patient-1", "dr-1")
///     .with_procedure(
///         Procedure::new("rct", "D3330", ClinicalDomain::Endodontic)
///             .with_name("Root canal tooth #19")
///             .with_priority(Priority::High),
///     )
///     .with_procedure(
///         Procedure::new("crown", "D2740", ClinicalDomain::Prosthodontic)
///             .with_name("Crown tooth #19")
///             .with_priority(Priority::High),
///     );
///
/// let visits = VisitPacker::optimize(&request, &SchedulingConstraints::default()).unwrap();
/// assert_eq!(visits.len(), 2);
/// assert_eq!(visits[1].depends_on_visit, Some(1));
/// ```
#[derive(Debug, Clone)]
pub struct VisitPacker {
    limits: PackingLimits,
    resolver: ConstraintResolver,
    providers: Vec<Provider>,
    preferences: PatientPreferences,
    mobility: MobilityLevel,
}

impl VisitPacker {
    /// Creates a packer with the given limits and no providers.
    pub fn new(limits: PackingLimits) -> Self {
        Self {
            limits,
            resolver: ConstraintResolver::new(),
            providers: Vec::new(),
            preferences: PatientPreferences::default(),
            mobility: MobilityLevel::Full,
        }
    }

    /// Creates a packer whose cap, providers and patient settings come from
    /// `constraints`.
    pub fn from_constraints(limits: PackingLimits, constraints: &SchedulingConstraints) -> Self {
        Self {
            limits,
            resolver: ConstraintResolver::new()
                .with_min_days_between_visits(constraints.min_days_between_visits),
            providers: constraints.providers.clone(),
            preferences: constraints.preferences.clone(),
            mobility: constraints.mobility,
        }
    }

    pub fn limits(&self) -> &PackingLimits {
        &self.limits
    }

    pub fn resolver(&self) -> &ConstraintResolver {
        &self.resolver
    }

    /// Visit-level optimizer: validates the request, orders procedures by
    /// priority then original sequence, packs them and checks the result.
    pub fn optimize(
        request: &PlanRequest,
        constraints: &SchedulingConstraints,
    ) -> Result<Vec<Appointment>, PlanningError> {
        validate_request(request, constraints)?;

        let packer = Self::from_constraints(
            PackingLimits::new(constraints.effective_max_minutes()),
            constraints,
        );
        let procedures = prepare_procedures(request, constraints, &DurationEstimator::new());
        let dependencies = packer.resolver.resolve(&procedures);
        validate_dependencies(&dependencies)?;

        let engine = RuleEngine::new()
            .with_rule(rules::PriorityRank)
            .with_final_tie_breaker(TieBreaker::BySequence);
        let ordered = order_by_precedence(engine.sort(&procedures), &dependencies);

        let visits = packer.pack(&ordered, &dependencies);
        check_plan(
            &visits,
            procedures.len(),
            &dependencies,
            &packer.resolver,
            packer.limits.max_appointment_minutes,
        )?;
        Ok(visits)
    }

    /// Packs `procedures`, in the given order, into finalized visits.
    pub fn pack(&self, procedures: &[Procedure], dependencies: &DependencyMap) -> Vec<Appointment> {
        let mut visits: Vec<Appointment> = Vec::new();
        let mut current = Appointment::new(1);
        let mut current_minutes: u32 = 0;
        let mut visit_of: HashMap<&str, u32> = HashMap::new();
        let mut previous_priority: Option<Priority> = None;
        let mut budget_warned = false;

        for procedure in procedures {
            let minutes = procedure.minutes();

            // Latest visit among already placed prerequisites
            let prerequisite = dependencies
                .for_procedure(&procedure.id)
                .filter_map(|d| visit_of.get(d.before_id.as_str()).map(|&v| (v, d)))
                .max_by_key(|(v, _)| *v);

            let reason = match prerequisite {
                Some(_) if !current.is_empty() => Some(SplitReason::Dependency),
                _ => self.split_reason(&current, current_minutes, procedure, previous_priority),
            };

            if let Some(reason) = reason {
                let budget_reached = self
                    .limits
                    .max_visits
                    .is_some_and(|max| current.visit_number >= max);

                if reason.is_hard() || !budget_reached {
                    debug!(procedure = %procedure.id, ?reason, "closing visit");
                    close_visit(&mut visits, &mut current, &mut current_minutes);
                } else if !budget_warned {
                    warn!(
                        max_visits = current.visit_number,
                        "visit budget reached, relaxing per-visit limits"
                    );
                    budget_warned = true;
                }
            }

            // Dependency splits always leave an empty visit here
            if let Some((visit, dependency)) = prerequisite {
                current.depends_on_visit = Some(visit);
                current.ideal_timing_after_previous = Some(dependency.window.clone());
            }

            if current.preferred_provider.is_none() {
                current.preferred_provider = self.match_provider(procedure.domain).map(|p| p.id.clone());
            }
            visit_of.insert(procedure.id.as_str(), current.visit_number);
            current.push(procedure.clone());
            current_minutes += minutes;
            previous_priority = Some(procedure.priority);

            if self.limits.isolates(procedure) {
                close_visit(&mut visits, &mut current, &mut current_minutes);
            }
        }
        close_visit(&mut visits, &mut current, &mut current_minutes);

        finalize_visits(&mut visits, self.mobility);
        visits
    }

    /// One procedure per visit in priority order; the unoptimized fallback
    /// and the baseline that optimized plans are compared against.
    pub fn baseline(&self, procedures: &[Procedure]) -> Vec<Appointment> {
        let engine = RuleEngine::new()
            .with_rule(rules::PriorityRank)
            .with_final_tie_breaker(TieBreaker::BySequence);

        let mut visits: Vec<Appointment> = engine
            .sort(procedures)
            .into_iter()
            .enumerate()
            .map(|(i, procedure)| {
                let mut visit = Appointment::new(i as u32 + 1);
                visit.preferred_provider = self.match_provider(procedure.domain).map(|p| p.id.clone());
                visit.push(procedure);
                visit
            })
            .collect();

        finalize_visits(&mut visits, self.mobility);
        visits
    }

    fn split_reason(
        &self,
        current: &Appointment,
        current_minutes: u32,
        procedure: &Procedure,
        previous_priority: Option<Priority>,
    ) -> Option<SplitReason> {
        if current.is_empty() {
            return None;
        }
        if current_minutes + procedure.minutes() + SETUP_OVERHEAD_MINUTES
            > self.limits.max_appointment_minutes
        {
            return Some(SplitReason::Duration);
        }
        if current
            .procedures
            .iter()
            .any(|placed| !self.resolver.compatible(placed, procedure))
        {
            return Some(SplitReason::Incompatible);
        }
        if self
            .limits
            .max_procedures_per_visit
            .is_some_and(|max| current.len() >= max)
        {
            return Some(SplitReason::VisitFull);
        }
        if self.limits.isolates(procedure) {
            return Some(SplitReason::HighCost);
        }
        if self.limits.split_on_priority_change && previous_priority != Some(procedure.priority) {
            return Some(SplitReason::PriorityPhase);
        }
        None
    }

    /// Patient's preferred provider if suitable, else the first available
    /// provider for the domain.
    fn match_provider(&self, domain: ClinicalDomain) -> Option<&Provider> {
        let preferred = self
            .preferences
            .preferred_provider_id
            .as_deref()
            .and_then(|id| self.providers.iter().find(|p| p.id == id))
            .filter(|p| p.handles(domain));

        preferred.or_else(|| self.providers.iter().find(|p| p.handles(domain)))
    }
}

/// Unoptimized fallback plan: every procedure in its own visit, in priority
/// order. Never fails, so callers can use it when optimization is rejected.
pub fn baseline_appointments(
    request: &PlanRequest,
    constraints: &SchedulingConstraints,
) -> Vec<Appointment> {
    let procedures = prepare_procedures(request, constraints, &DurationEstimator::new());
    VisitPacker::from_constraints(
        PackingLimits::new(constraints.effective_max_minutes()),
        constraints,
    )
    .baseline(&procedures)
}

fn close_visit(visits: &mut Vec<Appointment>, current: &mut Appointment, minutes: &mut u32) {
    if current.is_empty() {
        return;
    }
    let next = Appointment::new(current.visit_number + 1);
    visits.push(mem::replace(current, next));
    *minutes = 0;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TimingWindow;

    fn make(id: &str, code: &str, domain: ClinicalDomain, name: &str, minutes: u32) -> Procedure {
        let mut p = Procedure::new(id, code, domain).with_name(name);
        p.estimated_minutes = Some(minutes);
        p
    }

    fn filling(id: &str, tooth: u32) -> Procedure {
        make(
            id,
            "D2391",
            ClinicalDomain::Restorative,
            &format!("Composite tooth #{tooth}"),
            30,
        )
    }

    fn visit_numbers(visits: &[Appointment]) -> Vec<Vec<&str>> {
        visits
            .iter()
            .map(|v| v.procedures.iter().map(|p| p.id.as_str()).collect())
            .collect()
    }

    #[test]
    fn test_duration_cap_splits() {
        let packer = VisitPacker::new(PackingLimits::new(120));
        let procs: Vec<_> = (1..=5).map(|i| filling(&format!("F{i}"), i)).collect();
        let visits = packer.pack(&procs, &DependencyMap::new());

        // 3 × 30 + 15 = 105 fits, a 4th would need 135
        assert_eq!(
            visit_numbers(&visits),
            vec![vec!["F1", "F2", "F3"], vec!["F4", "F5"]]
        );
        assert_eq!(visits[0].estimated_minutes, 105);
        assert_eq!(visits[1].estimated_minutes, 75);
    }

    #[test]
    fn test_incompatible_procedures_split() {
        let packer = VisitPacker::new(PackingLimits::new(240));
        let procs = vec![
            make("R", "D3310", ClinicalDomain::Endodontic, "RCT #8", 60),
            make("E", "D7140", ClinicalDomain::Surgical, "Extraction #32", 30),
        ];
        let visits = packer.pack(&procs, &DependencyMap::new());
        assert_eq!(visits.len(), 2);
    }

    #[test]
    fn test_dependency_forces_new_visit_with_window() {
        let packer = VisitPacker::new(PackingLimits::new(240));
        let procs = vec![
            make("S", "D4341", ClinicalDomain::Periodontic, "SRP", 60),
            filling("F", 3),
        ];
        let mut deps = DependencyMap::new();
        deps.insert(crate::models::Dependency::new(
            "S",
            "F",
            TimingWindow::new(14, 30, "periodontal therapy first"),
        ));
        let visits = packer.pack(&procs, &deps);

        assert_eq!(visits.len(), 2);
        assert_eq!(visits[1].depends_on_visit, Some(1));
        assert_eq!(
            visits[1].ideal_timing_after_previous.as_ref().map(|w| w.min_days),
            Some(14)
        );
        assert!(!visits[1].ready);
    }

    #[test]
    fn test_prerequisite_in_closed_visit_still_forces_new_visit() {
        // S + X = 135 > 120 closes visit 1; F must not join X in visit 2
        let request = PlanRequest::new("pt", "dr").with_procedures(vec![
            Procedure::new("S", "D4341", ClinicalDomain::Periodontic).with_name("SRP UR"),
            Procedure::new("X", "D7240", ClinicalDomain::Surgical)
                .with_name("Impacted extraction #32")
                .with_sequence(1),
            Procedure::new("F", "D2391", ClinicalDomain::Restorative)
                .with_name("Composite tooth #3")
                .with_sequence(2),
        ]);
        let visits = VisitPacker::optimize(&request, &SchedulingConstraints::default()).unwrap();

        assert_eq!(visit_numbers(&visits), vec![vec!["S"], vec!["X"], vec!["F"]]);
        assert_eq!(visits[1].depends_on_visit, None);
        assert!(visits[1].ideal_timing_after_previous.is_none());
        assert!(visits[1].ready);
        assert_eq!(visits[2].depends_on_visit, Some(1));
        assert!(!visits[2].ready);
    }

    #[test]
    fn test_each_dependent_starts_its_own_visit() {
        let packer = VisitPacker::new(PackingLimits::new(240));
        let procs = vec![
            make("S", "D4341", ClinicalDomain::Periodontic, "SRP", 60),
            filling("F1", 3),
            filling("F2", 4),
        ];
        let mut deps = DependencyMap::new();
        for after in ["F1", "F2"] {
            deps.insert(crate::models::Dependency::new(
                "S",
                after,
                TimingWindow::new(14, 30, "periodontal therapy first"),
            ));
        }
        let visits = packer.pack(&procs, &deps);

        assert_eq!(visit_numbers(&visits), vec![vec!["S"], vec!["F1"], vec!["F2"]]);
        assert_eq!(visits[2].depends_on_visit, Some(1));
    }

    #[test]
    fn test_unplaced_prerequisite_is_ignored() {
        let packer = VisitPacker::new(PackingLimits::new(120));
        let mut deps = DependencyMap::new();
        deps.insert(crate::models::Dependency::new(
            "elsewhere",
            "F1",
            TimingWindow::new(7, 30, "x"),
        ));
        let visits = packer.pack(&[filling("F1", 1), filling("F2", 2)], &deps);
        assert_eq!(visits.len(), 1);
        assert_eq!(visits[0].depends_on_visit, None);
    }

    #[test]
    fn test_max_procedures_per_visit() {
        let packer = VisitPacker::new(PackingLimits::new(240).with_max_procedures_per_visit(2));
        let procs: Vec<_> = (1..=5).map(|i| filling(&format!("F{i}"), i)).collect();
        let visits = packer.pack(&procs, &DependencyMap::new());
        assert_eq!(
            visit_numbers(&visits),
            vec![vec!["F1", "F2"], vec!["F3", "F4"], vec!["F5"]]
        );
    }

    #[test]
    fn test_visit_budget_relaxes_soft_limits_only() {
        let limits = PackingLimits::new(120)
            .with_max_procedures_per_visit(1)
            .with_max_visits(2);
        let packer = VisitPacker::new(limits);
        let procs: Vec<_> = (1..=5).map(|i| filling(&format!("F{i}"), i)).collect();
        let visits = packer.pack(&procs, &DependencyMap::new());

        // Visit 2 absorbs overflow until the duration cap forces visit 3
        assert_eq!(
            visit_numbers(&visits),
            vec![vec!["F1"], vec!["F2", "F3", "F4"], vec!["F5"]]
        );
    }

    #[test]
    fn test_high_cost_isolated() {
        let packer = VisitPacker::new(PackingLimits::new(240).with_isolate_cost_above(1000.0));
        let procs = vec![
            filling("A", 1),
            filling("B", 2).with_cost(1500.0, 500.0),
            filling("C", 3),
        ];
        let visits = packer.pack(&procs, &DependencyMap::new());
        assert_eq!(
            visit_numbers(&visits),
            vec![vec!["A"], vec!["B"], vec!["C"]]
        );
    }

    #[test]
    fn test_priority_phases() {
        let packer = VisitPacker::new(PackingLimits::new(240).with_priority_phases());
        let procs = vec![
            filling("U1", 1).with_priority(Priority::Urgent),
            filling("U2", 2).with_priority(Priority::Urgent),
            filling("M1", 3).with_priority(Priority::Medium),
        ];
        let visits = packer.pack(&procs, &DependencyMap::new());
        assert_eq!(
            visit_numbers(&visits),
            vec![vec!["U1", "U2"], vec!["M1"]]
        );
        assert_eq!(visits[0].priority, Priority::Urgent);
        assert_eq!(visits[1].priority, Priority::Medium);
    }

    #[test]
    fn test_oversized_procedure_gets_own_visit() {
        let packer = VisitPacker::new(PackingLimits::new(60));
        let procs = vec![
            make("R", "D3330", ClinicalDomain::Endodontic, "RCT #19", 90),
            filling("F", 3),
        ];
        let visits = packer.pack(&procs, &DependencyMap::new());
        assert_eq!(visits.len(), 2);
        assert_eq!(visits[0].estimated_minutes, 105);
    }

    #[test]
    fn test_provider_matching() {
        let constraints = SchedulingConstraints::new()
            .with_provider(Provider::new("gp").with_specialty(ClinicalDomain::Restorative))
            .with_provider(
                Provider::new("endo-away")
                    .with_specialty(ClinicalDomain::Endodontic)
                    .unavailable(),
            )
            .with_provider(
                Provider::new("endo")
                    .with_specialty(ClinicalDomain::Endodontic)
                    .with_specialty(ClinicalDomain::Restorative),
            )
            .with_preferences(PatientPreferences::default().with_preferred_provider("endo"));
        let packer = VisitPacker::from_constraints(PackingLimits::new(240), &constraints);

        let visits = packer.pack(
            &[
                filling("F", 3),
                make("R", "D3310", ClinicalDomain::Endodontic, "RCT #8", 60),
            ],
            &DependencyMap::new(),
        );
        assert_eq!(visits.len(), 1);
        assert_eq!(visits[0].preferred_provider.as_deref(), Some("endo"));
    }

    #[test]
    fn test_baseline_one_per_visit() {
        let packer = VisitPacker::new(PackingLimits::new(120));
        let procs = vec![
            filling("A", 1).with_priority(Priority::Low),
            filling("B", 2).with_priority(Priority::Urgent),
        ];
        let visits = packer.baseline(&procs);
        assert_eq!(visit_numbers(&visits), vec![vec!["B"], vec!["A"]]);
        assert!(visits.iter().all(|v| v.estimated_minutes == 45));
    }

    #[test]
    fn test_baseline_appointments_from_request() {
        let request = PlanRequest::new("pt", "dr").with_procedures(vec![
            Procedure::new("A", "D2391", ClinicalDomain::Restorative).with_name("Composite #3"),
            Procedure::new("B", "D2391", ClinicalDomain::Restorative)
                .with_name("Composite #4")
                .with_sequence(1),
        ]);
        let visits = baseline_appointments(&request, &SchedulingConstraints::default());
        assert_eq!(visit_numbers(&visits), vec![vec!["A"], vec!["B"]]);
        assert_eq!(visits[1].procedures[0].visit_number, Some(2));
    }

    #[test]
    fn test_optimize_rejects_empty_request() {
        let err = VisitPacker::optimize(
            &PlanRequest::new("pt", "dr"),
            &SchedulingConstraints::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PlanningError::InvalidInput(_)));
    }

    #[test]
    fn test_optimize_orders_prerequisite_first() {
        // Crown listed first with higher priority; root canal still goes first
        let request = PlanRequest::new("pt", "dr")
            .with_procedure(
                Procedure::new("crown", "D2740", ClinicalDomain::Prosthodontic)
                    .with_name("Crown tooth #19")
                    .with_priority(Priority::Urgent),
            )
            .with_procedure(
                Procedure::new("rct", "D3330", ClinicalDomain::Endodontic)
                    .with_name("Root canal tooth #19")
                    .with_priority(Priority::Low)
                    .with_sequence(1),
            );
        let visits = VisitPacker::optimize(&request, &SchedulingConstraints::default()).unwrap();
        assert_eq!(visit_numbers(&visits), vec![vec!["rct"], vec!["crown"]]);
        assert_eq!(visits[1].priority, Priority::Urgent);
    }

    #[test]
    fn test_optimize_honours_patient_cap_and_min_gap() {
        let request = PlanRequest::new("pt", "dr").with_procedures(vec![
            Procedure::new("S", "D4341", ClinicalDomain::Periodontic).with_name("SRP UR"),
            Procedure::new("F1", "D2391", ClinicalDomain::Restorative)
                .with_name("Composite #3")
                .with_sequence(1),
            Procedure::new("F2", "D2391", ClinicalDomain::Restorative)
                .with_name("Composite #4")
                .with_sequence(2),
        ]);
        let constraints = SchedulingConstraints::new()
            .with_min_days_between_visits(21)
            .with_preferences(PatientPreferences::default().with_max_visit_minutes(60));
        let visits = VisitPacker::optimize(&request, &constraints).unwrap();

        // 30 + 30 + 15 = 75 > 60, so the fillings split
        assert_eq!(visit_numbers(&visits), vec![vec!["S"], vec!["F1"], vec!["F2"]]);
        let window = visits[1].ideal_timing_after_previous.as_ref().unwrap();
        assert_eq!((window.min_days, window.max_days), (21, 30));
    }
}
