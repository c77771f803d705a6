//! Input validation and plan invariant checks.
//!
//! Before packing, checks the caller's input contract:
//! - Non-empty procedure list
//! - Positive appointment length
//! - Unique, non-empty procedure IDs
//! - Finite, non-negative costs and coverage
//! - No circular prerequisites (DAG validation)
//!
//! After packing, [`check_plan`] verifies the properties every produced
//! plan must hold. A failure there is a bug in the planner, not bad input.
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4 (Topological Sort)

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::constraints::{ConstraintResolver, DependencyMap};
use crate::duration::{round_up_to_slot, visit_minutes, SETUP_OVERHEAD_MINUTES, SLOT_MINUTES};
use crate::error::PlanningError;
use crate::models::{Appointment, PlanRequest, SchedulingConstraints};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// No procedures to plan.
    EmptyProcedureList,
    /// Appointment length is zero or negative.
    InvalidAppointmentLength,
    /// A procedure has a blank ID.
    EmptyId,
    /// Two procedures share the same ID.
    DuplicateId,
    /// Cost or coverage is negative or not a number.
    InvalidAmount,
    /// Prerequisite graph contains a cycle.
    CyclicDependency,
}

impl ValidationError {
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Validates a planning request against its constraints.
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_request(
    request: &PlanRequest,
    constraints: &SchedulingConstraints,
) -> ValidationResult {
    let mut errors = Vec::new();

    if request.procedures.is_empty() {
        errors.push(ValidationError::new(
            ValidationErrorKind::EmptyProcedureList,
            "No procedures to plan",
        ));
    }

    if constraints.max_appointment_minutes <= 0 {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidAppointmentLength,
            format!(
                "Max appointment length must be positive, got {} minutes",
                constraints.max_appointment_minutes
            ),
        ));
    }
    if let Some(preferred) = constraints.preferences.max_visit_minutes {
        if preferred <= 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidAppointmentLength,
                format!("Preferred visit length must be positive, got {preferred} minutes"),
            ));
        }
    }

    let mut ids = HashSet::new();
    for p in &request.procedures {
        if p.id.trim().is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::EmptyId,
                format!("Procedure with code '{}' has an empty ID", p.code),
            ));
        } else if !ids.insert(p.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate procedure ID: {}", p.id),
            ));
        }

        if !p.cost.is_finite() || p.cost < 0.0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidAmount,
                format!("Procedure '{}' has invalid cost {}", p.id, p.cost),
            ));
        }
        if !p.insurance_coverage.is_finite() || p.insurance_coverage < 0.0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidAmount,
                format!(
                    "Procedure '{}' has invalid insurance coverage {}",
                    p.id, p.insurance_coverage
                ),
            ));
        }
    }

    let known = &ids;
    let edges = request.procedures.iter().flat_map(move |p| {
        p.prerequisites
            .iter()
            .filter(move |pre| known.contains(pre.as_str()))
            .map(move |pre| (pre.as_str(), p.id.as_str()))
    });
    if let Some(node) = detect_cycles(edges) {
        errors.push(ValidationError::new(
            ValidationErrorKind::CyclicDependency,
            format!("Circular prerequisite detected involving procedure '{node}'"),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates the combined clinical and listed dependencies of a batch.
///
/// Listed prerequisites can contradict a clinical rule (e.g. a crown listed
/// as prerequisite of its own root canal); such a batch cannot be ordered.
pub fn validate_dependencies(dependencies: &DependencyMap) -> ValidationResult {
    let edges = dependencies
        .iter()
        .map(|d| (d.before_id.as_str(), d.after_id.as_str()));
    match detect_cycles(edges) {
        Some(node) => Err(vec![ValidationError::new(
            ValidationErrorKind::CyclicDependency,
            format!("Prerequisites contradict clinical ordering around procedure '{node}'"),
        )]),
        None => Ok(()),
    }
}

/// Detects cycles in a precedence graph using DFS.
///
/// Returns a node on the first cycle found, in first-appearance order.
///
/// # Algorithm
/// Topological sort via DFS. If a back-edge is found (visiting a node
/// currently in the recursion stack), a cycle exists.
fn detect_cycles<'a>(edges: impl IntoIterator<Item = (&'a str, &'a str)>) -> Option<&'a str> {
    // Build adjacency list: before → afters
    let mut adj: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut nodes: Vec<&str> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for (before, after) in edges {
        adj.entry(before).or_default().push(after);
        for node in [before, after] {
            if seen.insert(node) {
                nodes.push(node);
            }
        }
    }

    let mut visited = HashSet::new();
    let mut in_stack = HashSet::new();

    nodes.into_iter().find(|&node| {
        !visited.contains(node) && has_cycle_dfs(node, &adj, &mut visited, &mut in_stack)
    })
}

fn has_cycle_dfs<'a>(
    node: &'a str,
    adj: &HashMap<&'a str, Vec<&'a str>>,
    visited: &mut HashSet<&'a str>,
    in_stack: &mut HashSet<&'a str>,
) -> bool {
    visited.insert(node);
    in_stack.insert(node);

    if let Some(neighbors) = adj.get(node) {
        for &next in neighbors {
            if in_stack.contains(next) {
                return true; // Back edge → cycle
            }
            if !visited.contains(next) && has_cycle_dfs(next, adj, visited, in_stack) {
                return true;
            }
        }
    }

    in_stack.remove(node);
    false
}

/// Verifies the invariants of a packed visit sequence.
///
/// Checks:
/// 1. Visits are numbered `1..=n` in order and none is empty
/// 2. Every procedure carries its visit's number, and none is lost
/// 3. Visit minutes are whole booking slots, at least one slot long
/// 4. Multi-procedure visits fit the cap before rounding
/// 5. No incompatible pair shares a visit
/// 6. Every dependent procedure is in a later visit than its prerequisite
///
/// A single procedure longer than the cap still gets its own visit; it
/// cannot be split, so it is exempt from check 4.
pub fn check_plan(
    appointments: &[Appointment],
    expected_procedures: usize,
    dependencies: &DependencyMap,
    resolver: &ConstraintResolver,
    max_appointment_minutes: u32,
) -> Result<(), PlanningError> {
    let violation = |message: String| Err(PlanningError::InvariantViolation(message));

    let mut visit_of: HashMap<&str, u32> = HashMap::new();
    let cap = round_up_to_slot(max_appointment_minutes);

    for (i, visit) in appointments.iter().enumerate() {
        let expected = i as u32 + 1;
        if visit.visit_number != expected {
            return violation(format!(
                "visit at position {expected} is numbered {}",
                visit.visit_number
            ));
        }
        if visit.is_empty() {
            return violation(format!("visit {expected} has no procedures"));
        }
        if visit.estimated_minutes % SLOT_MINUTES != 0
            || visit.estimated_minutes < SLOT_MINUTES
            || visit.estimated_minutes != visit_minutes(visit.treatment_minutes())
        {
            return violation(format!(
                "visit {expected} has unrounded duration {} minutes",
                visit.estimated_minutes
            ));
        }
        if visit.len() > 1 && visit.treatment_minutes() + SETUP_OVERHEAD_MINUTES > cap {
            return violation(format!(
                "visit {expected} needs {} minutes, over the {cap}-minute cap",
                visit.treatment_minutes() + SETUP_OVERHEAD_MINUTES
            ));
        }

        for (j, p) in visit.procedures.iter().enumerate() {
            if p.visit_number != Some(expected) {
                return violation(format!(
                    "procedure '{}' in visit {expected} is marked {:?}",
                    p.id, p.visit_number
                ));
            }
            if visit_of.insert(p.id.as_str(), expected).is_some() {
                return violation(format!("procedure '{}' is scheduled twice", p.id));
            }
            for other in &visit.procedures[j + 1..] {
                if let Some(rule) = resolver.conflict(p, other) {
                    return violation(format!(
                        "'{}' and '{}' share visit {expected}: {}",
                        p.id,
                        other.id,
                        rule.description()
                    ));
                }
            }
        }
    }

    if visit_of.len() != expected_procedures {
        return violation(format!(
            "{} of {expected_procedures} procedures were scheduled",
            visit_of.len()
        ));
    }

    for dep in dependencies.iter() {
        if let (Some(&before), Some(&after)) = (
            visit_of.get(dep.before_id.as_str()),
            visit_of.get(dep.after_id.as_str()),
        ) {
            if after <= before {
                return violation(format!(
                    "'{}' (visit {after}) must come after '{}' (visit {before})",
                    dep.after_id, dep.before_id
                ));
            }
        }
    }

    Ok(())
}
