//! Precedence-consistent ordering.
//!
//! The packer only honours a dependency when the prerequisite has already
//! been placed, so the packing order must list every prerequisite before its
//! dependents. This pass is a stable topological sort: at each step it takes
//! the earliest procedure (in the incoming order) whose in-batch
//! prerequisites are all placed. Procedures unrelated by dependencies keep
//! their relative order.
//!
//! Cycles are rejected by validation before this point; if one slips
//! through, the earliest remaining procedure is taken so nothing is dropped.
//!
//! # Reference
//! Kahn (1962), "Topological sorting of large networks"

use std::collections::HashSet;

use crate::constraints::DependencyMap;
use crate::models::Procedure;

/// Reorders `procedures` so every prerequisite precedes its dependents.
pub fn order_by_precedence(procedures: Vec<Procedure>, dependencies: &DependencyMap) -> Vec<Procedure> {
    if dependencies.is_empty() {
        return procedures;
    }

    let batch: HashSet<String> = procedures.iter().map(|p| p.id.clone()).collect();
    let mut placed: HashSet<String> = HashSet::with_capacity(procedures.len());
    let mut remaining = procedures;
    let mut ordered = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        let next = remaining
            .iter()
            .position(|p| {
                dependencies
                    .for_procedure(&p.id)
                    .all(|d| placed.contains(&d.before_id) || !batch.contains(&d.before_id))
            })
            .unwrap_or(0);

        let procedure = remaining.remove(next);
        placed.insert(procedure.id.clone());
        ordered.push(procedure);
    }

    ordered
}
