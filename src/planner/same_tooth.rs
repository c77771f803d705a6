//! Same-tooth endodontic/prosthodontic ordering pass.
//!
//! Packing can leave an endodontic procedure after prosthodontic work on the
//! same tooth when no clinical rule links the two codes. This pass swaps
//! such pairs between their visits when the swap keeps every visit valid,
//! and records the endodontic procedure as a prerequisite of the
//! prosthodontic one. Visits touched by a swap get their dependency
//! reference and window rebuilt from the procedures they now hold.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::constraints::{teeth_overlap, ConstraintResolver, DependencyMap};
use crate::duration::{round_up_to_slot, SETUP_OVERHEAD_MINUTES};
use crate::models::{Appointment, ClinicalDomain, Procedure};

/// Position of a procedure: (visit index, procedure index).
type Slot = (usize, usize);

fn locate(visits: &[Appointment], procedure_id: &str) -> Option<Slot> {
    visits.iter().enumerate().find_map(|(v, visit)| {
        visit
            .procedures
            .iter()
            .position(|p| p.id == procedure_id)
            .map(|i| (v, i))
    })
}

/// Orders same-tooth endodontic/prosthodontic pairs. Returns the number of
/// swaps performed.
pub(crate) fn order_same_tooth_pairs(
    visits: &mut [Appointment],
    resolver: &ConstraintResolver,
    dependencies: &DependencyMap,
    max_appointment_minutes: u32,
) -> usize {
    let all: Vec<&Procedure> = visits.iter().flat_map(|v| v.procedures.iter()).collect();
    let candidates = &all;
    let pairs: Vec<(String, String)> = all
        .iter()
        .filter(|p| p.domain == ClinicalDomain::Endodontic)
        .flat_map(move |&endo| {
            candidates
                .iter()
                .filter(move |p| {
                    p.domain == ClinicalDomain::Prosthodontic && teeth_overlap(endo, p)
                })
                .map(move |prostho| (endo.id.clone(), prostho.id.clone()))
        })
        .collect();

    let mut swaps = 0;
    for (endo_id, prostho_id) in pairs {
        let (Some(endo), Some(prostho)) = (locate(visits, &endo_id), locate(visits, &prostho_id))
        else {
            continue;
        };

        if visits[endo.0].visit_number > visits[prostho.0].visit_number {
            if !can_swap(visits, endo, prostho, resolver, dependencies, max_appointment_minutes) {
                warn!(
                    endodontic = %endo_id,
                    prosthodontic = %prostho_id,
                    "cannot reorder same-tooth pair without breaking a visit"
                );
                continue;
            }
            swap(visits, endo, prostho);
            refresh_dependency_fields(visits, endo.0, dependencies);
            refresh_dependency_fields(visits, prostho.0, dependencies);
            swaps += 1;
            debug!(endodontic = %endo_id, prosthodontic = %prostho_id, "swapped same-tooth pair");
        }

        if let Some((v, i)) = locate(visits, &prostho_id) {
            let prerequisites = &mut visits[v].procedures[i].prerequisites;
            if !prerequisites.contains(&endo_id) {
                prerequisites.push(endo_id);
            }
        }
    }
    swaps
}

fn can_swap(
    visits: &[Appointment],
    a: Slot,
    b: Slot,
    resolver: &ConstraintResolver,
    dependencies: &DependencyMap,
    max_appointment_minutes: u32,
) -> bool {
    let cap = round_up_to_slot(max_appointment_minutes);
    let first = &visits[a.0].procedures[a.1];
    let second = &visits[b.0].procedures[b.1];

    // Each procedure must fit the other's visit
    let fits = |slot: Slot, incoming: &Procedure| {
        let visit = &visits[slot.0];
        let outgoing = &visit.procedures[slot.1];
        let others_ok = visit
            .procedures
            .iter()
            .filter(|p| p.id != outgoing.id)
            .all(|p| resolver.compatible(p, incoming));
        let minutes = visit.treatment_minutes() - outgoing.minutes() + incoming.minutes();
        others_ok && (visit.len() == 1 || minutes + SETUP_OVERHEAD_MINUTES <= cap)
    };
    if !fits(a, second) || !fits(b, first) {
        return false;
    }

    let mut visit_of: HashMap<&str, u32> = visits
        .iter()
        .flat_map(|v| v.procedures.iter().map(move |p| (p.id.as_str(), v.visit_number)))
        .collect();
    visit_of.insert(first.id.as_str(), visits[b.0].visit_number);
    visit_of.insert(second.id.as_str(), visits[a.0].visit_number);

    dependencies.iter().all(|d| {
        match (
            visit_of.get(d.before_id.as_str()),
            visit_of.get(d.after_id.as_str()),
        ) {
            (Some(before), Some(after)) => after > before,
            _ => true,
        }
    })
}

fn swap(visits: &mut [Appointment], a: Slot, b: Slot) {
    let mut first = visits[a.0].procedures[a.1].clone();
    let mut second = visits[b.0].procedures[b.1].clone();
    first.visit_number = Some(visits[b.0].visit_number);
    second.visit_number = Some(visits[a.0].visit_number);
    visits[a.0].procedures[a.1] = second;
    visits[b.0].procedures[b.1] = first;
    visits[a.0].refresh_priority();
    visits[b.0].refresh_priority();
}

/// Recomputes which earlier visit the visit at `index` waits on, from the
/// prerequisites of the procedures it now holds.
fn refresh_dependency_fields(visits: &mut [Appointment], index: usize, dependencies: &DependencyMap) {
    let visit_of: HashMap<&str, u32> = visits
        .iter()
        .flat_map(|v| v.procedures.iter().map(move |p| (p.id.as_str(), v.visit_number)))
        .collect();
    let number = visits[index].visit_number;

    let latest = visits[index]
        .procedures
        .iter()
        .flat_map(|p| dependencies.for_procedure(&p.id))
        .filter_map(|d| {
            visit_of
                .get(d.before_id.as_str())
                .filter(|&&v| v < number)
                .map(|&v| (v, d.window.clone()))
        })
        .max_by_key(|(v, _)| *v);

    let visit = &mut visits[index];
    match latest {
        Some((before, window)) => {
            visit.depends_on_visit = Some(before);
            visit.ideal_timing_after_previous = Some(window);
        }
        None => {
            visit.depends_on_visit = None;
            visit.ideal_timing_after_previous = None;
        }
    }
    visit.ready = visit.depends_on_visit.is_none();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Dependency, Priority, TimingWindow};

    fn visit(number: u32, procs: Vec<Procedure>) -> Appointment {
        let mut v = Appointment::new(number);
        for p in procs {
            v.push(p);
        }
        v
    }

    fn pontic() -> Procedure {
        Procedure::new("pontic", "D6240", ClinicalDomain::Prosthodontic)
            .with_name("Pontic tooth #19")
            .with_priority(Priority::High)
    }

    fn root_canal() -> Procedure {
        Procedure::new("rct", "D3330", ClinicalDomain::Endodontic).with_name("Root canal tooth #19")
    }

    #[test]
    fn test_out_of_order_pair_is_swapped() {
        let mut visits = vec![visit(1, vec![pontic()]), visit(2, vec![root_canal()])];
        let swaps = order_same_tooth_pairs(
            &mut visits,
            &ConstraintResolver::new(),
            &DependencyMap::new(),
            120,
        );

        assert_eq!(swaps, 1);
        assert_eq!(visits[0].procedures[0].id, "rct");
        assert_eq!(visits[0].procedures[0].visit_number, Some(1));
        assert_eq!(visits[1].procedures[0].id, "pontic");
        assert_eq!(visits[1].procedures[0].visit_number, Some(2));
        assert_eq!(visits[1].procedures[0].prerequisites, vec!["rct".to_string()]);
        assert_eq!(visits[0].priority, Priority::Medium);
        assert_eq!(visits[1].priority, Priority::High);
    }

    #[test]
    fn test_ordered_pair_only_records_prerequisite() {
        let mut visits = vec![visit(1, vec![root_canal()]), visit(2, vec![pontic()])];
        let swaps = order_same_tooth_pairs(
            &mut visits,
            &ConstraintResolver::new(),
            &DependencyMap::new(),
            120,
        );
        assert_eq!(swaps, 0);
        assert_eq!(visits[1].procedures[0].prerequisites, vec!["rct".to_string()]);
    }

    #[test]
    fn test_different_teeth_untouched() {
        let other = Procedure::new("rct", "D3330", ClinicalDomain::Endodontic).with_name("RCT #3");
        let mut visits = vec![visit(1, vec![pontic()]), visit(2, vec![other])];
        order_same_tooth_pairs(&mut visits, &ConstraintResolver::new(), &DependencyMap::new(), 120);
        assert_eq!(visits[0].procedures[0].id, "pontic");
        assert!(visits[0].procedures[0].prerequisites.is_empty());
    }

    #[test]
    fn test_swap_moves_dependency_window_with_procedure() {
        // Root canal waits on an SRP in visit 1 and was packed after the pontic
        let srp = Procedure::new("srp", "D4341", ClinicalDomain::Periodontic).with_name("SRP");
        let mut late = visit(3, vec![root_canal()]);
        late.depends_on_visit = Some(1);
        late.ideal_timing_after_previous = Some(TimingWindow::new(7, 60, "listed prerequisite"));
        late.ready = false;
        let mut visits = vec![visit(1, vec![srp]), visit(2, vec![pontic()]), late];

        let mut deps = DependencyMap::new();
        deps.insert(Dependency::new("srp", "rct", TimingWindow::new(7, 60, "listed prerequisite")));

        let swaps = order_same_tooth_pairs(&mut visits, &ConstraintResolver::new(), &deps, 120);
        assert_eq!(swaps, 1);

        assert_eq!(visits[1].procedures[0].id, "rct");
        assert_eq!(visits[1].depends_on_visit, Some(1));
        assert_eq!(
            visits[1].ideal_timing_after_previous.as_ref().map(|w| w.reason.as_str()),
            Some("listed prerequisite")
        );
        assert!(!visits[1].ready);

        assert_eq!(visits[2].procedures[0].id, "pontic");
        assert_eq!(visits[2].depends_on_visit, None);
        assert!(visits[2].ideal_timing_after_previous.is_none());
        assert!(visits[2].ready);
    }

    #[test]
    fn test_swap_refused_when_it_breaks_a_dependency() {
        let srp = Procedure::new("srp", "D4341", ClinicalDomain::Periodontic).with_name("SRP");
        let mut visits = vec![
            visit(1, vec![pontic()]),
            visit(2, vec![srp]),
            visit(3, vec![root_canal()]),
        ];
        // Root canal must stay after visit 2
        let mut deps = DependencyMap::new();
        deps.insert(Dependency::new("srp", "rct", TimingWindow::new(14, 30, "x")));

        let swaps = order_same_tooth_pairs(&mut visits, &ConstraintResolver::new(), &deps, 120);
        assert_eq!(swaps, 0);
        assert_eq!(visits[0].procedures[0].id, "pontic");
        assert!(visits[0].procedures[0].prerequisites.is_empty());
    }
}
