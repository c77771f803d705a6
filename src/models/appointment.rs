//! Appointment (visit) model.
//!
//! A visit is one clinical encounter holding one or more procedures. Its
//! duration always includes the setup overhead and is rounded up to the
//! booking slot.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{ClinicalDomain, Priority, Procedure, TimingWindow};

/// A single patient visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    /// 1-based visit number, dense within a plan.
    pub visit_number: u32,
    /// Procedures performed in this visit, in packing order.
    pub procedures: Vec<Procedure>,
    /// Chair minutes including setup, rounded up to the booking slot.
    pub estimated_minutes: u32,
    /// Highest priority among the contained procedures.
    pub priority: Priority,
    pub notes: Vec<String>,
    /// Visit that must be completed first.
    pub depends_on_visit: Option<u32>,
    /// Recommended gap after `depends_on_visit`.
    pub ideal_timing_after_previous: Option<TimingWindow>,
    /// First provider whose specialties matched a procedure domain.
    pub preferred_provider: Option<String>,
    /// Whether the visit can be booked without waiting on a prior visit.
    pub ready: bool,
}

impl Appointment {
    /// Creates an empty visit.
    pub fn new(visit_number: u32) -> Self {
        Self {
            visit_number,
            procedures: Vec::new(),
            estimated_minutes: 0,
            priority: Priority::Low,
            notes: Vec::new(),
            depends_on_visit: None,
            ideal_timing_after_previous: None,
            preferred_provider: None,
            ready: true,
        }
    }

    /// Adds a procedure, stamping it with this visit's number.
    pub fn push(&mut self, mut procedure: Procedure) {
        procedure.visit_number = Some(self.visit_number);
        if procedure.priority > self.priority {
            self.priority = procedure.priority;
        }
        self.procedures.push(procedure);
    }

    /// Renumbers the visit and every contained procedure.
    pub fn renumber(&mut self, visit_number: u32) {
        self.visit_number = visit_number;
        for p in &mut self.procedures {
            p.visit_number = Some(visit_number);
        }
    }

    /// Recomputes the visit priority from its contents.
    pub fn refresh_priority(&mut self) {
        self.priority = self
            .procedures
            .iter()
            .map(|p| p.priority)
            .max()
            .unwrap_or(Priority::Low);
    }

    /// Sum of procedure minutes, excluding setup.
    pub fn treatment_minutes(&self) -> u32 {
        self.procedures.iter().map(|p| p.minutes()).sum()
    }

    /// Distinct clinical domains, in enumeration order.
    pub fn domains(&self) -> BTreeSet<ClinicalDomain> {
        self.procedures.iter().map(|p| p.domain).collect()
    }

    /// Whether the visit contains the given procedure.
    pub fn contains(&self, procedure_id: &str) -> bool {
        self.procedures.iter().any(|p| p.id == procedure_id)
    }

    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.procedures.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proc(id: &str, domain: ClinicalDomain, minutes: u32, priority: Priority) -> Procedure {
        let mut p = Procedure::new(id, "D0000", domain).with_priority(priority);
        p.estimated_minutes = Some(minutes);
        p
    }

    #[test]
    fn test_push_stamps_visit_and_priority() {
        let mut visit = Appointment::new(3);
        visit.push(proc("A", ClinicalDomain::Restorative, 30, Priority::Medium));
        visit.push(proc("B", ClinicalDomain::Restorative, 40, Priority::Urgent));

        assert_eq!(visit.len(), 2);
        assert_eq!(visit.priority, Priority::Urgent);
        assert!(visit.procedures.iter().all(|p| p.visit_number == Some(3)));
        assert_eq!(visit.treatment_minutes(), 70);
        assert!(visit.contains("B"));
        assert!(!visit.contains("C"));
    }

    #[test]
    fn test_renumber() {
        let mut visit = Appointment::new(1);
        visit.push(proc("A", ClinicalDomain::Diagnostic, 15, Priority::Low));
        visit.renumber(4);
        assert_eq!(visit.visit_number, 4);
        assert_eq!(visit.procedures[0].visit_number, Some(4));
    }

    #[test]
    fn test_refresh_priority_after_removal() {
        let mut visit = Appointment::new(1);
        visit.push(proc("A", ClinicalDomain::Diagnostic, 15, Priority::Low));
        visit.push(proc("B", ClinicalDomain::Surgical, 45, Priority::High));
        visit.procedures.pop();
        visit.refresh_priority();
        assert_eq!(visit.priority, Priority::Low);
    }

    #[test]
    fn test_domains_distinct() {
        let mut visit = Appointment::new(1);
        visit.push(proc("A", ClinicalDomain::Restorative, 30, Priority::Low));
        visit.push(proc("B", ClinicalDomain::Restorative, 30, Priority::Low));
        visit.push(proc("C", ClinicalDomain::Preventive, 30, Priority::Low));
        let domains: Vec<_> = visit.domains().into_iter().collect();
        assert_eq!(
            domains,
            vec![ClinicalDomain::Preventive, ClinicalDomain::Restorative]
        );
    }
}
