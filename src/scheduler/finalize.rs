//! Visit finalization.
//!
//! Turns packed visits into bookable ones: adds the setup overhead, rounds
//! to the booking slot and derives every note from the visit's contents.
//! Notes are regenerated from scratch on each call, so visits can be
//! finalized again after procedures move between them.

use crate::constraints::ClinicalRole;
use crate::duration::{visit_minutes, SETUP_OVERHEAD_MINUTES};
use crate::models::{Appointment, MobilityLevel, Procedure};

fn is_crown_preparation(p: &Procedure) -> bool {
    ClinicalRole::Crown.applies_to(p) && !p.is_seating()
}

/// Finalizes durations, readiness and notes for every visit.
pub fn finalize_visits(visits: &mut [Appointment], mobility: MobilityLevel) {
    for visit in visits.iter_mut() {
        let treatment = visit.treatment_minutes();
        visit.estimated_minutes = visit_minutes(treatment);
        visit.ready = visit.depends_on_visit.is_none();
        visit.notes.clear();

        if let (Some(previous), Some(window)) =
            (visit.depends_on_visit, &visit.ideal_timing_after_previous)
        {
            visit.notes.push(format!(
                "Schedule {}-{} days after visit {previous}: {}",
                window.min_days, window.max_days, window.reason
            ));
        }

        let domains = visit.domains();
        if domains.len() > 1 {
            let labels: Vec<&str> = domains.iter().map(|d| d.label()).collect();
            visit
                .notes
                .push(format!("Combined visit: {}", labels.join(" + ")));
        }

        visit.notes.push(format!(
            "Estimated chair time: {} minutes ({treatment} treatment + {SETUP_OVERHEAD_MINUTES} setup)",
            visit.estimated_minutes
        ));

        if let Some(note) = mobility.visit_note() {
            visit.notes.push(note.to_string());
        }
    }

    for i in 0..visits.len() {
        let visit_number = visits[i].visit_number;
        let procedures = &visits[i].procedures;
        let crown_prep = procedures.iter().any(is_crown_preparation);
        let implant = procedures
            .iter()
            .any(|p| ClinicalRole::ImplantPlacement.applies_to(p));
        let scaling = procedures
            .iter()
            .any(|p| ClinicalRole::ScalingRootPlaning.applies_to(p));

        if crown_prep {
            visits[i].notes.push(
                "Crown preparation: temporary crown placed until the permanent crown is seated"
                    .to_string(),
            );
            if let Some(next) = visits.get_mut(i + 1) {
                next.notes.push(format!(
                    "Suggested as the cementation appointment for the crown prepared in visit {visit_number}"
                ));
            }
        }
        if implant {
            visits[i]
                .notes
                .push("Implant placed: schedule a follow-up check in 7-10 days".to_string());
        }
        if scaling {
            visits[i].notes.push(
                "Periodontal re-evaluation recommended 4-6 weeks after scaling and root planing"
                    .to_string(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClinicalDomain, TimingWindow};

    fn proc(id: &str, code: &str, domain: ClinicalDomain, name: &str, minutes: u32) -> Procedure {
        let mut p = Procedure::new(id, code, domain).with_name(name);
        p.estimated_minutes = Some(minutes);
        p
    }

    fn visit(number: u32, procs: Vec<Procedure>) -> Appointment {
        let mut v = Appointment::new(number);
        for p in procs {
            v.push(p);
        }
        v
    }

    #[test]
    fn test_duration_overhead_and_rounding() {
        let mut visits = vec![
            visit(1, vec![proc("A", "D2391", ClinicalDomain::Restorative, "Composite #3", 30)]),
            visit(2, vec![proc("B", "D0220", ClinicalDomain::Diagnostic, "PA x-ray", 10)]),
        ];
        finalize_visits(&mut visits, MobilityLevel::Full);
        assert_eq!(visits[0].estimated_minutes, 45);
        assert_eq!(visits[1].estimated_minutes, 30); // 10 + 15 = 25 → 30
        assert_eq!(
            visits[1].notes,
            vec!["Estimated chair time: 30 minutes (10 treatment + 15 setup)".to_string()]
        );
    }

    #[test]
    fn test_combined_visit_note() {
        let mut visits = vec![visit(
            1,
            vec![
                proc("A", "D0150", ClinicalDomain::Diagnostic, "Exam", 30),
                proc("B", "D1110", ClinicalDomain::Preventive, "Cleaning", 45),
            ],
        )];
        finalize_visits(&mut visits, MobilityLevel::Full);
        assert!(visits[0]
            .notes
            .contains(&"Combined visit: diagnostic + preventive".to_string()));
    }

    #[test]
    fn test_dependency_note_and_readiness() {
        let mut second = visit(2, vec![proc("C", "D2740", ClinicalDomain::Prosthodontic, "Crown seat #19", 90)]);
        second.depends_on_visit = Some(1);
        second.ideal_timing_after_previous =
            Some(TimingWindow::new(7, 30, "root canal must complete before crown"));
        let mut visits = vec![
            visit(1, vec![proc("R", "D3330", ClinicalDomain::Endodontic, "RCT #19", 90)]),
            second,
        ];
        finalize_visits(&mut visits, MobilityLevel::Full);
        assert!(visits[0].ready);
        assert!(!visits[1].ready);
        assert_eq!(
            visits[1].notes[0],
            "Schedule 7-30 days after visit 1: root canal must complete before crown"
        );
    }

    #[test]
    fn test_crown_preparation_notes_current_and_next_visit() {
        let mut visits = vec![
            visit(1, vec![proc("C", "D2740", ClinicalDomain::Prosthodontic, "Crown prep #14", 90)]),
            visit(2, vec![proc("X", "D1110", ClinicalDomain::Preventive, "Cleaning", 45)]),
        ];
        finalize_visits(&mut visits, MobilityLevel::Full);
        assert!(visits[0].notes.iter().any(|n| n.starts_with("Crown preparation")));
        assert!(visits[1]
            .notes
            .iter()
            .any(|n| n.contains("cementation appointment for the crown prepared in visit 1")));
    }

    #[test]
    fn test_crown_seat_is_not_a_preparation() {
        let mut visits = vec![visit(
            1,
            vec![proc("C", "D2740", ClinicalDomain::Prosthodontic, "Crown seat #14", 30)],
        )];
        finalize_visits(&mut visits, MobilityLevel::Full);
        assert!(!visits[0].notes.iter().any(|n| n.starts_with("Crown preparation")));
    }

    #[test]
    fn test_implant_and_scaling_notes() {
        let mut visits = vec![
            visit(1, vec![proc("S", "D4341", ClinicalDomain::Periodontic, "SRP UR", 60)]),
            visit(2, vec![proc("I", "D6010", ClinicalDomain::Implant, "Implant #30", 90)]),
        ];
        finalize_visits(&mut visits, MobilityLevel::Full);
        assert!(visits[0].notes.iter().any(|n| n.starts_with("Periodontal re-evaluation")));
        assert!(visits[1].notes.iter().any(|n| n.starts_with("Implant placed")));
    }

    #[test]
    fn test_refinalize_replaces_notes() {
        let mut visits = vec![visit(
            1,
            vec![proc("A", "D2391", ClinicalDomain::Restorative, "Composite #3", 30)],
        )];
        finalize_visits(&mut visits, MobilityLevel::Limited);
        let first = visits[0].notes.clone();
        finalize_visits(&mut visits, MobilityLevel::Limited);
        assert_eq!(visits[0].notes, first);
        assert_eq!(first.len(), 2);
    }
}
