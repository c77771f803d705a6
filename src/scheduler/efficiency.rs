//! Plan efficiency metrics.
//!
//! Compares an optimized visit sequence against the visits the procedures
//! were originally assigned to.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Original visits | Distinct original visit numbers (unassigned procedures count as one visit each) |
//! | Optimized visits | Number of appointments |
//! | Visit reduction | Original − optimized, and as a percentage of original |
//! | Original minutes | Per original visit: round-up-15(treatment + 15) |
//! | Optimized minutes | Sum of finalized appointment minutes |
//! | Time saved | Original − optimized minutes, and as a percentage |
//!
//! Percentages are rounded to one decimal and are 0.0 when the original
//! value is zero.

use std::collections::BTreeMap;
use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::constraints::ClinicalRole;
use crate::duration::{visit_minutes, DurationEstimator};
use crate::models::{Appointment, ClinicalDomain, Procedure, TreatmentPlan};

/// Original vs optimized visit comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyReport {
    pub original_visits: u32,
    pub optimized_visits: u32,
    /// Positive when the optimized plan needs fewer visits.
    pub visit_reduction: i64,
    pub visit_reduction_percentage: f64,
    /// Original chair time, setup included (minutes).
    pub original_minutes: u32,
    /// Optimized chair time, setup included (minutes).
    pub optimized_minutes: u32,
    pub time_saved_minutes: i64,
    pub time_saved_percentage: f64,
    pub notes: Vec<String>,
}

impl EfficiencyReport {
    /// Compares `plan` against the raw procedures it was generated from.
    pub fn compare(
        original: &[Procedure],
        plan: &TreatmentPlan,
        estimator: &DurationEstimator,
    ) -> Self {
        Self::from_appointments(original, &plan.appointments, estimator)
    }

    /// Compares `appointments` against the original visit assignment of
    /// `original`.
    ///
    /// # Arguments
    /// * `original` - Procedures as received, `visit_number` being the
    ///   original assignment.
    /// * `appointments` - Finalized optimized visits.
    /// * `estimator` - Used for procedures without annotated minutes.
    pub fn from_appointments(
        original: &[Procedure],
        appointments: &[Appointment],
        estimator: &DurationEstimator,
    ) -> Self {
        let mut assigned: BTreeMap<u32, u32> = BTreeMap::new();
        let mut unassigned: Vec<u32> = Vec::new();

        for p in original {
            let minutes = p
                .estimated_minutes
                .unwrap_or_else(|| estimator.estimate(&p.code));
            match p.visit_number {
                Some(visit) => *assigned.entry(visit).or_default() += minutes,
                None => unassigned.push(minutes),
            }
        }

        let original_visits = (assigned.len() + unassigned.len()) as u32;
        let original_minutes: u32 = assigned
            .values()
            .chain(unassigned.iter())
            .map(|&treatment| visit_minutes(treatment))
            .sum();

        let optimized_visits = appointments.len() as u32;
        let optimized_minutes: u32 = appointments.iter().map(|a| a.estimated_minutes).sum();

        let visit_reduction = i64::from(original_visits) - i64::from(optimized_visits);
        let time_saved_minutes = i64::from(original_minutes) - i64::from(optimized_minutes);

        let mut report = Self {
            original_visits,
            optimized_visits,
            visit_reduction,
            visit_reduction_percentage: percentage(visit_reduction, original_visits),
            original_minutes,
            optimized_minutes,
            time_saved_minutes,
            time_saved_percentage: percentage(time_saved_minutes, original_minutes),
            notes: Vec::new(),
        };
        report.notes = report.derive_notes(appointments);
        report
    }

    fn derive_notes(&self, appointments: &[Appointment]) -> Vec<String> {
        let mut notes = Vec::new();

        if self.visit_reduction > 0 {
            notes.push(format!(
                "Reduced visits from {} to {} ({}% fewer)",
                self.original_visits, self.optimized_visits, self.visit_reduction_percentage
            ));
        }
        if self.time_saved_minutes > 0 {
            notes.push(format!(
                "Saved {} minutes of chair time ({}%)",
                self.time_saved_minutes, self.time_saved_percentage
            ));
        }

        for visit in appointments {
            let restorative = visit
                .procedures
                .iter()
                .filter(|p| ClinicalRole::Restorative.applies_to(p))
                .count();
            if restorative > 1 {
                notes.push(format!(
                    "Combined {restorative} restorative procedures into a single visit (visit {})",
                    visit.visit_number
                ));
            }

            let scaling = visit.procedures.iter().any(|p| {
                p.domain == ClinicalDomain::Periodontic
                    || ClinicalRole::ScalingRootPlaning.applies_to(p)
            });
            if scaling && restorative > 0 {
                notes.push(format!(
                    "Combined periodontal scaling with restorative work in visit {}",
                    visit.visit_number
                ));
            }
        }

        notes
    }

    /// Human-readable summary of the comparison.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Visits: {} -> {} ({} fewer, {}%)",
            self.original_visits,
            self.optimized_visits,
            self.visit_reduction,
            self.visit_reduction_percentage
        );
        let _ = writeln!(
            out,
            "Chair time: {} -> {} minutes ({} saved, {}%)",
            self.original_minutes,
            self.optimized_minutes,
            self.time_saved_minutes,
            self.time_saved_percentage
        );
        for note in &self.notes {
            let _ = writeln!(out, "- {note}");
        }
        out
    }

    /// Whether the optimized plan is no worse than the original on both
    /// visit count and chair time.
    pub fn is_improvement(&self) -> bool {
        self.visit_reduction >= 0 && self.time_saved_minutes >= 0
    }
}

fn percentage(delta: i64, base: u32) -> f64 {
    if base == 0 {
        return 0.0;
    }
    let pct = delta as f64 / f64::from(base) * 100.0;
    (pct * 10.0).round() / 10.0
}
