//! Treatment plan (solution) model.
//!
//! A plan is one packing strategy applied to a patient's proposed
//! procedures: the final procedure list with visit assignments, the visits
//! themselves, and cost aggregates.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Appointment, Procedure};

/// Packing strategy a plan was produced with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanVariant {
    /// Prefers the most durable (most expensive) options.
    QualityFirst,
    /// Prefers options with the best insurance coverage ratio.
    InsuranceOptimized,
    /// Spreads treatment into priority phases, one procedure per visit.
    Phased,
}

impl PlanVariant {
    /// All variants, in generation order.
    pub const ALL: [PlanVariant; 3] = [
        PlanVariant::QualityFirst,
        PlanVariant::InsuranceOptimized,
        PlanVariant::Phased,
    ];

    /// Short identifier used in plan IDs.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::QualityFirst => "quality-first",
            Self::InsuranceOptimized => "insurance-optimized",
            Self::Phased => "phased",
        }
    }

    /// Human-readable plan title.
    pub fn title(&self) -> &'static str {
        match self {
            Self::QualityFirst => "Quality-First Treatment Plan",
            Self::InsuranceOptimized => "Insurance-Optimized Treatment Plan",
            Self::Phased => "Phased Treatment Plan",
        }
    }
}

impl fmt::Display for PlanVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Planning input: the proposed procedures for one patient.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanRequest {
    pub patient_id: String,
    pub doctor_id: String,
    pub procedures: Vec<Procedure>,
}

impl PlanRequest {
    pub fn new(patient_id: impl Into<String>, doctor_id: impl Into<String>) -> Self {
        Self {
            patient_id: patient_id.into(),
            doctor_id: doctor_id.into(),
            procedures: Vec::new(),
        }
    }

    pub fn with_procedure(mut self, procedure: Procedure) -> Self {
        self.procedures.push(procedure);
        self
    }

    pub fn with_procedures(mut self, procedures: impl IntoIterator<Item = Procedure>) -> Self {
        self.procedures.extend(procedures);
        self
    }
}

/// A complete treatment plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreatmentPlan {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub variant: PlanVariant,
    pub title: String,
    /// Final procedures, in visit order, each carrying its visit number.
    pub procedures: Vec<Procedure>,
    pub appointments: Vec<Appointment>,
    pub total_cost: f64,
    pub total_coverage: f64,
    pub out_of_pocket: f64,
    pub visit_count: u32,
    /// Rough completion estimate in months.
    pub estimated_months: u32,
}

impl TreatmentPlan {
    /// Finds a procedure by ID.
    pub fn procedure(&self, procedure_id: &str) -> Option<&Procedure> {
        self.procedures.iter().find(|p| p.id == procedure_id)
    }

    /// Visit number assigned to a procedure.
    pub fn visit_of(&self, procedure_id: &str) -> Option<u32> {
        self.procedure(procedure_id).and_then(|p| p.visit_number)
    }

    /// Returns the visit with the given number.
    pub fn appointment(&self, visit_number: u32) -> Option<&Appointment> {
        self.appointments
            .iter()
            .find(|a| a.visit_number == visit_number)
    }

    /// Total chair minutes across all visits.
    pub fn total_minutes(&self) -> u32 {
        self.appointments.iter().map(|a| a.estimated_minutes).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClinicalDomain;

    #[test]
    fn test_variant_labels() {
        assert_eq!(PlanVariant::QualityFirst.slug(), "quality-first");
        assert_eq!(PlanVariant::Phased.to_string(), "phased");
        assert_eq!(
            PlanVariant::InsuranceOptimized.title(),
            "Insurance-Optimized Treatment Plan"
        );
    }

    #[test]
    fn test_variant_serde_names() {
        let json = serde_json::to_string(&PlanVariant::InsuranceOptimized).unwrap();
        assert_eq!(json, "\"insurance_optimized\"");
    }

    #[test]
    fn test_request_builder() {
        let request = PlanRequest::new("patient-1", "dr-1")
            .with_procedure(Procedure::new("P1", "D0150", ClinicalDomain::Diagnostic))
            .with_procedures(vec![Procedure::new(
                "P2",
                "D1110",
                ClinicalDomain::Preventive,
            )]);
        assert_eq!(request.procedures.len(), 2);
        assert_eq!(request.patient_id, "patient-1");
    }
}
