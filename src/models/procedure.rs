//! Procedure model.
//!
//! A procedure is the smallest schedulable unit of clinical work. It comes
//! from upstream clinical findings with its identity, code and cost fixed;
//! planning only rewrites its visit assignment, priority and duration
//! annotation, and always on a cloned value.

use serde::{Deserialize, Serialize};

use super::code::{ranges, ProcedureCode};
use crate::duration::DEFAULT_MINUTES;

/// Clinical specialty classification of a procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClinicalDomain {
    Diagnostic,
    Preventive,
    Restorative,
    Endodontic,
    Periodontic,
    Prosthodontic,
    Implant,
    Surgical,
    Orthodontic,
    Adjunctive,
}

impl ClinicalDomain {
    /// Lower-case display label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Diagnostic => "diagnostic",
            Self::Preventive => "preventive",
            Self::Restorative => "restorative",
            Self::Endodontic => "endodontic",
            Self::Periodontic => "periodontic",
            Self::Prosthodontic => "prosthodontic",
            Self::Implant => "implant",
            Self::Surgical => "surgical",
            Self::Orthodontic => "orthodontic",
            Self::Adjunctive => "adjunctive",
        }
    }

    /// Domain implied by the CDT category of a code, if any.
    pub fn from_code(raw: &str) -> Option<Self> {
        let code = ProcedureCode::parse(raw)?;
        let table = [
            (ranges::DIAGNOSTIC, Self::Diagnostic),
            (ranges::PREVENTIVE, Self::Preventive),
            (ranges::RESTORATIVE, Self::Restorative),
            (ranges::ENDODONTIC, Self::Endodontic),
            (ranges::PERIODONTIC, Self::Periodontic),
            (ranges::REMOVABLE_PROSTHODONTIC, Self::Prosthodontic),
            (ranges::MAXILLOFACIAL, Self::Prosthodontic),
            (ranges::IMPLANT, Self::Implant),
            (ranges::FIXED_PROSTHODONTIC, Self::Prosthodontic),
            (ranges::SURGICAL, Self::Surgical),
            (ranges::ORTHODONTIC, Self::Orthodontic),
            (ranges::ADJUNCTIVE, Self::Adjunctive),
        ];
        table
            .iter()
            .find(|(range, _)| range.contains(&code))
            .map(|(_, domain)| *domain)
    }
}

/// Clinical urgency. Ordered so that `Urgent` is the maximum.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    /// Numeric rank used by weighted ordering (urgent = 4 .. low = 1).
    pub fn rank(&self) -> u8 {
        match self {
            Self::Urgent => 4,
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
        }
    }

    /// Urgent and high priorities elevate the visit they land in.
    pub fn is_elevated(&self) -> bool {
        matches!(self, Self::Urgent | Self::High)
    }
}

/// A substitute treatment option for a procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    /// Substitute procedure code.
    pub code: String,
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    /// Clinical domain, when it differs from the code's category.
    #[serde(default)]
    pub domain: Option<ClinicalDomain>,
    pub cost: f64,
    pub insurance_coverage: f64,
    #[serde(default)]
    pub pros: Vec<String>,
    #[serde(default)]
    pub cons: Vec<String>,
}

impl Alternative {
    /// Creates an alternative with the given code, cost and coverage.
    pub fn new(code: impl Into<String>, cost: f64, insurance_coverage: f64) -> Self {
        Self {
            code: code.into(),
            name: String::new(),
            domain: None,
            cost,
            insurance_coverage,
            pros: Vec::new(),
            cons: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_domain(mut self, domain: ClinicalDomain) -> Self {
        self.domain = Some(domain);
        self
    }

    pub fn with_pro(mut self, pro: impl Into<String>) -> Self {
        self.pros.push(pro.into());
        self
    }

    pub fn with_con(mut self, con: impl Into<String>) -> Self {
        self.cons.push(con.into());
        self
    }

    /// Coverage-to-cost ratio; zero for free alternatives.
    pub fn coverage_ratio(&self) -> f64 {
        coverage_ratio(self.insurance_coverage, self.cost)
    }
}

/// A proposed clinical procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Procedure {
    /// Unique procedure identifier.
    pub id: String,
    /// Clinical billing code (e.g. `D2740`).
    pub code: String,
    pub domain: ClinicalDomain,
    /// Free-text name; may embed a tooth reference such as `tooth #19`.
    #[serde(default)]
    pub name: String,
    /// Affected tooth identifiers.
    #[serde(default)]
    pub teeth: Vec<String>,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub insurance_coverage: f64,
    #[serde(default)]
    pub priority: Priority,
    /// Originally assigned sequence number (stable tie-break).
    #[serde(default)]
    pub sequence: u32,
    /// Visit number; original assignment on input, final assignment on output.
    #[serde(default)]
    pub visit_number: Option<u32>,
    #[serde(default)]
    pub alternatives: Vec<Alternative>,
    /// IDs of procedures that must be completed in an earlier visit.
    #[serde(default)]
    pub prerequisites: Vec<String>,
    /// Chair minutes annotated by the duration estimator.
    #[serde(default)]
    pub estimated_minutes: Option<u32>,
}

impl Procedure {
    /// Creates a procedure with the given ID, code and domain.
    pub fn new(id: impl Into<String>, code: impl Into<String>, domain: ClinicalDomain) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
            domain,
            name: String::new(),
            teeth: Vec::new(),
            cost: 0.0,
            insurance_coverage: 0.0,
            priority: Priority::default(),
            sequence: 0,
            visit_number: None,
            alternatives: Vec::new(),
            prerequisites: Vec::new(),
            estimated_minutes: None,
        }
    }

    /// Sets the procedure name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds an affected tooth.
    pub fn with_tooth(mut self, tooth: impl Into<String>) -> Self {
        self.teeth.push(tooth.into());
        self
    }

    /// Sets cost and insurance-covered amount.
    pub fn with_cost(mut self, cost: f64, insurance_coverage: f64) -> Self {
        self.cost = cost;
        self.insurance_coverage = insurance_coverage;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_sequence(mut self, sequence: u32) -> Self {
        self.sequence = sequence;
        self
    }

    /// Sets the originally assigned visit.
    pub fn with_visit(mut self, visit_number: u32) -> Self {
        self.visit_number = Some(visit_number);
        self
    }

    pub fn with_alternative(mut self, alternative: Alternative) -> Self {
        self.alternatives.push(alternative);
        self
    }

    pub fn with_prerequisite(mut self, procedure_id: impl Into<String>) -> Self {
        self.prerequisites.push(procedure_id.into());
        self
    }

    /// Estimated chair minutes, or the default when not yet annotated.
    pub fn minutes(&self) -> u32 {
        self.estimated_minutes.unwrap_or(DEFAULT_MINUTES)
    }

    /// Coverage-to-cost ratio; zero for free procedures.
    pub fn coverage_ratio(&self) -> f64 {
        coverage_ratio(self.insurance_coverage, self.cost)
    }

    /// Amount the patient pays.
    pub fn out_of_pocket(&self) -> f64 {
        self.cost - self.insurance_coverage
    }

    /// Whether the name marks a crown seating (cementation) rather than a preparation.
    pub fn is_seating(&self) -> bool {
        self.name.to_ascii_lowercase().contains("seat")
    }
}

fn coverage_ratio(coverage: f64, cost: f64) -> f64 {
    if cost > 0.0 {
        coverage / cost
    } else {
        0.0
    }
}
