//! Treatment-planning domain models.
//!
//! Provides the core data types for representing a patient's proposed
//! procedures and the plans built from them.
//!
//! # Domain Mappings
//!
//! | Model | Scheduling concept |
//! |-------|--------------------|
//! | Procedure | Activity / job |
//! | Dependency | Precedence constraint with delay window |
//! | Appointment | Bin (visit) |
//! | TreatmentPlan | Schedule (solution) |
//! | SchedulingConstraints | Problem configuration |

mod appointment;
pub mod code;
mod constraints;
mod dependency;
mod plan;
mod procedure;

pub use appointment::Appointment;
pub use code::{CodeRange, ProcedureCode};
pub use constraints::{
    MobilityLevel, PatientPreferences, Provider, SchedulingConstraints,
    DEFAULT_MAX_APPOINTMENT_MINUTES, DEFAULT_MIN_DAYS_BETWEEN_VISITS,
};
pub use dependency::{Dependency, TimingWindow};
pub use plan::{PlanRequest, PlanVariant, TreatmentPlan};
pub use procedure::{Alternative, ClinicalDomain, Priority, Procedure};
