//! Treatment sequencing and plan optimization for dental care.
//!
//! Turns a flat list of proposed clinical procedures into ordered visits
//! that respect chair-time caps, same-visit exclusions and clinical
//! precedence, and produces competing plan variants from the same input.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Procedure`, `Alternative`, `Appointment`,
//!   `TreatmentPlan`, `SchedulingConstraints`, `ProcedureCode`
//! - **`duration`**: Chair-time estimation by procedure code
//! - **`constraints`**: Pairwise compatibility and dependency rules
//! - **`dispatching`**: Procedure ordering rules and precedence ordering
//! - **`scheduler`**: Greedy visit packing and efficiency reporting
//! - **`planner`**: Quality-first, insurance-optimized and phased variants
//! - **`validation`**: Input checks before packing, invariant checks after
//!
//! # Example
//!
//! ```
//! use dental_sequencing::models::{ClinicalDomain, PlanRequest, PlanVariant, Priority, Procedure};
//! use dental_sequencing::planner::PlanGenerator;
//!
//! let request = PlanRequest::new("patient-7", "dr-2")
//!     .with_procedure(
//!         Procedure::new("rct", "D3330", ClinicalDomain::Endodontic)
//!             .with_name("Root canal tooth #19")
//!             .with_priority(Priority::High),
//!     )
//!     .with_procedure(
//!         Procedure::new("crown", "D2740", ClinicalDomain::Prosthodontic)
//!             .with_name("Crown tooth #19")
//!             .with_sequence(1),
//!     );
//!
//! let plan = PlanGenerator::default()
//!     .generate(&request, PlanVariant::QualityFirst)
//!     .unwrap();
//! assert_eq!(plan.visit_of("rct"), Some(1));
//! assert_eq!(plan.visit_of("crown"), Some(2));
//! ```
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - Coffman, Garey & Johnson (1996), "Approximation algorithms for bin
//!   packing: a survey"
//! - ADA, "Code on Dental Procedures and Nomenclature (CDT)"

pub mod constraints;
pub mod dispatching;
pub mod duration;
pub mod error;
pub mod models;
pub mod planner;
pub mod scheduler;
pub mod validation;

pub use error::PlanningError;
pub use planner::PlanGenerator;
pub use scheduler::{EfficiencyReport, VisitPacker};
