//! Visit packing and efficiency evaluation.
//!
//! # Algorithm
//!
//! `VisitPacker` uses a greedy, single-pass, next-fit heuristic over
//! procedures in priority order. It never backtracks, so the visit count is
//! not guaranteed minimal, but every produced visit respects the duration
//! cap, compatibility rules and clinical ordering.
//!
//! # Efficiency
//!
//! `EfficiencyReport` compares a packed plan against the original visit
//! assignment: visit count, chair time and qualitative notes.
//!
//! # References
//!
//! - Coffman, Garey & Johnson (1996), "Approximation algorithms for bin
//!   packing: a survey"
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 3

mod efficiency;
mod finalize;
mod input;
mod packer;

pub use efficiency::EfficiencyReport;
pub use finalize::finalize_visits;
pub use input::prepare_procedures;
pub use packer::{baseline_appointments, PackingLimits, VisitPacker};
