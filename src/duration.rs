//! Chair-time estimation for procedure codes.
//!
//! # Lookup Order
//!
//! 1. Caller-registered overrides (exact code).
//! 2. Built-in exact-code table.
//! 3. Built-in category ranges, first match in table order. Narrow
//!    sub-ranges precede their parent range.
//! 4. [`DEFAULT_MINUTES`].
//!
//! Estimation never fails: unknown or malformed codes get the default.

use tracing::debug;

use crate::models::code::{ranges, CodeRange, ProcedureCode};
use crate::models::Procedure;

/// Fallback duration for codes with no table entry (minutes).
pub const DEFAULT_MINUTES: u32 = 45;

/// Anesthesia / setup overhead added once per visit (minutes).
pub const SETUP_OVERHEAD_MINUTES: u32 = 15;

/// Booking slot granularity (minutes).
pub const SLOT_MINUTES: u32 = 15;

/// Exact-code durations (minutes).
const CODE_MINUTES: &[(&str, u32)] = &[
    ("D0120", 15),
    ("D0140", 20),
    ("D0150", 30),
    ("D0210", 20),
    ("D0220", 10),
    ("D0274", 10),
    ("D0330", 15),
    ("D1110", 45),
    ("D1120", 30),
    ("D1206", 10),
    ("D1208", 10),
    ("D1351", 15),
    ("D2140", 30),
    ("D2150", 40),
    ("D2160", 45),
    ("D2330", 30),
    ("D2331", 40),
    ("D2391", 30),
    ("D2392", 40),
    ("D2393", 50),
    ("D2740", 90),
    ("D2750", 90),
    ("D2950", 30),
    ("D2954", 30),
    ("D3220", 45),
    ("D3310", 60),
    ("D3320", 75),
    ("D3330", 90),
    ("D4341", 60),
    ("D4342", 45),
    ("D4910", 45),
    ("D6010", 90),
    ("D6065", 60),
    ("D7140", 30),
    ("D7210", 45),
    ("D7240", 60),
    ("D9110", 30),
    ("D9230", 15),
];

/// Category-range durations (minutes), most specific first.
const RANGE_MINUTES: &[(CodeRange, u32)] = &[
    (ranges::DIAGNOSTIC, 20),
    (ranges::PREVENTIVE, 30),
    (ranges::CROWN, 90),
    (ranges::RESTORATIVE, 45),
    (ranges::ENDODONTIC, 90),
    (ranges::SCALING_ROOT_PLANING, 60),
    (ranges::PERIODONTIC, 45),
    (ranges::REMOVABLE_PROSTHODONTIC, 60),
    (ranges::MAXILLOFACIAL, 60),
    (ranges::IMPLANT_PLACEMENT, 90),
    (ranges::IMPLANT_CROWN, 60),
    (ranges::IMPLANT, 75),
    (ranges::FIXED_PROSTHODONTIC, 90),
    (ranges::EXTRACTION, 45),
    (ranges::SURGICAL, 60),
    (ranges::ORTHODONTIC, 45),
    (ranges::ADJUNCTIVE, 30),
];

/// Rounds up to the next booking slot.
pub fn round_up_to_slot(minutes: u32) -> u32 {
    minutes.div_ceil(SLOT_MINUTES) * SLOT_MINUTES
}

/// Bookable length of a visit: treatment minutes plus setup, rounded up.
pub fn visit_minutes(treatment_minutes: u32) -> u32 {
    round_up_to_slot(treatment_minutes + SETUP_OVERHEAD_MINUTES)
}

/// Maps procedure codes to expected chair minutes.
///
/// The built-in tables are immutable; practices with different timings can
/// register per-code overrides that take precedence.
#[derive(Debug, Clone)]
pub struct DurationEstimator {
    overrides: Vec<(String, u32)>,
    default_minutes: u32,
}

impl DurationEstimator {
    /// Creates an estimator backed by the built-in tables.
    pub fn new() -> Self {
        Self {
            overrides: Vec::new(),
            default_minutes: DEFAULT_MINUTES,
        }
    }

    /// Registers an exact-code override.
    pub fn with_override(mut self, code: &str, minutes: u32) -> Self {
        let code = ProcedureCode::normalize(code);
        self.overrides.retain(|(c, _)| *c != code);
        self.overrides.push((code, minutes));
        self
    }

    /// Sets the fallback used when no table entry matches.
    pub fn with_default(mut self, minutes: u32) -> Self {
        self.default_minutes = minutes;
        self
    }

    /// Expected chair minutes for a code.
    pub fn estimate(&self, code: &str) -> u32 {
        let normalized = ProcedureCode::normalize(code);

        if let Some((_, minutes)) = self.overrides.iter().find(|(c, _)| *c == normalized) {
            return *minutes;
        }
        if let Some((_, minutes)) = CODE_MINUTES.iter().find(|(c, _)| *c == normalized) {
            return *minutes;
        }

        let range_minutes = ProcedureCode::parse(&normalized).and_then(|parsed| {
            RANGE_MINUTES
                .iter()
                .find(|(range, _)| range.contains(&parsed))
                .map(|(_, minutes)| *minutes)
        });

        range_minutes.unwrap_or_else(|| {
            debug!(code, "no duration entry, using default");
            self.default_minutes
        })
    }

    /// Writes `estimated_minutes` on every procedure.
    pub fn annotate(&self, procedures: &mut [Procedure]) {
        for p in procedures {
            p.estimated_minutes = Some(self.estimate(&p.code));
        }
    }
}

impl Default for DurationEstimator {
    fn default() -> Self {
        Self::new()
    }
}
