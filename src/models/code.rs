//! Procedure codes and code ranges.
//!
//! Clinical billing codes carry an alphabetic category prefix followed by a
//! numeric part (e.g. `D2740`). Ranges compare the numeric part only, and
//! only within the same prefix.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A parsed procedure code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcedureCode {
    /// Alphabetic prefix, upper-cased (e.g. `"D"`).
    pub prefix: String,
    /// Numeric part (e.g. `2740`).
    pub number: u32,
}

impl ProcedureCode {
    /// Parses a code such as `"D2740"` or `" d0120 "`.
    ///
    /// Returns `None` when the code has no alphabetic prefix, no digits,
    /// or trailing characters after the digits.
    pub fn parse(raw: &str) -> Option<Self> {
        let code = raw.trim();
        let split = code.find(|c: char| c.is_ascii_digit())?;
        let (prefix, digits) = code.split_at(split);

        if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }

        Some(Self {
            prefix: prefix.to_ascii_uppercase(),
            number: digits.parse().ok()?,
        })
    }

    /// Normalized textual form used for exact-match lookups.
    pub fn normalize(raw: &str) -> String {
        raw.trim().to_ascii_uppercase()
    }
}

impl fmt::Display for ProcedureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:04}", self.prefix, self.number)
    }
}

/// An inclusive numeric range of codes within one prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeRange {
    pub prefix: &'static str,
    pub start: u32,
    pub end: u32,
}

impl CodeRange {
    /// Creates a range `prefix+start ..= prefix+end`.
    pub const fn new(prefix: &'static str, start: u32, end: u32) -> Self {
        Self { prefix, start, end }
    }

    /// Whether a parsed code falls inside this range.
    pub fn contains(&self, code: &ProcedureCode) -> bool {
        code.prefix == self.prefix && (self.start..=self.end).contains(&code.number)
    }

    /// Parses `raw` and checks membership. Unparseable codes are never members.
    pub fn contains_raw(&self, raw: &str) -> bool {
        ProcedureCode::parse(raw).is_some_and(|code| self.contains(&code))
    }
}

/// Well-known CDT ranges used by the duration table and the clinical rules.
pub mod ranges {
    use super::CodeRange;

    pub const DIAGNOSTIC: CodeRange = CodeRange::new("D", 100, 999);
    pub const PREVENTIVE: CodeRange = CodeRange::new("D", 1000, 1999);
    pub const RESTORATIVE: CodeRange = CodeRange::new("D", 2000, 2999);
    pub const CROWN: CodeRange = CodeRange::new("D", 2700, 2799);
    pub const ENDODONTIC: CodeRange = CodeRange::new("D", 3000, 3999);
    pub const PERIODONTIC: CodeRange = CodeRange::new("D", 4000, 4999);
    pub const SCALING_ROOT_PLANING: CodeRange = CodeRange::new("D", 4341, 4346);
    pub const REMOVABLE_PROSTHODONTIC: CodeRange = CodeRange::new("D", 5000, 5899);
    pub const MAXILLOFACIAL: CodeRange = CodeRange::new("D", 5900, 5999);
    pub const IMPLANT: CodeRange = CodeRange::new("D", 6000, 6199);
    pub const IMPLANT_PLACEMENT: CodeRange = CodeRange::new("D", 6010, 6013);
    pub const IMPLANT_CROWN: CodeRange = CodeRange::new("D", 6058, 6067);
    pub const FIXED_PROSTHODONTIC: CodeRange = CodeRange::new("D", 6200, 6999);
    pub const RETAINER_CROWN: CodeRange = CodeRange::new("D", 6710, 6794);
    pub const SURGICAL: CodeRange = CodeRange::new("D", 7000, 7999);
    pub const EXTRACTION: CodeRange = CodeRange::new("D", 7111, 7250);
    pub const ORTHODONTIC: CodeRange = CodeRange::new("D", 8000, 8999);
    pub const ADJUNCTIVE: CodeRange = CodeRange::new("D", 9000, 9999);
}
