//! Clinical rule sets.
//!
//! Both rule sets are closed enumerations evaluated by pattern matching.
//! `ALL` lists every rule so tests can walk the complete set.
//!
//! # Score Convention
//! Compatibility rules *forbid*: a pair is compatible unless some rule
//! forbids it. Dependency rules *order*: the first rule that orders a pair
//! decides which procedure comes first.

use crate::models::code::ranges;
use crate::models::{ClinicalDomain, Procedure, TimingWindow};

/// Clinical role of a procedure, derived from its code and domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClinicalRole {
    /// Single-tooth crown (restorative crowns and fixed retainer crowns).
    Crown,
    /// Any restorative work, crowns included.
    Restorative,
    /// Root canal and other endodontic therapy.
    Endodontic,
    ScalingRootPlaning,
    ImplantPlacement,
    /// Crown supported by an implant or abutment.
    ImplantCrown,
    /// Any implant service.
    ImplantWork,
    Extraction,
}

impl ClinicalRole {
    /// Whether `procedure` plays this role.
    pub fn applies_to(&self, procedure: &Procedure) -> bool {
        let code = procedure.code.as_str();
        match self {
            Self::Crown => ranges::CROWN.contains_raw(code) || ranges::RETAINER_CROWN.contains_raw(code),
            Self::Restorative => {
                procedure.domain == ClinicalDomain::Restorative
                    || ranges::RESTORATIVE.contains_raw(code)
            }
            Self::Endodontic => {
                procedure.domain == ClinicalDomain::Endodontic
                    || ranges::ENDODONTIC.contains_raw(code)
            }
            Self::ScalingRootPlaning => ranges::SCALING_ROOT_PLANING.contains_raw(code),
            Self::ImplantPlacement => ranges::IMPLANT_PLACEMENT.contains_raw(code),
            Self::ImplantCrown => ranges::IMPLANT_CROWN.contains_raw(code),
            Self::ImplantWork => {
                procedure.domain == ClinicalDomain::Implant || ranges::IMPLANT.contains_raw(code)
            }
            Self::Extraction => ranges::EXTRACTION.contains_raw(code),
        }
    }
}

fn is_non_crown_restorative(p: &Procedure) -> bool {
    ClinicalRole::Restorative.applies_to(p) && !ClinicalRole::Crown.applies_to(p)
}

/// A rule that forbids two procedures from sharing a visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompatibilityRule {
    /// A filling and a crown on the same tooth.
    SameToothRestorationAndCrown,
    /// A root canal and a crown on the same tooth.
    SameToothRootCanalAndCrown,
    /// Two domains that never share a visit, regardless of tooth.
    DomainPair(ClinicalDomain, ClinicalDomain),
}

impl CompatibilityRule {
    pub const ALL: [CompatibilityRule; 5] = [
        Self::SameToothRestorationAndCrown,
        Self::SameToothRootCanalAndCrown,
        Self::DomainPair(ClinicalDomain::Endodontic, ClinicalDomain::Surgical),
        Self::DomainPair(ClinicalDomain::Endodontic, ClinicalDomain::Prosthodontic),
        Self::DomainPair(ClinicalDomain::Prosthodontic, ClinicalDomain::Surgical),
    ];

    /// Whether this rule forbids `a` and `b` in one visit. Symmetric.
    pub fn forbids(&self, a: &Procedure, b: &Procedure, same_tooth: bool) -> bool {
        match self {
            Self::SameToothRestorationAndCrown => {
                same_tooth && either_way(a, b, is_non_crown_restorative, |p| {
                    ClinicalRole::Crown.applies_to(p)
                })
            }
            Self::SameToothRootCanalAndCrown => {
                same_tooth
                    && either_way(
                        a,
                        b,
                        |p| ClinicalRole::Endodontic.applies_to(p),
                        |p| ClinicalRole::Crown.applies_to(p),
                    )
            }
            Self::DomainPair(x, y) => {
                (a.domain == *x && b.domain == *y) || (a.domain == *y && b.domain == *x)
            }
        }
    }

    /// Short explanation, used in log output.
    pub fn description(&self) -> &'static str {
        match self {
            Self::SameToothRestorationAndCrown => "filling and crown on the same tooth",
            Self::SameToothRootCanalAndCrown => "root canal and crown on the same tooth",
            Self::DomainPair(..) => "domains cannot share a visit",
        }
    }
}

/// A rule that orders two procedures into separate visits with a gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyRule {
    RootCanalBeforeCrown,
    ExtractionBeforeImplant,
    ImplantBeforeImplantCrown,
    PeriodontalTherapyFirst,
}

impl DependencyRule {
    pub const ALL: [DependencyRule; 4] = [
        Self::RootCanalBeforeCrown,
        Self::ExtractionBeforeImplant,
        Self::ImplantBeforeImplantCrown,
        Self::PeriodontalTherapyFirst,
    ];

    /// Whether the rule only applies to procedures on the same tooth.
    pub fn requires_same_tooth(&self) -> bool {
        !matches!(self, Self::PeriodontalTherapyFirst)
    }

    /// Whether `before` must precede `after` under this rule (directional).
    pub fn orders(&self, before: &Procedure, after: &Procedure) -> bool {
        match self {
            Self::RootCanalBeforeCrown => {
                ClinicalRole::Endodontic.applies_to(before) && ClinicalRole::Crown.applies_to(after)
            }
            Self::ExtractionBeforeImplant => {
                ClinicalRole::Extraction.applies_to(before)
                    && ClinicalRole::ImplantPlacement.applies_to(after)
            }
            Self::ImplantBeforeImplantCrown => {
                ClinicalRole::ImplantPlacement.applies_to(before)
                    && ClinicalRole::ImplantCrown.applies_to(after)
            }
            Self::PeriodontalTherapyFirst => {
                ClinicalRole::ScalingRootPlaning.applies_to(before)
                    && (ClinicalRole::Restorative.applies_to(after)
                        || ClinicalRole::ImplantWork.applies_to(after))
            }
        }
    }

    /// Recommended gap between the two visits.
    pub fn window(&self) -> TimingWindow {
        match self {
            Self::RootCanalBeforeCrown => {
                TimingWindow::new(7, 30, "root canal must complete before crown")
            }
            Self::ExtractionBeforeImplant => {
                TimingWindow::new(60, 180, "extraction site must heal before implant placement")
            }
            Self::ImplantBeforeImplantCrown => {
                TimingWindow::new(90, 180, "implant must osseointegrate before crown")
            }
            Self::PeriodontalTherapyFirst => TimingWindow::new(14, 30, "periodontal therapy first"),
        }
    }
}

fn either_way(
    a: &Procedure,
    b: &Procedure,
    first: impl Fn(&Procedure) -> bool,
    second: impl Fn(&Procedure) -> bool,
) -> bool {
    (first(a) && second(b)) || (first(b) && second(a))
}
