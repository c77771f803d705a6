//! Pairwise clinical constraints between procedures.
//!
//! Two independent, pure decisions per procedure pair:
//! - **Compatibility**: may they share a visit?
//! - **Dependency**: must one precede the other, and by how many days?
//!
//! # Tooth References
//!
//! Same-tooth rules need to know which tooth a procedure treats. The name is
//! searched for a token such as `tooth #19` or `#19`; when the name has none
//! and the procedure lists exactly one tooth, that tooth is used. Otherwise
//! the procedure has no tooth and same-tooth rules never fire for it.
//!
//! # Complexity
//! O(n²) over procedure pairs. Per-patient batches are tens of procedures.

pub mod rules;

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::models::{Dependency, Procedure, TimingWindow};
pub use rules::{ClinicalRole, CompatibilityRule, DependencyRule};

/// Upper bound of the gap window attached to caller-listed prerequisites (days).
pub const LISTED_PREREQUISITE_MAX_DAYS: u32 = 60;

static TOOTH_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\btooth\s*)?#\s*(\d+)").expect("tooth token pattern is valid")
});

/// Tooth referenced in a procedure name, e.g. `"Crown tooth #19"` → `"19"`.
pub fn tooth_token(name: &str) -> Option<String> {
    let caps = TOOTH_TOKEN.captures(name)?;
    let number: u32 = caps.get(1)?.as_str().parse().ok()?;
    Some(number.to_string())
}

fn normalize_tooth(raw: &str) -> String {
    let trimmed = raw.trim().trim_start_matches('#');
    match trimmed.parse::<u32>() {
        Ok(n) => n.to_string(),
        Err(_) => trimmed.to_ascii_uppercase(),
    }
}

/// The single tooth a procedure treats, if determinable.
pub fn tooth_of(procedure: &Procedure) -> Option<String> {
    tooth_token(&procedure.name).or_else(|| match procedure.teeth.as_slice() {
        [only] => Some(normalize_tooth(only)),
        _ => None,
    })
}

/// Every tooth a procedure touches: the name token plus the listed teeth.
pub fn teeth_of(procedure: &Procedure) -> BTreeSet<String> {
    let mut teeth: BTreeSet<String> = procedure.teeth.iter().map(|t| normalize_tooth(t)).collect();
    if let Some(token) = tooth_token(&procedure.name) {
        teeth.insert(token);
    }
    teeth
}

/// Whether two procedures touch at least one common tooth.
pub fn teeth_overlap(a: &Procedure, b: &Procedure) -> bool {
    let teeth_a = teeth_of(a);
    teeth_of(b).iter().any(|t| teeth_a.contains(t))
}

fn same_tooth(a: &Procedure, b: &Procedure) -> bool {
    match (tooth_of(a), tooth_of(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// Dependencies discovered for one planning run, indexed by the dependent
/// procedure.
#[derive(Debug, Clone, Default)]
pub struct DependencyMap {
    dependencies: Vec<Dependency>,
    by_after: HashMap<String, Vec<usize>>,
}

impl DependencyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a dependency unless the same ordered pair is already present.
    pub fn insert(&mut self, dependency: Dependency) -> bool {
        if self.contains(&dependency.before_id, &dependency.after_id) {
            return false;
        }
        self.by_after
            .entry(dependency.after_id.clone())
            .or_default()
            .push(self.dependencies.len());
        self.dependencies.push(dependency);
        true
    }

    /// Whether `after_id` depends on `before_id`.
    pub fn contains(&self, before_id: &str, after_id: &str) -> bool {
        self.for_procedure(after_id)
            .any(|d| d.before_id == before_id)
    }

    /// Dependencies where `procedure_id` is the dependent side.
    pub fn for_procedure<'a>(&'a self, procedure_id: &str) -> impl Iterator<Item = &'a Dependency> {
        self.by_after
            .get(procedure_id)
            .into_iter()
            .flatten()
            .map(|&i| &self.dependencies[i])
    }

    /// All dependencies, in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &Dependency> {
        self.dependencies.iter()
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }
}

/// Evaluates compatibility and dependency rules over procedure pairs.
///
/// # Example
/// ```
/// use dental_sequencing::constraints::ConstraintResolver;
/// use dental_sequencing::models::{ClinicalDomain, Procedure};
///
/// let rct = Procedure::new("rct", "D3330", ClinicalDomain::Endodontic)
///     .with_name("Root canal tooth #19");
/// let crown = Procedure::new("crown", "D2740", ClinicalDomain::Prosthodontic)
///     .with_name("Crown tooth #19");
///
/// let resolver = ConstraintResolver::new();
/// assert!(!resolver.compatible(&rct, &crown));
/// let dep = resolver.depends_on(&crown, &rct).unwrap();
/// assert_eq!(dep.before_id, "rct");
/// assert_eq!(dep.window.min_days, 7);
/// ```
#[derive(Debug, Clone)]
pub struct ConstraintResolver {
    min_days_between_visits: u32,
}

impl ConstraintResolver {
    /// Creates a resolver with no extra gap floor.
    pub fn new() -> Self {
        Self {
            min_days_between_visits: 0,
        }
    }

    /// Sets the minimum gap applied to every dependency window and used for
    /// caller-listed prerequisites.
    pub fn with_min_days_between_visits(mut self, days: u32) -> Self {
        self.min_days_between_visits = days;
        self
    }

    /// Whether `a` and `b` may share a visit. Symmetric.
    pub fn compatible(&self, a: &Procedure, b: &Procedure) -> bool {
        self.conflict(a, b).is_none()
    }

    /// The first rule forbidding `a` and `b` in one visit.
    pub fn conflict(&self, a: &Procedure, b: &Procedure) -> Option<CompatibilityRule> {
        let same = same_tooth(a, b);
        CompatibilityRule::ALL
            .into_iter()
            .find(|rule| rule.forbids(a, b, same))
    }

    /// Clinical dependency between `a` and `b`, in whichever direction applies.
    pub fn depends_on(&self, a: &Procedure, b: &Procedure) -> Option<Dependency> {
        if a.id == b.id {
            return None;
        }
        let same = same_tooth(a, b);

        DependencyRule::ALL
            .into_iter()
            .filter(|rule| same || !rule.requires_same_tooth())
            .find_map(|rule| {
                let (before, after) = if rule.orders(a, b) {
                    (a, b)
                } else if rule.orders(b, a) {
                    (b, a)
                } else {
                    return None;
                };
                Some(Dependency::new(
                    &before.id,
                    &after.id,
                    rule.window().with_floor(self.min_days_between_visits),
                ))
            })
    }

    /// Discovers every dependency among `procedures`.
    ///
    /// Clinical rules are evaluated over all pairs. Each procedure's listed
    /// prerequisites are added as well when the prerequisite is part of the
    /// batch; prerequisites outside the batch are ignored.
    pub fn resolve(&self, procedures: &[Procedure]) -> DependencyMap {
        let mut map = DependencyMap::new();

        for (i, a) in procedures.iter().enumerate() {
            for b in &procedures[i + 1..] {
                if let Some(dep) = self.depends_on(a, b) {
                    debug!(
                        before = %dep.before_id,
                        after = %dep.after_id,
                        reason = %dep.window.reason,
                        "clinical dependency"
                    );
                    map.insert(dep);
                }
            }
        }

        let ids: HashSet<&str> = procedures.iter().map(|p| p.id.as_str()).collect();
        for p in procedures {
            for prerequisite in &p.prerequisites {
                if prerequisite == &p.id || !ids.contains(prerequisite.as_str()) {
                    debug!(
                        procedure = %p.id,
                        prerequisite = %prerequisite,
                        "prerequisite not in batch, ignored"
                    );
                    continue;
                }
                let min_days = self.min_days_between_visits;
                map.insert(Dependency::new(
                    prerequisite,
                    &p.id,
                    TimingWindow::new(
                        min_days,
                        LISTED_PREREQUISITE_MAX_DAYS.max(min_days),
                        "listed prerequisite",
                    ),
                ));
            }
        }

        map
    }
}

impl Default for ConstraintResolver {
    fn default() -> Self {
        Self::new()
    }
}
