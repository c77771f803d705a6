//! Alternative-procedure substitution.
//!
//! A substituted procedure keeps its identity (id, teeth, priority, sequence)
//! and takes the alternative's code, name, domain and amounts. The original
//! selection is kept as an alternative so the choice stays reviewable.

use std::cmp::Ordering;

use tracing::debug;

use crate::constraints::tooth_token;
use crate::models::{Alternative, ClinicalDomain, Procedure};

/// Which alternative, if any, replaces the current selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Substitution {
    /// Keep every procedure as proposed.
    #[default]
    None,
    /// Take the most expensive alternative if it costs strictly more.
    HigherCost,
    /// Take the alternative with the best coverage/cost ratio if strictly
    /// better than the current one.
    BestCoverageRatio,
}

impl Substitution {
    /// Applies the substitution to `procedure`. Returns whether it changed.
    pub fn apply(&self, procedure: &mut Procedure) -> bool {
        let chosen = match self {
            Self::None => None,
            Self::HigherCost => best_by(&procedure.alternatives, |a| a.cost)
                .filter(|&i| procedure.alternatives[i].cost > procedure.cost),
            Self::BestCoverageRatio => best_by(&procedure.alternatives, Alternative::coverage_ratio)
                .filter(|&i| {
                    procedure.alternatives[i].coverage_ratio() > procedure.coverage_ratio()
                }),
        };

        match chosen {
            Some(index) => {
                substitute(procedure, index);
                true
            }
            None => false,
        }
    }
}

/// Index of the alternative with the highest key; the first one wins ties.
fn best_by(alternatives: &[Alternative], key: impl Fn(&Alternative) -> f64) -> Option<usize> {
    alternatives
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, alt)| {
            let score = key(alt);
            match best {
                Some((_, top)) if score.partial_cmp(&top) != Some(Ordering::Greater) => best,
                _ => Some((i, score)),
            }
        })
        .map(|(i, _)| i)
}

fn substitute(procedure: &mut Procedure, index: usize) {
    let chosen = procedure.alternatives.remove(index);
    debug!(
        procedure = %procedure.id,
        from = %procedure.code,
        to = %chosen.code,
        "substituting alternative"
    );

    let (pros, cons) = if chosen.pros.is_empty() && chosen.cons.is_empty() {
        default_tradeoffs(procedure.cost, chosen.cost)
    } else {
        (chosen.cons.clone(), chosen.pros.clone())
    };
    let original = Alternative {
        code: procedure.code.clone(),
        name: procedure.name.clone(),
        domain: Some(procedure.domain),
        cost: procedure.cost,
        insurance_coverage: procedure.insurance_coverage,
        pros,
        cons,
    };

    // Keep the tooth when the new name no longer carries it
    if procedure.teeth.is_empty() && tooth_token(&chosen.name).is_none() {
        if let Some(tooth) = tooth_token(&procedure.name) {
            procedure.teeth.push(tooth);
        }
    }

    procedure.domain = chosen
        .domain
        .or_else(|| ClinicalDomain::from_code(&chosen.code))
        .unwrap_or(procedure.domain);
    if !chosen.name.is_empty() {
        procedure.name = chosen.name;
    }
    procedure.code = chosen.code;
    procedure.cost = chosen.cost;
    procedure.insurance_coverage = chosen.insurance_coverage.min(chosen.cost);
    procedure.estimated_minutes = None;
    procedure.alternatives.push(original);
}

/// Trade-offs of the original selection relative to its replacement.
fn default_tradeoffs(original_cost: f64, chosen_cost: f64) -> (Vec<String>, Vec<String>) {
    if original_cost < chosen_cost {
        (
            vec!["Lower cost".to_string()],
            vec!["Less durable, higher risk of retreatment".to_string()],
        )
    } else {
        (
            vec!["Originally proposed treatment".to_string()],
            vec!["Higher out-of-pocket cost".to_string()],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crown() -> Procedure {
        Procedure::new("C", "D2740", ClinicalDomain::Prosthodontic)
            .with_name("Porcelain crown tooth #19")
            .with_cost(1500.0, 750.0)
    }

    #[test]
    fn test_none_keeps_procedure() {
        let mut p = crown().with_alternative(Alternative::new("D2790", 1800.0, 900.0));
        let before = p.clone();
        assert!(!Substitution::None.apply(&mut p));
        assert_eq!(p, before);
    }

    #[test]
    fn test_higher_cost_picks_most_expensive() {
        let mut p = crown()
            .with_alternative(Alternative::new("D2750", 1600.0, 700.0))
            .with_alternative(Alternative::new("D2790", 1800.0, 700.0).with_name("Gold crown"))
            .with_alternative(Alternative::new("D2391", 200.0, 160.0));

        assert!(Substitution::HigherCost.apply(&mut p));
        assert_eq!(p.code, "D2790");
        assert_eq!(p.name, "Gold crown");
        assert_eq!(p.cost, 1800.0);
        assert_eq!(p.teeth, vec!["19".to_string()]);
        assert_eq!(p.alternatives.len(), 3);
        assert_eq!(p.alternatives[2].code, "D2740");
    }

    #[test]
    fn test_higher_cost_requires_strictly_more() {
        let mut p = crown().with_alternative(Alternative::new("D2750", 1500.0, 750.0));
        assert!(!Substitution::HigherCost.apply(&mut p));
        assert_eq!(p.code, "D2740");
    }

    #[test]
    fn test_coverage_ratio_substitution_mirrors_tradeoffs() {
        let mut p = crown().with_alternative(
            Alternative::new("D2751", 1200.0, 900.0)
                .with_name("Porcelain-fused-to-metal crown tooth #19")
                .with_pro("Better insurance coverage")
                .with_con("Less natural appearance"),
        );

        assert!(Substitution::BestCoverageRatio.apply(&mut p));
        assert_eq!(p.code, "D2751");
        assert_eq!(p.cost, 1200.0);
        assert_eq!(p.insurance_coverage, 900.0);
        assert_eq!(p.domain, ClinicalDomain::Restorative);
        assert_eq!(p.estimated_minutes, None);

        let original = &p.alternatives[0];
        assert_eq!(original.code, "D2740");
        assert_eq!(original.domain, Some(ClinicalDomain::Prosthodontic));
        assert_eq!(original.pros, vec!["Less natural appearance".to_string()]);
        assert_eq!(original.cons, vec!["Better insurance coverage".to_string()]);
    }

    #[test]
    fn test_coverage_ratio_requires_improvement() {
        let mut p = crown().with_alternative(Alternative::new("D2751", 1000.0, 400.0));
        assert!(!Substitution::BestCoverageRatio.apply(&mut p));
    }

    #[test]
    fn test_default_tradeoffs() {
        let mut p = crown().with_alternative(Alternative::new("D2790", 1800.0, 700.0));
        Substitution::HigherCost.apply(&mut p);
        assert_eq!(p.alternatives[0].pros, vec!["Lower cost".to_string()]);

        let mut q = crown().with_alternative(Alternative::new("D2751", 1200.0, 900.0));
        Substitution::BestCoverageRatio.apply(&mut q);
        assert_eq!(q.alternatives[0].cons, vec!["Higher out-of-pocket cost".to_string()]);
    }

    #[test]
    fn test_alternative_domain_wins_over_code() {
        let mut p = crown().with_alternative(
            Alternative::new("D6065", 2500.0, 1000.0).with_domain(ClinicalDomain::Implant),
        );
        Substitution::HigherCost.apply(&mut p);
        assert_eq!(p.domain, ClinicalDomain::Implant);
    }
}
