//! Rule engine for multi-criteria procedure ordering.
//!
//! Composes ordering rules with configurable evaluation modes and
//! tie-breaking strategies. Sorting is stable: procedures that tie on every
//! rule keep their input order.

use std::cmp::Ordering;
use std::sync::Arc;

use super::{DispatchingRule, RuleScore};
use crate::models::Procedure;

/// How sort keys combine.
#[derive(Debug, Clone, Default)]
pub enum EvaluationMode {
    /// Compare key by key; later keys only break ties.
    #[default]
    Sequential,
    /// Blend every key into one weighted score.
    Weighted,
}

/// Ordering of procedures that tie on every key.
#[derive(Debug, Clone, Default)]
pub enum TieBreaker {
    /// Keep input order (stable sort).
    #[default]
    Stable,
    /// Original sequence number, ascending.
    BySequence,
}

#[derive(Clone)]
struct WeightedRule {
    rule: Arc<dyn DispatchingRule>,
    weight: f64,
}

/// A composable rule engine for procedure ordering.
///
/// Each plan variant builds one of these to order procedures before packing.
#[derive(Clone)]
pub struct RuleEngine {
    rules: Vec<WeightedRule>,
    mode: EvaluationMode,
    tie_breaker: TieBreaker,
    epsilon: f64,
}

impl RuleEngine {
    /// Creates an engine with no sort keys (input order is kept).
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            mode: EvaluationMode::Sequential,
            tie_breaker: TieBreaker::Stable,
            epsilon: 1e-9,
        }
    }

    /// Appends a sort key at full weight.
    pub fn with_rule<R: DispatchingRule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(WeightedRule {
            rule: Arc::new(rule),
            weight: 1.0,
        });
        self
    }

    /// Appends a key contributing `weight` to the blended score.
    pub fn with_weighted_rule<R: DispatchingRule + 'static>(
        mut self,
        rule: R,
        weight: f64,
    ) -> Self {
        self.rules.push(WeightedRule {
            rule: Arc::new(rule),
            weight,
        });
        self
    }

    /// Appends a key consulted only when earlier keys tie (ignored by weighted mode).
    pub fn with_tie_breaker<R: DispatchingRule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(WeightedRule {
            rule: Arc::new(rule),
            weight: 0.0,
        });
        self
    }

    /// Chooses sequential or weighted evaluation.
    pub fn with_mode(mut self, mode: EvaluationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Chooses how procedures equal on every key are ordered.
    pub fn with_final_tie_breaker(mut self, tie_breaker: TieBreaker) -> Self {
        self.tie_breaker = tie_breaker;
        self
    }

    /// Returns indices into `procedures`, earliest first.
    pub fn sort_indices(&self, procedures: &[Procedure]) -> Vec<usize> {
        if procedures.is_empty() {
            return Vec::new();
        }

        let mut indices: Vec<usize> = (0..procedures.len()).collect();

        match &self.mode {
            EvaluationMode::Sequential => {
                indices.sort_by(|&a, &b| self.compare_sequential(&procedures[a], &procedures[b]));
            }
            EvaluationMode::Weighted => {
                let scores: Vec<f64> = procedures.iter().map(|p| self.weighted_score(p)).collect();
                indices.sort_by(|&a, &b| {
                    if (scores[a] - scores[b]).abs() > self.epsilon {
                        scores[a].partial_cmp(&scores[b]).unwrap_or(Ordering::Equal)
                    } else {
                        self.final_tie_break(&procedures[a], &procedures[b])
                    }
                });
            }
        }

        indices
    }

    /// Returns a sorted copy of `procedures`.
    pub fn sort(&self, procedures: &[Procedure]) -> Vec<Procedure> {
        self.sort_indices(procedures)
            .into_iter()
            .map(|i| procedures[i].clone())
            .collect()
    }

    /// Evaluates a single procedure and returns weighted scores from each rule.
    pub fn evaluate(&self, procedure: &Procedure) -> Vec<RuleScore> {
        self.rules
            .iter()
            .map(|wr| wr.rule.evaluate(procedure) * wr.weight)
            .collect()
    }

    fn compare_sequential(&self, a: &Procedure, b: &Procedure) -> Ordering {
        for wr in &self.rules {
            let score_a = wr.rule.evaluate(a);
            let score_b = wr.rule.evaluate(b);

            if (score_a - score_b).abs() > self.epsilon {
                return score_a.partial_cmp(&score_b).unwrap_or(Ordering::Equal);
            }
        }

        self.final_tie_break(a, b)
    }

    fn final_tie_break(&self, a: &Procedure, b: &Procedure) -> Ordering {
        match &self.tie_breaker {
            TieBreaker::Stable => Ordering::Equal,
            TieBreaker::BySequence => a.sequence.cmp(&b.sequence),
        }
    }

    fn weighted_score(&self, procedure: &Procedure) -> f64 {
        self.rules
            .iter()
            .map(|wr| wr.rule.evaluate(procedure) * wr.weight)
            .sum()
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleEngine")
            .field(
                "rules",
                &self
                    .rules
                    .iter()
                    .map(|r| format!("{}(w={})", r.rule.name(), r.weight))
                    .collect::<Vec<_>>(),
            )
            .field("mode", &self.mode)
            .field("tie_breaker", &self.tie_breaker)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatching::rules;
    use crate::models::{ClinicalDomain, Priority};

    fn make(id: &str, priority: Priority, cost: f64, coverage: f64) -> Procedure {
        Procedure::new(id, "D2391", ClinicalDomain::Restorative)
            .with_priority(priority)
            .with_cost(cost, coverage)
    }

    fn ids(procs: &[Procedure]) -> Vec<&str> {
        procs.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_priority_ordering_is_stable() {
        let procs = vec![
            make("low", Priority::Low, 100.0, 0.0),
            make("high-1", Priority::High, 100.0, 0.0),
            make("urgent", Priority::Urgent, 100.0, 0.0),
            make("high-2", Priority::High, 100.0, 0.0),
        ];
        let engine = RuleEngine::new().with_rule(rules::PriorityRank);
        let sorted = engine.sort(&procs);
        assert_eq!(ids(&sorted), vec!["urgent", "high-1", "high-2", "low"]);
    }

    #[test]
    fn test_sequential_with_tie_breaker() {
        let procs = vec![
            make("dear", Priority::High, 900.0, 0.0),
            make("cheap", Priority::High, 90.0, 0.0),
            make("low", Priority::Low, 10.0, 0.0),
        ];
        let engine = RuleEngine::new()
            .with_rule(rules::PriorityRank)
            .with_tie_breaker(rules::LowestCost);
        let sorted = engine.sort(&procs);
        assert_eq!(ids(&sorted), vec!["cheap", "dear", "low"]);
    }

    #[test]
    fn test_weighted_mode() {
        // A: 0.7*4 + 0.3*10*0.0 = 2.8
        // B: 0.7*2 + 0.3*10*0.9 = 4.1 → B first
        let procs = vec![
            make("A", Priority::Urgent, 100.0, 0.0),
            make("B", Priority::Medium, 100.0, 90.0),
        ];
        let engine = RuleEngine::new()
            .with_mode(EvaluationMode::Weighted)
            .with_weighted_rule(rules::PriorityRank, 0.7)
            .with_weighted_rule(rules::CoverageRatio, 0.3);
        let sorted = engine.sort(&procs);
        assert_eq!(ids(&sorted), vec!["B", "A"]);
    }

    #[test]
    fn test_by_sequence_tie_breaker() {
        let procs = vec![
            make("second", Priority::Low, 1.0, 0.0).with_sequence(2),
            make("first", Priority::Low, 1.0, 0.0).with_sequence(1),
        ];
        let engine = RuleEngine::new()
            .with_rule(rules::PriorityRank)
            .with_final_tie_breaker(TieBreaker::BySequence);
        assert_eq!(ids(&engine.sort(&procs)), vec!["first", "second"]);
    }

    #[test]
    fn test_empty() {
        let engine = RuleEngine::new().with_rule(rules::PriorityRank);
        assert!(engine.sort_indices(&[]).is_empty());
        assert!(engine.sort(&[]).is_empty());
    }

    #[test]
    fn test_evaluate_scores() {
        let p = make("T1", Priority::High, 250.0, 0.0);
        let engine = RuleEngine::new()
            .with_rule(rules::PriorityRank)
            .with_rule(rules::LowestCost);

        let scores = engine.evaluate(&p);
        assert_eq!(scores.len(), 2);
        assert!((scores[0] + 3.0).abs() < 1e-10);
        assert!((scores[1] - 250.0).abs() < 1e-10);
    }

    #[test]
    fn test_debug_lists_rules() {
        let engine = RuleEngine::new()
            .with_rule(rules::PriorityRank)
            .with_tie_breaker(rules::LowestCost);
        let text = format!("{engine:?}");
        assert!(text.contains("PRIORITY(w=1)"));
        assert!(text.contains("COST(w=0)"));
    }
}
