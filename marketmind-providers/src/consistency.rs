//! Optional consistency check between the top two available adapters for
//! one operation. Off by default; callers opt in via
//! [`crate::orchestrator::ProviderOrchestrator::daily_basic_with_consistency_check`].

use crate::quote::DailyBasicRow;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolutionStrategy {
    UsePrimary,
    UseSecondary,
    Merge,
    FlagForReview,
}

#[derive(Clone, Debug)]
pub struct ConsistencyResult {
    pub is_consistent: bool,
    pub confidence: f64,
    pub recommended_action: ResolutionStrategy,
    pub differences: Vec<String>,
}

/// Compares two adapters' `daily_basic` rows for the same trade date,
/// field by field, and recommends a resolution strategy.
pub struct ConsistencyChecker {
    /// Relative tolerance below which two numeric fields are "the same".
    tolerance: f64,
}

impl Default for ConsistencyChecker {
    fn default() -> Self {
        Self { tolerance: 0.02 }
    }
}

impl ConsistencyChecker {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn check_daily_basic(
        &self,
        primary: &[DailyBasicRow],
        secondary: &[DailyBasicRow],
    ) -> ConsistencyResult {
        let mut differences = Vec::new();
        let mut compared = 0usize;
        let mut agreeing = 0usize;

        for p in primary {
            let Some(s) = secondary.iter().find(|s| s.symbol == p.symbol) else {
                continue;
            };
            for (field, pv, sv) in [
                ("pe", p.pe, s.pe),
                ("pb", p.pb, s.pb),
                ("turnover_rate", p.turnover_rate, s.turnover_rate),
                ("total_mv", p.total_mv, s.total_mv),
            ] {
                let (Some(pv), Some(sv)) = (pv, sv) else { continue };
                compared += 1;
                if relative_diff(pv, sv) <= self.tolerance {
                    agreeing += 1;
                } else {
                    differences.push(format!("{}.{field}: primary={pv} secondary={sv}", p.symbol));
                }
            }
        }

        let confidence = if compared == 0 { 0.0 } else { agreeing as f64 / compared as f64 };
        let is_consistent = compared > 0 && differences.is_empty();
        let recommended_action = if compared == 0 {
            ResolutionStrategy::FlagForReview
        } else if is_consistent {
            ResolutionStrategy::UsePrimary
        } else if confidence >= 0.8 {
            ResolutionStrategy::Merge
        } else {
            ResolutionStrategy::FlagForReview
        };

        ConsistencyResult { is_consistent, confidence, recommended_action, differences }
    }

    /// Applies `recommended_action` to produce the final row set.
    pub fn resolve(
        &self,
        primary: Vec<DailyBasicRow>,
        secondary: Vec<DailyBasicRow>,
        result: &ConsistencyResult,
    ) -> Vec<DailyBasicRow> {
        match result.recommended_action {
            ResolutionStrategy::UsePrimary | ResolutionStrategy::FlagForReview => primary,
            ResolutionStrategy::UseSecondary => secondary,
            ResolutionStrategy::Merge => {
                let mut merged = primary;
                for s in secondary {
                    if !merged.iter().any(|p| p.symbol == s.symbol) {
                        merged.push(s);
                    }
                }
                merged
            }
        }
    }
}

fn relative_diff(a: f64, b: f64) -> f64 {
    if a == 0.0 && b == 0.0 {
        0.0
    } else {
        (a - b).abs() / a.abs().max(b.abs()).max(f64::EPSILON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(symbol: &str, pe: f64) -> DailyBasicRow {
        DailyBasicRow { symbol: symbol.to_string(), pe: Some(pe), ..Default::default() }
    }

    #[test]
    fn matching_rows_are_consistent_and_recommend_primary() {
        let checker = ConsistencyChecker::default();
        let result = checker.check_daily_basic(&[row("600000", 10.0)], &[row("600000", 10.01)]);
        assert!(result.is_consistent);
        assert_eq!(result.recommended_action, ResolutionStrategy::UsePrimary);
    }

    #[test]
    fn diverging_rows_flag_or_merge_depending_on_confidence() {
        let checker = ConsistencyChecker::default();
        let result = checker.check_daily_basic(&[row("600000", 10.0)], &[row("600000", 50.0)]);
        assert!(!result.is_consistent);
        assert!(!result.differences.is_empty());
    }

    #[test]
    fn no_overlap_flags_for_review() {
        let checker = ConsistencyChecker::default();
        let result = checker.check_daily_basic(&[row("600000", 10.0)], &[row("000001", 10.0)]);
        assert_eq!(result.recommended_action, ResolutionStrategy::FlagForReview);
    }
}
