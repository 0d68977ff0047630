//! Score calculations
//!
//! Pure functions over rubric results: per-example points, the run-level
//! mean and spread, and incremental per-theme rollups.

use crate::report::{ExampleResult, RubricResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Points earned by one example
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExampleScore {
    /// Sum of points over met criteria; met negative criteria subtract.
    pub achieved_points: f64,
    /// Sum of positive points only.
    pub total_points: f64,
    /// `achieved / total`, unclipped, or 0 when `total_points` is 0.
    pub score: f64,
}

/// Run-level aggregate
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OverallScore {
    /// Mean example score, clipped to `[0, 1]`.
    pub overall_score: f64,
    /// Population standard deviation of the unclipped example scores.
    pub std_dev: f64,
}

pub fn calculate_example_score(results: &[RubricResult]) -> ExampleScore {
    let achieved_points: f64 = results.iter().filter(|r| r.criteria_met).map(|r| r.points).sum();
    let total_points: f64 = results.iter().filter(|r| r.points > 0.0).map(|r| r.points).sum();
    let score = if total_points > 0.0 { achieved_points / total_points } else { 0.0 };

    ExampleScore { achieved_points, total_points, score }
}

pub fn calculate_overall_score(results: &[ExampleResult]) -> OverallScore {
    if results.is_empty() {
        return OverallScore::default();
    }

    let n = results.len() as f64;
    let mean = results.iter().map(|r| r.score).sum::<f64>() / n;
    let variance = results.iter().map(|r| (r.score - mean).powi(2)).sum::<f64>() / n;

    OverallScore { overall_score: mean.clamp(0.0, 1.0), std_dev: variance.sqrt() }
}

/// Running score for one theme
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeScore {
    pub theme: String,
    pub examples: usize,
    pub total_score: f64,
    pub avg_score: f64,
}

impl ThemeScore {
    pub fn new(theme: impl Into<String>) -> Self {
        Self { theme: theme.into(), examples: 0, total_score: 0.0, avg_score: 0.0 }
    }

    pub fn record(&mut self, score: f64) {
        self.examples += 1;
        self.total_score += score;
        self.avg_score = self.total_score / self.examples as f64;
    }
}

/// Fold one example score into the theme rollup.
///
/// Examples without a theme leave the map untouched.
pub fn update_theme_scores(themes: &mut BTreeMap<String, ThemeScore>, theme: Option<&str>, score: f64) {
    if let Some(theme) = theme {
        themes.entry(theme.to_string()).or_insert_with(|| ThemeScore::new(theme)).record(score);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rubric(points: f64, met: bool) -> RubricResult {
        RubricResult {
            criterion: format!("criterion worth {points}"),
            points,
            criteria_met: met,
            explanation: String::new(),
            tags: Vec::new(),
        }
    }

    fn scored(score: f64) -> ExampleResult {
        ExampleResult {
            prompt_id: "p".to_string(),
            model_response: String::new(),
            rubric_results: Vec::new(),
            achieved_points: 0.0,
            total_points: 1.0,
            score,
        }
    }

    #[test]
    fn test_example_score_mixed_rubrics() {
        let results = [rubric(5.0, true), rubric(3.0, false), rubric(-2.0, true), rubric(-4.0, false)];
        let score = calculate_example_score(&results);
        assert_eq!(score.achieved_points, 3.0);
        assert_eq!(score.total_points, 8.0);
        assert!((score.score - 0.375).abs() < 1e-12);
    }

    #[test]
    fn test_met_negative_item_subtracts() {
        let score = calculate_example_score(&[rubric(-10.0, true)]);
        assert_eq!(score.achieved_points, -10.0);
        assert_eq!(score.total_points, 0.0);
        assert_eq!(score.score, 0.0);
    }

    #[test]
    fn test_example_score_can_go_negative() {
        let score = calculate_example_score(&[rubric(2.0, false), rubric(-6.0, true)]);
        assert_eq!(score.score, -3.0);
    }

    #[test]
    fn test_overall_score_empty() {
        assert_eq!(calculate_overall_score(&[]), OverallScore { overall_score: 0.0, std_dev: 0.0 });
    }

    #[test]
    fn test_overall_score_uses_population_std_dev() {
        let overall = calculate_overall_score(&[scored(0.0), scored(1.0)]);
        assert!((overall.overall_score - 0.5).abs() < 1e-12);
        assert!((overall.std_dev - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_overall_score_clips_mean_but_not_spread() {
        let overall = calculate_overall_score(&[scored(-1.0), scored(-0.5)]);
        assert_eq!(overall.overall_score, 0.0);
        assert!((overall.std_dev - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_theme_rollup_is_incremental() {
        let mut themes = BTreeMap::new();
        update_theme_scores(&mut themes, Some("hedging"), 0.2);
        update_theme_scores(&mut themes, None, 0.9);
        update_theme_scores(&mut themes, Some("hedging"), 0.8);

        let hedging = &themes["hedging"];
        assert_eq!(themes.len(), 1);
        assert_eq!(hedging.examples, 2);
        assert!((hedging.avg_score - 0.5).abs() < 1e-12);
        assert!((hedging.total_score - 1.0).abs() < 1e-12);
    }
}
