//! Result hydration (C8): produce a uniform [`HydratedResult`] regardless of
//! where its pieces live, merging layers in order so later sources only fill
//! gaps left by earlier ones, then run defensive coercion so downstream
//! consumers see only well-typed fields.

use std::collections::BTreeMap;
use std::path::Path;

use marketmind_core::AnalysisState;

use crate::error::TaskError;
use crate::model::HydratedResult;
use crate::store::TaskStore;

/// Non-`_report` state keys that still belong in the `reports` map.
const KNOWN_NON_REPORT_KEYS: &[&str] = &["trader_investment_plan", "investment_plan", "final_trade_decision"];

/// Reports considered, in priority order, when synthesizing `summary`.
const SUMMARY_PRIORITY: &[&str] = &["market_report", "fundamentals_report", "sentiment_report", "news_report"];

const MIN_REPORT_LEN: usize = 10;
const SUMMARY_CHAR_BUDGET: usize = 3000;

/// Merges in-memory state, the `analysis_reports` document, the
/// `analysis_tasks.result` embedded field, and filesystem report files, then
/// infers the derived fields and coerces everything to well-typed strings.
pub fn hydrate(store: &TaskStore, task_id: &str, runtime_dir: Option<&Path>) -> Result<HydratedResult, TaskError> {
    let mut reports: BTreeMap<String, String> = BTreeMap::new();
    let mut recommendation = String::new();
    let mut final_trade_decision = String::new();
    let mut symbol = String::new();

    // 1. In-memory AnalysisState, if the task is still resident and carries one.
    if let Some(task) = store.get(task_id)? {
        symbol = task.symbol.clone();
        if let Some(result) = task.result.clone() {
            merge_value_reports(&mut reports, &result);
            if let Some(r) = result.get("final_trade_decision").and_then(|v| v.as_str()) {
                final_trade_decision = r.to_string();
            }
        }
    }

    // 2. analysis_reports document, keyed by task_id.
    if let Some(report_doc) = store.get_report(task_id)? {
        merge_value_reports(&mut reports, &report_doc);
        if let Some(r) = report_doc.get("final_trade_decision").and_then(|v| v.as_str()) {
            if final_trade_decision.is_empty() {
                final_trade_decision = r.to_string();
            }
        }
        if let Some(r) = report_doc.get("investment_recommendation").and_then(|v| v.as_str()) {
            if recommendation.is_empty() {
                recommendation = r.to_string();
            }
        }
    }

    // 3. analysis_tasks.result embedded field (covered above via store.get;
    // kept as an explicit no-op layer so the merge order stays legible).

    // 4. Filesystem: <runtime>/<symbol>/<date>/reports/*.md
    if let (Some(runtime_dir), false) = (runtime_dir, symbol.is_empty()) {
        let pattern = runtime_dir.join(&symbol).join("*").join("reports").join("*.md");
        if let Some(pattern_str) = pattern.to_str() {
            if let Ok(paths) = glob::glob(pattern_str) {
                for entry in paths.flatten() {
                    if let Some(stem) = entry.file_stem().and_then(|s| s.to_str()) {
                        if let Ok(content) = std::fs::read_to_string(&entry) {
                            reports.entry(stem.to_string()).or_insert(content);
                        }
                    }
                }
            }
        }
    }

    // 5. Inferred fields.
    reports.retain(|_, v| v.trim().len() >= MIN_REPORT_LEN);

    if recommendation.is_empty() {
        recommendation = if !final_trade_decision.is_empty() {
            final_trade_decision.clone()
        } else {
            reports
                .values()
                .max_by_key(|v| v.len())
                .cloned()
                .unwrap_or_default()
        };
    }

    let summary = build_summary(&reports);
    let key_points = build_key_points(&final_trade_decision, &reports);

    Ok(HydratedResult {
        task_id: task_id.to_string(),
        symbol,
        reports,
        recommendation: to_string_or_default(&recommendation),
        summary,
        key_points,
        final_trade_decision: to_string_or_default(&final_trade_decision),
    })
}

/// Pulls every `_report`-suffixed key plus the known non-report keys and the
/// per-side debate histories out of a JSON value shaped like [`AnalysisState`].
fn merge_value_reports(reports: &mut BTreeMap<String, String>, value: &serde_json::Value) {
    if let Some(obj) = value.get("reports").and_then(|v| v.as_object()) {
        for (k, v) in obj {
            if let Some(s) = v.as_str() {
                reports.entry(k.clone()).or_insert_with(|| s.to_string());
            }
        }
    }
    for key in KNOWN_NON_REPORT_KEYS {
        if let Some(s) = value.get(key).and_then(|v| v.as_str()) {
            reports.entry((*key).to_string()).or_insert_with(|| s.to_string());
        }
    }
    if let Some(bull) = value
        .pointer("/investment_debate_state/bull_history")
        .and_then(|v| v.as_str())
    {
        reports.entry("bull_researcher".to_string()).or_insert_with(|| bull.to_string());
    }
    if let Some(bear) = value
        .pointer("/investment_debate_state/bear_history")
        .and_then(|v| v.as_str())
    {
        reports.entry("bear_researcher".to_string()).or_insert_with(|| bear.to_string());
    }
}

/// Builds `reports` directly from an [`AnalysisState`] still held in memory,
/// without a JSON round trip.
pub fn reports_from_state(state: &AnalysisState) -> BTreeMap<String, String> {
    let mut reports: BTreeMap<String, String> = state
        .reports
        .iter()
        .filter(|(_, v)| v.trim().len() >= MIN_REPORT_LEN)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    if !state.trader_investment_plan.trim().is_empty() {
        reports.insert("trader_investment_plan".to_string(), state.trader_investment_plan.clone());
    }
    if !state.investment_plan.trim().is_empty() {
        reports.insert("investment_plan".to_string(), state.investment_plan.clone());
    }
    if !state.final_trade_decision.trim().is_empty() {
        reports.insert("final_trade_decision".to_string(), state.final_trade_decision.clone());
    }
    if !state.investment_debate_state.bull_history.trim().is_empty() {
        reports.insert("bull_researcher".to_string(), state.investment_debate_state.bull_history.clone());
    }
    if !state.investment_debate_state.bear_history.trim().is_empty() {
        reports.insert("bear_researcher".to_string(), state.investment_debate_state.bear_history.clone());
    }
    reports
}

fn build_summary(reports: &BTreeMap<String, String>) -> String {
    let mut summary = String::new();
    for key in SUMMARY_PRIORITY {
        if let Some(content) = reports.get(*key) {
            append_within_budget(&mut summary, content);
        }
    }
    if summary.len() < SUMMARY_CHAR_BUDGET {
        for (key, content) in reports {
            if SUMMARY_PRIORITY.contains(&key.as_str()) {
                continue;
            }
            if key.ends_with("_report") {
                append_within_budget(&mut summary, content);
            }
            if summary.len() >= SUMMARY_CHAR_BUDGET {
                break;
            }
        }
    }
    summary.chars().take(SUMMARY_CHAR_BUDGET).collect()
}

fn append_within_budget(summary: &mut String, content: &str) {
    if summary.len() >= SUMMARY_CHAR_BUDGET {
        return;
    }
    if !summary.is_empty() {
        summary.push_str("\n\n");
    }
    summary.push_str(content);
}

fn build_key_points(decision: &str, reports: &BTreeMap<String, String>) -> Vec<String> {
    let mut points = Vec::new();
    for line in decision.lines() {
        let line = line.trim().trim_start_matches(['-', '*', '•']).trim();
        if !line.is_empty() {
            points.push(line.to_string());
        }
        if points.len() >= 5 {
            return points;
        }
    }
    if let Some(plan) = reports.get("investment_plan") {
        for line in plan.lines() {
            let line = line.trim().trim_start_matches(['-', '*', '•']).trim();
            if !line.is_empty() {
                points.push(line.to_string());
            }
            if points.len() >= 5 {
                break;
            }
        }
    }
    points
}

fn to_string_or_default(s: &str) -> String {
    s.trim().to_string()
}
