//! Conditional routers for the debate stages: who speaks next, and when a
//! debate has run its course and should hand off to the next stage.

use std::sync::Arc;

use crate::graph::{ConditionalRouter, ConditionalRouterFn};
use crate::state::AnalysisState;

/// Node ids, matching the names the corresponding `Agent` impls return.
pub const BULL_NODE: &str = "\u{1F402} \u{770B}\u{6DA8}\u{7814}\u{7A76}\u{5458}";
pub const BEAR_NODE: &str = "\u{1F43B} \u{770B}\u{8DCC}\u{7814}\u{7A76}\u{5458}";
pub const RESEARCH_MANAGER_NODE: &str = "\u{1F454} \u{7814}\u{7A76}\u{7ECF}\u{7406}";
pub const TRADER_NODE: &str = "\u{1F4BC} \u{4EA4}\u{6613}\u{5458}\u{51B3}\u{7B56}";
pub const RISKY_NODE: &str = "\u{1F525} \u{6FC0}\u{8FDB}\u{98CE}\u{9669}\u{8BC4}\u{4F30}";
pub const SAFE_NODE: &str = "\u{1F6E1}\u{FE0F} \u{4FDD}\u{5B88}\u{98CE}\u{9669}\u{8BC4}\u{4F30}";
pub const NEUTRAL_NODE: &str = "\u{2696}\u{FE0F} \u{4E2D}\u{6027}\u{98CE}\u{9669}\u{8BC4}\u{4F30}";
pub const RISK_JUDGE_NODE: &str = "\u{1F3AF} \u{98CE}\u{9669}\u{7ECF}\u{7406}";

/// Investment debate continues until `count >= 2 * (max_rounds + 1)`, then
/// hands off to the research manager. Bull always opens a round; bear always
/// follows.
pub fn investment_debate_router() -> ConditionalRouter<AnalysisState> {
    let path: ConditionalRouterFn<AnalysisState> = Arc::new(|state: &AnalysisState| {
        let debate = &state.investment_debate_state;
        if debate.count >= 2 * (debate.max_rounds + 1) {
            return RESEARCH_MANAGER_NODE.to_string();
        }
        match debate.latest_speaker.as_deref() {
            Some("bull") => BEAR_NODE.to_string(),
            _ => BULL_NODE.to_string(),
        }
    });
    ConditionalRouter::new(path, None)
}

/// Risk debate rotates risky -> safe -> neutral -> risky ... until
/// `count >= 3 * max_rounds`, then hands off to the risk judge.
pub fn risk_debate_router() -> ConditionalRouter<AnalysisState> {
    let path: ConditionalRouterFn<AnalysisState> = Arc::new(|state: &AnalysisState| {
        let debate = &state.risk_debate_state;
        if debate.count >= 3 * debate.max_rounds {
            return RISK_JUDGE_NODE.to_string();
        }
        match debate.latest_speaker.as_deref() {
            Some("risky") => SAFE_NODE.to_string(),
            Some("safe") => NEUTRAL_NODE.to_string(),
            _ => RISKY_NODE.to_string(),
        }
    });
    ConditionalRouter::new(path, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{InvestmentDebateState, RiskDebateState};

    #[test]
    fn investment_debate_alternates_bull_and_bear() {
        let router = investment_debate_router();
        let mut state = AnalysisState {
            investment_debate_state: InvestmentDebateState {
                max_rounds: 2,
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(router.resolve(&state), BULL_NODE);

        state.investment_debate_state.latest_speaker = Some("bull".to_string());
        state.investment_debate_state.count = 1;
        assert_eq!(router.resolve(&state), BEAR_NODE);

        state.investment_debate_state.latest_speaker = Some("bear".to_string());
        state.investment_debate_state.count = 2;
        assert_eq!(router.resolve(&state), BULL_NODE);
    }

    #[test]
    fn investment_debate_terminates_after_threshold() {
        let router = investment_debate_router();
        let state = AnalysisState {
            investment_debate_state: InvestmentDebateState {
                max_rounds: 1,
                count: 4,
                latest_speaker: Some("bear".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(router.resolve(&state), RESEARCH_MANAGER_NODE);
    }

    #[test]
    fn risk_debate_rotates_three_ways_then_hands_to_judge() {
        let router = risk_debate_router();
        let mut state = AnalysisState {
            risk_debate_state: RiskDebateState {
                max_rounds: 1,
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(router.resolve(&state), RISKY_NODE);

        state.risk_debate_state.latest_speaker = Some("risky".to_string());
        assert_eq!(router.resolve(&state), SAFE_NODE);

        state.risk_debate_state.latest_speaker = Some("safe".to_string());
        assert_eq!(router.resolve(&state), NEUTRAL_NODE);

        state.risk_debate_state.count = 3;
        state.risk_debate_state.latest_speaker = Some("neutral".to_string());
        assert_eq!(router.resolve(&state), RISK_JUDGE_NODE);
    }
}
