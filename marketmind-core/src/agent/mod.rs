//! Agent Graph Controller: the analyst -> debate -> risk -> summary pipeline.
//!
//! [`generic`] holds Stage A (one [`traits::Agent`](crate::traits::Agent) per
//! enabled analyst record), [`debate`] Stage B, [`risk`] Stage C, [`summary`]
//! Stage D, [`routing`] the conditional edges between B and C's nodes, and
//! [`controller`] wires all of it into one [`crate::graph::StateGraph`].

mod controller;
mod debate;
mod generic;
mod risk;
mod routing;
mod summary;

pub use controller::AgentGraphController;
pub use debate::{BearResearcherAgent, BullResearcherAgent, ResearchManagerAgent};
pub use generic::GenericAgent;
pub use risk::{NeutralAnalystAgent, RiskJudgeAgent, RiskyAnalystAgent, SafeAnalystAgent};
pub use routing::{investment_debate_router, risk_debate_router};
pub use summary::StructuredSummaryAgent;
