//! Task records and the result shape produced by hydration (C8).

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// Whether the reclamation pass and the cancel/mark-failed endpoints treat
    /// this status as still in flight.
    pub fn is_running_like(self) -> bool {
        matches!(self, Self::Pending | Self::Running | Self::Processing)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "pending" => Self::Pending,
            "running" => Self::Running,
            "processing" => Self::Processing,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "cancelled" => Self::Cancelled,
            _ => return None,
        })
    }
}

/// One analysis task, as persisted in `analysis_tasks` and held in-memory
/// while running.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalysisTask {
    pub task_id: String,
    pub user_id: Option<String>,
    pub symbol: String,
    pub market: Option<String>,
    pub params: serde_json::Value,
    pub status: TaskStatus,
    pub progress: f64,
    pub current_step: Option<String>,
    /// Monotonic sequence number for progress updates; a late update with a
    /// lower seq than what's recorded is dropped.
    pub progress_seq: u64,
    pub cancel_requested: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub last_error: Option<String>,
    /// Embedded final result once available, mirrored into `analysis_reports`
    /// once the report document is written.
    pub result: Option<serde_json::Value>,
}

impl AnalysisTask {
    pub fn new(task_id: String, user_id: Option<String>, symbol: String, market: Option<String>, params: serde_json::Value) -> Self {
        Self {
            task_id,
            user_id,
            symbol,
            market,
            params,
            status: TaskStatus::Pending,
            progress: 0.0,
            current_step: None,
            progress_seq: 0,
            cancel_requested: false,
            created_at: chrono::Utc::now(),
            started_at: None,
            completed_at: None,
            last_error: None,
            result: None,
        }
    }

    pub fn elapsed_seconds(&self) -> Option<i64> {
        let start = self.started_at?;
        let end = self.completed_at.unwrap_or_else(chrono::Utc::now);
        Some((end - start).num_seconds())
    }
}

/// Filters accepted by the user history query. All fields are optional and
/// are pushed down into the durable store's query rather than applied after
/// a whole-collection scan.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct HistoryFilter {
    pub user_id: Option<String>,
    pub status: Option<TaskStatus>,
    pub symbol: Option<String>,
    pub market: Option<String>,
    pub from: Option<chrono::DateTime<chrono::Utc>>,
    pub to: Option<chrono::DateTime<chrono::Utc>>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct HistoryPage {
    pub items: Vec<AnalysisTask>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
}

/// Status lookup shape for `GET /analysis/tasks/{id}/status`.
#[derive(Debug, Serialize)]
pub struct StatusView {
    pub status: String,
    pub progress: f64,
    pub current_step: Option<String>,
    pub elapsed_time: Option<i64>,
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,
    pub last_error: Option<String>,
}

/// Uniform result object produced by the hydrator (C8), regardless of which
/// backing store actually held the data.
#[derive(Debug, Default, Serialize)]
pub struct HydratedResult {
    pub task_id: String,
    pub symbol: String,
    pub reports: std::collections::BTreeMap<String, String>,
    pub recommendation: String,
    pub summary: String,
    pub key_points: Vec<String>,
    pub final_trade_decision: String,
}
