//! SQLite-backed durable store for `analysis_tasks` and `analysis_reports`,
//! fronted by an in-memory table for tasks still resident in the process.
//!
//! Mirrors the blocking-call-under-a-lock pattern used elsewhere in this
//! workspace for rusqlite access: `tokio::task::block_in_place` plus a
//! `Mutex<Connection>`, so async callers never block the scheduler on I/O
//! that rusqlite can't do non-blockingly.

use std::path::Path;
use std::sync::{Arc, Mutex};

use dashmap::DashMap;

use crate::error::TaskError;
use crate::model::{AnalysisTask, HistoryFilter, HistoryPage, TaskStatus};

pub struct TaskStore {
    mem: DashMap<String, AnalysisTask>,
    db: Arc<Mutex<rusqlite::Connection>>,
}

impl TaskStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, TaskError> {
        let conn = rusqlite::Connection::open(path.as_ref())
            .map_err(|e| TaskError::Storage(e.to_string()))?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS analysis_tasks (
                task_id TEXT PRIMARY KEY,
                user_id TEXT,
                symbol TEXT NOT NULL,
                market TEXT,
                status TEXT NOT NULL,
                progress REAL NOT NULL DEFAULT 0,
                current_step TEXT,
                progress_seq INTEGER NOT NULL DEFAULT 0,
                cancel_requested INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                started_at TEXT,
                completed_at TEXT,
                last_error TEXT,
                result TEXT,
                params TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS analysis_reports (
                task_id TEXT PRIMARY KEY,
                report TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_tasks_user ON analysis_tasks(user_id);
            CREATE INDEX IF NOT EXISTS idx_tasks_status ON analysis_tasks(status);
            CREATE INDEX IF NOT EXISTS idx_tasks_symbol ON analysis_tasks(symbol);
            "#,
        )
        .map_err(|e| TaskError::Storage(e.to_string()))?;
        Ok(Self {
            mem: DashMap::new(),
            db: Arc::new(Mutex::new(conn)),
        })
    }

    fn row_to_task(row: &rusqlite::Row) -> rusqlite::Result<AnalysisTask> {
        let status: String = row.get("status")?;
        let params: String = row.get("params")?;
        let result: Option<String> = row.get("result")?;
        Ok(AnalysisTask {
            task_id: row.get("task_id")?,
            user_id: row.get("user_id")?,
            symbol: row.get("symbol")?,
            market: row.get("market")?,
            params: serde_json::from_str(&params).unwrap_or(serde_json::Value::Null),
            status: TaskStatus::parse(&status).unwrap_or(TaskStatus::Failed),
            progress: row.get("progress")?,
            current_step: row.get("current_step")?,
            progress_seq: row.get::<_, i64>("progress_seq")? as u64,
            cancel_requested: row.get::<_, i64>("cancel_requested")? != 0,
            created_at: row.get("created_at")?,
            started_at: row.get("started_at")?,
            completed_at: row.get("completed_at")?,
            last_error: row.get("last_error")?,
            result: result.and_then(|s| serde_json::from_str(&s).ok()),
        })
    }

    fn persist(&self, task: &AnalysisTask) -> Result<(), TaskError> {
        let db = self.db.clone();
        let task = task.clone();
        tokio_block(move || {
            let conn = db.lock().map_err(|_| TaskError::Storage("lock poisoned".into()))?;
            conn.execute(
                "INSERT INTO analysis_tasks
                    (task_id, user_id, symbol, market, status, progress, current_step,
                     progress_seq, cancel_requested, created_at, started_at, completed_at,
                     last_error, result, params)
                 VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15)
                 ON CONFLICT(task_id) DO UPDATE SET
                    status=excluded.status, progress=excluded.progress,
                    current_step=excluded.current_step, progress_seq=excluded.progress_seq,
                    cancel_requested=excluded.cancel_requested, started_at=excluded.started_at,
                    completed_at=excluded.completed_at, last_error=excluded.last_error,
                    result=excluded.result",
                rusqlite::params![
                    task.task_id,
                    task.user_id,
                    task.symbol,
                    task.market,
                    task.status.as_str(),
                    task.progress,
                    task.current_step,
                    task.progress_seq as i64,
                    task.cancel_requested as i64,
                    task.created_at,
                    task.started_at,
                    task.completed_at,
                    task.last_error,
                    task.result.as_ref().map(|v| v.to_string()),
                    task.params.to_string(),
                ],
            )
            .map_err(|e| TaskError::Storage(e.to_string()))?;
            Ok(())
        })
    }

    pub fn insert(&self, task: AnalysisTask) -> Result<(), TaskError> {
        self.persist(&task)?;
        self.mem.insert(task.task_id.clone(), task);
        Ok(())
    }

    /// Applies a progress update, dropping it if `seq` is not newer than the
    /// last-recorded sequence for an already-terminal task (late update).
    pub fn update_progress(&self, task_id: &str, node_display_name: &str, percent: f64, seq: u64) -> Result<(), TaskError> {
        let Some(mut entry) = self.mem.get_mut(task_id) else {
            return Err(TaskError::NotFound(task_id.to_string()));
        };
        if entry.status.is_terminal() || seq <= entry.progress_seq {
            return Ok(());
        }
        entry.progress_seq = seq;
        entry.progress = percent;
        entry.current_step = Some(node_display_name.to_string());
        if entry.status == TaskStatus::Pending {
            entry.status = TaskStatus::Running;
            entry.started_at = Some(chrono::Utc::now());
        }
        let snapshot = entry.clone();
        drop(entry);
        // Debounced durable write: every 5th update or any update past the
        // halfway mark, so the document store doesn't take a write per node.
        if snapshot.progress_seq % 5 == 0 || snapshot.progress >= 50.0 {
            self.persist(&snapshot)?;
        }
        Ok(())
    }

    pub fn set_terminal(&self, task_id: &str, status: TaskStatus, last_error: Option<String>, result: Option<serde_json::Value>) -> Result<(), TaskError> {
        let Some(mut entry) = self.mem.get_mut(task_id) else {
            return Err(TaskError::NotFound(task_id.to_string()));
        };
        entry.status = status;
        entry.last_error = last_error;
        entry.result = result;
        entry.completed_at = Some(chrono::Utc::now());
        entry.progress = if status == TaskStatus::Completed { 100.0 } else { entry.progress };
        let snapshot = entry.clone();
        drop(entry);
        self.persist(&snapshot)
    }

    pub fn request_cancel(&self, task_id: &str) -> Result<(), TaskError> {
        let Some(mut entry) = self.mem.get_mut(task_id) else {
            return Err(TaskError::NotFound(task_id.to_string()));
        };
        entry.cancel_requested = true;
        Ok(())
    }

    pub fn is_cancel_requested(&self, task_id: &str) -> bool {
        self.mem.get(task_id).map(|t| t.cancel_requested).unwrap_or(false)
    }

    /// Layered read: in-memory, else `analysis_tasks`.
    pub fn get(&self, task_id: &str) -> Result<Option<AnalysisTask>, TaskError> {
        if let Some(t) = self.mem.get(task_id) {
            return Ok(Some(t.clone()));
        }
        self.load_from_db(task_id)
    }

    fn load_from_db(&self, task_id: &str) -> Result<Option<AnalysisTask>, TaskError> {
        let db = self.db.clone();
        let task_id = task_id.to_string();
        tokio_block(move || {
            let conn = db.lock().map_err(|_| TaskError::Storage("lock poisoned".into()))?;
            conn.query_row(
                "SELECT * FROM analysis_tasks WHERE task_id = ?1",
                rusqlite::params![task_id],
                Self::row_to_task,
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                e => Err(TaskError::Storage(e.to_string())),
            })
        })
    }

    pub fn write_report(&self, task_id: &str, report: serde_json::Value) -> Result<(), TaskError> {
        let db = self.db.clone();
        let task_id = task_id.to_string();
        tokio_block(move || {
            let conn = db.lock().map_err(|_| TaskError::Storage("lock poisoned".into()))?;
            conn.execute(
                "INSERT INTO analysis_reports (task_id, report) VALUES (?1, ?2)
                 ON CONFLICT(task_id) DO UPDATE SET report=excluded.report",
                rusqlite::params![task_id, report.to_string()],
            )
            .map_err(|e| TaskError::Storage(e.to_string()))?;
            Ok(())
        })
    }

    pub fn get_report(&self, task_id: &str) -> Result<Option<serde_json::Value>, TaskError> {
        let db = self.db.clone();
        let task_id = task_id.to_string();
        tokio_block(move || {
            let conn = db.lock().map_err(|_| TaskError::Storage("lock poisoned".into()))?;
            conn.query_row(
                "SELECT report FROM analysis_reports WHERE task_id = ?1",
                rusqlite::params![task_id],
                |row| row.get::<_, String>(0),
            )
            .map(|s| serde_json::from_str(&s).ok())
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                e => Err(TaskError::Storage(e.to_string())),
            })
        })
    }

    pub fn delete(&self, task_id: &str) -> Result<(), TaskError> {
        self.mem.remove(task_id);
        let db = self.db.clone();
        let task_id = task_id.to_string();
        tokio_block(move || {
            let conn = db.lock().map_err(|_| TaskError::Storage("lock poisoned".into()))?;
            conn.execute("DELETE FROM analysis_tasks WHERE task_id = ?1", rusqlite::params![task_id])
                .map_err(|e| TaskError::Storage(e.to_string()))?;
            conn.execute("DELETE FROM analysis_reports WHERE task_id = ?1", rusqlite::params![task_id])
                .map_err(|e| TaskError::Storage(e.to_string()))?;
            Ok(())
        })
    }

    /// Force-transitions every running-like task older than `max_running_hours`
    /// to failed. Returns the count reclaimed.
    pub fn reclaim_zombies(&self, max_running_hours: u32) -> Result<u64, TaskError> {
        let cutoff = chrono::Utc::now() - chrono::Duration::hours(max_running_hours as i64);
        let db = self.db.clone();
        let ids: Vec<String> = {
            let cutoff = cutoff;
            let db = db.clone();
            tokio_block(move || {
                let conn = db.lock().map_err(|_| TaskError::Storage("lock poisoned".into()))?;
                let mut stmt = conn
                    .prepare(
                        "SELECT task_id FROM analysis_tasks
                         WHERE status IN ('pending','running','processing') AND started_at IS NOT NULL AND started_at < ?1",
                    )
                    .map_err(|e| TaskError::Storage(e.to_string()))?;
                let rows = stmt
                    .query_map(rusqlite::params![cutoff], |row| row.get::<_, String>(0))
                    .map_err(|e| TaskError::Storage(e.to_string()))?;
                rows.collect::<Result<Vec<_>, _>>().map_err(|e| TaskError::Storage(e.to_string()))
            })?
        };
        for id in &ids {
            self.mem.remove(id);
            let db = db.clone();
            let id = id.clone();
            tokio_block(move || {
                let conn = db.lock().map_err(|_| TaskError::Storage("lock poisoned".into()))?;
                conn.execute(
                    "UPDATE analysis_tasks SET status='failed', last_error='marked failed by reclamation', completed_at=?1 WHERE task_id=?2",
                    rusqlite::params![chrono::Utc::now(), id],
                )
                .map_err(|e| TaskError::Storage(e.to_string()))?;
                Ok(())
            })?;
        }
        Ok(ids.len() as u64)
    }

    /// Filtered, paginated history query with filter push-down into SQL (no
    /// whole-collection scan).
    pub fn list_history(&self, filter: &HistoryFilter) -> Result<HistoryPage, TaskError> {
        let page = filter.page.unwrap_or(1).max(1);
        let page_size = filter.page_size.unwrap_or(20).clamp(1, 200);
        let offset = (page - 1) as i64 * page_size as i64;

        let mut clauses = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(ref u) = filter.user_id {
            clauses.push("user_id = ?");
            params.push(Box::new(u.clone()));
        }
        if let Some(status) = filter.status {
            clauses.push("status = ?");
            params.push(Box::new(status.as_str().to_string()));
        }
        if let Some(ref s) = filter.symbol {
            clauses.push("symbol = ?");
            params.push(Box::new(s.clone()));
        }
        if let Some(ref m) = filter.market {
            clauses.push("market = ?");
            params.push(Box::new(m.clone()));
        }
        if let Some(from) = filter.from {
            clauses.push("created_at >= ?");
            params.push(Box::new(from));
        }
        if let Some(to) = filter.to {
            clauses.push("created_at <= ?");
            params.push(Box::new(to));
        }
        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let db = self.db.clone();
        let count_sql = format!("SELECT COUNT(*) FROM analysis_tasks {}", where_sql);
        let list_sql = format!(
            "SELECT * FROM analysis_tasks {} ORDER BY created_at DESC LIMIT ? OFFSET ?",
            where_sql
        );
        tokio_block(move || {
            let conn = db.lock().map_err(|_| TaskError::Storage("lock poisoned".into()))?;
            let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|b| b.as_ref()).collect();

            let total: i64 = conn
                .query_row(&count_sql, param_refs.as_slice(), |row| row.get(0))
                .map_err(|e| TaskError::Storage(e.to_string()))?;

            let mut list_params = param_refs;
            list_params.push(&page_size);
            list_params.push(&offset);
            let mut stmt = conn.prepare(&list_sql).map_err(|e| TaskError::Storage(e.to_string()))?;
            let rows = stmt
                .query_map(list_params.as_slice(), Self::row_to_task)
                .map_err(|e| TaskError::Storage(e.to_string()))?;
            let items = rows.collect::<Result<Vec<_>, _>>().map_err(|e| TaskError::Storage(e.to_string()))?;
            Ok(HistoryPage { items, total, page, page_size })
        })
    }
}

/// Runs a blocking rusqlite closure from async context without stalling the
/// scheduler for other tasks on the same worker thread.
fn tokio_block<F, T>(f: F) -> Result<T, TaskError>
where
    F: FnOnce() -> Result<T, TaskError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::block_in_place(f)
}
