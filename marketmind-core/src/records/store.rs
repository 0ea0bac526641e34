//! [`AgentRecordStore`]: the cache, lookup indices, and derived progress map
//! over a set of loaded [`AgentRecord`]s.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

use super::derive::{derive_icon, derive_internal_key, derive_node_label, derive_tool_category};
use super::load::{self, LoadError};

/// Lower bound of the analyst-stage progress band.
pub const ANALYST_PROGRESS_FLOOR: f64 = 10.0;
/// Upper bound of the analyst-stage progress band.
pub const ANALYST_PROGRESS_CEILING: f64 = 50.0;

/// Fixed, non-analyst stage anchors, in pipeline order.
const FIXED_ANCHORS: &[(&str, f64)] = &[
    ("\u{1F402} \u{770B}\u{6DA8}\u{7814}\u{7A76}\u{5458}", 51.25), // 🐂 看涨研究员
    ("\u{1F43B} \u{770B}\u{8DCC}\u{7814}\u{7A76}\u{5458}", 57.5),  // 🐻 看跌研究员
    ("\u{1F454} \u{7814}\u{7A76}\u{7ECF}\u{7406}", 70.0),          // 👔 研究经理
    ("\u{1F4BC} \u{4EA4}\u{6613}\u{5458}\u{51B3}\u{7B56}", 78.0),  // 💼 交易员决策
    ("\u{1F525} \u{6FC0}\u{8FDB}\u{98CE}\u{9669}\u{8BC4}\u{4F30}", 81.75), // 🔥 激进风险评估
    ("\u{1F6E1}\u{FE0F} \u{4FDD}\u{5B88}\u{98CE}\u{9669}\u{8BC4}\u{4F30}", 85.5), // 🛡️ 保守风险评估
    ("\u{2696}\u{FE0F} \u{4E2D}\u{6027}\u{98CE}\u{9669}\u{8BC4}\u{4F30}", 89.25), // ⚖️ 中性风险评估
    ("\u{1F3AF} \u{98CE}\u{9669}\u{7ECF}\u{7406}", 93.0),          // 🎯 风险经理
    ("\u{1F4CA} \u{751F}\u{6210}\u{62A5}\u{544A}", 97.0),          // 📊 生成报告
];

/// One validated, declarative analyst description. The only place an
/// analyst's behavior is defined; everything else (icon, node label, tool
/// category) is derived from `slug`/`name`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentRecord {
    pub slug: String,
    pub name: String,
    pub role_definition: String,
    pub description: Option<String>,
    pub when_to_use: Option<String>,
    pub groups: Vec<String>,
    /// Allow-list of tool names; `None` means every tool is available.
    pub tools: Option<Vec<String>>,
    pub internal_key: String,
    pub icon: &'static str,
    pub node_label: String,
    pub tool_category: &'static str,
}

impl AgentRecord {
    pub fn new(
        slug: String,
        name: String,
        role_definition: String,
        description: Option<String>,
        when_to_use: Option<String>,
        groups: Vec<String>,
        tools: Option<Vec<String>>,
    ) -> Self {
        let internal_key = derive_internal_key(&slug);
        let icon = derive_icon(&slug, &name);
        let node_label = derive_node_label(&internal_key);
        let tool_category = derive_tool_category(&slug, &name);
        Self {
            slug,
            name,
            role_definition,
            description,
            when_to_use,
            groups,
            tools,
            internal_key,
            icon,
            node_label,
            tool_category,
        }
    }

    /// Display name shown to the user/progress channel: `<icon> <name>`.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.icon, self.name)
    }

    /// Key under which this analyst's output lives in `AnalysisState::reports`.
    pub fn report_key(&self) -> String {
        format!("{}_report", self.internal_key)
    }
}

struct CacheEntry {
    mtime: SystemTime,
    records: Vec<AgentRecord>,
}

/// Cached, indexed view over the records loaded from one directory (or the
/// embedded defaults). Re-reads from disk only when the directory's newest
/// phase-file mtime changes.
pub struct AgentRecordStore {
    dir: Option<PathBuf>,
    cache: Mutex<Option<CacheEntry>>,
}

impl AgentRecordStore {
    /// Store backed by a configured directory; falls back to embedded
    /// defaults if the directory is missing at load time.
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self {
            dir,
            cache: Mutex::new(None),
        }
    }

    /// Store backed only by the embedded defaults (tests, or no directory configured).
    pub fn embedded() -> Self {
        Self::new(None)
    }

    fn newest_mtime(dir: &Path) -> Option<SystemTime> {
        std::fs::read_dir(dir)
            .ok()?
            .filter_map(|e| e.ok())
            .filter_map(|e| e.metadata().ok()?.modified().ok())
            .max()
    }

    /// Drops the cache; the next `records()` call re-reads from disk.
    pub fn clear_cache(&self) {
        *self.cache.lock().unwrap() = None;
    }

    /// Returns the current record set, loading or refreshing the cache as needed.
    pub fn records(&self) -> Result<Vec<AgentRecord>, LoadError> {
        let Some(dir) = &self.dir else {
            return Ok(load::default_from_embedded());
        };

        let current_mtime = Self::newest_mtime(dir);
        let mut cache = self.cache.lock().unwrap();

        if let (Some(entry), Some(mtime)) = (cache.as_ref(), current_mtime) {
            if entry.mtime == mtime {
                return Ok(entry.records.clone());
            }
        }

        let records = match load::load_dir(dir) {
            Ok(r) => r,
            Err(LoadError::DirNotFound(_)) => load::default_from_embedded(),
            Err(e) => return Err(e),
        };

        if let Some(mtime) = current_mtime {
            *cache = Some(CacheEntry {
                mtime,
                records: records.clone(),
            });
        }
        Ok(records)
    }

    pub fn by_slug(&self, slug: &str) -> Result<Option<AgentRecord>, LoadError> {
        Ok(self.records()?.into_iter().find(|r| r.slug == slug))
    }

    pub fn by_internal_key(&self, internal_key: &str) -> Result<Option<AgentRecord>, LoadError> {
        Ok(self.records()?.into_iter().find(|r| r.internal_key == internal_key))
    }

    pub fn by_display_name(&self, display_name: &str) -> Result<Option<AgentRecord>, LoadError> {
        Ok(self.records()?.into_iter().find(|r| r.display_name() == display_name))
    }

    /// Node-label -> display-name map, for every known record.
    pub fn node_label_to_display_name(&self) -> Result<HashMap<String, String>, LoadError> {
        Ok(self
            .records()?
            .into_iter()
            .map(|r| (r.node_label.clone(), r.display_name()))
            .collect())
    }

    /// Display-name -> percent map for a run: the analyst band [10, 50] is
    /// split evenly across `enabled_slugs` (or every known analyst if empty),
    /// then the fixed non-analyst anchors are appended.
    pub fn progress_percent_map(&self, enabled_slugs: &[String]) -> Result<HashMap<String, f64>, LoadError> {
        let all = self.records()?;
        let selected: Vec<&AgentRecord> = if enabled_slugs.is_empty() {
            all.iter().collect()
        } else {
            all.iter().filter(|r| enabled_slugs.iter().any(|s| s == &r.slug)).collect()
        };

        let mut map = HashMap::new();
        let band = ANALYST_PROGRESS_CEILING - ANALYST_PROGRESS_FLOOR;
        let n = selected.len().max(1) as f64;
        let step = band / n;
        for (i, record) in selected.iter().enumerate() {
            let percent = ANALYST_PROGRESS_FLOOR + step * (i as f64 + 1.0);
            map.insert(record.display_name(), percent);
        }
        for (name, percent) in FIXED_ANCHORS {
            map.insert(name.to_string(), *percent);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record(slug: &str, name: &str) -> AgentRecord {
        AgentRecord::new(
            slug.to_string(),
            name.to_string(),
            "do the thing".to_string(),
            None,
            None,
            vec![],
            None,
        )
    }

    #[test]
    fn embedded_store_serves_default_records() {
        let store = AgentRecordStore::embedded();
        let records = store.records().unwrap();
        assert!(!records.is_empty());
        assert!(store.by_slug("market-analyst").unwrap().is_some());
    }

    #[test]
    fn lookup_by_internal_key_and_display_name() {
        let store = AgentRecordStore::embedded();
        let market = store.by_internal_key("market").unwrap().unwrap();
        assert_eq!(market.slug, "market-analyst");
        let by_display = store.by_display_name(&market.display_name()).unwrap().unwrap();
        assert_eq!(by_display.slug, "market-analyst");
    }

    #[test]
    fn progress_percent_map_splits_band_and_includes_anchors() {
        let store = AgentRecordStore::embedded();
        let map = store.progress_percent_map(&[]).unwrap();
        assert!(map.values().all(|&v| v >= ANALYST_PROGRESS_FLOOR && v <= 100.0));
        assert!(map.contains_key("\u{1F3AF} \u{98CE}\u{9669}\u{7ECF}\u{7406}"));
    }

    #[test]
    fn progress_percent_map_with_two_enabled_analysts_splits_evenly() {
        let store = AgentRecordStore::embedded();
        let enabled = vec!["market-analyst".to_string(), "news-analyst".to_string()];
        let map = store.progress_percent_map(&enabled).unwrap();
        let market_record = store.by_slug("market-analyst").unwrap().unwrap();
        let news_record = store.by_slug("news-analyst").unwrap().unwrap();
        assert_eq!(map[&market_record.display_name()], 30.0);
        assert_eq!(map[&news_record.display_name()], 50.0);
    }

    #[test]
    fn cache_reused_when_mtime_unchanged() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("phase1_agents_config.yaml"),
            "customModes:\n  - slug: a\n    name: A\n    roleDefinition: do a\n",
        )
        .unwrap();
        let store = AgentRecordStore::new(Some(temp.path().to_path_buf()));
        let first = store.records().unwrap();
        let second = store.records().unwrap();
        assert_eq!(first.len(), second.len());
    }

    #[test]
    fn report_key_matches_internal_key_suffix() {
        let record = sample_record("custom-analyst", "Custom");
        assert_eq!(record.report_key(), "custom_report");
    }
}
