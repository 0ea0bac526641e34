//! Loads `customModes` YAML phase files (`phase{1..4}_agents_config.yaml`)
//! from a directory, validating each record.
//!
//! **Canonical source**: default records live in
//! `marketmind-core/records/phase1_agents_config.yaml`, embedded at compile
//! time and used when `AGENT_CONFIG_DIR` is unset and no directory is passed.

use std::path::Path;

use serde::Deserialize;

use super::store::AgentRecord;

const EMBEDDED_DEFAULT: &str = include_str!("../../records/phase1_agents_config.yaml");

const PHASE_FILES: &[&str] = &[
    "phase1_agents_config.yaml",
    "phase2_agents_config.yaml",
    "phase3_agents_config.yaml",
    "phase4_agents_config.yaml",
];

/// Default directory name when `AGENT_CONFIG_DIR` is not set.
const DEFAULT_RECORDS_DIR: &str = "records";

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("agent record directory not found or not readable: {0}")]
    DirNotFound(String),
    #[error("failed to read {path}: {message}")]
    ReadFile { path: String, message: String },
    #[error("failed to parse YAML in {path}: {message}")]
    ParseYaml { path: String, message: String },
    #[error("invalid record in {path}: {message}")]
    InvalidRecord { path: String, message: String },
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    slug: String,
    name: String,
    #[serde(rename = "roleDefinition")]
    role_definition: String,
    description: Option<String>,
    #[serde(rename = "whenToUse")]
    when_to_use: Option<String>,
    #[serde(default)]
    groups: Vec<String>,
    tools: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct RecordsFile {
    #[serde(default, rename = "customModes")]
    custom_modes: Vec<RawRecord>,
}

/// Role prompt length cap, matching the upstream config router's limit.
const MAX_ROLE_PROMPT_LEN: usize = 20_000;

fn validate(raw: RawRecord, path: &str) -> Result<AgentRecord, LoadError> {
    let slug = raw.slug.trim().to_string();
    let name = raw.name.trim().to_string();
    let role_definition = raw.role_definition.trim().to_string();

    if slug.is_empty() {
        return Err(LoadError::InvalidRecord {
            path: path.to_string(),
            message: "slug must not be empty".to_string(),
        });
    }
    if name.is_empty() {
        return Err(LoadError::InvalidRecord {
            path: path.to_string(),
            message: format!("record {slug}: name must not be empty"),
        });
    }
    if role_definition.is_empty() {
        return Err(LoadError::InvalidRecord {
            path: path.to_string(),
            message: format!("record {slug}: roleDefinition must not be empty"),
        });
    }
    if role_definition.len() > MAX_ROLE_PROMPT_LEN {
        return Err(LoadError::InvalidRecord {
            path: path.to_string(),
            message: format!("record {slug}: roleDefinition exceeds {MAX_ROLE_PROMPT_LEN} chars"),
        });
    }

    let tools = raw.tools.map(|list| {
        let mut seen = std::collections::HashSet::new();
        list.into_iter().filter(|t| seen.insert(t.clone())).collect()
    });

    Ok(AgentRecord::new(
        slug,
        name,
        role_definition,
        raw.description,
        raw.when_to_use,
        raw.groups,
        tools,
    ))
}

fn parse_file(content: &str, path: &str) -> Result<Vec<AgentRecord>, LoadError> {
    let file: RecordsFile = serde_yaml::from_str(content).map_err(|e| LoadError::ParseYaml {
        path: path.to_string(),
        message: e.to_string(),
    })?;

    let mut seen_slugs = std::collections::HashSet::new();
    let mut records = Vec::with_capacity(file.custom_modes.len());
    for raw in file.custom_modes {
        let record = validate(raw, path)?;
        if !seen_slugs.insert(record.slug.clone()) {
            return Err(LoadError::InvalidRecord {
                path: path.to_string(),
                message: format!("duplicate slug in file: {}", record.slug),
            });
        }
        records.push(record);
    }
    Ok(records)
}

/// Loads every present phase file under `dir`, concatenating records in
/// phase order. Missing files are skipped (not every deployment defines all
/// four phases); a present-but-invalid file is an error.
pub fn load_dir(dir: &Path) -> Result<Vec<AgentRecord>, LoadError> {
    if !dir.exists() || !dir.is_dir() {
        return Err(LoadError::DirNotFound(dir.display().to_string()));
    }

    let mut all = Vec::new();
    for file_name in PHASE_FILES {
        let path = dir.join(file_name);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => {
                return Err(LoadError::ReadFile {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })
            }
        };
        all.extend(parse_file(&content, &path.display().to_string())?);
    }
    Ok(all)
}

/// Parses the embedded default records. Used when no directory is configured
/// and as the store's guaranteed-available fallback.
pub fn default_from_embedded() -> Vec<AgentRecord> {
    parse_file(EMBEDDED_DEFAULT, "<embedded phase1_agents_config.yaml>")
        .expect("embedded default agent records must parse")
}
