//! Application-level settings read from the environment (after
//! [`crate::load_and_apply`] has run) and the MCP servers JSON config file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Directory containing `phase{1..4}_agents_config.yaml`. Defaults to
/// `"records"` relative to the working directory.
pub fn agent_config_dir() -> PathBuf {
    std::env::var("AGENT_CONFIG_DIR").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("records"))
}

/// Tie-break data source name for the China-market provider orchestrator,
/// read from `DEFAULT_CHINA_DATA_SOURCE`. `None` when unset — the
/// orchestrator then falls back to each adapter's built-in default.
pub fn default_china_data_source() -> Option<String> {
    std::env::var("DEFAULT_CHINA_DATA_SOURCE").ok().filter(|s| !s.trim().is_empty())
}

/// One entry in the MCP servers config file: a named external tool server,
/// launched over stdio (`command`/`args`/`env`) or reached over
/// streamable-HTTP/SSE (`url`). `name` is filled in from the enclosing map
/// key, not read from the entry body.
#[derive(Clone, Debug, Deserialize)]
pub struct McpServerConfig {
    #[serde(skip)]
    pub name: String,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub transport: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_enabled() -> bool {
    true
}

/// `{"mcpServers": {name -> {command,args,env,url,transport,enabled}}}`.
#[derive(Debug, Deserialize)]
struct McpServersFile {
    #[serde(default, rename = "mcpServers")]
    mcp_servers: HashMap<String, McpServerConfig>,
}

/// Path to the MCP servers JSON config file, from `MCP_SERVERS_CONFIG`.
/// `None` when unset — the MCP bridge then starts with no configured servers.
pub fn mcp_servers_config_path() -> Option<PathBuf> {
    std::env::var("MCP_SERVERS_CONFIG").ok().map(PathBuf::from)
}

#[derive(Debug, thiserror::Error)]
pub enum McpConfigError {
    #[error("read {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("parse {0}: {1}")]
    Parse(PathBuf, serde_json::Error),
}

/// Loads the MCP servers list from `path`, or returns an empty list if
/// `path` is `None`. Server name is taken from the JSON map key.
pub fn load_mcp_servers(path: Option<&Path>) -> Result<Vec<McpServerConfig>, McpConfigError> {
    let Some(path) = path else { return Ok(vec![]) };
    let content = std::fs::read_to_string(path).map_err(|e| McpConfigError::Read(path.to_path_buf(), e))?;
    let parsed: McpServersFile =
        serde_json::from_str(&content).map_err(|e| McpConfigError::Parse(path.to_path_buf(), e))?;
    let mut servers: Vec<McpServerConfig> = parsed
        .mcp_servers
        .into_iter()
        .map(|(name, mut cfg)| {
            cfg.name = name;
            cfg
        })
        .collect();
    servers.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(servers)
}
