//! Run configuration summary: aggregates LLM, memory, tools, and embedding
//! config into one printable structure (used for `--verbose` / startup logging).

use std::fmt;

/// Where a config value came from, for display next to the value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunConfigSummarySource {
    /// Read from an environment variable.
    Env,
    /// Fell back to a built-in default.
    Default,
    /// Set explicitly by the caller (e.g. CLI flag, builder call).
    Explicit,
}

impl fmt::Display for RunConfigSummarySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Env => write!(f, "env"),
            Self::Default => write!(f, "default"),
            Self::Explicit => write!(f, "explicit"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct LlmConfigSummary {
    pub provider: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub source: RunConfigSummarySource,
}

#[derive(Clone, Debug)]
pub struct MemoryConfigSummary {
    pub checkpointer: String,
    pub store: String,
    pub source: RunConfigSummarySource,
}

#[derive(Clone, Debug)]
pub struct ToolConfigSummary {
    pub registered_count: usize,
    pub mcp_server_count: usize,
    pub source: RunConfigSummarySource,
}

#[derive(Clone, Debug)]
pub struct EmbeddingConfigSummary {
    pub model: Option<String>,
    pub source: RunConfigSummarySource,
}

/// One labelled section of the summary, as printed.
#[derive(Clone, Debug)]
pub struct ConfigSection {
    pub title: String,
    pub lines: Vec<String>,
}

impl fmt::Display for ConfigSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        for line in &self.lines {
            writeln!(f, "  {line}")?;
        }
        Ok(())
    }
}

/// Full run configuration summary, assembled from the four sub-summaries.
#[derive(Clone, Debug)]
pub struct RunConfigSummary {
    pub llm: LlmConfigSummary,
    pub memory: MemoryConfigSummary,
    pub tools: ToolConfigSummary,
    pub embedding: EmbeddingConfigSummary,
}

impl RunConfigSummary {
    pub fn sections(&self) -> Vec<ConfigSection> {
        vec![
            ConfigSection {
                title: "llm".to_string(),
                lines: vec![
                    format!("provider={} ({})", self.llm.provider, self.llm.source),
                    format!("model={}", self.llm.model),
                    format!("temperature={:?}", self.llm.temperature),
                ],
            },
            ConfigSection {
                title: "memory".to_string(),
                lines: vec![
                    format!("checkpointer={} ({})", self.memory.checkpointer, self.memory.source),
                    format!("store={}", self.memory.store),
                ],
            },
            ConfigSection {
                title: "tools".to_string(),
                lines: vec![
                    format!("registered={}", self.tools.registered_count),
                    format!("mcp_servers={}", self.tools.mcp_server_count),
                ],
            },
            ConfigSection {
                title: "embedding".to_string(),
                lines: vec![format!(
                    "model={} ({})",
                    self.embedding.model.as_deref().unwrap_or("none"),
                    self.embedding.source
                )],
            },
        ]
    }
}

impl fmt::Display for RunConfigSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for section in self.sections() {
            write!(f, "{section}")?;
        }
        Ok(())
    }
}

/// Builds a summary from the pieces callers already have on hand at startup.
#[allow(clippy::too_many_arguments)]
pub fn build_config_summary(
    llm: LlmConfigSummary,
    memory: MemoryConfigSummary,
    tools: ToolConfigSummary,
    embedding: EmbeddingConfigSummary,
) -> RunConfigSummary {
    RunConfigSummary {
        llm,
        memory,
        tools,
        embedding,
    }
}
