use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Configuration for a [`crate::drain::Drain`] instance.
///
/// Every field has a serde default so a partial (or empty) TOML document
/// deserializes to sane values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateMinerConfig {
    /// Depth of the prefix tree (`max_node_depth = drain_depth - 2`). Must be >= 3.
    #[serde(default = "default_drain_depth")]
    pub drain_depth: usize,
    /// Similarity threshold below which a new cluster is created instead of a match.
    #[serde(default = "default_drain_sim_th")]
    pub drain_sim_th: f64,
    /// Maximum number of children per tree node.
    #[serde(default = "default_drain_max_children")]
    pub drain_max_children: usize,
    /// Maximum number of live clusters kept in the LRU store. 0 means unbounded.
    #[serde(default)]
    pub drain_max_clusters: usize,
    /// Substrings replaced with a single space before tokenization.
    #[serde(default)]
    pub drain_extra_delimiters: Vec<String>,
    /// The wildcard token used in generalized templates.
    #[serde(default = "default_param_string")]
    pub param_string: String,
    /// Whether tokens containing a digit are routed straight to the wildcard child.
    #[serde(default = "default_parametrize_numeric_tokens")]
    pub parametrize_numeric_tokens: bool,
}

fn default_drain_depth() -> usize {
    4
}
fn default_drain_sim_th() -> f64 {
    0.4
}
fn default_drain_max_children() -> usize {
    100
}
fn default_param_string() -> String {
    "<*>".to_string()
}
fn default_parametrize_numeric_tokens() -> bool {
    true
}

impl Default for TemplateMinerConfig {
    fn default() -> Self {
        Self {
            drain_depth: default_drain_depth(),
            drain_sim_th: default_drain_sim_th(),
            drain_max_children: default_drain_max_children(),
            drain_max_clusters: 0,
            drain_extra_delimiters: Vec::new(),
            param_string: default_param_string(),
            parametrize_numeric_tokens: default_parametrize_numeric_tokens(),
        }
    }
}

impl TemplateMinerConfig {
    /// Load configuration from a TOML file on disk.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file at {path}"))?;
        Self::parse(&content)
    }

    /// Parse configuration from an in-memory TOML document.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("failed to parse template miner config as TOML")
    }
}
