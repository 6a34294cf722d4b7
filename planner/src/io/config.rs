//! Planner configuration stored as TOML (default `planner.toml`).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::negotiation::StrategyKind;
use crate::plan::PlannerOptions;

/// Planner configuration (TOML).
///
/// Supplies the defaults that per-request `options` override. Missing fields
/// take the built-in defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PlannerConfig {
    /// Hard cap on scheduling cycles per planning call.
    pub max_iterations: u32,

    /// Wall-clock safety limit per planning call, in milliseconds.
    pub deliberation_timeout_ms: u64,

    /// When false the scheduler always breaks ties by agent index.
    pub enable_negotiation: bool,

    pub negotiation_strategy: StrategyKind,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        let options = PlannerOptions::default();
        Self {
            max_iterations: options.max_iterations,
            deliberation_timeout_ms: options.deliberation_timeout_ms,
            enable_negotiation: options.enable_negotiation,
            negotiation_strategy: options.negotiation_strategy,
        }
    }
}

impl PlannerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(anyhow!("max_iterations must be > 0"));
        }
        if self.deliberation_timeout_ms == 0 {
            return Err(anyhow!("deliberation_timeout_ms must be > 0"));
        }
        Ok(())
    }

    pub fn planner_options(&self) -> PlannerOptions {
        PlannerOptions {
            max_iterations: self.max_iterations,
            deliberation_timeout_ms: self.deliberation_timeout_ms,
            enable_negotiation: self.enable_negotiation,
            negotiation_strategy: self.negotiation_strategy,
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `PlannerConfig::default()`.
pub fn load_config(path: &Path) -> Result<PlannerConfig> {
    if !path.exists() {
        return Ok(PlannerConfig::default());
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: PlannerConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &PlannerConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
