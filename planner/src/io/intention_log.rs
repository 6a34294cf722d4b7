//! Intention-log persistence for a planning run.
//!
//! Layout under the chosen log directory:
//!
//! ```text
//! <dir>/report.json
//! <dir>/cycles/<n>/cycle.json
//! <dir>/cycles/<n>/stacks.before.json
//! <dir>/cycles/<n>/stacks.after.json
//! ```
//!
//! Tracing output is diagnostics; these files are the product artifact the
//! execution layer (or a human) replays.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;

use crate::core::scheduler::CycleEntry;
use crate::core::types::Block;
use crate::plan::PlanReport;

#[derive(Debug, Clone)]
pub struct CyclePaths {
    pub dir: PathBuf,
    pub entry_path: PathBuf,
    pub stacks_before_path: PathBuf,
    pub stacks_after_path: PathBuf,
}

impl CyclePaths {
    pub fn new(root: &Path, cycle: u32) -> Self {
        let dir = root.join("cycles").join(cycle.to_string());
        Self {
            dir: dir.clone(),
            entry_path: dir.join("cycle.json"),
            stacks_before_path: dir.join("stacks.before.json"),
            stacks_after_path: dir.join("stacks.after.json"),
        }
    }
}

pub fn report_path(root: &Path) -> PathBuf {
    root.join("report.json")
}

/// Write one cycle's entry with the stacks on either side of it.
pub fn write_cycle(
    root: &Path,
    entry: &CycleEntry,
    stacks_before: &[Vec<Block>],
) -> Result<CyclePaths> {
    let paths = CyclePaths::new(root, entry.cycle);
    fs::create_dir_all(&paths.dir)
        .with_context(|| format!("create cycle dir {}", paths.dir.display()))?;

    write_json(&paths.entry_path, entry)?;
    write_json(&paths.stacks_before_path, &stacks_before)?;
    write_json(&paths.stacks_after_path, &entry.stacks)?;
    Ok(paths)
}

/// Write the whole run: every cycle of the intention log, then the report.
///
/// `initial` are the stacks the run started from (after any edits).
pub fn write_run(root: &Path, initial: &[Vec<Block>], report: &PlanReport) -> Result<PathBuf> {
    fs::create_dir_all(root).with_context(|| format!("create log dir {}", root.display()))?;
    let mut before = initial.to_vec();
    for entry in &report.intention_log {
        write_cycle(root, entry, &before)?;
        before.clone_from(&entry.stacks);
    }
    let path = report_path(root);
    write_json(&path, report)?;
    debug!(
        dir = %root.display(),
        cycles = report.intention_log.len(),
        "intention log written"
    );
    Ok(path)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(value).context("serialize json")?;
    buf.push('\n');
    fs::write(path, buf).with_context(|| format!("write {}", path.display()))
}
