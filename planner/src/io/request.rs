//! Plan request loading: JSON Schema conformance, then typed parse.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use jsonschema::Draft;
use serde_json::Value;
use tracing::debug;

use crate::replan::ReplanRequest;

/// Embedded request schema (Draft 2020-12).
pub const REQUEST_SCHEMA: &str = include_str!("../../schemas/plan_request.schema.json");

/// Validate a JSON instance against the embedded request schema.
pub fn validate_schema(instance: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(REQUEST_SCHEMA).context("parse request schema")?;
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .context("compile json schema")?;
    let messages: Vec<String> = compiled
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        bail!("schema validation failed:\n- {}", messages.join("\n- "));
    }
    Ok(())
}

/// Parse and validate a request document.
pub fn parse_request(raw: &str) -> Result<ReplanRequest> {
    let instance: Value = serde_json::from_str(raw).context("parse request json")?;
    validate_schema(&instance)?;
    let request: ReplanRequest =
        serde_json::from_value(instance).context("parse request as plan request")?;
    debug!(
        stacks = request.plan.stacks.len(),
        edits = request.edits.len(),
        "request loaded"
    );
    Ok(request)
}

/// Read and validate a request file.
pub fn load_request(path: &Path) -> Result<ReplanRequest> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    parse_request(&raw).with_context(|| format!("invalid request {}", path.display()))
}
