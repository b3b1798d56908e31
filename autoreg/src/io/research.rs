//! Research configuration loading: JSON file, schema-checked before parsing.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use jsonschema::Draft;
use serde_json::Value;

use crate::regress::ResearchConfig;

const RESEARCH_SCHEMA: &str = include_str!("../../schemas/research_config.schema.json");

/// Load and validate a research configuration.
///
/// Schema violations are collected and reported together so the author fixes
/// the file in one pass.
pub fn load_research_config(path: &Path) -> Result<ResearchConfig> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let instance: Value =
        serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    validate_schema(&instance)?;
    let config: ResearchConfig = serde_json::from_value(instance)
        .with_context(|| format!("parse {} as research config", path.display()))?;
    Ok(config)
}

/// Validate a JSON instance against the research config schema (Draft 2020-12).
fn validate_schema(instance: &Value) -> Result<()> {
    let schema: Value =
        serde_json::from_str(RESEARCH_SCHEMA).context("parse research config schema")?;
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .context("compile research config schema")?;
    let messages: Vec<String> = compiled
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        bail!(
            "research config validation failed:\n- {}",
            messages.join("\n- ")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write_config(value: &Value) -> (tempfile::TempDir, std::path::PathBuf) {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("research.json");
        fs::write(&path, value.to_string()).expect("write");
        (temp, path)
    }

    #[test]
    fn minimal_valid_config_loads() {
        let (_temp, path) = write_config(&json!({
            "research_topic": "board diversity and firm value",
            "dependent_vars": ["tobin_q"],
            "independent_vars": ["female_ratio"]
        }));
        let config = load_research_config(&path).expect("load");
        assert_eq!(config.dependent_vars, vec!["tobin_q"]);
        assert!(config.control_vars.is_empty());
    }

    #[test]
    fn missing_required_field_is_reported() {
        let (_temp, path) = write_config(&json!({
            "research_topic": "incomplete",
            "dependent_vars": ["y"]
        }));
        let err = load_research_config(&path).expect_err("invalid");
        assert!(format!("{err:#}").contains("independent_vars"));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let (_temp, path) = write_config(&json!({
            "research_topic": "typo",
            "dependent_vars": ["y"],
            "independent_vars": ["x"],
            "dependnet_vars": ["oops"]
        }));
        let err = load_research_config(&path).expect_err("invalid");
        assert!(format!("{err:#}").contains("validation failed"));
    }

    #[test]
    fn wrong_type_is_rejected_before_parsing() {
        let (_temp, path) = write_config(&json!({
            "research_topic": "types",
            "dependent_vars": "y",
            "independent_vars": ["x"]
        }));
        assert!(load_research_config(&path).is_err());
    }
}
