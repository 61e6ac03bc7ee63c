// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! External validators
//!
//! Runs the buildingSMART checks as subprocesses: schema validation through
//! `ifcopenshell.validate` and the gherkin rule sets through
//! `ifc_validation.checks.check_gherkin`. Their output is parsed
//! defensively; a missing tool is reported, never raised.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use bim45d_core::IfcModel;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

pub const REPORT_FILE: &str = "ifc_validation_report.json";

/// Gherkin rule families accepted by the checker
pub const RULE_TYPES: [&str; 4] = [
    "CRITICAL",
    "IMPLEMENTER_AGREEMENT",
    "INFORMAL_PROPOSITION",
    "INDUSTRY_PRACTICE",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Interpreter used for `-m` module invocations
    pub python: String,
    pub schema_timeout: Duration,
    pub gherkin_timeout: Duration,
    pub rule_types: Vec<String>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            python: "python".to_string(),
            schema_timeout: Duration::from_secs(60),
            gherkin_timeout: Duration::from_secs(120),
            rule_types: vec!["CRITICAL".to_string()],
        }
    }
}

impl ValidatorConfig {
    pub fn with_rule_types<S: AsRef<str>>(mut self, rule_types: &[S]) -> Result<Self> {
        if let Some(unknown) = rule_types
            .iter()
            .find(|t| !RULE_TYPES.contains(&t.as_ref()))
        {
            return Err(Error::UnknownOption {
                field: "rule_type",
                value: unknown.as_ref().to_string(),
            });
        }
        self.rule_types = rule_types.iter().map(|t| t.as_ref().to_string()).collect();
        Ok(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleStatus {
    Passed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleResult {
    pub rule_type: String,
    pub status: RuleStatus,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    pub ok: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_results: Option<Vec<RuleResult>>,
}

impl CheckResult {
    fn new(ok: bool, errors: Vec<String>, warnings: Vec<String>, message: impl Into<String>) -> Self {
        Self {
            ok,
            errors,
            warnings,
            message: message.into(),
            rule_results: None,
        }
    }

    fn failed(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(false, vec![error.into()], Vec::new(), message)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overall {
    pub ok: bool,
    pub total_errors: usize,
    pub total_warnings: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub syntax: CheckResult,
    pub schema: CheckResult,
    pub gherkin: CheckResult,
    pub overall: Overall,
}

impl ValidationReport {
    /// Report over the three checks with their combined verdict
    pub fn new(syntax: CheckResult, schema: CheckResult, gherkin: CheckResult) -> Self {
        let checks = [&syntax, &schema, &gherkin];
        let total_errors = checks.iter().map(|c| c.errors.len()).sum();
        let total_warnings = checks.iter().map(|c| c.warnings.len()).sum();
        let overall = Overall {
            ok: checks.iter().all(|c| c.ok),
            total_errors,
            total_warnings,
            message: format!(
                "Validation complete: {} errors, {} warnings",
                total_errors, total_warnings
            ),
        };
        Self {
            syntax,
            schema,
            gherkin,
            overall,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Parse the exchange file with the core reader
pub fn syntax_check(content: &str) -> CheckResult {
    match IfcModel::parse(content) {
        Ok(_) => CheckResult::new(true, Vec::new(), Vec::new(), "Syntax validation passed"),
        Err(e) => CheckResult::failed(e.to_string(), format!("Syntax validation failed: {}", e)),
    }
}

struct ProcessOutput {
    success: bool,
    stdout: String,
    stderr: String,
}

enum RunError {
    NotFound,
    TimedOut,
    Io(std::io::Error),
}

async fn run(program: &str, args: &[&str], limit: Duration) -> std::result::Result<ProcessOutput, RunError> {
    let start = Instant::now();
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(program, ?args, timeout_secs = limit.as_secs(), "Spawning validator");
    let output = match timeout(limit, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(program, "Validator executable not found");
            return Err(RunError::NotFound);
        }
        Ok(Err(e)) => return Err(RunError::Io(e)),
        Err(_) => {
            warn!(program, timeout_secs = limit.as_secs(), "Validator timed out");
            return Err(RunError::TimedOut);
        }
    };

    debug!(
        program,
        exit_code = output.status.code().unwrap_or(-1),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Validator finished"
    );
    Ok(ProcessOutput {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

fn messages(report: &Value, key: &str) -> Vec<String> {
    match report.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other.to_string()],
    }
}

/// Interpret `ifcopenshell.validate --json` output
///
/// Exit status decides `ok` for non-JSON output; a JSON report decides it
/// from its error list on success.
pub fn interpret_schema_output(success: bool, stdout: &str) -> CheckResult {
    match serde_json::from_str::<Value>(stdout) {
        Ok(report) if report.is_object() => {
            let errors = messages(&report, "errors");
            let warnings = messages(&report, "warnings");
            if success {
                CheckResult::new(errors.is_empty(), errors, warnings, "Schema validation completed")
            } else {
                CheckResult::new(false, errors, warnings, "Schema validation found errors")
            }
        }
        _ if success => {
            let warnings = if stdout.trim().is_empty() {
                Vec::new()
            } else {
                vec![stdout.to_string()]
            };
            CheckResult::new(true, Vec::new(), warnings, "Schema validation completed (non-JSON output)")
        }
        _ => {
            let error = if stdout.trim().is_empty() {
                "Unknown schema error".to_string()
            } else {
                stdout.to_string()
            };
            CheckResult::failed(error, "Schema validation failed")
        }
    }
}

pub async fn schema_check(path: &Path, config: &ValidatorConfig) -> CheckResult {
    let path = path.to_string_lossy();
    let args = ["-m", "ifcopenshell.validate", "--json", "--rules", "--fields", &*path];
    match run(&config.python, &args, config.schema_timeout).await {
        Ok(output) => interpret_schema_output(output.success, &output.stdout),
        Err(RunError::NotFound) => CheckResult::failed(
            "ifcopenshell.validate module not available",
            "Schema validation not available",
        ),
        Err(RunError::TimedOut) => CheckResult::failed("Schema validation timed out", "Schema validation timed out"),
        Err(RunError::Io(e)) => {
            CheckResult::failed(e.to_string(), format!("Schema validation error: {}", e))
        }
    }
}

/// Run the gherkin checker once per rule type
pub async fn gherkin_check(path: &Path, config: &ValidatorConfig) -> CheckResult {
    let path = path.to_string_lossy();
    let mut rule_results = Vec::new();
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for rule_type in &config.rule_types {
        let args = [
            "-m",
            "ifc_validation.checks.check_gherkin",
            "--file-name",
            &*path,
            "--rule-type",
            rule_type.as_str(),
        ];
        match run(&config.python, &args, config.gherkin_timeout).await {
            Ok(output) if output.success => rule_results.push(RuleResult {
                rule_type: rule_type.clone(),
                status: RuleStatus::Passed,
                details: if output.stdout.is_empty() {
                    "No issues found".to_string()
                } else {
                    output.stdout
                },
            }),
            Ok(output) => {
                let text = if output.stdout.is_empty() {
                    output.stderr
                } else {
                    output.stdout
                };
                errors.push(format!("{}: {}", rule_type, text));
                rule_results.push(RuleResult {
                    rule_type: rule_type.clone(),
                    status: RuleStatus::Failed,
                    details: if text.is_empty() {
                        "Validation failed".to_string()
                    } else {
                        text
                    },
                });
            }
            Err(RunError::NotFound) => {
                warnings.push(format!("Gherkin rules checker not available for {}", rule_type))
            }
            Err(RunError::TimedOut) => {
                errors.push(format!("Gherkin rules validation timed out for {}", rule_type))
            }
            Err(RunError::Io(e)) => {
                errors.push(format!("Gherkin rules validation error for {}: {}", rule_type, e))
            }
        }
    }

    let mut result = CheckResult::new(
        errors.is_empty(),
        errors,
        warnings,
        format!(
            "Gherkin rules validation completed for {} rule types",
            config.rule_types.len()
        ),
    );
    result.rule_results = Some(rule_results);
    result
}

/// Run every check on a file already on disk
pub async fn run_on_file(path: &Path, config: &ValidatorConfig) -> Result<ValidationReport> {
    let content = tokio::fs::read_to_string(path).await?;
    let syntax = syntax_check(&content);
    let schema = schema_check(path, config).await;
    let gherkin = gherkin_check(path, config).await;
    let report = ValidationReport::new(syntax, schema, gherkin);
    info!(
        ok = report.overall.ok,
        errors = report.overall.total_errors,
        warnings = report.overall.total_warnings,
        "Validation finished"
    );
    Ok(report)
}

/// Write the model to a temporary file and run every check on it
pub async fn run_all(model: &IfcModel, config: &ValidatorConfig) -> Result<ValidationReport> {
    let file = tempfile::Builder::new()
        .prefix("bim45d-")
        .suffix(".ifc")
        .tempfile()?;
    tokio::fs::write(file.path(), model.to_step()).await?;
    run_on_file(file.path(), config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture;

    fn config(python: &str) -> ValidatorConfig {
        ValidatorConfig {
            python: python.to_string(),
            schema_timeout: Duration::from_secs(5),
            gherkin_timeout: Duration::from_secs(5),
            ..ValidatorConfig::default()
        }
    }

    #[test]
    fn test_syntax_check() {
        assert!(syntax_check(fixture::STRUCTURAL).ok);
        let broken = syntax_check("ISO-10303-21;\nDATA;\nENDSEC;");
        assert!(!broken.ok);
        assert_eq!(broken.errors.len(), 1);
    }

    #[test]
    fn test_interpret_schema_output() {
        let json = r##"{"errors": ["#20 IfcWall: invalid GlobalId", {"rule": "WR1"}], "warnings": []}"##;
        let result = interpret_schema_output(true, json);
        assert!(!result.ok);
        assert_eq!(result.errors[1], r#"{"rule":"WR1"}"#);

        let clean = interpret_schema_output(true, r#"{"errors": [], "warnings": null}"#);
        assert!(clean.ok);
        assert!(clean.warnings.is_empty());

        let text = interpret_schema_output(true, "all good\n");
        assert!(text.ok);
        assert_eq!(text.warnings, vec!["all good\n"]);

        let failed = interpret_schema_output(false, "");
        assert_eq!(failed.errors, vec!["Unknown schema error"]);
    }

    #[test]
    fn test_rule_types() {
        let config = ValidatorConfig::default()
            .with_rule_types(&["CRITICAL", "INDUSTRY_PRACTICE"])
            .unwrap();
        assert_eq!(config.rule_types.len(), 2);
        assert!(ValidatorConfig::default().with_rule_types(&["SOMETIMES"]).is_err());
    }

    #[tokio::test]
    async fn test_missing_tools() {
        let model = fixture::model();
        let report = run_all(&model, &config("bim45d-no-such-python")).await.unwrap();
        assert!(report.syntax.ok);
        assert_eq!(report.schema.errors, vec!["ifcopenshell.validate module not available"]);
        assert!(report.gherkin.ok);
        assert_eq!(report.gherkin.warnings, vec!["Gherkin rules checker not available for CRITICAL"]);
        assert!(!report.overall.ok);
        assert_eq!(report.overall.message, "Validation complete: 1 errors, 1 warnings");
        assert!(report.to_json().unwrap().contains("\"rule_results\": []"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_status() {
        let file = tempfile::NamedTempFile::new().unwrap();

        let passed = gherkin_check(file.path(), &config("true")).await;
        assert!(passed.ok);
        let results = passed.rule_results.unwrap();
        assert_eq!(results[0].status, RuleStatus::Passed);
        assert_eq!(results[0].details, "No issues found");

        let failed = gherkin_check(file.path(), &config("false")).await;
        assert!(!failed.ok);
        assert_eq!(failed.rule_results.unwrap()[0].details, "Validation failed");

        let schema = schema_check(file.path(), &config("false")).await;
        assert_eq!(schema.message, "Schema validation failed");
    }
}
