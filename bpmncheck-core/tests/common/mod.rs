use bpmncheck_core::rules::{RuleEngine, RuleError, RuleFinding};
use std::fs;
use std::path::{Path, PathBuf};

#[allow(dead_code)]
pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

#[allow(dead_code)]
pub fn write_file(folder: &Path, name: &str, content: &str) -> PathBuf {
    let path = folder.join(name);
    fs::write(&path, content).expect("write test file");
    path
}

/// Rule engine returning canned findings.
#[allow(dead_code)]
pub struct StubEngine {
    pub findings: Vec<RuleFinding>,
}

#[allow(dead_code)]
impl StubEngine {
    pub fn empty() -> Self {
        Self {
            findings: Vec::new(),
        }
    }

    pub fn with_findings(findings: Vec<RuleFinding>) -> Self {
        Self { findings }
    }
}

impl RuleEngine for StubEngine {
    fn evaluate(&self, _merged_xml: &str) -> Result<Vec<RuleFinding>, RuleError> {
        Ok(self.findings.clone())
    }
}

/// Rule engine whose configuration is broken.
#[allow(dead_code)]
pub struct MisconfiguredEngine;

impl RuleEngine for MisconfiguredEngine {
    fn evaluate(&self, _merged_xml: &str) -> Result<Vec<RuleFinding>, RuleError> {
        Err(RuleError::Configuration(
            "rule definition is unusable".to_string(),
        ))
    }
}
