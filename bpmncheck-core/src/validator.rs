//! Sequences the checking phases into one outcome per root file.
use crate::checks::{IdDuplicatesChecker, ImportsExistChecker};
use crate::config::Config;
use crate::locate::{self, XmlLocator};
use crate::merge::{self, NamespaceTable, PreProcessError, PreProcessor};
use crate::result::{short_name, ValidationResult, Violation};
use crate::rules::{RuleEngine, RuleError, RuleFinding, XPathRuleEngine};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("given file couldn't be read or doesn't exist: {path}")]
    UnreadableFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Rule(#[from] RuleError),
    #[error(transparent)]
    PreProcess(#[from] PreProcessError),
}

/// Validates process-model files: schema conformance, import existence,
/// cross-file id uniqueness, and the configured rule set over the merged
/// evaluation scope. Each `validate` call owns its own result, namespace
/// table, and schema-checker instances, so independent root files can be
/// validated concurrently.
pub struct Validator<E = XPathRuleEngine> {
    config: Config,
    engine: E,
    locator: XmlLocator,
}

impl Validator<XPathRuleEngine> {
    /// Builds the engine from the configured rule definition file.
    pub fn from_config(config: Config) -> Result<Self, ValidatorError> {
        let engine = XPathRuleEngine::from_file(config.rules_path())?;
        Ok(Self::with_engine(config, engine))
    }
}

impl<E: RuleEngine> Validator<E> {
    pub fn with_engine(config: Config, engine: E) -> Self {
        Self {
            config,
            engine,
            locator: XmlLocator::new(),
        }
    }

    pub fn validate_files(&self, xml_files: &[PathBuf]) -> Result<Vec<ValidationResult>, ValidatorError> {
        xml_files.iter().map(|file| self.validate(file)).collect()
    }

    pub fn validate(&self, xml_file: &Path) -> Result<ValidationResult, ValidatorError> {
        info!("validating {}", short_name(xml_file));
        let mut result = ValidationResult::new();

        let source = fs::read_to_string(xml_file).map_err(|source| ValidatorError::UnreadableFile {
            path: xml_file.display().to_string(),
            source,
        })?;

        if let Err(parse_error) = locate::parse::parse_str(&source) {
            result.violations.push(Violation::new(
                "XSD-Check",
                short_name(xml_file),
                Some(parse_error.line),
                "",
                &parse_error.message,
            ));
            result.checked_files.push(short_name(xml_file));
            info!(
                "XML not well-formed in {} at line {}",
                short_name(xml_file),
                parse_error.line
            );
            result.finalize();
            return Ok(result);
        }

        result
            .checked_files
            .push(xml_file.to_string_lossy().into_owned());
        let folder = default_folder(xml_file);

        ImportsExistChecker::new(&self.config).check(xml_file, folder, &mut result);
        IdDuplicatesChecker::new().check(xml_file, folder, &mut result);

        let preprocessed = PreProcessor::new().preprocess(xml_file, folder)?;
        let findings = self.engine.evaluate(&preprocessed.merged_xml)?;
        for finding in findings {
            self.handle_finding(xml_file, &mut result, &preprocessed.namespace_table, finding);
        }

        result.normalize_checked_files();
        result.finalize();
        info!(
            "validating process successfully done, file is valid: {}",
            result.is_valid()
        );
        Ok(result)
    }

    /// Pins a merged-scope finding to a file and line: the reported
    /// location resolved against the root file first, the synthetic-id
    /// reverse mapping second, a placeholder violation last.
    fn handle_finding(
        &self,
        xml_file: &Path,
        result: &mut ValidationResult,
        namespace_table: &NamespaceTable,
        finding: RuleFinding,
    ) {
        let text = finding.text.trim().to_string();
        let (constraint, message) = match text.split_once('|') {
            Some((constraint, message)) => (constraint, message),
            None => {
                warn!("rule finding without constraint separator: {text}");
                (text.as_str(), "")
            }
        };
        let location = finding.location.unwrap_or_default();

        let line = if location.is_empty() {
            None
        } else {
            self.locator.find_line(xml_file, &location)
        };
        if let Some(line) = line {
            info!(
                "violation of constraint {constraint} found in {} at line {line}",
                short_name(xml_file)
            );
            result.violations.push(Violation::new(
                constraint,
                short_name(xml_file),
                Some(line),
                location,
                message,
            ));
            return;
        }

        let reference = finding
            .diagnostic_references
            .first()
            .map(String::as_str)
            .unwrap_or("");
        match merge::resolve_synthetic(&self.locator, reference, &result.checked_files, namespace_table)
        {
            Ok(resolved) => {
                info!(
                    "violation of constraint {constraint} found in {} at line {}",
                    resolved.file_name, resolved.line
                );
                result.violations.push(Violation::new(
                    constraint,
                    resolved.file_name,
                    Some(resolved.line),
                    resolved.expression,
                    message,
                ));
            }
            Err(localization_error) => {
                error!("line of affected element could not be determined");
                result.violations.push(Violation::new(
                    constraint,
                    localization_error.to_string(),
                    None,
                    location,
                    message,
                ));
            }
        }
    }
}

fn default_folder(xml_file: &Path) -> &Path {
    match xml_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
