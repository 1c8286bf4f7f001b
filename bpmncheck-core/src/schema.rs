//! XSD validation against the configured schema files.
use crate::config::Config;
use crate::result::{short_name, ValidationResult, Violation};
use libxml::error::StructuredError;
use libxml::schemas::{SchemaParserContext, SchemaValidationContext};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// The schema a file is validated against, fixing the reported constraint id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    ProcessModel,
    Wsdl,
    Xml,
}

impl SchemaKind {
    pub fn constraint(&self) -> &'static str {
        match self {
            SchemaKind::ProcessModel => "XSD-Check",
            SchemaKind::Wsdl => "WSDL-Check",
            SchemaKind::Xml => "XML-Check",
        }
    }

    fn schema_path(&self, config: &Config) -> PathBuf {
        match self {
            SchemaKind::ProcessModel => config.process_xsd_path().to_path_buf(),
            SchemaKind::Wsdl => config.wsdl_xsd_path().to_path_buf(),
            SchemaKind::Xml => config.xml_xsd_path().to_path_buf(),
        }
    }
}

/// Validates files against one XSD, built lazily on first use.
///
/// When the schema file is absent or cannot be compiled the validator
/// degrades to a no-op; well-formedness checking happens elsewhere.
pub struct XsdValidator {
    kind: SchemaKind,
    schema_path: PathBuf,
    context: Option<SchemaValidationContext>,
    attempted: bool,
}

impl XsdValidator {
    pub fn new(kind: SchemaKind, config: &Config) -> Self {
        Self {
            schema_path: kind.schema_path(config),
            kind,
            context: None,
            attempted: false,
        }
    }

    pub fn kind(&self) -> SchemaKind {
        self.kind
    }

    fn context(&mut self) -> Option<&mut SchemaValidationContext> {
        if !self.attempted {
            self.attempted = true;
            if !self.schema_path.exists() {
                debug!(
                    "schema {} not available, skipping schema validation",
                    self.schema_path.display()
                );
            } else if let Some(path) = self.schema_path.to_str() {
                let mut parser = SchemaParserContext::from_file(path);
                match SchemaValidationContext::from_parser(&mut parser) {
                    Ok(context) => self.context = Some(context),
                    Err(errors) => error!(
                        "schema {} could not be built: {}",
                        self.schema_path.display(),
                        summarize(&errors)
                    ),
                }
            }
        }
        self.context.as_mut()
    }

    /// Appends one violation per schema error reported for `xml_file`.
    /// Lines come from the validator's diagnostics, unaltered.
    pub fn validate_against_xsd(&mut self, xml_file: &Path, result: &mut ValidationResult) {
        let kind = self.kind;
        let Some(context) = self.context() else {
            return;
        };
        let Some(path) = xml_file.to_str() else {
            return;
        };
        if let Err(errors) = context.validate_file(path) {
            for schema_error in &errors {
                let line = error_line(schema_error);
                result.violations.push(Violation::new(
                    kind.constraint(),
                    short_name(xml_file),
                    line,
                    "",
                    error_message(schema_error),
                ));
                info!(
                    "schema violation in {} at line {}",
                    short_name(xml_file),
                    line.map_or(-1, |l| l as i64)
                );
            }
        }
    }
}

fn error_line(schema_error: &StructuredError) -> Option<u32> {
    schema_error
        .line
        .and_then(|line| u32::try_from(line).ok())
        .filter(|line| *line > 0)
}

fn error_message(schema_error: &StructuredError) -> String {
    schema_error
        .message
        .as_deref()
        .unwrap_or("schema validation failed")
        .trim()
        .to_string()
}

fn summarize(errors: &[StructuredError]) -> String {
    errors
        .iter()
        .map(error_message)
        .collect::<Vec<_>>()
        .join("; ")
}
