//! EXT.001: every imported file exists and conforms to its schema.
use crate::config::Config;
use crate::imports::{canonical_identity, select_imported_files, ImportKind, ImportedFile};
use crate::locate::{self, LocateError, XmlLocator};
use crate::result::{short_name, ValidationResult, Violation};
use crate::schema::{SchemaKind, XsdValidator};
use libxml::parser::Parser;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const CONSTRAINT: &str = "EXT.001";
const MISSING_FILE_MESSAGE: &str = "The imported file does not exist";

/// Walks the import graph of a file, reporting missing targets and
/// delegating recognized schema types to the matching XSD validator.
/// Process-model imports are the only recursive expansion; a visited set
/// keeps cyclic graphs from recursing forever.
pub struct ImportsExistChecker {
    process_xsd: XsdValidator,
    wsdl_xsd: XsdValidator,
    xml_xsd: XsdValidator,
    locator: XmlLocator,
}

impl ImportsExistChecker {
    pub fn new(config: &Config) -> Self {
        Self {
            process_xsd: XsdValidator::new(SchemaKind::ProcessModel, config),
            wsdl_xsd: XsdValidator::new(SchemaKind::Wsdl, config),
            xml_xsd: XsdValidator::new(SchemaKind::Xml, config),
            locator: XmlLocator::new(),
        }
    }

    pub fn check(&mut self, head_file: &Path, folder: &Path, result: &mut ValidationResult) {
        let mut visited = BTreeSet::new();
        visited.insert(canonical_identity(head_file));
        self.check_file(head_file, folder, result, &mut visited);
    }

    fn check_file(
        &mut self,
        head_file: &Path,
        folder: &Path,
        result: &mut ValidationResult,
        visited: &mut BTreeSet<PathBuf>,
    ) {
        self.process_xsd.validate_against_xsd(head_file, result);

        let Some(path) = head_file.to_str() else {
            return;
        };
        let document = match Parser::default().parse_file(path) {
            Ok(document) => document,
            Err(parse_error) => {
                debug!(
                    "{} could not be parsed: {parse_error:?}",
                    short_name(head_file)
                );
                return;
            }
        };

        for imported in select_imported_files(&document, folder, visited.len(), false) {
            self.check_imported(&imported, head_file, folder, result, visited);
        }
    }

    fn check_imported(
        &mut self,
        imported: &ImportedFile,
        head_file: &Path,
        folder: &Path,
        result: &mut ValidationResult,
        visited: &mut BTreeSet<PathBuf>,
    ) {
        if !imported.file.exists() {
            let file_name = short_name(&imported.file);
            let location = import_query(&file_name);
            let line = self.locator.find_line(head_file, &location);
            result.violations.push(Violation::new(
                CONSTRAINT,
                &file_name,
                line,
                format!("{location}[0]"),
                MISSING_FILE_MESSAGE,
            ));
            info!("violation of constraint {CONSTRAINT} in {file_name} found");
            return;
        }

        match imported.kind {
            ImportKind::ProcessModel => {
                if !visited.insert(canonical_identity(&imported.file)) {
                    debug!(
                        "{} already on the traversal path, not descending again",
                        short_name(&imported.file)
                    );
                    return;
                }
                self.check_file(&imported.file, folder, result, visited);
            }
            ImportKind::WsdlSchema => {
                check_schema_import(&mut self.wsdl_xsd, &imported.file, result);
            }
            ImportKind::XmlSchema => {
                check_schema_import(&mut self.xml_xsd, &imported.file, result);
            }
            ImportKind::Unclassified => {
                debug!("import {} not classified, ignoring", short_name(&imported.file));
            }
        }
    }
}

/// Well-formedness first (a failure is reported at the parser's line and
/// the file still counts as checked), then schema validation.
fn check_schema_import(validator: &mut XsdValidator, file: &Path, result: &mut ValidationResult) {
    match locate::parse::parse_file(file) {
        Ok(_) => validator.validate_against_xsd(file, result),
        Err(LocateError::Parse(parse_error)) => {
            result.violations.push(Violation::new(
                "XSD-Check",
                short_name(file),
                Some(parse_error.line),
                "",
                &parse_error.message,
            ));
            result.checked_files.push(short_name(file));
            info!(
                "XML not well-formed in {} at line {}",
                short_name(file),
                parse_error.line
            );
        }
        Err(LocateError::Io(io_error)) => {
            debug!("{} could not be read: {io_error}", short_name(file));
        }
    }
}

fn import_query(file_name: &str) -> String {
    format!("//bpmn:import[@location = '{file_name}']")
}
