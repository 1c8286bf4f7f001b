//! EXT.002: no id collisions between files sharing a target namespace.
use crate::imports::{canonical_identity, select_imported_files, BPMN_DI_NS, BPMN_NS};
use crate::locate::{self, id_query, LocateError, LocatedDocument, LocatedElement, XmlLocator};
use crate::result::{short_name, ValidationResult, Violation};
use libxml::parser::Parser;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const CONSTRAINT: &str = "EXT.002";
const DUPLICATE_MESSAGE: &str = "Files have id duplicates";

/// Compares every pair of files in the process-model import closure.
/// Quadratic in files and ids, which is fine for the graph sizes this
/// domain produces.
#[derive(Debug, Default)]
pub struct IdDuplicatesChecker {
    locator: XmlLocator,
}

impl IdDuplicatesChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&self, head_file: &Path, folder: &Path, result: &mut ValidationResult) {
        let files = self.search_for_imports(head_file, folder, result);

        for (index, first_file) in files.iter().enumerate() {
            let Some(first) = parse_for_comparison(first_file) else {
                continue;
            };
            let first_namespace = first.root.attribute("targetNamespace").unwrap_or_default();
            if first_namespace.is_empty() {
                continue;
            }
            for second_file in &files[index + 1..] {
                let Some(second) = parse_for_comparison(second_file) else {
                    continue;
                };
                let second_namespace =
                    second.root.attribute("targetNamespace").unwrap_or_default();
                if first_namespace == second_namespace {
                    self.check_id_duplicates(first_file, second_file, &first, &second, result);
                }
            }
        }
    }

    /// Transitive process-model closure of `file`, head first. Every
    /// existing import is recorded into `checked_files`; a file that fails
    /// to parse mid-crawl becomes a well-formedness violation.
    fn search_for_imports(
        &self,
        file: &Path,
        folder: &Path,
        result: &mut ValidationResult,
    ) -> Vec<PathBuf> {
        let mut files = vec![file.to_path_buf()];
        let mut visited = BTreeSet::new();
        visited.insert(canonical_identity(file));
        self.collect_imports(file, folder, result, &mut files, &mut visited);
        files
    }

    fn collect_imports(
        &self,
        file: &Path,
        folder: &Path,
        result: &mut ValidationResult,
        files: &mut Vec<PathBuf>,
        visited: &mut BTreeSet<PathBuf>,
    ) {
        match locate::parse::parse_file(file) {
            Ok(_) => {}
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
                return;
            }
            Err(LocateError::Io(io_error)) => {
                debug!("{} could not be read: {io_error}", short_name(file));
                return;
            }
        }

        let Some(path) = file.to_str() else {
            return;
        };
        let Ok(document) = Parser::default().parse_file(path) else {
            return;
        };

        for imported in select_imported_files(&document, folder, visited.len(), true) {
            if !imported.file.exists() {
                continue;
            }
            if !visited.insert(canonical_identity(&imported.file)) {
                continue;
            }
            result
                .checked_files
                .push(imported.file.to_string_lossy().into_owned());
            files.push(imported.file.clone());
            self.collect_imports(&imported.file, folder, result, files, visited);
        }
    }

    fn check_id_duplicates(
        &self,
        first_file: &Path,
        second_file: &Path,
        first: &LocatedDocument,
        second: &LocatedDocument,
        result: &mut ValidationResult,
    ) {
        let first_ids = model_ids(&first.root);
        let second_ids = model_ids(&second.root);

        // index 0 is the definitions element itself
        for first_id in first_ids.iter().skip(1) {
            for second_id in second_ids.iter().skip(1) {
                if first_id == second_id {
                    let location = id_query(first_id);
                    result.violations.push(Violation::new(
                        CONSTRAINT,
                        short_name(first_file),
                        self.locator.find_line(first_file, &location),
                        format!("{location}[0]"),
                        DUPLICATE_MESSAGE,
                    ));
                    result.violations.push(Violation::new(
                        CONSTRAINT,
                        short_name(second_file),
                        self.locator.find_line(second_file, &location),
                        format!("{location}[0]"),
                        DUPLICATE_MESSAGE,
                    ));
                    info!("violation of constraint {CONSTRAINT} found");
                }
            }
        }
    }
}

fn parse_for_comparison(file: &Path) -> Option<LocatedDocument> {
    match locate::parse::parse_file(file) {
        Ok(document) => Some(document),
        Err(error) => {
            debug!("{} could not be parsed: {error}", short_name(file));
            None
        }
    }
}

/// All ids of model elements in document order, ignoring the diagram
/// interchange part.
fn model_ids(element: &LocatedElement) -> Vec<String> {
    let mut ids = Vec::new();
    collect_model_ids(element, &mut ids);
    ids
}

fn collect_model_ids(element: &LocatedElement, ids: &mut Vec<String>) {
    if element.namespace.as_deref() == Some(BPMN_DI_NS) {
        return;
    }
    if element.namespace.as_deref() == Some(BPMN_NS) {
        if let Some(id) = element.attribute("id") {
            ids.push(id.to_string());
        }
    }
    for child in element.elements() {
        collect_model_ids(child, ids);
    }
}
