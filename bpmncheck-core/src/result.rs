//! Validation outcome types.
use serde::Serialize;
use std::path::Path;

/// Line value reported when no source line could be determined.
pub const UNRESOLVED_LINE: i32 = -1;

/// A single constraint violation, pinned to a file and line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub constraint: String,
    pub file_name: String,
    pub line: i32,
    pub location: String,
    pub message: String,
}

impl Violation {
    pub fn new(
        constraint: impl Into<String>,
        file_name: impl Into<String>,
        line: Option<u32>,
        location: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            constraint: constraint.into(),
            file_name: file_name.into(),
            line: line.map_or(UNRESOLVED_LINE, |l| l as i32),
            location: location.into(),
            message: message.into(),
        }
    }
}

/// The outcome of validating one root file.
///
/// `checked_files` holds full paths while the phases run (the demerge
/// fallback re-parses them) and is normalized to short names before the
/// result is handed back to the caller.
#[derive(Debug, Default, Serialize)]
pub struct ValidationResult {
    pub checked_files: Vec<String>,
    pub violations: Vec<Violation>,
    is_valid: bool,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// Derives `is_valid`. Called exactly once, after all phases ran.
    pub(crate) fn finalize(&mut self) {
        self.is_valid = self.violations.is_empty();
    }

    /// Replaces every checked-file path with its short name.
    pub(crate) fn normalize_checked_files(&mut self) {
        for entry in &mut self.checked_files {
            *entry = short_name(Path::new(entry));
        }
    }
}

/// The file name without its directory part.
pub fn short_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_line_maps_to_sentinel() {
        let violation = Violation::new("EXT.001", "a.bpmn", None, "", "missing");
        assert_eq!(violation.line, UNRESOLVED_LINE);
        let violation = Violation::new("EXT.001", "a.bpmn", Some(12), "", "missing");
        assert_eq!(violation.line, 12);
    }

    #[test]
    fn finalize_derives_validity() {
        let mut result = ValidationResult::new();
        result.finalize();
        assert!(result.is_valid());

        let mut result = ValidationResult::new();
        result
            .violations
            .push(Violation::new("EXT.002", "b.bpmn", Some(4), "", "dup"));
        result.finalize();
        assert!(!result.is_valid());
    }

    #[test]
    fn checked_files_are_shortened() {
        let mut result = ValidationResult::new();
        result.checked_files.push("/tmp/proc/a.bpmn".to_string());
        result.checked_files.push("b.bpmn".to_string());
        result.normalize_checked_files();
        assert_eq!(result.checked_files, vec!["a.bpmn", "b.bpmn"]);
    }
}
