//! Cross-file constraint checks run before rule evaluation.
pub mod id_duplicates;
pub mod imports_exist;

pub use id_duplicates::IdDuplicatesChecker;
pub use imports_exist::ImportsExistChecker;
