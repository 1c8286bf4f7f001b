//! Validator for BPMN process models and the files they import.
//!
//! Walks a root file's import graph, checks that imported files exist and
//! conform to their schemas, finds id collisions between files sharing a
//! target namespace, and evaluates a configurable rule set over the merged
//! evaluation scope — reporting every violation with the originating file
//! and source line, including findings that are only visible after files
//! have been merged.
//!
//! # Examples
//! ```rust,no_run
//! use bpmncheck_core::{Config, Validator};
//! use std::path::Path;
//!
//! let validator = Validator::from_config(Config::default())?;
//! let result = validator.validate(Path::new("process.bpmn"))?;
//! for violation in &result.violations {
//!     println!("{}:{} {}", violation.file_name, violation.line, violation.message);
//! }
//! # Ok::<(), bpmncheck_core::Error>(())
//! ```
pub mod checks;
pub mod config;
pub mod imports;
pub mod locate;
pub mod merge;
pub mod result;
pub mod rules;
pub mod schema;
pub mod validator;

pub use config::Config;
pub use result::{ValidationResult, Violation};
pub use validator::{Validator, ValidatorError};

use thiserror::Error;

/// Top-level error wrapper for core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validator(#[from] validator::ValidatorError),
    #[error(transparent)]
    Rule(#[from] rules::RuleError),
    #[error(transparent)]
    Locate(#[from] locate::LocateError),
    #[error(transparent)]
    PreProcess(#[from] merge::PreProcessError),
}
