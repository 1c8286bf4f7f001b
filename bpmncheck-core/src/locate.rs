//! Maps query expressions to source lines.
pub mod parse;
mod query;

pub use parse::{LocateError, LocatedDocument, LocatedElement, LocatedNode, ParseError, XmlAttribute};
pub use query::{Query, QueryError};

use std::path::Path;
use tracing::debug;

/// Expression selecting a model element by id.
pub fn id_query(id: &str) -> String {
    format!("//bpmn:*[@id = '{id}']")
}

/// Locates the lines of validation errors.
#[derive(Debug, Default)]
pub struct XmlLocator;

impl XmlLocator {
    pub fn new() -> Self {
        XmlLocator
    }

    /// Searches the line of the given expression in the given file.
    ///
    /// A trailing `[k]` whose content parses as a number is the zero-based
    /// index into the match set (default 0); any other bracket content is
    /// left in place as a predicate. Returns `None` when the file cannot be
    /// parsed, the expression is unsupported, or the index is out of range.
    pub fn find_line(&self, xml_file: &Path, expression: &str) -> Option<u32> {
        let document = match parse::parse_file(xml_file) {
            Ok(document) => document,
            Err(error) => {
                debug!("{} could not be parsed: {error}", xml_file.display());
                return None;
            }
        };
        let (expression, index) = split_trailing_index(expression);
        let query = match Query::parse(expression) {
            Ok(query) => query,
            Err(error) => {
                debug!("{error}");
                return None;
            }
        };
        let matches = query.evaluate(&document);
        matches.get(index).map(|element| element.line)
    }
}

fn split_trailing_index(expression: &str) -> (&str, usize) {
    if expression.ends_with(']') {
        if let Some(open) = expression.rfind('[') {
            if let Ok(index) = expression[open + 1..expression.len() - 1].trim().parse() {
                return (&expression[..open], index);
            }
        }
    }
    (expression, 0)
}
