//! Builds the single evaluation-scope document rule patterns run against,
//! and maps rule findings inside it back to real files and lines.
use crate::imports::{canonical_identity, select_imported_files};
use crate::locate::{self, id_query, LocatedDocument, LocatedElement, LocatedNode, XmlAttribute, XmlLocator};
use crate::result::short_name;
use libxml::parser::Parser;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Attributes referencing other model elements by id. Their values move to
/// the synthetic id space together with the ids they point at.
const REFERENCE_ATTRIBUTES: &[&str] = &[
    "sourceRef",
    "targetRef",
    "processRef",
    "attachedToRef",
    "calledElement",
    "default",
    "messageRef",
    "signalRef",
    "errorRef",
];

/// Bijection between declared target namespaces and the synthetic tokens
/// assigned during merging. Insertion order is discovery order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NamespaceTable {
    entries: Vec<(String, String)>,
}

impl NamespaceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token for `namespace`, assigning the next free one if needed.
    pub fn assign(&mut self, namespace: &str) -> String {
        if let Some(token) = self.token_for(namespace) {
            return token.to_string();
        }
        let token = format!("ns{}", self.entries.len());
        self.entries.push((namespace.to_string(), token.clone()));
        token
    }

    /// Adds a mapping unless either side is already taken.
    pub fn insert(&mut self, namespace: impl Into<String>, token: impl Into<String>) -> bool {
        let (namespace, token) = (namespace.into(), token.into());
        if self.token_for(&namespace).is_some() || self.namespace_for(&token).is_some() {
            return false;
        }
        self.entries.push((namespace, token));
        true
    }

    pub fn token_for(&self, namespace: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == namespace)
            .map(|(_, token)| token.as_str())
    }

    pub fn namespace_for(&self, token: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, entry)| entry == token)
            .map(|(namespace, _)| namespace.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(namespace, token)| (namespace.as_str(), token.as_str()))
    }
}

/// A `<token>_<id>` pair. Keeping construction and destructuring here is
/// what makes the separator convention a single point of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticId<'a> {
    pub token: &'a str,
    pub local: &'a str,
}

impl<'a> SyntheticId<'a> {
    /// Splits at the first separator; `None` when there is none.
    pub fn split(raw: &'a str) -> Option<SyntheticId<'a>> {
        let (token, local) = raw.split_once('_')?;
        Some(SyntheticId { token, local })
    }

    pub fn compose(token: &str, local: &str) -> String {
        format!("{token}_{local}")
    }
}

#[derive(Debug, Error)]
pub enum PreProcessError {
    #[error(transparent)]
    Locate(#[from] locate::LocateError),
    #[error("failed to serialize merged document: {0}")]
    Serialize(String),
}

#[derive(Debug)]
pub struct PreProcessResult {
    pub merged_xml: String,
    pub namespace_table: NamespaceTable,
}

/// Splices every reachable process-model import into the head document's
/// scope, moving imported ids into the synthetic `<token>_` space.
#[derive(Debug, Default)]
pub struct PreProcessor;

impl PreProcessor {
    pub fn new() -> Self {
        PreProcessor
    }

    pub fn preprocess(
        &self,
        head_file: &Path,
        folder: &Path,
    ) -> Result<PreProcessResult, PreProcessError> {
        let mut document = locate::parse::parse_file(head_file)?;
        let mut namespace_table = NamespaceTable::new();
        let mut visited = BTreeSet::new();
        visited.insert(canonical_identity(head_file));

        self.inline_imports(
            &mut document.root,
            head_file,
            folder,
            &mut namespace_table,
            &mut visited,
        );

        let merged_xml = serialize(&document).map_err(PreProcessError::Serialize)?;
        Ok(PreProcessResult {
            merged_xml,
            namespace_table,
        })
    }

    fn inline_imports(
        &self,
        scope_root: &mut LocatedElement,
        file: &Path,
        folder: &Path,
        namespace_table: &mut NamespaceTable,
        visited: &mut BTreeSet<PathBuf>,
    ) {
        let Some(path) = file.to_str() else {
            return;
        };
        let Ok(document) = Parser::default().parse_file(path) else {
            return;
        };

        for imported in select_imported_files(&document, folder, visited.len(), true) {
            if !imported.file.exists() {
                // already reported by the existence check
                continue;
            }
            if !visited.insert(canonical_identity(&imported.file)) {
                continue;
            }
            if imported.namespace.is_empty() {
                debug!(
                    "import {} declares no namespace, not merged",
                    short_name(&imported.file)
                );
                continue;
            }

            let subtree = match locate::parse::parse_file(&imported.file) {
                Ok(subtree) => subtree,
                Err(error) => {
                    debug!("{} skipped during merge: {error}", short_name(&imported.file));
                    continue;
                }
            };

            let token = namespace_table.assign(&imported.namespace);
            if !imported.prefix.is_empty() {
                rewrite_qualified_references(scope_root, &imported.prefix, &token);
            }

            let mut imported_root = subtree.root;
            prefix_identifiers(&mut imported_root, &token);

            let declarations: Vec<XmlAttribute> = imported_root
                .attributes
                .iter()
                .filter(|attribute| {
                    attribute.qname == "xmlns" || attribute.qname.starts_with("xmlns:")
                })
                .cloned()
                .collect();

            for child in imported_root.children {
                if let LocatedNode::Element(mut element) = child {
                    for declaration in &declarations {
                        if element.attribute(&declaration.qname).is_none() {
                            element.attributes.push(declaration.clone());
                        }
                    }
                    scope_root.children.push(LocatedNode::Element(element));
                }
            }

            self.inline_imports(scope_root, &imported.file, folder, namespace_table, visited);
        }
    }
}

/// Moves `id` and reference attributes of an imported subtree into the
/// token's synthetic id space.
fn prefix_identifiers(element: &mut LocatedElement, token: &str) {
    for attribute in &mut element.attributes {
        let renames = attribute.qname == "id"
            || (REFERENCE_ATTRIBUTES.contains(&attribute.qname.as_str())
                && !attribute.value.is_empty()
                && !attribute.value.contains(':'));
        if renames {
            attribute.value = SyntheticId::compose(token, &attribute.value);
        }
    }
    for child in &mut element.children {
        if let LocatedNode::Element(child) = child {
            prefix_identifiers(child, token);
        }
    }
}

/// Rewrites `prefix:ref` values in the importing scope to `token_ref`.
fn rewrite_qualified_references(element: &mut LocatedElement, prefix: &str, token: &str) {
    let pattern = format!("{prefix}:");
    for attribute in &mut element.attributes {
        if attribute.qname == "xmlns" || attribute.qname.starts_with("xmlns:") {
            continue;
        }
        if let Some(local) = attribute.value.strip_prefix(&pattern) {
            attribute.value = SyntheticId::compose(token, local);
        }
    }
    for child in &mut element.children {
        if let LocatedNode::Element(child) = child {
            rewrite_qualified_references(child, prefix, token);
        }
    }
}

fn serialize(document: &LocatedDocument) -> Result<String, String> {
    let mut writer = Writer::new(Vec::new());
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(|error| error.to_string())?;
    write_element(&mut writer, &document.root)?;
    String::from_utf8(writer.into_inner()).map_err(|error| error.to_string())
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &LocatedElement) -> Result<(), String> {
    let name = element.qualified_name();
    let mut start = BytesStart::new(name.as_str());
    for attribute in &element.attributes {
        start.push_attribute((attribute.qname.as_str(), attribute.value.as_str()));
    }

    if element.children.is_empty() {
        return writer
            .write_event(Event::Empty(start))
            .map_err(|error| error.to_string());
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|error| error.to_string())?;
    for child in &element.children {
        match child {
            LocatedNode::Element(child) => write_element(writer, child)?,
            LocatedNode::Text(text) => writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(|error| error.to_string())?,
        }
    }
    writer
        .write_event(Event::End(BytesEnd::new(name.as_str())))
        .map_err(|error| error.to_string())
}

/// Why a merged-scope finding could not be pinned to a file and line. The
/// display strings double as the placeholder a degraded violation carries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocalizationError {
    #[error("Element couldn't be found!")]
    MissingSeparator,
    #[error("BPMN Element couldn't be found!")]
    UnknownToken,
    #[error("BPMN Element couldn't be found!")]
    ElementNotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLocation {
    pub file_name: String,
    pub line: u32,
    pub expression: String,
}

/// Reverse-maps a synthetic id from the merged scope to the file that
/// declared it: split off the token, look up its namespace, find the
/// checked file declaring that namespace, locate the local id there.
pub fn resolve_synthetic(
    locator: &XmlLocator,
    raw_id: &str,
    checked_files: &[String],
    namespace_table: &NamespaceTable,
) -> Result<ResolvedLocation, LocalizationError> {
    let synthetic = SyntheticId::split(raw_id).ok_or(LocalizationError::MissingSeparator)?;
    let namespace = namespace_table
        .namespace_for(synthetic.token)
        .ok_or(LocalizationError::UnknownToken)?;

    for checked in checked_files {
        let path = Path::new(checked);
        let document = match locate::parse::parse_file(path) {
            Ok(document) => document,
            Err(error) => {
                debug!("checked file {checked} could not be re-read: {error}");
                continue;
            }
        };
        if document.root.attribute("targetNamespace") == Some(namespace) {
            let expression = id_query(synthetic.local);
            let line = locator
                .find_line(path, &expression)
                .ok_or(LocalizationError::ElementNotFound)?;
            return Ok(ResolvedLocation {
                file_name: short_name(path),
                line,
                expression: format!("{expression}[0]"),
            });
        }
    }
    Err(LocalizationError::ElementNotFound)
}
