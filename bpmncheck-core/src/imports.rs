//! Import discovery and classification.
use libxml::tree::Document;
use libxml::xpath::Context;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const BPMN_NS: &str = "http://www.omg.org/spec/BPMN/20100524/MODEL";
pub const BPMN_DI_NS: &str = "http://www.omg.org/spec/BPMN/20100524/DI";
pub const WSDL_NS: &str = "http://www.w3.org/TR/wsdl20/";
pub const XML_SCHEMA_NS: &str = "http://www.w3.org/2001/XMLSchema";

/// What an import declaration points at, per its `importType` namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    ProcessModel,
    WsdlSchema,
    XmlSchema,
    Unclassified,
}

impl ImportKind {
    pub fn classify(namespace: &str) -> ImportKind {
        match namespace {
            BPMN_NS => ImportKind::ProcessModel,
            WSDL_NS => ImportKind::WsdlSchema,
            XML_SCHEMA_NS => ImportKind::XmlSchema,
            _ => ImportKind::Unclassified,
        }
    }
}

/// One import declaration, resolved against the importing file's folder.
#[derive(Debug, Clone)]
pub struct ImportedFile {
    pub file: PathBuf,
    pub prefix: String,
    pub namespace: String,
    pub kind: ImportKind,
}

/// Collects the import declarations of a parsed document.
///
/// Existence of the referenced files is the caller's concern; malformed
/// declarations are skipped. `depth` only annotates diagnostics.
pub fn select_imported_files(
    document: &Document,
    folder: &Path,
    depth: usize,
    only_process_models: bool,
) -> Vec<ImportedFile> {
    let mut imported = Vec::new();
    let Ok(context) = Context::new(document) else {
        return imported;
    };
    if context.register_namespace("bpmn", BPMN_NS).is_err() {
        return imported;
    }
    let Ok(object) = context.evaluate("//bpmn:import") else {
        return imported;
    };

    for node in object.get_nodes_as_vec() {
        let Some(location) = node.get_attribute("location") else {
            debug!("import declaration without location skipped");
            continue;
        };
        let namespace = node.get_attribute("namespace").unwrap_or_default();
        let import_type = node.get_attribute("importType").unwrap_or_default();
        let kind = ImportKind::classify(&import_type);
        if only_process_models && kind != ImportKind::ProcessModel {
            continue;
        }
        debug!(depth, %location, "import discovered");
        imported.push(ImportedFile {
            file: folder.join(&location),
            prefix: declared_prefix(document, &namespace),
            namespace,
            kind,
        });
    }
    imported
}

/// The prefix the importing document binds to the imported namespace.
fn declared_prefix(document: &Document, namespace: &str) -> String {
    if namespace.is_empty() {
        return String::new();
    }
    document
        .get_root_element()
        .and_then(|root| {
            root.get_namespace_declarations()
                .into_iter()
                .find(|declaration| declaration.get_href() == namespace)
                .map(|declaration| declaration.get_prefix())
        })
        .unwrap_or_default()
}

/// Identity used by the cycle guards; falls back to the literal path for
/// files that cannot be canonicalized (e.g. missing targets).
pub(crate) fn canonical_identity(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_is_closed_over_known_namespaces() {
        assert_eq!(ImportKind::classify(BPMN_NS), ImportKind::ProcessModel);
        assert_eq!(ImportKind::classify(WSDL_NS), ImportKind::WsdlSchema);
        assert_eq!(ImportKind::classify(XML_SCHEMA_NS), ImportKind::XmlSchema);
        assert_eq!(
            ImportKind::classify("http://example.org/other"),
            ImportKind::Unclassified
        );
        assert_eq!(ImportKind::classify(""), ImportKind::Unclassified);
    }
}
