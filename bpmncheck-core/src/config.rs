//! Configuration for schema locations and the rule definition file.
use std::path::{Path, PathBuf};

/// Paths consumed by one validation run.
///
/// The defaults expect the schema and rule assets next to the working
/// directory; deployments point these at their own copies. A missing
/// schema file degrades that checker to well-formedness checking only.
#[derive(Debug, Clone)]
pub struct Config {
    process_xsd_path: PathBuf,
    wsdl_xsd_path: PathBuf,
    xml_xsd_path: PathBuf,
    rules_path: PathBuf,
}

impl Config {
    pub fn new(
        process_xsd_path: impl Into<PathBuf>,
        wsdl_xsd_path: impl Into<PathBuf>,
        xml_xsd_path: impl Into<PathBuf>,
        rules_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            process_xsd_path: process_xsd_path.into(),
            wsdl_xsd_path: wsdl_xsd_path.into(),
            xml_xsd_path: xml_xsd_path.into(),
            rules_path: rules_path.into(),
        }
    }

    pub fn process_xsd_path(&self) -> &Path {
        &self.process_xsd_path
    }

    pub fn wsdl_xsd_path(&self) -> &Path {
        &self.wsdl_xsd_path
    }

    pub fn xml_xsd_path(&self) -> &Path {
        &self.xml_xsd_path
    }

    pub fn rules_path(&self) -> &Path {
        &self.rules_path
    }

    pub fn with_rules_path(mut self, rules_path: impl Into<PathBuf>) -> Self {
        self.rules_path = rules_path.into();
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            process_xsd_path: PathBuf::from("./assets/schemas/BPMN20.xsd"),
            wsdl_xsd_path: PathBuf::from("./assets/schemas/wsdl20.xsd"),
            xml_xsd_path: PathBuf::from("./assets/schemas/XMLSchema.xsd"),
            rules_path: PathBuf::from("./assets/rules/validation.json"),
        }
    }
}
