//! Interface to the rule engine evaluating the merged document, plus the
//! built-in XPath-assertion engine.
use crate::imports::BPMN_NS;
use libxml::parser::Parser;
use libxml::tree::{Node, NodeType};
use libxml::xpath::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// One finding reported against the merged document.
///
/// `text` carries the constraint id and message as `"<id>|<message>"`.
/// `location` is a query expression into the merged document, when the
/// engine has one. `diagnostic_references` carry element ids usable for
/// the reverse-mapping fallback; ids of elements that originated in an
/// imported file are synthetic (`<token>_<id>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleFinding {
    pub text: String,
    pub location: Option<String>,
    pub diagnostic_references: Vec<String>,
}

#[derive(Debug, Error)]
pub enum RuleError {
    /// The rule definition itself is invalid. Fatal for the whole call.
    #[error("invalid rule definition: {0}")]
    Configuration(String),
    #[error("rule evaluation failed: {0}")]
    Evaluation(String),
}

/// Evaluates a fixed rule set against one merged document.
pub trait RuleEngine {
    fn evaluate(&self, merged_xml: &str) -> Result<Vec<RuleFinding>, RuleError>;
}

/// A declarative rule: any node matched by `forbid` violates it.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleDefinition {
    pub id: String,
    pub message: String,
    pub forbid: String,
}

/// Rule engine over a JSON list of [`RuleDefinition`]s.
pub struct XPathRuleEngine {
    rules: Vec<RuleDefinition>,
}

impl XPathRuleEngine {
    pub fn from_file(path: &Path) -> Result<Self, RuleError> {
        let raw = fs::read_to_string(path)
            .map_err(|error| RuleError::Configuration(format!("{}: {error}", path.display())))?;
        let rules: Vec<RuleDefinition> = serde_json::from_str(&raw)
            .map_err(|error| RuleError::Configuration(error.to_string()))?;
        Self::from_rules(rules)
    }

    pub fn from_rules(rules: Vec<RuleDefinition>) -> Result<Self, RuleError> {
        for rule in &rules {
            if rule.id.is_empty() || rule.forbid.is_empty() {
                return Err(RuleError::Configuration(format!(
                    "rule '{}' needs both an id and an expression",
                    rule.id
                )));
            }
        }
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[RuleDefinition] {
        &self.rules
    }
}

impl RuleEngine for XPathRuleEngine {
    fn evaluate(&self, merged_xml: &str) -> Result<Vec<RuleFinding>, RuleError> {
        let document = Parser::default()
            .parse_string(merged_xml)
            .map_err(|error| RuleError::Evaluation(format!("{error:?}")))?;
        let context = Context::new(&document)
            .map_err(|_| RuleError::Evaluation("no evaluation context".to_string()))?;
        context
            .register_namespace("bpmn", BPMN_NS)
            .map_err(|_| RuleError::Evaluation("namespace registration failed".to_string()))?;

        let mut findings = Vec::new();
        for rule in &self.rules {
            let object = context.evaluate(&rule.forbid).map_err(|_| {
                RuleError::Configuration(format!(
                    "rule {} has an invalid expression: {}",
                    rule.id, rule.forbid
                ))
            })?;
            for node in object.get_nodes_as_vec() {
                if node.get_type() != Some(NodeType::ElementNode) {
                    continue;
                }
                findings.push(RuleFinding {
                    text: format!("{}|{}", rule.id, rule.message),
                    location: Some(element_path(&node)),
                    diagnostic_references: node.get_attribute("id").into_iter().collect(),
                });
            }
        }
        Ok(findings)
    }
}

/// Positional path of an element. Inner steps carry 1-based positions; the
/// final bracket is the locator's zero-based trailing match index.
fn element_path(node: &Node) -> String {
    let mut segments = Vec::new();
    let mut current = Some(node.clone());
    while let Some(element) = current {
        if element.get_type() != Some(NodeType::ElementNode) {
            break;
        }
        segments.push((element.get_name(), preceding_same_name(&element)));
        current = element.get_parent();
    }
    segments.reverse();

    let mut path = String::new();
    let last = segments.len().saturating_sub(1);
    for (index, (name, position)) in segments.iter().enumerate() {
        if index == last {
            path.push_str(&format!("/{name}[{position}]"));
        } else {
            path.push_str(&format!("/{name}[{}]", position + 1));
        }
    }
    path
}

fn preceding_same_name(node: &Node) -> usize {
    let name = node.get_name();
    let mut count = 0;
    let mut sibling = node.get_prev_sibling();
    while let Some(previous) = sibling {
        if previous.get_type() == Some(NodeType::ElementNode) && previous.get_name() == name {
            count += 1;
        }
        sibling = previous.get_prev_sibling();
    }
    count
}
