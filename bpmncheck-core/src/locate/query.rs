//! The node-selection subset understood by the locator.
//!
//! Two shapes cover everything the validator emits and consumes:
//!
//! - descendant searches: `//bpmn:import[@location = 'a.wsdl']`,
//!   `//bpmn:*[@id = 'Task_1']`, optionally followed by child steps;
//! - absolute child paths with 1-based positions: `/definitions[1]/process[2]`.
//!
//! The `bpmn` prefix binds to the BPMN MODEL namespace. An unprefixed or
//! unknown-prefix name test matches on local name alone.
use crate::imports::BPMN_NS;
use crate::locate::parse::{LocatedDocument, LocatedElement};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported query expression: {0}")]
pub struct QueryError(pub String);

#[derive(Debug, Clone)]
pub struct Query {
    descendant: bool,
    steps: Vec<Step>,
}

#[derive(Debug, Clone)]
struct Step {
    prefix: Option<String>,
    /// `None` matches any local name (`*`).
    name: Option<String>,
    predicates: Vec<Predicate>,
}

#[derive(Debug, Clone)]
enum Predicate {
    Attribute { name: String, value: String },
    /// 1-based position among the elements matched so far.
    Position(usize),
}

impl Query {
    pub fn parse(expression: &str) -> Result<Query, QueryError> {
        let expression = expression.trim();
        let (descendant, rest) = if let Some(rest) = expression.strip_prefix("//") {
            (true, rest)
        } else if let Some(rest) = expression.strip_prefix('/') {
            (false, rest)
        } else {
            return Err(QueryError(expression.to_string()));
        };

        let steps = split_steps(rest)
            .into_iter()
            .map(parse_step)
            .collect::<Result<Vec<_>, _>>()?;
        if steps.is_empty() {
            return Err(QueryError(expression.to_string()));
        }
        Ok(Query { descendant, steps })
    }

    pub fn evaluate<'a>(&self, document: &'a LocatedDocument) -> Vec<&'a LocatedElement> {
        let first = &self.steps[0];
        let mut current: Vec<&LocatedElement> = if self.descendant {
            let mut matched = Vec::new();
            collect_descendants(&document.root, first, &mut matched);
            apply_predicates(matched, &first.predicates)
        } else {
            let candidates = if step_matches(first, &document.root) {
                vec![&document.root]
            } else {
                Vec::new()
            };
            apply_predicates(candidates, &first.predicates)
        };

        for step in &self.steps[1..] {
            let mut next = Vec::new();
            for element in current {
                let children: Vec<&LocatedElement> = element
                    .elements()
                    .filter(|child| step_matches(step, child))
                    .collect();
                next.extend(apply_predicates(children, &step.predicates));
            }
            current = next;
        }
        current
    }
}

fn collect_descendants<'a>(
    element: &'a LocatedElement,
    step: &Step,
    matched: &mut Vec<&'a LocatedElement>,
) {
    if step_matches(step, element) {
        matched.push(element);
    }
    for child in element.elements() {
        collect_descendants(child, step, matched);
    }
}

fn step_matches(step: &Step, element: &LocatedElement) -> bool {
    if let Some(name) = &step.name {
        if element.name != *name {
            return false;
        }
    }
    match step.prefix.as_deref() {
        Some("bpmn") => element.namespace.as_deref() == Some(BPMN_NS),
        _ => true,
    }
}

fn apply_predicates<'a>(
    mut candidates: Vec<&'a LocatedElement>,
    predicates: &[Predicate],
) -> Vec<&'a LocatedElement> {
    for predicate in predicates {
        match predicate {
            Predicate::Attribute { name, value } => {
                candidates.retain(|element| element.attribute(name) == Some(value.as_str()));
            }
            Predicate::Position(position) => {
                candidates = match candidates.get(position - 1) {
                    Some(element) => vec![element],
                    None => Vec::new(),
                };
            }
        }
    }
    candidates
}

/// Splits on `/` outside of predicates and quoted values.
fn split_steps(expression: &str) -> Vec<&str> {
    let mut steps = Vec::new();
    let mut start = 0;
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (index, character) in expression.char_indices() {
        match character {
            '\'' | '"' if depth > 0 => match quote {
                Some(open) if open == character => quote = None,
                Some(_) => {}
                None => quote = Some(character),
            },
            '[' if quote.is_none() => depth += 1,
            ']' if quote.is_none() => depth = depth.saturating_sub(1),
            '/' if depth == 0 && quote.is_none() => {
                steps.push(&expression[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    steps.push(&expression[start..]);
    steps
}

fn parse_step(step: &str) -> Result<Step, QueryError> {
    let step = step.trim();
    let (name_test, mut rest) = match step.find('[') {
        Some(index) => (&step[..index], &step[index..]),
        None => (step, ""),
    };
    if name_test.is_empty() {
        return Err(QueryError(step.to_string()));
    }

    let (prefix, local) = match name_test.split_once(':') {
        Some((prefix, local)) => (Some(prefix.to_string()), local),
        None => (None, name_test),
    };
    let name = match local {
        "*" => None,
        other => Some(other.to_string()),
    };

    let mut predicates = Vec::new();
    while !rest.is_empty() {
        let close = matching_bracket(rest).ok_or_else(|| QueryError(step.to_string()))?;
        predicates.push(parse_predicate(&rest[1..close])?);
        rest = &rest[close + 1..];
    }
    Ok(Step {
        prefix,
        name,
        predicates,
    })
}

/// Index of the `]` closing the `[` at position 0, honoring quotes.
fn matching_bracket(rest: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (index, character) in rest.char_indices().skip(1) {
        match character {
            '\'' | '"' => match quote {
                Some(open) if open == character => quote = None,
                Some(_) => {}
                None => quote = Some(character),
            },
            ']' if quote.is_none() => return Some(index),
            _ => {}
        }
    }
    None
}

fn parse_predicate(inner: &str) -> Result<Predicate, QueryError> {
    let inner = inner.trim();
    if let Some(attribute) = inner.strip_prefix('@') {
        let (name, value) = attribute
            .split_once('=')
            .ok_or_else(|| QueryError(inner.to_string()))?;
        let value = value.trim();
        let value = value
            .strip_prefix('\'')
            .and_then(|v| v.strip_suffix('\''))
            .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')))
            .ok_or_else(|| QueryError(inner.to_string()))?;
        return Ok(Predicate::Attribute {
            name: name.trim().to_string(),
            value: value.to_string(),
        });
    }
    inner
        .parse::<usize>()
        .ok()
        .filter(|position| *position >= 1)
        .map(Predicate::Position)
        .ok_or_else(|| QueryError(inner.to_string()))
}
