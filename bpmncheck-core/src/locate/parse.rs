//! Location-aware XML parsing.
//!
//! Builds a lightweight element tree that retains, for every element, the
//! 1-based source line of its opening tag. Lines are derived from the byte
//! offset the reader sits at when the tag is encountered, which is also how
//! a well-formedness failure gets its line.
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// A document is not well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub line: u32,
    pub message: String,
}

/// Reading or parsing a file failed.
#[derive(Debug, Error)]
pub enum LocateError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// One attribute, with the qualified name as written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    pub qname: String,
    pub value: String,
}

/// An element plus the line its opening tag started on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedElement {
    pub name: String,
    pub prefix: Option<String>,
    pub namespace: Option<String>,
    pub attributes: Vec<XmlAttribute>,
    pub line: u32,
    pub children: Vec<LocatedNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocatedNode {
    Element(LocatedElement),
    Text(String),
}

impl LocatedElement {
    /// Attribute value by qualified name, as written in the source.
    pub fn attribute(&self, qname: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attribute| attribute.qname == qname)
            .map(|attribute| attribute.value.as_str())
    }

    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{}", self.name),
            None => self.name.clone(),
        }
    }

    /// Element children, in document order.
    pub fn elements(&self) -> impl Iterator<Item = &LocatedElement> {
        self.children.iter().filter_map(|child| match child {
            LocatedNode::Element(element) => Some(element),
            LocatedNode::Text(_) => None,
        })
    }
}

#[derive(Debug)]
pub struct LocatedDocument {
    pub root: LocatedElement,
}

pub fn parse_file(path: &Path) -> Result<LocatedDocument, LocateError> {
    let source = fs::read_to_string(path)?;
    Ok(parse_str(&source)?)
}

pub fn parse_str(source: &str) -> Result<LocatedDocument, ParseError> {
    let mut reader = NsReader::from_str(source);
    let mut stack: Vec<LocatedElement> = Vec::new();
    let mut root: Option<LocatedElement> = None;

    loop {
        let tag_offset = reader.buffer_position() as usize;
        match reader.read_resolved_event() {
            Err(error) => {
                return Err(ParseError {
                    line: line_at(source, reader.error_position() as usize),
                    message: error.to_string(),
                });
            }
            Ok((resolution, Event::Start(tag))) => {
                let line = line_at(source, tag_offset);
                let element = element_from(&tag, resolution, line)?;
                stack.push(element);
            }
            Ok((resolution, Event::Empty(tag))) => {
                let line = line_at(source, tag_offset);
                let element = element_from(&tag, resolution, line)?;
                attach(element, &mut stack, &mut root)?;
            }
            Ok((_, Event::End(_))) => {
                // the reader already rejected mismatched end tags
                if let Some(element) = stack.pop() {
                    attach(element, &mut stack, &mut root)?;
                }
            }
            Ok((_, Event::Text(text))) => {
                if let Some(parent) = stack.last_mut() {
                    let value = text.unescape().map_err(|error| ParseError {
                        line: line_at(source, tag_offset),
                        message: error.to_string(),
                    })?;
                    parent.children.push(LocatedNode::Text(value.into_owned()));
                }
            }
            Ok((_, Event::CData(data))) => {
                if let Some(parent) = stack.last_mut() {
                    let value = String::from_utf8_lossy(&data.into_inner()).into_owned();
                    parent.children.push(LocatedNode::Text(value));
                }
            }
            Ok((_, Event::Eof)) => break,
            Ok(_) => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(ParseError {
            line: open.line,
            message: format!("element '{}' is never closed", open.qualified_name()),
        });
    }
    root.ok_or_else(|| ParseError {
        line: 1,
        message: "document has no root element".to_string(),
    })
    .map(|root| LocatedDocument { root })
}

fn attach(
    element: LocatedElement,
    stack: &mut Vec<LocatedElement>,
    root: &mut Option<LocatedElement>,
) -> Result<(), ParseError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(LocatedNode::Element(element));
        return Ok(());
    }
    if root.is_some() {
        return Err(ParseError {
            line: element.line,
            message: "document contains more than one root element".to_string(),
        });
    }
    *root = Some(element);
    Ok(())
}

fn element_from(
    tag: &BytesStart<'_>,
    resolution: ResolveResult<'_>,
    line: u32,
) -> Result<LocatedElement, ParseError> {
    let qname = tag.name();
    let name = String::from_utf8_lossy(qname.local_name().as_ref()).into_owned();
    let prefix = qname
        .prefix()
        .map(|prefix| String::from_utf8_lossy(prefix.as_ref()).into_owned());
    let namespace = match resolution {
        ResolveResult::Bound(namespace) => {
            Some(String::from_utf8_lossy(namespace.as_ref()).into_owned())
        }
        _ => None,
    };

    let mut attributes = Vec::new();
    for attribute in tag.attributes() {
        let attribute = attribute.map_err(|error| ParseError {
            line,
            message: error.to_string(),
        })?;
        let value = attribute.unescape_value().map_err(|error| ParseError {
            line,
            message: error.to_string(),
        })?;
        attributes.push(XmlAttribute {
            qname: String::from_utf8_lossy(attribute.key.as_ref()).into_owned(),
            value: value.into_owned(),
        });
    }

    Ok(LocatedElement {
        name,
        prefix,
        namespace,
        attributes,
        line,
        children: Vec::new(),
    })
}

fn line_at(source: &str, offset: usize) -> u32 {
    let end = offset.min(source.len());
    1 + source.as_bytes()[..end]
        .iter()
        .filter(|byte| **byte == b'\n')
        .count() as u32
}
