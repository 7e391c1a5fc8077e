//! Parser for the Twinsoft tag export document.
//!
//! Folds scanner events into [`ExportedTag`] records. Child elements may
//! appear in any order; unknown elements (Presentation, WriteAllowed,
//! DisplayFormat and friends) are skipped, subtrees included.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::export::xml::{XmlEvent, XmlScanner};
use crate::export::ExportedTag;

const ROOT_ELEMENT: &str = "TWinSoftTags";
const TAG_ELEMENT: &str = "Tag";
const NAME_ATTRIBUTE: &str = "Name";

/// Parses a whole export document into tag records.
pub fn parse_snapshot(source: &str, path: &str) -> Result<Vec<ExportedTag>> {
    let mut scanner = XmlScanner::new(source);

    match next_event(&mut scanner, path)? {
        Some(XmlEvent::Open { name, .. }) if name == ROOT_ELEMENT => {}
        _ => {
            return Err(Error::malformed(
                path,
                scanner.line(),
                format!("expected <{}> root element", ROOT_ELEMENT),
            ));
        }
    }

    let mut tags = Vec::new();
    loop {
        match next_event(&mut scanner, path)? {
            Some(XmlEvent::Open {
                name,
                attributes,
                self_closing,
            }) if name == TAG_ELEMENT => {
                tags.push(parse_tag(&mut scanner, &attributes, self_closing, path)?);
            }
            Some(XmlEvent::Close { name }) if name == ROOT_ELEMENT => break,
            Some(_) => {
                return Err(Error::malformed(
                    path,
                    scanner.line(),
                    format!("unexpected content inside <{}>", ROOT_ELEMENT),
                ));
            }
            None => {
                return Err(Error::malformed(
                    path,
                    scanner.line(),
                    format!("<{}> is never closed", ROOT_ELEMENT),
                ));
            }
        }
    }

    if tags.is_empty() {
        return Err(Error::malformed(
            path,
            scanner.line(),
            format!("<{}> not found in document", TAG_ELEMENT),
        ));
    }
    Ok(tags)
}

fn parse_tag(
    scanner: &mut XmlScanner,
    attributes: &[(String, String)],
    self_closing: bool,
    path: &str,
) -> Result<ExportedTag> {
    let name = attributes
        .iter()
        .find(|(key, _)| key == NAME_ATTRIBUTE)
        .map(|(_, value)| value.clone())
        .ok_or_else(|| {
            Error::malformed(
                path,
                scanner.line(),
                format!(
                    "attribute {} not found, e.g. <{} {}=>",
                    NAME_ATTRIBUTE, TAG_ELEMENT, NAME_ATTRIBUTE
                ),
            )
        })?;

    let mut children: HashMap<String, String> = HashMap::new();
    if !self_closing {
        loop {
            match next_event(scanner, path)? {
                Some(XmlEvent::Open {
                    name: child,
                    self_closing,
                    ..
                }) => {
                    let text = if self_closing {
                        String::new()
                    } else {
                        element_text(scanner, &child, path)?
                    };
                    children.insert(child, text);
                }
                Some(XmlEvent::Close { name: closed }) if closed == TAG_ELEMENT => break,
                Some(_) => {
                    return Err(Error::malformed(
                        path,
                        scanner.line(),
                        format!("unexpected content inside <{} {}=\"{}\">", TAG_ELEMENT, NAME_ATTRIBUTE, name),
                    ));
                }
                None => {
                    return Err(Error::malformed(
                        path,
                        scanner.line(),
                        format!("<{}> element for {} is never closed", TAG_ELEMENT, name),
                    ));
                }
            }
        }
    }

    let address_text = required(&children, "ModbusAddress", &name, scanner, path)?;
    let address = address_text.trim().parse().map_err(|_| {
        Error::malformed(
            path,
            scanner.line(),
            format!("tag {} has non-numeric ModbusAddress '{}'", name, address_text),
        )
    })?;
    let format_text = required(&children, "Format", &name, scanner, path)?;
    let format = format_text.trim().parse().map_err(|_| {
        Error::malformed(
            path,
            scanner.line(),
            format!("tag {} has unknown Format '{}'", name, format_text),
        )
    })?;
    // Empty <Signed /> means unsigned, same as an explicit False
    let signed = children.get("Signed").map(String::as_str) == Some("True");
    let text_size = match children.get("TextTagSize").map(String::as_str) {
        None | Some("") => None,
        Some(raw) => Some(raw.trim().parse().map_err(|_| {
            Error::malformed(
                path,
                scanner.line(),
                format!("tag {} has non-numeric TextTagSize '{}'", name, raw),
            )
        })?),
    };

    Ok(ExportedTag {
        name,
        group: children.get("Group").cloned().unwrap_or_default(),
        format,
        signed,
        address,
        comment: children.get("Comment").cloned().unwrap_or_default(),
        initial_value: children
            .get("InitalValue")
            .filter(|v| !v.is_empty())
            .cloned(),
        text_size,
    })
}

/// Collects the text of a simple element, skipping any nested subtree.
fn element_text(scanner: &mut XmlScanner, element: &str, path: &str) -> Result<String> {
    let mut text = String::new();
    let mut depth = 0usize;
    loop {
        match next_event(scanner, path)? {
            Some(XmlEvent::Text(t)) => {
                if depth == 0 {
                    text.push_str(&t);
                }
            }
            Some(XmlEvent::Open { self_closing, .. }) => {
                if !self_closing {
                    depth += 1;
                }
            }
            Some(XmlEvent::Close { name }) => {
                if depth == 0 {
                    if name == element {
                        return Ok(text);
                    }
                    return Err(Error::malformed(
                        path,
                        scanner.line(),
                        format!("mismatched closing tag </{}> inside <{}>", name, element),
                    ));
                }
                depth -= 1;
            }
            None => {
                return Err(Error::malformed(
                    path,
                    scanner.line(),
                    format!("<{}> is never closed", element),
                ));
            }
        }
    }
}

fn required(
    children: &HashMap<String, String>,
    element: &str,
    tag: &str,
    scanner: &XmlScanner,
    path: &str,
) -> Result<String> {
    children.get(element).cloned().ok_or_else(|| {
        Error::malformed(
            path,
            scanner.line(),
            format!("tag {} is missing the <{}> element", tag, element),
        )
    })
}

fn next_event(scanner: &mut XmlScanner, path: &str) -> Result<Option<XmlEvent>> {
    scanner.next_event().map_err(|e| match e {
        Error::SourceMalformed { line, message, .. } => Error::malformed(path, line, message),
        other => other,
    })
}
