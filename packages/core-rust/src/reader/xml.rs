//! XML payloads.
//!
//! The payload is parsed into a small element tree. A dotted path selects the
//! repeated elements, and each selected element becomes a row by grouping its
//! children by tag name:
//!
//! - a tag seen once becomes a scalar (leaf text) or a nested row
//! - a tag seen more than once becomes an array in document order
//!
//! Leaf text is coerced to a 32-bit integer, a 64-bit integer or a float,
//! whichever parses first, and otherwise kept as a trimmed string.
//!
//! Path navigation follows only the first match of each intermediate segment.
//! With `<a><b><c/></b><b><c/></b></a>`, the path `b.c` reaches only the `c`
//! under the first `b`.

use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::{Map, Number, Value as Json};
use tracing::debug;

use super::{lookup_dotted, strip_root, ResponseFormat, Row, RowReader};

/// Reader for `application/xml` and `text/xml` payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlReader;

impl RowReader for XmlReader {
    fn extract_array(&self, payload: &str, path: &str) -> Vec<Row> {
        let Some(root) = parse_document(payload) else {
            return Vec::new();
        };
        select(&root, path)
            .into_iter()
            .map(|element| Row::new(ResponseFormat::Xml, element_to_row(element)))
            .collect()
    }

    fn extract_field(&self, row: &Row, _row_index: usize, path: &str) -> Json {
        lookup_dotted(row.data(), path)
    }
}

#[derive(Debug, Default)]
struct Element {
    name: String,
    children: Vec<Element>,
    text: String,
}

impl Element {
    fn named(name: &[u8]) -> Self {
        Self {
            name: String::from_utf8_lossy(name).into_owned(),
            ..Self::default()
        }
    }
}

/// Parses a document into its root element. `None` for malformed input.
fn parse_document(xml: &str) -> Option<Element> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(Element::named(e.name().as_ref())),
            Ok(Event::Empty(e)) => {
                attach(&mut stack, &mut root, Element::named(e.name().as_ref()))?;
            }
            Ok(Event::End(_)) => {
                let element = stack.pop()?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::Text(t)) => {
                if let Some(open) = stack.last_mut() {
                    match t.unescape() {
                        Ok(text) => open.text.push_str(&text),
                        Err(e) => {
                            debug!(error = %e, "malformed XML text, no rows");
                            return None;
                        }
                    }
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(open) = stack.last_mut() {
                    open.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(
                    error = %e,
                    position = reader.buffer_position(),
                    "malformed XML payload, no rows"
                );
                return None;
            }
        }
    }

    if !stack.is_empty() {
        debug!(unclosed = stack.len(), "truncated XML payload, no rows");
        return None;
    }
    root
}

/// Adds a closed element to its parent, or makes it the root.
/// A second top-level element makes the document malformed.
fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Option<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
    } else if root.is_none() {
        *root = Some(element);
    } else {
        debug!("multiple XML root elements, no rows");
        return None;
    }
    Some(())
}

/// Resolves `path` to the target element set.
fn select<'a>(root: &'a Element, path: &str) -> Vec<&'a Element> {
    let mut segments: Vec<&str> = strip_root(path)
        .split('.')
        .filter(|s| !s.is_empty())
        .collect();
    if segments.first() == Some(&root.name.as_str()) {
        segments.remove(0);
    }
    if segments.is_empty() {
        return root.children.iter().collect();
    }

    let mut current = root;
    let last = segments.len() - 1;
    for (depth, segment) in segments.into_iter().enumerate() {
        let matches: Vec<&Element> = current
            .children
            .iter()
            .filter(|child| child.name == segment)
            .collect();
        let Some(&first) = matches.first() else {
            return Vec::new();
        };
        if depth == last {
            return matches;
        }
        current = first;
    }
    Vec::new()
}

/// Converts an element into a row by grouping its children by tag.
fn element_to_row(element: &Element) -> Json {
    let mut groups: Vec<(&str, Vec<&Element>)> = Vec::new();
    for child in &element.children {
        match groups.iter_mut().find(|(name, _)| *name == child.name) {
            Some((_, members)) => members.push(child),
            None => groups.push((child.name.as_str(), vec![child])),
        }
    }

    let mut row = Map::with_capacity(groups.len());
    for (name, members) in groups {
        let value = match members.as_slice() {
            [single] => node_value(single),
            _ => Json::Array(members.into_iter().map(node_value).collect()),
        };
        row.insert(name.to_string(), value);
    }
    Json::Object(row)
}

fn node_value(element: &Element) -> Json {
    if element.children.is_empty() {
        coerce_leaf(element.text.trim())
    } else {
        element_to_row(element)
    }
}

/// Narrowest numeric interpretation of leaf text, or the text itself.
pub(crate) fn coerce_leaf(text: &str) -> Json {
    if let Ok(i) = text.parse::<i32>() {
        return Json::from(i);
    }
    if let Ok(i) = text.parse::<i64>() {
        return Json::from(i);
    }
    if let Some(n) = text.parse::<f64>().ok().and_then(Number::from_f64) {
        return Json::Number(n);
    }
    Json::String(text.to_string())
}
