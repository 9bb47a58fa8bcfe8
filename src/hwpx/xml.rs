use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{HwpxError, Result};

#[derive(Clone, Debug, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

#[derive(Clone, Debug)]
pub struct XmlPart {
    pub name: String,
    pub root: XmlElement,
}

/// Parses one decoded XML part into an element tree.
///
/// Whitespace is kept as-is; text nodes outside the root element are dropped.
pub fn parse_xml_part(name: &str, xml: &str) -> Result<XmlPart> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let pos = reader.buffer_position();
        let ev = reader
            .read_event()
            .map_err(|e| HwpxError::malformed(name, format!("at byte {pos}: {e}")))?;
        match ev {
            Event::Eof => break,
            Event::Start(s) => {
                stack.push(XmlElement {
                    name: bytes_to_string(s.name().as_ref()),
                    attrs: collect_attrs(name, &s)?,
                    children: Vec::new(),
                });
            }
            Event::Empty(s) => {
                let el = XmlElement {
                    name: bytes_to_string(s.name().as_ref()),
                    attrs: collect_attrs(name, &s)?,
                    children: Vec::new(),
                };
                attach(name, &mut stack, &mut root, el)?;
            }
            Event::End(e) => {
                let el = stack.pop().ok_or_else(|| {
                    HwpxError::malformed(
                        name,
                        format!("unexpected </{}>", bytes_to_string(e.name().as_ref())),
                    )
                })?;
                attach(name, &mut stack, &mut root, el)?;
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    let txt = t
                        .unescape()
                        .map_err(|e| HwpxError::malformed(name, format!("text: {e}")))?;
                    push_text(top, &txt);
                }
            }
            Event::CData(t) => {
                if let Some(top) = stack.last_mut() {
                    push_text(top, &bytes_to_string(t.into_inner()));
                }
            }
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(HwpxError::malformed(
            name,
            format!("unclosed element <{}>", open.name),
        ));
    }
    let root = root.ok_or_else(|| HwpxError::malformed(name, "no root element"))?;
    Ok(XmlPart {
        name: name.to_string(),
        root,
    })
}

fn attach(
    part: &str,
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    el: XmlElement,
) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(XmlNode::Element(el));
        return Ok(());
    }
    if root.is_some() {
        return Err(HwpxError::malformed(
            part,
            format!("second root element <{}>", el.name),
        ));
    }
    *root = Some(el);
    Ok(())
}

fn push_text(el: &mut XmlElement, text: &str) {
    if let Some(XmlNode::Text(prev)) = el.children.last_mut() {
        prev.push_str(text);
    } else {
        el.children.push(XmlNode::Text(text.to_string()));
    }
}

fn collect_attrs(part: &str, s: &BytesStart<'_>) -> Result<Vec<(String, String)>> {
    let mut attrs: Vec<(String, String)> = Vec::new();
    for a in s.attributes() {
        let a = a.map_err(|e| HwpxError::malformed(part, format!("attribute: {e}")))?;
        let key = bytes_to_string(a.key.as_ref());
        let val = a
            .unescape_value()
            .map_err(|e| HwpxError::malformed(part, format!("attribute {key}: {e}")))?
            .into_owned();
        attrs.push((key, val));
    }
    Ok(attrs)
}

fn bytes_to_string(bytes: impl AsRef<[u8]>) -> String {
    String::from_utf8_lossy(bytes.as_ref()).into_owned()
}

pub fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

impl XmlElement {
    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    pub fn is(&self, local: &str) -> bool {
        self.local_name() == local
    }

    /// Exact qualified name first, then the first attribute with the same local name.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .or_else(|| self.attrs.iter().find(|(k, _)| local_name(k) == key))
            .map(|(_, v)| v.as_str())
    }

    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|c| match c {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    pub fn child(&self, local: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.is(local))
    }

    pub fn children_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.elements().filter(move |e| e.is(local))
    }

    /// First descendant (document order) with the given local name.
    pub fn find(&self, local: &str) -> Option<&XmlElement> {
        for el in self.elements() {
            if el.is(local) {
                return Some(el);
            }
            if let Some(found) = el.find(local) {
                return Some(found);
            }
        }
        None
    }

    /// All descendants with the given local name, in document order.
    pub fn descendants(&self, local: &str) -> Vec<&XmlElement> {
        let mut out = Vec::new();
        collect_descendants(self, local, None, &mut out);
        out
    }

    /// Like [`XmlElement::find`], but never looks inside `stop_at` elements.
    pub fn find_within(&self, local: &str, stop_at: &str) -> Option<&XmlElement> {
        for el in self.elements() {
            if el.is(local) {
                return Some(el);
            }
            if el.is(stop_at) {
                continue;
            }
            if let Some(found) = el.find_within(local, stop_at) {
                return Some(found);
            }
        }
        None
    }

    /// Like [`XmlElement::descendants`], but never looks inside `stop_at` elements.
    pub fn descendants_within(&self, local: &str, stop_at: &str) -> Vec<&XmlElement> {
        let mut out = Vec::new();
        collect_descendants(self, local, Some(stop_at), &mut out);
        out
    }

    /// Concatenated text nodes that are direct children of this element.
    pub fn direct_text(&self) -> String {
        let mut out = String::new();
        for c in &self.children {
            if let XmlNode::Text(t) = c {
                out.push_str(t);
            }
        }
        out
    }
}

fn collect_descendants<'a>(
    el: &'a XmlElement,
    local: &str,
    stop_at: Option<&str>,
    out: &mut Vec<&'a XmlElement>,
) {
    for child in el.elements() {
        if child.is(local) {
            out.push(child);
        }
        if stop_at.is_some_and(|s| child.is(s)) {
            continue;
        }
        collect_descendants(child, local, stop_at, out);
    }
}
