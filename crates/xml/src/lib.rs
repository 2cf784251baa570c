//! A minimal in-memory XML element tree.
//!
//! This is deliberately small: attributes are an ordered `Vec` (duplicate
//! keys are never produced by this crate's own writers, but nothing here
//! enforces uniqueness), children are `Element`s, and `text`/`tail` mirror
//! the mixed-content model `xml.etree.ElementTree` uses so that the
//! pretty-printer can be a direct, recognizable port of the effbot
//! indentation routine rather than a from-scratch layout algorithm.

use quick_xml::escape::escape;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: Option<String>,
    pub tail: Option<String>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Element {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
            text: None,
            tail: None,
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        if let Some(existing) = self.attrs.iter_mut().find(|(k, _)| *k == key) {
            existing.1 = value;
        } else {
            self.attrs.push((key, value));
        }
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn push(&mut self, child: Element) -> &mut Self {
        self.children.push(child);
        self
    }

    /// Insert `child` as the first child, matching `Element.insert(0, ...)`
    /// in the original implementation (used to place `<bounds>`, `<meta>`,
    /// `<note>`).
    pub fn insert_first(&mut self, child: Element) {
        self.children.insert(0, child);
    }

    /// Recursive descendant search by tag name, equivalent to
    /// `elem.findall(".//tag")`.
    pub fn find_all_descendants<'a>(&'a self, tag: &str) -> Vec<&'a Element> {
        let mut out = Vec::new();
        for child in &self.children {
            if child.tag == tag {
                out.push(child);
            }
            out.extend(child.find_all_descendants(tag));
        }
        out
    }
}

/// Recursive 2-space indentation, applied in place.
///
/// Ported from the effbot prettyprint recipe
/// (http://effbot.org/zone/element-lib.htm#prettyprint), the same routine
/// the source generator used verbatim in two places.
pub fn indent(elem: &mut Element, level: usize) {
    let i = format!("\n{}", "  ".repeat(level));
    if !elem.children.is_empty() {
        if elem.text.as_deref().map_or(true, |t| t.trim().is_empty()) {
            elem.text = Some(format!("{}  ", i));
        }
        let last_idx = elem.children.len() - 1;
        for (idx, child) in elem.children.iter_mut().enumerate() {
            indent(child, level + 1);
            if idx != last_idx {
                if child.tail.as_deref().map_or(true, |t| t.trim().is_empty()) {
                    child.tail = Some(format!("{}  ", i));
                }
            }
        }
        let last = &mut elem.children[last_idx];
        if last.tail.as_deref().map_or(true, |t| t.trim().is_empty()) {
            last.tail = Some(i.clone());
        }
    } else if level > 0 && elem.tail.as_deref().map_or(true, |t| t.trim().is_empty()) {
        elem.tail = Some(i);
    }
}

/// Serialize the tree to an XML byte string, honoring `text`/`tail` set by
/// [`indent`]. Always emits an XML declaration, matching
/// `ElementTree.write`'s default.
pub fn to_xml_string(root: &Element) -> String {
    let mut out = String::from("<?xml version='1.0' encoding='utf-8'?>\n");
    write_element(&mut out, root);
    out
}

fn write_element(out: &mut String, elem: &Element) {
    out.push('<');
    out.push_str(&elem.tag);
    for (k, v) in &elem.attrs {
        out.push(' ');
        out.push_str(k);
        out.push_str("=\"");
        out.push_str(&escape(v));
        out.push('"');
    }
    if elem.children.is_empty() && elem.text.is_none() {
        out.push_str(" />");
    } else {
        out.push('>');
        if let Some(text) = &elem.text {
            out.push_str(&escape(text));
        }
        for child in &elem.children {
            write_element(out, child);
        }
        out.push_str("</");
        out.push_str(&elem.tag);
        out.push('>');
    }
    if let Some(tail) = &elem.tail {
        out.push_str(tail);
    }
}
