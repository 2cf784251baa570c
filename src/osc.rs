//! Parses an osmChange (OSC) document into an ordered list of
//! `(block kind, element)` pairs.
//!
//! This is explicitly *not* part of the diff composition engine proper
//! (§1 lists OSC parsing as an external-collaborator concern, bounded by
//! the abstract interface `OscReconciler` consumes) but the crate needs a
//! real parser to be runnable, so it lives in its own module next to
//! (not inside) the reconciler it feeds.

use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::EngineError;
use crate::model::{placeholder_metadata, ActionKind, Element, Id, Member, Metadata, NdRef, Node, Relation, Variant, Way};

pub fn parse_osc<R: BufRead>(input: R) -> Result<Vec<(ActionKind, Element)>, EngineError> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text = true;

    let mut out = Vec::new();
    let mut current_block: Option<ActionKind> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(tag) => {
                let name = local_name(&tag);
                if let Some(kind) = block_kind(&name) {
                    current_block = Some(kind);
                    continue;
                }
                if let Some(variant) = Variant::from_tag(&name) {
                    let elem = parse_element(&mut reader, &tag, variant)?;
                    if let Some(kind) = current_block {
                        out.push((kind, elem));
                    }
                }
            }
            Event::Empty(tag) => {
                let name = local_name(&tag);
                if let Some(variant) = Variant::from_tag(&name) {
                    let elem = build_element(variant, &tag, Vec::new())?;
                    if let Some(kind) = current_block {
                        out.push((kind, elem));
                    }
                }
            }
            Event::End(tag) => {
                let name = local_name(&tag);
                if block_kind(&name).is_some() {
                    current_block = None;
                }
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}

fn block_kind(name: &str) -> Option<ActionKind> {
    match name {
        "create" => Some(ActionKind::Create),
        "modify" => Some(ActionKind::Modify),
        "delete" => Some(ActionKind::Delete),
        _ => None,
    }
}

fn local_name(tag: &BytesStart) -> String {
    String::from_utf8_lossy(tag.local_name().as_ref()).into_owned()
}

/// Reads everything up to (and including) the matching end tag for a
/// `node`/`way`/`relation` start element, collecting `nd`/`tag`/`member`
/// children in document order.
fn parse_element<R: BufRead>(
    reader: &mut Reader<R>,
    start: &BytesStart,
    variant: Variant,
) -> Result<Element, EngineError> {
    let mut children = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Empty(child) | Event::Start(child) => {
                children.push(child.to_owned());
            }
            Event::End(tag) if tag.local_name().as_ref() == start.local_name().as_ref() => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    build_element(variant, start, children)
}

fn build_element(
    variant: Variant,
    start: &BytesStart,
    children: Vec<BytesStart<'static>>,
) -> Result<Element, EngineError> {
    let id: Id = attr_i64(start, "id").unwrap_or(0);
    let version: u32 = attr_u32(start, "version").unwrap_or(1);
    let meta = Metadata {
        version,
        uid: attr_i64(start, "uid").unwrap_or(0),
        user: attr_string(start, "user").unwrap_or_default(),
        changeset: attr_i64(start, "changeset").unwrap_or(0),
        timestamp: attr_timestamp(start).unwrap_or_else(|| placeholder_metadata(version).timestamp),
    };

    let elem = match variant {
        Variant::Node => Element::Node(Node {
            id,
            version,
            meta,
            lat: attr_f64(start, "lat").unwrap_or(0.0),
            lon: attr_f64(start, "lon").unwrap_or(0.0),
            tags: collect_tags(&children),
        }),
        Variant::Way => Element::Way(Way {
            id,
            version,
            meta,
            nodes: children
                .iter()
                .filter(|c| local_name(c) == "nd")
                .filter_map(|c| attr_i64(c, "ref"))
                .map(NdRef::new)
                .collect(),
            tags: collect_tags(&children),
        }),
        Variant::Relation => Element::Relation(Relation {
            id,
            version,
            meta,
            members: children
                .iter()
                .filter(|c| local_name(c) == "member")
                .filter_map(|c| {
                    let ref_id = attr_i64(c, "ref")?;
                    let member_type = Variant::from_tag(&attr_string(c, "type")?)?;
                    let role = attr_string(c, "role").unwrap_or_default();
                    Some(Member::new(member_type, ref_id, role))
                })
                .collect(),
            tags: collect_tags(&children),
        }),
    };
    Ok(elem)
}

fn collect_tags(children: &[BytesStart<'static>]) -> Vec<(String, String)> {
    children
        .iter()
        .filter(|c| local_name(c) == "tag")
        .filter_map(|c| Some((attr_string(c, "k")?, attr_string(c, "v").unwrap_or_default())))
        .collect()
}

fn attr_string(tag: &BytesStart, key: &str) -> Option<String> {
    tag.try_get_attribute(key)
        .ok()
        .flatten()
        .map(|a| a.unescape_value().unwrap_or_default().into_owned())
}

fn attr_i64(tag: &BytesStart, key: &str) -> Option<i64> {
    attr_string(tag, key)?.parse().ok()
}

fn attr_u32(tag: &BytesStart, key: &str) -> Option<u32> {
    attr_string(tag, key)?.parse().ok()
}

fn attr_f64(tag: &BytesStart, key: &str) -> Option<f64> {
    attr_string(tag, key)?.parse().ok()
}

fn attr_timestamp(tag: &BytesStart) -> Option<chrono::DateTime<chrono::Utc>> {
    let raw = attr_string(tag, "timestamp")?;
    chrono::DateTime::parse_from_rfc3339(&raw)
        .ok()
        .map(|dt| dt.with_timezone(&chrono::Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_single_create_block() {
        let osc = br#"<osmChange><create><node id="1" version="1" lat="10.0" lon="20.0" user="u" uid="5" changeset="7" timestamp="2020-01-01T00:00:00Z"/></create></osmChange>"#;
        let blocks = parse_osc(&osc[..]).unwrap();
        assert_eq!(blocks.len(), 1);
        let (kind, elem) = &blocks[0];
        assert_eq!(*kind, ActionKind::Create);
        match elem {
            Element::Node(n) => {
                assert_eq!(n.id, 1);
                assert_eq!(n.lat, 10.0);
                assert_eq!(n.lon, 20.0);
            }
            _ => panic!("expected node"),
        }
    }

    #[test]
    fn parses_way_with_nd_and_tag_children() {
        let osc = br#"<osmChange><modify><way id="50" version="2" user="u" uid="1" changeset="1" timestamp="2020-01-01T00:00:00Z"><nd ref="10"/><nd ref="12"/><tag k="highway" v="residential"/></way></modify></osmChange>"#;
        let blocks = parse_osc(&osc[..]).unwrap();
        match &blocks[0].1 {
            Element::Way(w) => {
                assert_eq!(w.nodes.iter().map(|n| n.node_id).collect::<Vec<_>>(), vec![10, 12]);
                assert_eq!(w.tags, vec![("highway".to_string(), "residential".to_string())]);
            }
            _ => panic!("expected way"),
        }
    }

    #[test]
    fn empty_osc_yields_no_blocks() {
        let blocks = parse_osc(&b"<osmChange></osmChange>"[..]).unwrap();
        assert!(blocks.is_empty());
    }
}
