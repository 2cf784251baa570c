//! Converts the typed, augmented model into the generic XML tree that
//! gets pretty-printed and serialized (§3 diff tree shape, §4.4 passes
//! 4/6/7).

use osm_adiff_xml::Element as XmlElement;

use crate::bounds::bounds_for;
use crate::model::{ActionKind, DiffAction, Element, Metadata};

fn format7(v: f64) -> String {
    format!("{:.7}", v)
}

fn format_timestamp(meta: &Metadata) -> String {
    meta.timestamp.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

fn set_metadata(el: &mut XmlElement, id: i64, version: u32, meta: &Metadata) {
    el.set_attr("id", id.to_string());
    el.set_attr("version", version.to_string());
    el.set_attr("user", meta.user.clone());
    el.set_attr("uid", meta.uid.to_string());
    el.set_attr("changeset", meta.changeset.to_string());
    el.set_attr("timestamp", format_timestamp(meta));
}

fn render_tags(el: &mut XmlElement, tags: &[(String, String)]) {
    for (k, v) in tags {
        el.push(XmlElement::new("tag").with_attr("k", k.clone()).with_attr("v", v.clone()));
    }
}

/// Renders one OSM element (node, way, or relation) to its XML form,
/// inserting `<bounds>` as the first child when it has any resolvable
/// `<nd>` descendant (§3 Invariant 4).
pub fn render_element(elem: &Element) -> XmlElement {
    let mut el = match elem {
        Element::Node(n) => {
            let mut el = XmlElement::new("node");
            el.set_attr("lat", format7(n.lat));
            el.set_attr("lon", format7(n.lon));
            set_metadata(&mut el, n.id, n.version, &n.meta);
            render_tags(&mut el, &n.tags);
            el
        }
        Element::Way(w) => {
            let mut el = XmlElement::new("way");
            set_metadata(&mut el, w.id, w.version, &w.meta);
            for nd in &w.nodes {
                let mut nd_el = XmlElement::new("nd").with_attr("ref", nd.node_id.to_string());
                if let Some((lon, lat)) = nd.coord {
                    nd_el.set_attr("lon", format7(lon));
                    nd_el.set_attr("lat", format7(lat));
                }
                el.push(nd_el);
            }
            render_tags(&mut el, &w.tags);
            el
        }
        Element::Relation(r) => {
            let mut el = XmlElement::new("relation");
            set_metadata(&mut el, r.id, r.version, &r.meta);
            for m in &r.members {
                let mut mem_el = XmlElement::new("member")
                    .with_attr("ref", m.ref_id.to_string())
                    .with_attr("role", m.role.clone())
                    .with_attr("type", m.member_type.as_tag());
                if let Some((lon, lat)) = m.node_coord {
                    mem_el.set_attr("lon", format7(lon));
                    mem_el.set_attr("lat", format7(lat));
                }
                if let Some(points) = &m.way_expansion {
                    for (lon, lat) in points {
                        mem_el.push(
                            XmlElement::new("nd")
                                .with_attr("lon", format7(*lon))
                                .with_attr("lat", format7(*lat)),
                        );
                    }
                }
                el.push(mem_el);
            }
            render_tags(&mut el, &r.tags);
            el
        }
    };

    if let Some(bounds) = bounds_for(elem) {
        el.insert_first(
            XmlElement::new("bounds")
                .with_attr("minlat", format7(bounds.minlat))
                .with_attr("minlon", format7(bounds.minlon))
                .with_attr("maxlat", format7(bounds.maxlat))
                .with_attr("maxlon", format7(bounds.maxlon)),
        );
    }

    el
}

/// Renders the `<action>` wrapper around one reconciled diff entry.
/// For `delete`, the `<new>` side is a childless stub with
/// `visible="false"` (§3 Invariant 2) — it is never given a `<bounds>`
/// because it is always childless.
pub fn render_action(action: &DiffAction) -> XmlElement {
    let mut a = XmlElement::new("action").with_attr("type", action.kind.as_tag());

    match action.kind {
        ActionKind::Create => {
            a.push(render_element(&action.new));
        }
        ActionKind::Modify => {
            let mut old_el = XmlElement::new("old");
            old_el.push(render_element(
                action.old.as_ref().expect("modify action always has an old side"),
            ));
            let mut new_el = XmlElement::new("new");
            new_el.push(render_element(&action.new));
            a.push(old_el);
            a.push(new_el);
        }
        ActionKind::Delete => {
            let mut old_el = XmlElement::new("old");
            old_el.push(render_element(
                action.old.as_ref().expect("delete action always has an old side"),
            ));
            let mut new_el = XmlElement::new("new");
            let mut stub = render_element(&action.new);
            stub.children.clear();
            stub.set_attr("visible", "false");
            new_el.push(stub);
            a.push(old_el);
            a.push(new_el);
        }
    }

    a
}

/// Builds `<meta osm_base=... replication_id=... replication_url=.../>`,
/// omitting (with a warning logged by the caller) whichever of the
/// optional attributes is unavailable (§4.4 pass 6).
pub fn render_meta(
    osm_base: Option<&chrono::DateTime<chrono::Utc>>,
    replication_id: Option<u64>,
    replication_url: Option<&str>,
) -> XmlElement {
    let mut meta = XmlElement::new("meta");
    if let Some(ts) = osm_base {
        meta.set_attr("osm_base", ts.format("%Y-%m-%dT%H:%M:%SZ").to_string());
    }
    if let Some(id) = replication_id {
        meta.set_attr("replication_id", id.to_string());
    }
    if let Some(url) = replication_url {
        meta.set_attr("replication_url", url.to_string());
    }
    meta
}

pub fn render_note() -> XmlElement {
    let mut note = XmlElement::new("note");
    note.text = Some(
        "The data included in this document is from www.openstreetmap.org. The data is made available under ODbL."
            .to_string(),
    );
    note
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{placeholder_metadata, NdRef, Node, Way};

    #[test]
    fn node_lat_lon_have_seven_fractional_digits() {
        let n = Element::Node(Node {
            id: 1,
            version: 1,
            meta: placeholder_metadata(1),
            lat: 10.0,
            lon: 20.0,
            tags: Vec::new(),
        });
        let el = render_element(&n);
        assert_eq!(el.attr("lat"), Some("10.0000000"));
        assert_eq!(el.attr("lon"), Some("20.0000000"));
    }

    #[test]
    fn way_without_coords_has_no_bounds() {
        let w = Element::Way(Way {
            id: 1,
            version: 1,
            meta: placeholder_metadata(1),
            nodes: vec![NdRef::new(1)],
            tags: Vec::new(),
        });
        let el = render_element(&w);
        assert!(el.children.iter().all(|c| c.tag != "bounds"));
    }

    #[test]
    fn way_with_coords_gets_bounds_as_first_child() {
        let mut nodes = vec![NdRef::new(1), NdRef::new(2)];
        nodes[0].coord = Some((1.0, 2.0));
        nodes[1].coord = Some((3.0, 4.0));
        let w = Element::Way(Way {
            id: 1,
            version: 1,
            meta: placeholder_metadata(1),
            nodes,
            tags: Vec::new(),
        });
        let el = render_element(&w);
        assert_eq!(el.children[0].tag, "bounds");
    }

    #[test]
    fn delete_new_side_is_childless_and_invisible() {
        let n = Element::Node(Node {
            id: 1,
            version: 1,
            meta: placeholder_metadata(1),
            lat: 10.0,
            lon: 20.0,
            tags: vec![("k".into(), "v".into())],
        });
        let action = DiffAction {
            kind: ActionKind::Delete,
            old: Some(n.clone()),
            new: n,
        };
        let rendered = render_action(&action);
        let new_el = &rendered.children[1];
        assert_eq!(new_el.tag, "new");
        let stub = &new_el.children[0];
        assert!(stub.children.is_empty());
        assert_eq!(stub.attr("visible"), Some("false"));
    }
}
