//! §4.2 — rebuilds the pre-change state of an element from the snapshot.

use crate::error::EngineError;
use crate::model::{placeholder_metadata, Element, Id, Member, NdRef, Node, Relation, Variant, Way};
use crate::snapshot::SnapshotView;

/// Reconstructs the snapshot state of `variant/id`.
///
/// A node with no full record but a location record (a tagless node) is
/// still reconstructible — its metadata falls back to the uniform
/// placeholder policy (SPEC_FULL.md §9). An id with neither is
/// [`EngineError::IncompleteElement`].
pub fn reconstruct(
    variant: Variant,
    id: Id,
    snapshot: &dyn SnapshotView,
) -> Result<Element, EngineError> {
    match variant {
        Variant::Node => reconstruct_node(id, snapshot),
        Variant::Way => reconstruct_way(id, snapshot),
        Variant::Relation => reconstruct_relation(id, snapshot),
    }
}

fn incomplete(variant: Variant, id: Id) -> EngineError {
    EngineError::IncompleteElement {
        variant: variant.as_tag(),
        id,
    }
}

fn reconstruct_node(id: Id, snapshot: &dyn SnapshotView) -> Result<Element, EngineError> {
    if let Some(record) = snapshot.node(id) {
        return Ok(Element::Node(Node {
            id,
            version: record.meta.version,
            meta: record.meta,
            lat: record.lat,
            lon: record.lon,
            tags: record.tags,
        }));
    }
    if let Some(loc) = snapshot.location(id) {
        return Ok(Element::Node(Node {
            id,
            version: loc.version,
            meta: placeholder_metadata(loc.version),
            lat: loc.lat,
            lon: loc.lon,
            tags: Vec::new(),
        }));
    }
    Err(incomplete(Variant::Node, id))
}

fn reconstruct_way(id: Id, snapshot: &dyn SnapshotView) -> Result<Element, EngineError> {
    let record = snapshot.way(id).ok_or_else(|| incomplete(Variant::Way, id))?;
    Ok(Element::Way(Way {
        id,
        version: record.meta.version,
        meta: record.meta,
        nodes: record.nodes.into_iter().map(NdRef::new).collect(),
        tags: record.tags,
    }))
}

fn reconstruct_relation(id: Id, snapshot: &dyn SnapshotView) -> Result<Element, EngineError> {
    let record = snapshot
        .relation(id)
        .ok_or_else(|| incomplete(Variant::Relation, id))?;
    Ok(Element::Relation(Relation {
        id,
        version: record.meta.version,
        meta: record.meta,
        members: record
            .members
            .into_iter()
            .map(|m| Member::new(m.member_type, m.ref_id, m.role))
            .collect(),
        tags: record.tags,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem_snapshot::MemSnapshot;

    #[test]
    fn tagless_node_gets_placeholder_metadata() {
        let snap = MemSnapshot::from_slice(
            br#"{"locations": [{"id": 7, "lat": 1.0, "lon": 2.0, "version": 3}]}"#,
        )
        .unwrap();
        let elem = reconstruct(Variant::Node, 7, &snap).unwrap();
        match elem {
            Element::Node(n) => {
                assert_eq!(n.version, 3);
                assert_eq!(n.meta.user, "");
                assert_eq!(n.meta.uid, 0);
            }
            _ => panic!("expected node"),
        }
    }

    #[test]
    fn missing_element_is_incomplete() {
        let snap = MemSnapshot::default();
        let err = reconstruct(Variant::Way, 99, &snap).unwrap_err();
        assert!(matches!(err, EngineError::IncompleteElement { .. }));
    }
}
