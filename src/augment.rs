//! §4.3 — decorates `<nd>` and `<member>` children with `lon`/`lat` using
//! a read-your-writes view over the action table and the snapshot.

use std::collections::HashMap;

use log::warn;

use crate::error::EngineError;
use crate::model::{Element, Id, Key, OscAction, Variant};
use crate::snapshot::SnapshotView;

/// Resolves `node_id`'s coordinates as `(lon, lat)`.
///
/// `use_new=true` prefers a pending action's new attributes over the
/// snapshot (read-your-writes); `use_new=false` is snapshot-only. Returns
/// `None` rather than erroring when nothing resolves — the caller logs
/// and leaves the `nd` undecorated (§4.3, §7 `UnresolvedLocation`).
pub fn locate(
    node_id: Id,
    use_new: bool,
    actions: &HashMap<Key, OscAction>,
    snapshot: &dyn SnapshotView,
) -> Option<(f64, f64)> {
    if use_new {
        if let Some(action) = actions.get(&(Variant::Node, node_id)) {
            if let Element::Node(n) = &action.element {
                return Some((n.lon, n.lat));
            }
        }
    }
    snapshot.location(node_id).map(|l| (l.lon, l.lat))
}

/// The node-ref list a way member should expand against: the pending
/// action's new refs when `use_new` and the way is in the action table,
/// else the snapshot's. Unlike [`locate`], a way that resolves nowhere is
/// a hard error — it means the relation member can't be expanded at all,
/// which the caller (§4.5) treats as "incomplete in db".
fn way_refs_for_augment(
    way_id: Id,
    use_new: bool,
    actions: &HashMap<Key, OscAction>,
    snapshot: &dyn SnapshotView,
) -> Result<Vec<Id>, EngineError> {
    if use_new {
        if let Some(action) = actions.get(&(Variant::Way, way_id)) {
            if let Element::Way(w) = &action.element {
                return Ok(w.nodes.iter().map(|nd| nd.node_id).collect());
            }
        }
    }
    snapshot
        .way(way_id)
        .map(|record| record.nodes)
        .ok_or(EngineError::IncompleteElement {
            variant: "way",
            id: way_id,
        })
}

/// Decorates `elem` in place. Always returns `Ok` for nodes and ways
/// (individual unresolved coordinates only warn); a relation with a
/// `type="way"` member whose way can't be found anywhere propagates
/// [`EngineError::IncompleteElement`] so the caller can decide whether to
/// keep a partially-decorated element (pass 2) or drop a synthesized
/// action entirely (pass 4, §4.5).
pub fn augment_element(
    elem: &mut Element,
    use_new: bool,
    actions: &HashMap<Key, OscAction>,
    snapshot: &dyn SnapshotView,
) -> Result<(), EngineError> {
    match elem {
        Element::Node(n) => {
            match locate(n.id, use_new, actions, snapshot) {
                Some((lon, lat)) => {
                    n.lon = lon;
                    n.lat = lat;
                }
                None => warn!("{}", EngineError::UnresolvedLocation(n.id)),
            }
            Ok(())
        }
        Element::Way(w) => {
            for nd in &mut w.nodes {
                match locate(nd.node_id, use_new, actions, snapshot) {
                    Some(coord) => nd.coord = Some(coord),
                    None => warn!("{}", EngineError::UnresolvedLocation(nd.node_id)),
                }
            }
            Ok(())
        }
        Element::Relation(r) => {
            for m in &mut r.members {
                match m.member_type {
                    Variant::Node => match locate(m.ref_id, use_new, actions, snapshot) {
                        Some(coord) => m.node_coord = Some(coord),
                        None => warn!("{}", EngineError::UnresolvedLocation(m.ref_id)),
                    },
                    Variant::Way => {
                        let refs = way_refs_for_augment(m.ref_id, use_new, actions, snapshot)?;
                        let mut expansion = Vec::with_capacity(refs.len());
                        for node_id in refs {
                            match locate(node_id, use_new, actions, snapshot) {
                                Some(coord) => expansion.push(coord),
                                None => warn!(
                                    "{} (via way/{})",
                                    EngineError::UnresolvedLocation(node_id),
                                    m.ref_id
                                ),
                            }
                        }
                        m.way_expansion = Some(expansion);
                    }
                    Variant::Relation => {
                        // Relations are never expanded recursively (§4.3, §9).
                    }
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem_snapshot::MemSnapshot;
    use crate::model::{placeholder_metadata, ActionKind, Member, NdRef, Node, Way};

    fn action_table() -> HashMap<Key, OscAction> {
        let mut actions = HashMap::new();
        actions.insert(
            (Variant::Node, 1),
            OscAction {
                kind: ActionKind::Create,
                element: Element::Node(Node {
                    id: 1,
                    version: 1,
                    meta: placeholder_metadata(1),
                    lat: 10.5,
                    lon: 20.5,
                    tags: Vec::new(),
                }),
            },
        );
        actions
    }

    #[test]
    fn read_your_writes_prefers_pending_action() {
        let actions = action_table();
        let snap = MemSnapshot::default();
        let coord = locate(1, true, &actions, &snap).unwrap();
        assert_eq!(coord, (20.5, 10.5));
    }

    #[test]
    fn use_new_false_is_snapshot_only() {
        let actions = action_table();
        let snap = MemSnapshot::from_slice(
            br#"{"locations": [{"id": 1, "lat": 1.0, "lon": 2.0, "version": 1}]}"#,
        )
        .unwrap();
        let coord = locate(1, false, &actions, &snap).unwrap();
        assert_eq!(coord, (2.0, 1.0));
    }

    #[test]
    fn way_member_expands_into_synthetic_coords() {
        let snap = MemSnapshot::from_slice(
            br#"{
                "locations": [
                    {"id": 10, "lat": 1.0, "lon": 1.0, "version": 1},
                    {"id": 11, "lat": 2.0, "lon": 2.0, "version": 1}
                ],
                "ways": [{"id": 50, "version": 1, "nodes": [10, 11]}]
            }"#,
        )
        .unwrap();
        let actions = HashMap::new();
        let mut relation = Element::Relation(crate::model::Relation {
            id: 500,
            version: 1,
            meta: placeholder_metadata(1),
            members: vec![Member::new(Variant::Way, 50, "")],
            tags: Vec::new(),
        });
        augment_element(&mut relation, false, &actions, &snap).unwrap();
        match relation {
            Element::Relation(r) => {
                assert_eq!(r.members[0].way_expansion, Some(vec![(1.0, 1.0), (2.0, 2.0)]));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn missing_way_member_errors() {
        let snap = MemSnapshot::default();
        let actions = HashMap::new();
        let mut relation = Element::Relation(crate::model::Relation {
            id: 500,
            version: 1,
            meta: placeholder_metadata(1),
            members: vec![Member::new(Variant::Way, 999, "")],
            tags: Vec::new(),
        });
        let err = augment_element(&mut relation, false, &actions, &snap).unwrap_err();
        assert!(matches!(err, EngineError::IncompleteElement { .. }));
    }

    #[test]
    fn unresolved_node_in_way_warns_but_does_not_error() {
        let snap = MemSnapshot::default();
        let actions = HashMap::new();
        let mut way = Element::Way(Way {
            id: 1,
            version: 1,
            meta: placeholder_metadata(1),
            nodes: vec![NdRef::new(42)],
            tags: Vec::new(),
        });
        augment_element(&mut way, false, &actions, &snap).unwrap();
        match way {
            Element::Way(w) => assert!(w.nodes[0].coord.is_none()),
            _ => unreachable!(),
        }
    }
}
