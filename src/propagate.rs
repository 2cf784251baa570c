//! §4.5 — finds ways/relations transitively affected by an explicit
//! modify and synthesizes `modify` actions for them.

use std::collections::{HashMap, HashSet};

use log::warn;

use crate::augment::augment_element;
use crate::model::{ActionKind, DiffAction, Element, Id, Key, OscAction, Variant};
use crate::reconstruct::reconstruct;
use crate::snapshot::SnapshotView;

/// Scans `diff_actions` (pass 1+2 output) for modifies whose geometry or
/// membership actually changed and returns the synthesized `modify`
/// actions for every affected way/relation not already present in
/// `actions` (the original action table — "an element mentioned in the
/// action table is authoritative", §4.5).
pub fn propagate(
    diff_actions: &[DiffAction],
    actions: &HashMap<Key, OscAction>,
    snapshot: &dyn SnapshotView,
) -> Vec<DiffAction> {
    let mut affected_ways: HashSet<Id> = HashSet::new();
    let mut affected_relations: HashSet<Id> = HashSet::new();

    for action in diff_actions {
        if action.kind != ActionKind::Modify {
            continue;
        }
        let Some(old) = &action.old else { continue };

        match (old, &action.new) {
            (Element::Node(old_n), Element::Node(new_n)) => {
                if (old_n.lat, old_n.lon) != (new_n.lat, new_n.lon) {
                    collect_node_propagation(old_n.id, actions, snapshot, &mut affected_ways, &mut affected_relations);
                }
            }
            (Element::Way(old_w), Element::Way(_)) => {
                let old_refs: Vec<Id> = old_w.nodes.iter().map(|n| n.node_id).collect();
                let new_refs: Vec<Id> = match &action.new {
                    Element::Way(new_w) => new_w.nodes.iter().map(|n| n.node_id).collect(),
                    _ => unreachable!(),
                };
                if old_refs != new_refs {
                    for rel in snapshot.way_relation(old_w.id) {
                        if !actions.contains_key(&(Variant::Relation, rel)) {
                            affected_relations.insert(rel);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    let mut synthesized = Vec::new();

    for way_id in affected_ways {
        match synthesize_way_modify(way_id, actions, snapshot) {
            Ok(action) => synthesized.push(action),
            Err(e) => warn!("affected way/{} is incomplete in db: {}", way_id, e),
        }
    }
    for rel_id in affected_relations {
        match synthesize_relation_modify(rel_id, actions, snapshot) {
            Ok(action) => synthesized.push(action),
            Err(e) => warn!("affected relation/{} is incomplete in db: {}", rel_id, e),
        }
    }

    synthesized
}

fn collect_node_propagation(
    node_id: Id,
    actions: &HashMap<Key, OscAction>,
    snapshot: &dyn SnapshotView,
    affected_ways: &mut HashSet<Id>,
    affected_relations: &mut HashSet<Id>,
) {
    for rel in snapshot.node_relation(node_id) {
        if !actions.contains_key(&(Variant::Relation, rel)) {
            affected_relations.insert(rel);
        }
    }
    for way in snapshot.node_way(node_id) {
        if !actions.contains_key(&(Variant::Way, way)) {
            affected_ways.insert(way);
            for rel in snapshot.way_relation(way) {
                if !actions.contains_key(&(Variant::Relation, rel)) {
                    affected_relations.insert(rel);
                }
            }
        }
    }
}

fn synthesize_way_modify(
    way_id: Id,
    actions: &HashMap<Key, OscAction>,
    snapshot: &dyn SnapshotView,
) -> Result<DiffAction, crate::error::EngineError> {
    let mut old = reconstruct(Variant::Way, way_id, snapshot)?;
    let mut new = old.clone();
    augment_element(&mut old, false, actions, snapshot)?;
    augment_element(&mut new, true, actions, snapshot)?;
    Ok(DiffAction {
        kind: ActionKind::Modify,
        old: Some(old),
        new,
    })
}

fn synthesize_relation_modify(
    rel_id: Id,
    actions: &HashMap<Key, OscAction>,
    snapshot: &dyn SnapshotView,
) -> Result<DiffAction, crate::error::EngineError> {
    let mut old = reconstruct(Variant::Relation, rel_id, snapshot)?;
    let mut new = old.clone();
    augment_element(&mut old, false, actions, snapshot)?;
    augment_element(&mut new, true, actions, snapshot)?;
    Ok(DiffAction {
        kind: ActionKind::Modify,
        old: Some(old),
        new,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem_snapshot::MemSnapshot;
    use crate::model::{placeholder_metadata, Node};

    fn snapshot_with_way_and_relation() -> MemSnapshot {
        MemSnapshot::from_slice(
            br#"{
                "locations": [
                    {"id": 1, "lat": 10.0, "lon": 20.0, "version": 1},
                    {"id": 11, "lat": 0.0, "lon": 0.0, "version": 1}
                ],
                "ways": [{"id": 100, "version": 1, "nodes": [1, 11]}],
                "relations": [{"id": 900, "version": 1, "members": [{"type": "way", "ref": 100, "role": ""}]}]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn moved_node_propagates_to_way_and_relation() {
        let snapshot = snapshot_with_way_and_relation();
        let actions: HashMap<Key, OscAction> = HashMap::new();

        let old = Element::Node(Node {
            id: 1,
            version: 1,
            meta: placeholder_metadata(1),
            lat: 10.0,
            lon: 20.0,
            tags: Vec::new(),
        });
        let new = Element::Node(Node {
            id: 1,
            version: 2,
            meta: placeholder_metadata(2),
            lat: 10.5,
            lon: 20.5,
            tags: Vec::new(),
        });
        let diff_actions = vec![DiffAction {
            kind: ActionKind::Modify,
            old: Some(old),
            new,
        }];

        let synthesized = propagate(&diff_actions, &actions, &snapshot);
        let ids: Vec<(Variant, Id)> = synthesized.iter().map(|a| a.new.key()).collect();
        assert!(ids.contains(&(Variant::Way, 100)));
        assert!(ids.contains(&(Variant::Relation, 900)));
    }

    #[test]
    fn element_already_in_action_table_is_not_resynthesized() {
        let snapshot = snapshot_with_way_and_relation();
        let mut actions: HashMap<Key, OscAction> = HashMap::new();
        actions.insert(
            (Variant::Way, 100),
            OscAction {
                kind: ActionKind::Modify,
                element: Element::Way(crate::model::Way {
                    id: 100,
                    version: 2,
                    meta: placeholder_metadata(2),
                    nodes: vec![],
                    tags: vec![],
                }),
            },
        );

        let old = Element::Node(Node {
            id: 1,
            version: 1,
            meta: placeholder_metadata(1),
            lat: 10.0,
            lon: 20.0,
            tags: Vec::new(),
        });
        let new = Element::Node(Node {
            id: 1,
            version: 2,
            meta: placeholder_metadata(2),
            lat: 10.5,
            lon: 20.5,
            tags: Vec::new(),
        });
        let diff_actions = vec![DiffAction {
            kind: ActionKind::Modify,
            old: Some(old),
            new,
        }];

        let synthesized = propagate(&diff_actions, &actions, &snapshot);
        let ids: Vec<(Variant, Id)> = synthesized.iter().map(|a| a.new.key()).collect();
        assert!(!ids.contains(&(Variant::Way, 100)));
    }

    #[test]
    fn unchanged_node_location_does_not_propagate() {
        let snapshot = snapshot_with_way_and_relation();
        let actions: HashMap<Key, OscAction> = HashMap::new();
        let elem = Element::Node(Node {
            id: 1,
            version: 2,
            meta: placeholder_metadata(2),
            lat: 10.0,
            lon: 20.0,
            tags: vec![("k".into(), "v".into())],
        });
        let diff_actions = vec![DiffAction {
            kind: ActionKind::Modify,
            old: Some(elem.clone()),
            new: elem,
        }];
        let synthesized = propagate(&diff_actions, &actions, &snapshot);
        assert!(synthesized.is_empty());
    }
}
