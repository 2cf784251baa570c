//! §4.1 — folds the ordered `(block kind, element)` sequence parsed from
//! the OSC into an action table keyed by `(variant, id)`.

use std::collections::HashMap;

use log::warn;

use crate::error::EngineError;
use crate::model::{ActionKind, Element, Key, OscAction};

/// Returns `None` only when the OSC contained zero operations
/// (`EmptyDiff`, §7) — the caller decides what to do with that, it is not
/// this function's job to treat it as an error.
pub fn reconcile(blocks: Vec<(ActionKind, Element)>) -> Option<HashMap<Key, OscAction>> {
    if blocks.is_empty() {
        return None;
    }

    let mut actions: HashMap<Key, OscAction> = HashMap::new();

    for (kind, element) in blocks {
        let key = element.key();
        match actions.get(&key) {
            None => {
                actions.insert(key, OscAction { kind, element });
            }
            Some(prev) => {
                if prev.kind == ActionKind::Create && kind == ActionKind::Delete {
                    let err = EngineError::CreatedAndDeleted {
                        variant: key.0.as_tag(),
                        id: key.1,
                    };
                    warn!("{}; dropping", err);
                    actions.remove(&key);
                } else if element.version() < prev.element.version() {
                    let err = EngineError::StaleVersion {
                        variant: key.0.as_tag(),
                        id: key.1,
                        got: element.version(),
                        have: prev.element.version(),
                    };
                    warn!("{}; skipping", err);
                } else {
                    actions.insert(key, OscAction { kind, element });
                }
            }
        }
    }

    Some(actions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{placeholder_metadata, Node};

    fn node(id: i64, version: u32) -> Element {
        Element::Node(Node {
            id,
            version,
            meta: placeholder_metadata(version),
            lat: 0.0,
            lon: 0.0,
            tags: Vec::new(),
        })
    }

    #[test]
    fn empty_blocks_yield_none() {
        assert!(reconcile(Vec::new()).is_none());
    }

    #[test]
    fn create_then_delete_cancels() {
        let blocks = vec![
            (ActionKind::Create, node(2, 1)),
            (ActionKind::Delete, node(2, 2)),
        ];
        let actions = reconcile(blocks).unwrap();
        assert!(!actions.contains_key(&(crate::model::Variant::Node, 2)));
    }

    #[test]
    fn stale_modify_is_ignored() {
        let blocks = vec![
            (ActionKind::Modify, node(3, 5)),
            (ActionKind::Modify, node(3, 4)),
        ];
        let actions = reconcile(blocks).unwrap();
        let action = &actions[&(crate::model::Variant::Node, 3)];
        assert_eq!(action.element.version(), 5);
    }

    #[test]
    fn newer_modify_replaces_older() {
        let blocks = vec![
            (ActionKind::Modify, node(3, 1)),
            (ActionKind::Modify, node(3, 2)),
        ];
        let actions = reconcile(blocks).unwrap();
        let action = &actions[&(crate::model::Variant::Node, 3)];
        assert_eq!(action.element.version(), 2);
        assert_eq!(action.kind, ActionKind::Modify);
    }

    #[test]
    fn trailing_empty_modify_block_is_a_no_op() {
        let with_trailing = vec![(ActionKind::Create, node(1, 1))];
        let without_trailing = vec![(ActionKind::Create, node(1, 1))];
        assert_eq!(
            reconcile(with_trailing).unwrap().len(),
            reconcile(without_trailing).unwrap().len()
        );
    }
}
