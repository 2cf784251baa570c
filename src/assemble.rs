//! §4.4 — orchestrates the full pipeline from a reconciled action table to
//! a pretty-printed augmented diff document.

use std::io::BufRead;

use log::warn;

use crate::augment::augment_element;
use crate::bounds;
use crate::error::EngineError;
use crate::model::{ActionKind, DiffAction, OscAction};
use crate::osc::parse_osc;
use crate::propagate::propagate;
use crate::reconciler::reconcile;
use crate::reconstruct::reconstruct;
use crate::render::{render_action, render_meta, render_note};
use crate::snapshot::{SnapshotTxn, SnapshotView};

/// Replication metadata to stamp on the document's `<meta>` element.
/// Every field is optional — §4.4 pass 6 tolerates a caller (e.g. a
/// one-off local diff with no replication sequence) that can't supply it.
#[derive(Debug, Clone, Default)]
pub struct MetaInfo {
    pub osm_base: Option<chrono::DateTime<chrono::Utc>>,
    pub replication_id: Option<u64>,
    pub replication_url: Option<String>,
}

pub struct DiffAssembler<'a> {
    snapshot: &'a dyn SnapshotView,
}

impl<'a> DiffAssembler<'a> {
    pub fn new(snapshot: &'a dyn SnapshotView) -> Self {
        DiffAssembler { snapshot }
    }

    /// Runs the complete pipeline over an osmChange document, returning
    /// the pretty-printed augmented diff as a string. `Ok(None)` means the
    /// OSC had zero operations (§7 `EmptyDiff`); the caller decides
    /// whether that's worth writing out.
    pub fn run<R: BufRead>(
        &self,
        osc: R,
        meta: &MetaInfo,
    ) -> Result<Option<String>, EngineError> {
        let blocks = parse_osc(osc)?;
        let Some(actions) = reconcile(blocks) else {
            return Ok(None);
        };

        // One read transaction spans building, augmenting, and
        // propagating — released before the rest of the passes, which
        // only touch already-resolved data (§5).
        let txn = SnapshotTxn::new(self.snapshot);
        let mut diff_actions = build_base_actions(&actions, txn.view());
        for action in &mut diff_actions {
            augment_sides(action, &actions, txn.view());
        }
        let synthesized = propagate(&diff_actions, &actions, txn.view());
        diff_actions.extend(synthesized);
        drop(txn);

        diff_actions.sort_by_key(|a| a.sort_key());

        let mut root = osm_adiff_xml::Element::new("osm").with_attr("version", "0.6").with_attr(
            "generator",
            "Overpass API not used, but achavi detects it at the start of string; https://example.com/osm-adiff-core",
        );

        for action in &diff_actions {
            root.push(render_action(action));
        }

        if meta.replication_id.is_none() {
            warn!("assembling diff with no replication_id; <meta> will omit it");
        }
        root.insert_first(render_meta(
            meta.osm_base.as_ref(),
            meta.replication_id,
            meta.replication_url.as_deref(),
        ));
        root.insert_first(render_note());

        osm_adiff_xml::indent(&mut root, 0);
        Ok(Some(osm_adiff_xml::to_xml_string(&root)))
    }
}

/// Pass 1 — one `DiffAction` per action-table entry. A `modify` whose old
/// side can't be reconstructed (the element isn't actually in the
/// snapshot) downgrades to a `create`, since there is no prior state to
/// diff against.
fn build_base_actions(
    actions: &std::collections::HashMap<crate::model::Key, OscAction>,
    snapshot: &dyn SnapshotView,
) -> Vec<DiffAction> {
    let mut out = Vec::with_capacity(actions.len());

    for action in actions.values() {
        let (variant, id) = action.element.key();
        match action.kind {
            ActionKind::Create => out.push(DiffAction {
                kind: ActionKind::Create,
                old: None,
                new: action.element.clone(),
            }),
            ActionKind::Modify => match reconstruct(variant, id, snapshot) {
                Ok(old) => out.push(DiffAction {
                    kind: ActionKind::Modify,
                    old: Some(old),
                    new: action.element.clone(),
                }),
                Err(_) => {
                    warn!(
                        "{}/{} was modified but has no snapshot record; treating as create",
                        variant.as_tag(),
                        id
                    );
                    out.push(DiffAction {
                        kind: ActionKind::Create,
                        old: None,
                        new: action.element.clone(),
                    });
                }
            },
            ActionKind::Delete => match reconstruct(variant, id, snapshot) {
                Ok(old) => out.push(DiffAction {
                    kind: ActionKind::Delete,
                    old: Some(old),
                    new: action.element.clone(),
                }),
                Err(e) => warn!(
                    "{}/{} was deleted but has no snapshot record; dropping: {}",
                    variant.as_tag(),
                    id,
                    e
                ),
            },
        }
    }

    out
}

/// Pass 2/3 — decorates both sides in place: the old side snapshot-only,
/// the new side with read-your-writes over the action table.
fn augment_sides(
    action: &mut DiffAction,
    actions: &std::collections::HashMap<crate::model::Key, OscAction>,
    snapshot: &dyn SnapshotView,
) {
    if let Some(old) = &mut action.old {
        if let Err(e) = augment_element(old, false, actions, snapshot) {
            warn!("failed to augment old side of {:?}/{}: {}", old.variant(), old.id(), e);
        }
    }
    if let Err(e) = augment_element(&mut action.new, true, actions, snapshot) {
        warn!(
            "failed to augment new side of {:?}/{}: {}",
            action.new.variant(),
            action.new.id(),
            e
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem_snapshot::MemSnapshot;

    fn osc(body: &str) -> String {
        format!(r#"<osmChange version="0.6" generator="test">{}</osmChange>"#, body)
    }

    #[test]
    fn empty_osc_yields_none() {
        let snap = MemSnapshot::default();
        let assembler = DiffAssembler::new(&snap);
        let doc = osc("");
        let result = assembler.run(doc.as_bytes(), &MetaInfo::default()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn pure_create_has_no_old_side() {
        let snap = MemSnapshot::default();
        let assembler = DiffAssembler::new(&snap);
        let doc = osc(r#"<create><node id="1" version="1" lat="1.0" lon="2.0" /></create>"#);
        let result = assembler.run(doc.as_bytes(), &MetaInfo::default()).unwrap().unwrap();
        assert!(result.contains(r#"type="create""#));
        assert!(!result.contains("<old>"));
        assert!(result.contains(r#"id="1""#));
    }

    #[test]
    fn moved_node_modify_propagates_to_way() {
        let snap = MemSnapshot::from_slice(
            br#"{
                "nodes": [{"id": 1, "lat": 10.0, "lon": 20.0, "version": 1}],
                "ways": [{"id": 100, "version": 1, "nodes": [1, 2]}],
                "locations": [{"id": 2, "lat": 0.0, "lon": 0.0, "version": 1}]
            }"#,
        )
        .unwrap();
        let assembler = DiffAssembler::new(&snap);
        let doc = osc(
            r#"<modify><node id="1" version="2" lat="10.5" lon="20.5" /></modify>"#,
        );
        let result = assembler.run(doc.as_bytes(), &MetaInfo::default()).unwrap().unwrap();
        assert!(result.contains(r#"type="modify""#));
        assert!(result.matches(r#"type="modify""#).count() >= 2);
        assert!(result.contains(r#"id="100""#));
    }

    #[test]
    fn delete_renders_invisible_childless_new_side() {
        let snap = MemSnapshot::from_slice(
            br#"{"nodes": [{"id": 1, "lat": 1.0, "lon": 2.0, "version": 1, "tags": [["k", "v"]]}]}"#,
        )
        .unwrap();
        let assembler = DiffAssembler::new(&snap);
        let doc = osc(r#"<delete><node id="1" version="2" /></delete>"#);
        let result = assembler.run(doc.as_bytes(), &MetaInfo::default()).unwrap().unwrap();
        assert!(result.contains(r#"visible="false""#));
        let new_side = result.split("<new>").nth(1).unwrap();
        assert!(!new_side.contains("<tag"));
    }
}
