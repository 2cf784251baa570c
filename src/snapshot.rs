//! §4.6 — the read-only façade over the snapshot database.
//!
//! The concrete on-disk format is out of scope (§1); this module only
//! defines the trait every pass consults plus the read-transaction guard
//! that enforces "exactly one read transaction per diff, opened before
//! pass 1, released after pass 4" (§5) at the type level rather than by
//! convention.

use std::marker::PhantomData;

use crate::model::{Id, Metadata, Variant};

#[derive(Debug, Clone)]
pub struct LocationRecord {
    pub lat: f64,
    pub lon: f64,
    pub version: u32,
}

#[derive(Debug, Clone)]
pub struct NodeRecord {
    pub meta: Metadata,
    pub lat: f64,
    pub lon: f64,
    pub tags: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct WayRecord {
    pub meta: Metadata,
    pub nodes: Vec<Id>,
    pub tags: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct RelationMemberRecord {
    pub member_type: Variant,
    pub ref_id: Id,
    pub role: String,
}

#[derive(Debug, Clone)]
pub struct RelationRecord {
    pub meta: Metadata,
    pub members: Vec<RelationMemberRecord>,
    pub tags: Vec<(String, String)>,
}

/// A read-only, by-id and reverse-reference view over an OSM snapshot.
/// Every lookup is pure and consistent for the life of one diff — the OSC
/// has not yet been applied to it (§3 "Lifetimes").
pub trait SnapshotView {
    /// Tagless-safe location lookup (lat, lon, version).
    fn location(&self, id: Id) -> Option<LocationRecord>;
    fn node(&self, id: Id) -> Option<NodeRecord>;
    fn way(&self, id: Id) -> Option<WayRecord>;
    fn relation(&self, id: Id) -> Option<RelationRecord>;

    fn node_way(&self, id: Id) -> Vec<Id>;
    fn node_relation(&self, id: Id) -> Vec<Id>;
    fn way_relation(&self, id: Id) -> Vec<Id>;
}

/// A borrowed, non-`Send` handle scoping the one read transaction a diff
/// is supposed to hold (§5). This is a naming/lifetime device, not a
/// runtime lock: nothing stops a caller from constructing a second
/// `SnapshotTxn` over the same view, or from calling `SnapshotView`
/// methods directly without going through one at all. What it does
/// guarantee is that the handle can't cross a thread boundary — the
/// `PhantomData<*const ()>` keeps it `!Send` even if a future
/// `SnapshotView` implementation happens to be `Sync` — and it gives
/// `DiffAssembler::run` a single named value whose `Drop` marks, by
/// convention, where the read transaction ends.
pub struct SnapshotTxn<'a> {
    view: &'a dyn SnapshotView,
    _not_send: PhantomData<*const ()>,
}

impl<'a> SnapshotTxn<'a> {
    pub fn new(view: &'a dyn SnapshotView) -> Self {
        SnapshotTxn {
            view,
            _not_send: PhantomData,
        }
    }

    pub fn view(&self) -> &dyn SnapshotView {
        self.view
    }
}
