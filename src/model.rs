//! The OSM element data model (§3): nodes, ways, relations, and the
//! action table they're reconciled into.

use chrono::{DateTime, Utc};

pub type Id = i64;

/// Fixed ordering used for deterministic output: node < way < relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Variant {
    Node = 1,
    Way = 2,
    Relation = 3,
}

impl Variant {
    pub fn as_tag(&self) -> &'static str {
        match self {
            Variant::Node => "node",
            Variant::Way => "way",
            Variant::Relation => "relation",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Variant> {
        match tag {
            "node" => Some(Variant::Node),
            "way" => Some(Variant::Way),
            "relation" => Some(Variant::Relation),
            _ => None,
        }
    }
}

/// Unique key for an action or element: (variant, id).
pub type Key = (Variant, Id);

/// A tagless-node placeholder is chosen uniformly per SPEC_FULL.md §9:
/// empty/zero/epoch rather than `"?"`, so every metadata attribute stays
/// parseable by a downstream consumer expecting integers.
pub fn placeholder_metadata(version: u32) -> Metadata {
    Metadata {
        version,
        uid: 0,
        user: String::new(),
        changeset: 0,
        timestamp: DateTime::<Utc>::from_timestamp(0, 0).unwrap(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    pub version: u32,
    pub uid: i64,
    pub user: String,
    pub changeset: i64,
    pub timestamp: DateTime<Utc>,
}

/// A way's reference to a node, decorated with resolved coordinates once
/// the Augmentor has run. `(lon, lat)` to match the output attribute
/// order used throughout the spec's `get_lat_lon` helper.
#[derive(Debug, Clone, PartialEq)]
pub struct NdRef {
    pub node_id: Id,
    pub coord: Option<(f64, f64)>,
}

impl NdRef {
    pub fn new(node_id: Id) -> Self {
        NdRef { node_id, coord: None }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: Id,
    pub version: u32,
    pub meta: Metadata,
    pub lat: f64,
    pub lon: f64,
    pub tags: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Way {
    pub id: Id,
    pub version: u32,
    pub meta: Metadata,
    pub nodes: Vec<NdRef>,
    pub tags: Vec<(String, String)>,
}

/// A relation member. `node_coord` is populated by the Augmentor when
/// `member_type == Node`; `way_expansion` holds the synthesized
/// (lon, lat) list when `member_type == Way` (§4.3 — "enumerate the way's
/// node refs ... and append synthetic `<nd>` children").
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub member_type: Variant,
    pub ref_id: Id,
    pub role: String,
    pub node_coord: Option<(f64, f64)>,
    pub way_expansion: Option<Vec<(f64, f64)>>,
}

impl Member {
    pub fn new(member_type: Variant, ref_id: Id, role: impl Into<String>) -> Self {
        Member {
            member_type,
            ref_id,
            role: role.into(),
            node_coord: None,
            way_expansion: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub id: Id,
    pub version: u32,
    pub meta: Metadata,
    pub members: Vec<Member>,
    pub tags: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Node(Node),
    Way(Way),
    Relation(Relation),
}

impl Element {
    pub fn variant(&self) -> Variant {
        match self {
            Element::Node(_) => Variant::Node,
            Element::Way(_) => Variant::Way,
            Element::Relation(_) => Variant::Relation,
        }
    }

    pub fn id(&self) -> Id {
        match self {
            Element::Node(n) => n.id,
            Element::Way(w) => w.id,
            Element::Relation(r) => r.id,
        }
    }

    pub fn version(&self) -> u32 {
        match self {
            Element::Node(n) => n.version,
            Element::Way(w) => w.version,
            Element::Relation(r) => r.version,
        }
    }

    pub fn meta(&self) -> &Metadata {
        match self {
            Element::Node(n) => &n.meta,
            Element::Way(w) => &w.meta,
            Element::Relation(r) => &r.meta,
        }
    }

    pub fn key(&self) -> Key {
        (self.variant(), self.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Create,
    Modify,
    Delete,
}

impl ActionKind {
    pub fn as_tag(&self) -> &'static str {
        match self {
            ActionKind::Create => "create",
            ActionKind::Modify => "modify",
            ActionKind::Delete => "delete",
        }
    }
}

/// A single reconciled OSC operation: the net effect of every block that
/// touched `(variant, id)` (§4.1).
#[derive(Debug, Clone)]
pub struct OscAction {
    pub kind: ActionKind,
    pub element: Element,
}

/// A fully assembled diff entry: the `<action>` children of the `<osm>`
/// root (§3). `old` is `None` only for `create`.
#[derive(Debug, Clone)]
pub struct DiffAction {
    pub kind: ActionKind,
    pub old: Option<Element>,
    pub new: Element,
}

impl DiffAction {
    pub fn sort_key(&self) -> Key {
        self.new.key()
    }
}
