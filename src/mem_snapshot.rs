//! An in-memory [`SnapshotView`] built from a small JSON dump format.
//!
//! The on-disk snapshot format is explicitly out of scope (§1/§4.6); this
//! exists so the engine has something concrete to run against in tests
//! and so `adiffgen` has a usable store for local/offline runs. The JSON
//! shape is this crate's own invention, not a spec contract.

use std::collections::HashMap;
use std::io::Read;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::model::{Id, Metadata, Variant};
use crate::snapshot::{
    LocationRecord, NodeRecord, RelationMemberRecord, RelationRecord, SnapshotView, WayRecord,
};

#[derive(Debug, Deserialize)]
struct DumpNode {
    id: Id,
    version: u32,
    #[serde(default)]
    uid: i64,
    #[serde(default)]
    user: String,
    #[serde(default)]
    changeset: i64,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
    lat: f64,
    lon: f64,
    #[serde(default)]
    tags: Vec<(String, String)>,
}

#[derive(Debug, Deserialize)]
struct DumpLocation {
    id: Id,
    lat: f64,
    lon: f64,
    version: u32,
}

#[derive(Debug, Deserialize)]
struct DumpWay {
    id: Id,
    version: u32,
    #[serde(default)]
    uid: i64,
    #[serde(default)]
    user: String,
    #[serde(default)]
    changeset: i64,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
    nodes: Vec<Id>,
    #[serde(default)]
    tags: Vec<(String, String)>,
}

#[derive(Debug, Deserialize)]
struct DumpMember {
    #[serde(rename = "type")]
    member_type: String,
    #[serde(rename = "ref")]
    ref_id: Id,
    #[serde(default)]
    role: String,
}

#[derive(Debug, Deserialize)]
struct DumpRelation {
    id: Id,
    version: u32,
    #[serde(default)]
    uid: i64,
    #[serde(default)]
    user: String,
    #[serde(default)]
    changeset: i64,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
    members: Vec<DumpMember>,
    #[serde(default)]
    tags: Vec<(String, String)>,
}

#[derive(Debug, Default, Deserialize)]
struct Dump {
    #[serde(default)]
    locations: Vec<DumpLocation>,
    #[serde(default)]
    nodes: Vec<DumpNode>,
    #[serde(default)]
    ways: Vec<DumpWay>,
    #[serde(default)]
    relations: Vec<DumpRelation>,
}

#[derive(Debug, Default)]
pub struct MemSnapshot {
    locations: HashMap<Id, LocationRecord>,
    nodes: HashMap<Id, NodeRecord>,
    ways: HashMap<Id, WayRecord>,
    relations: HashMap<Id, RelationRecord>,
    node_way: HashMap<Id, Vec<Id>>,
    node_relation: HashMap<Id, Vec<Id>>,
    way_relation: HashMap<Id, Vec<Id>>,
}

fn meta_of(
    version: u32,
    uid: i64,
    user: String,
    changeset: i64,
    timestamp: Option<DateTime<Utc>>,
) -> Metadata {
    Metadata {
        version,
        uid,
        user,
        changeset,
        timestamp: timestamp.unwrap_or_else(|| DateTime::<Utc>::from_timestamp(0, 0).unwrap()),
    }
}

impl MemSnapshot {
    pub fn from_reader<R: Read>(reader: R) -> Result<MemSnapshot, serde_json::Error> {
        let dump: Dump = serde_json::from_reader(reader)?;
        Ok(MemSnapshot::from_dump(dump))
    }

    pub fn from_slice(bytes: &[u8]) -> Result<MemSnapshot, serde_json::Error> {
        let dump: Dump = serde_json::from_slice(bytes)?;
        Ok(MemSnapshot::from_dump(dump))
    }

    fn from_dump(dump: Dump) -> MemSnapshot {
        let mut snap = MemSnapshot::default();

        for loc in dump.locations {
            snap.locations.insert(
                loc.id,
                LocationRecord {
                    lat: loc.lat,
                    lon: loc.lon,
                    version: loc.version,
                },
            );
        }

        for n in dump.nodes {
            snap.locations.insert(
                n.id,
                LocationRecord {
                    lat: n.lat,
                    lon: n.lon,
                    version: n.version,
                },
            );
            snap.nodes.insert(
                n.id,
                NodeRecord {
                    meta: meta_of(n.version, n.uid, n.user, n.changeset, n.timestamp),
                    lat: n.lat,
                    lon: n.lon,
                    tags: n.tags,
                },
            );
        }

        for w in dump.ways {
            for &node_id in &w.nodes {
                snap.node_way.entry(node_id).or_default().push(w.id);
            }
            snap.ways.insert(
                w.id,
                WayRecord {
                    meta: meta_of(w.version, w.uid, w.user, w.changeset, w.timestamp),
                    nodes: w.nodes,
                    tags: w.tags,
                },
            );
        }

        for r in dump.relations {
            for m in &r.members {
                let Some(member_type) = Variant::from_tag(&m.member_type) else {
                    continue;
                };
                match member_type {
                    Variant::Node => snap.node_relation.entry(m.ref_id).or_default().push(r.id),
                    Variant::Way => snap.way_relation.entry(m.ref_id).or_default().push(r.id),
                    Variant::Relation => {}
                }
            }
            snap.relations.insert(
                r.id,
                RelationRecord {
                    meta: meta_of(r.version, r.uid, r.user, r.changeset, r.timestamp),
                    members: r
                        .members
                        .into_iter()
                        .filter_map(|m| {
                            Some(RelationMemberRecord {
                                member_type: Variant::from_tag(&m.member_type)?,
                                ref_id: m.ref_id,
                                role: m.role,
                            })
                        })
                        .collect(),
                    tags: r.tags,
                },
            );
        }

        snap
    }
}

impl SnapshotView for MemSnapshot {
    fn location(&self, id: Id) -> Option<LocationRecord> {
        self.locations.get(&id).cloned()
    }

    fn node(&self, id: Id) -> Option<NodeRecord> {
        self.nodes.get(&id).cloned()
    }

    fn way(&self, id: Id) -> Option<WayRecord> {
        self.ways.get(&id).cloned()
    }

    fn relation(&self, id: Id) -> Option<RelationRecord> {
        self.relations.get(&id).cloned()
    }

    fn node_way(&self, id: Id) -> Vec<Id> {
        self.node_way.get(&id).cloned().unwrap_or_default()
    }

    fn node_relation(&self, id: Id) -> Vec<Id> {
        self.node_relation.get(&id).cloned().unwrap_or_default()
    }

    fn way_relation(&self, id: Id) -> Vec<Id> {
        self.way_relation.get(&id).cloned().unwrap_or_default()
    }
}
