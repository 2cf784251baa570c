//! `osm-adiff-core` — the OSM Augmented Diff composition engine: takes a
//! reconciled osmChange and a read-only snapshot view and produces the
//! pretty-printed augmented diff document a consumer (Overpass, a tile
//! pipeline, etc.) replicates against.
//!
//! The pipeline lives across these modules in the order data flows
//! through them: [`osc`] → [`reconciler`] → [`reconstruct`]/[`augment`] →
//! [`propagate`] → [`bounds`] → [`render`], orchestrated end to end by
//! [`assemble::DiffAssembler`].

pub mod assemble;
pub mod augment;
pub mod bounds;
pub mod error;
pub mod mem_snapshot;
pub mod model;
pub mod osc;
pub mod propagate;
pub mod reconciler;
pub mod reconstruct;
pub mod render;
pub mod snapshot;

pub use assemble::{DiffAssembler, MetaInfo};
pub use error::EngineError;
pub use model::{ActionKind, DiffAction, Element, Id, Key, Variant};
pub use snapshot::SnapshotView;
