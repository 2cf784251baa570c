//! The error taxonomy from §7. `EngineError` covers the kinds that are
//! surfaced to a caller; the "local" kinds (`StaleVersion`,
//! `CreatedAndDeleted`, `UnresolvedLocation`) are never returned from the
//! happy path — call sites construct the typed variant and log it with
//! [`log::warn!`] instead of propagating it, then degrade the affected
//! action/side. `IncompleteElement` is unusual among these: it is
//! constructed and returned as a hard `Err` by [`crate::reconstruct`] and
//! [`crate::augment`]'s way-member expansion, but downgraded to a logged
//! warning by callers (`assemble.rs`, `propagate.rs`) that can recover by
//! dropping or downgrading the affected action.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Reconstructing an element failed: neither a full record nor a
    /// location record exists in the snapshot for it.
    #[error("element {variant}/{id} has no record in the snapshot")]
    IncompleteElement { variant: &'static str, id: i64 },

    /// An OSC operation referenced a version older than one already
    /// folded into the action table.
    #[error("element {variant}/{id} version {got} is stale (have {have})")]
    StaleVersion {
        variant: &'static str,
        id: i64,
        got: u32,
        have: u32,
    },

    /// An element was created and deleted within the same OSC window.
    #[error("element {variant}/{id} was created and deleted in the same window")]
    CreatedAndDeleted { variant: &'static str, id: i64 },

    /// A referenced node's location could not be resolved.
    #[error("could not resolve location for node/{0}")]
    UnresolvedLocation(i64),

    /// The OSC contained zero operations. Not an abort condition by
    /// itself — the caller decides whether a degenerate diff is worth
    /// emitting.
    #[error("the osmChange file contains no operations")]
    EmptyDiff,

    /// Writing the assembled document to its sink failed.
    #[error("failed to write augmented diff: {0}")]
    SinkFailure(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The OSC document itself did not parse as well-formed XML.
    #[error("osmChange document is malformed: {0}")]
    MalformedOsc(#[from] quick_xml::Error),
}
