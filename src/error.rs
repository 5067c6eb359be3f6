//! Crate-wide error type (§7 "Error handling design").
//!
//! Only the fatal, eager cases from §7 are represented here:
//! `MalformedTable` (fatal at `FontAdapter` construction),
//! `CapacityExhausted` (fatal during shaping) and `NoPrimaryFont`
//! (refuse-to-start). `MissingGlyph` and `UnsupportedLookupType` are
//! shaping-time anomalies that degrade gracefully in place and are
//! never propagated as `Err`.

use crate::Tag;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShapingError {
    #[error("required table {table} is malformed: {reason}")]
    MalformedTable { table: Tag, reason: String },

    #[error("buffer capacity exhausted requesting {requested} slots")]
    CapacityExhausted { requested: usize },

    #[error("shaping requires a valid primary font")]
    NoPrimaryFont,
}

pub type Result<T> = std::result::Result<T, ShapingError>;
