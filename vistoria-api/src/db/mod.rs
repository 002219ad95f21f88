//! Aggregate store: per-entity database operations
//!
//! All functions take `&mut SqliteConnection` rather than a pool so the sync
//! reconciler can run every step of one payload inside a single transaction.

pub mod checklists;
pub mod collaborators;
pub mod evidences;
pub mod inspection_items;
pub mod inspections;
pub mod pending_adjustments;
pub mod signatures;

use uuid::Uuid;
use vistoria_common::{Error, Result};

/// Parse a uuid column value; corrupt rows surface as internal errors
pub(crate) fn parse_uuid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| Error::Internal(format!("invalid uuid in database: {e}")))
}
