//! Append-only audit trail for scored requests.

pub mod record;
pub mod store;

pub use record::AuditRecord;
pub use store::{AuditError, AuditStore, StoredAudit};
