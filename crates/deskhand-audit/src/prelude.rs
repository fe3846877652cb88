//! Prelude module - commonly used types for convenient import.
//!
//! Use `use deskhand_audit::prelude::*;` to import all essential types.

pub use crate::{AuditError, AuditResult};

pub use crate::{AuditEntry, AuditEntryId, AuditStage, AuditStatus, AuditTrail};

pub use crate::{AuditSink, JsonlAuditSink, MemoryAuditSink};

pub use crate::{ChainVerificationResult, verify_chain};
