//! Deskhand Audit - Chain-linked, append-only audit trail.
//!
//! This crate provides:
//! - [`AuditEntry`]: one immutable record per pipeline stage transition
//! - [`AuditTrail`]: serialized appends with sequence numbers and hash links
//! - Sinks: [`MemoryAuditSink`] and the JSON-lines [`JsonlAuditSink`]
//! - [`verify_chain`] for tamper detection
//!
//! Each entry carries the BLAKE3 hash of the entry before it. Editing,
//! removing or reordering a persisted entry breaks the chain and shows up in
//! verification.
//!
//! # Example
//!
//! ```
//! use deskhand_audit::{AuditStage, AuditStatus, AuditTrail};
//! use deskhand_core::CommandId;
//!
//! let trail = AuditTrail::in_memory();
//! let command = CommandId::new();
//!
//! trail
//!     .record(command, AuditStage::Interpret, "open gedit", "1 action: open_app", AuditStatus::Succeeded)
//!     .unwrap();
//!
//! assert!(trail.verify().unwrap().valid);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod entry;
mod error;
mod sink;
mod trail;
mod verify;

pub use entry::{AuditEntry, AuditEntryId, AuditStage, AuditStatus, ContentHash};
pub use error::{AuditError, AuditResult};
pub use sink::{AuditSink, JsonlAuditSink, MemoryAuditSink, read_jsonl};
pub use trail::AuditTrail;
pub use verify::{ChainIssue, ChainVerificationResult, verify_chain};
