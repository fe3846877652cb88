//! Audit trail - the append-only, chain-linked record of pipeline activity.

use std::path::Path;
use std::sync::{Arc, Mutex};

use deskhand_core::CommandId;
use tracing::debug;

use crate::entry::{AuditEntry, AuditEntryId, AuditStage, AuditStatus, ContentHash};
use crate::error::{AuditError, AuditResult};
use crate::sink::{AuditSink, JsonlAuditSink, MemoryAuditSink};
use crate::verify::{ChainVerificationResult, verify_chain};

#[derive(Debug)]
struct ChainHead {
    next_sequence: u64,
    hash: ContentHash,
}

impl ChainHead {
    fn genesis() -> Self {
        Self {
            next_sequence: 0,
            hash: ContentHash::zero(),
        }
    }

    fn after(last: Option<&AuditEntry>) -> Self {
        last.map_or_else(Self::genesis, |entry| Self {
            next_sequence: entry.sequence.saturating_add(1),
            hash: entry.content_hash(),
        })
    }
}

/// Append-only audit trail.
///
/// Appends are serialized by an internal lock held across the sink write, so
/// sequence numbers, timestamps and sink order always agree. The trail is
/// `Send + Sync` and meant to be shared behind an `Arc`.
pub struct AuditTrail {
    sink: Arc<dyn AuditSink>,
    head: Mutex<ChainHead>,
}

impl AuditTrail {
    /// Start a fresh chain on `sink`.
    #[must_use]
    pub fn with_sink(sink: Arc<dyn AuditSink>) -> Self {
        Self {
            sink,
            head: Mutex::new(ChainHead::genesis()),
        }
    }

    /// Continue the chain already persisted in `sink`.
    ///
    /// # Errors
    ///
    /// Returns an error if the existing entries cannot be read.
    pub fn resume(sink: Arc<dyn AuditSink>) -> AuditResult<Self> {
        let existing = sink.entries()?;
        let head = ChainHead::after(existing.last());
        debug!(
            sink = sink.name(),
            entries = existing.len(),
            "Resuming audit chain"
        );
        Ok(Self {
            sink,
            head: Mutex::new(head),
        })
    }

    /// Open a JSON-lines log at `path`, continuing any chain it holds.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or its entries parsed.
    pub fn open_jsonl(path: impl AsRef<Path>) -> AuditResult<Self> {
        Self::resume(Arc::new(JsonlAuditSink::open(path)?))
    }

    /// In-memory trail.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_sink(Arc::new(MemoryAuditSink::new()))
    }

    /// Record a stage transition.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink rejects the entry. The chain head does
    /// not advance in that case.
    pub fn record(
        &self,
        command_id: CommandId,
        stage: AuditStage,
        input_summary: impl Into<String>,
        output_summary: impl Into<String>,
        status: AuditStatus,
    ) -> AuditResult<AuditEntryId> {
        let mut head = self
            .head
            .lock()
            .map_err(|e| AuditError::StorageError(e.to_string()))?;

        let entry = AuditEntry::create(
            head.next_sequence,
            command_id,
            stage,
            input_summary.into(),
            output_summary.into(),
            status,
            head.hash,
        );

        debug!(
            entry_id = %entry.id,
            sequence = entry.sequence,
            command_id = %command_id,
            stage = %stage,
            status = %status,
            "Appending audit entry"
        );

        self.sink.append(&entry)?;

        head.hash = entry.content_hash();
        head.next_sequence = head.next_sequence.saturating_add(1);
        Ok(entry.id)
    }

    /// Every entry in the trail.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink cannot be read.
    pub fn entries(&self) -> AuditResult<Vec<AuditEntry>> {
        self.sink.entries()
    }

    /// Entries belonging to one command, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink cannot be read.
    pub fn command_entries(&self, command_id: CommandId) -> AuditResult<Vec<AuditEntry>> {
        Ok(self
            .sink
            .entries()?
            .into_iter()
            .filter(|e| e.command_id == command_id)
            .collect())
    }

    /// Verify the whole chain.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink cannot be read.
    pub fn verify(&self) -> AuditResult<ChainVerificationResult> {
        Ok(verify_chain(&self.sink.entries()?))
    }

    /// Flush the sink.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink fails to flush.
    pub fn flush(&self) -> AuditResult<()> {
        self.sink.flush()
    }
}

impl std::fmt::Debug for AuditTrail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditTrail")
            .field("sink", &self.sink.name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_record_links_entries() {
        let trail = AuditTrail::in_memory();
        let command = CommandId::new();

        trail
            .record(command, AuditStage::Interpret, "open chrome.exe", "1 action", AuditStatus::Succeeded)
            .unwrap();
        trail
            .record(command, AuditStage::Validate, "1 action", "allowed", AuditStatus::Allowed)
            .unwrap();

        let entries = trail.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].previous_hash.is_zero());
        assert!(entries[1].follows(&entries[0]));
        assert_eq!(entries[1].sequence, 1);
        assert!(trail.verify().unwrap().valid);
    }

    #[test]
    fn test_command_entries_filters() {
        let trail = AuditTrail::in_memory();
        let a = CommandId::new();
        let b = CommandId::new();
        trail.record(a, AuditStage::Interpret, "", "", AuditStatus::Succeeded).unwrap();
        trail.record(b, AuditStage::Interpret, "", "", AuditStatus::Failed).unwrap();
        trail.record(a, AuditStage::Validate, "", "", AuditStatus::Denied).unwrap();

        let only_a = trail.command_entries(a).unwrap();
        assert_eq!(only_a.len(), 2);
        assert!(only_a.iter().all(|e| e.command_id == a));
    }

    #[test]
    fn test_concurrent_appends_keep_chain_valid() {
        let trail = Arc::new(AuditTrail::in_memory());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let trail = Arc::clone(&trail);
                thread::spawn(move || {
                    let command = CommandId::new();
                    for _ in 0..25 {
                        trail
                            .record(command, AuditStage::Execute, "wait", "ok", AuditStatus::Succeeded)
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let entries = trail.entries().unwrap();
        assert_eq!(entries.len(), 100);
        let sequences: Vec<u64> = entries.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, (0..100).collect::<Vec<u64>>());
        assert!(trail.verify().unwrap().valid);
    }

    #[test]
    fn test_open_jsonl_resumes_chain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let command = CommandId::new();

        {
            let trail = AuditTrail::open_jsonl(&path).unwrap();
            trail.record(command, AuditStage::Interpret, "", "", AuditStatus::Succeeded).unwrap();
            trail.flush().unwrap();
        }

        let trail = AuditTrail::open_jsonl(&path).unwrap();
        trail.record(command, AuditStage::Validate, "", "", AuditStatus::Allowed).unwrap();

        let entries = trail.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].sequence, 1);
        assert!(entries[1].follows(&entries[0]));
        assert!(trail.verify().unwrap().valid);
    }

    struct FailingSink;

    impl AuditSink for FailingSink {
        fn name(&self) -> &str {
            "failing"
        }

        fn append(&self, _entry: &AuditEntry) -> AuditResult<()> {
            Err(AuditError::StorageError("disk full".into()))
        }

        fn entries(&self) -> AuditResult<Vec<AuditEntry>> {
            Ok(Vec::new())
        }

        fn flush(&self) -> AuditResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_sink_failure_is_returned() {
        let trail = AuditTrail::with_sink(Arc::new(FailingSink));
        let result = trail.record(
            CommandId::new(),
            AuditStage::Interpret,
            "",
            "",
            AuditStatus::Succeeded,
        );
        assert!(matches!(result, Err(AuditError::StorageError(_))));
    }
}
