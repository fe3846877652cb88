//! Chain verification.

use std::fmt;

use tracing::warn;

use crate::entry::{AuditEntry, AuditEntryId, ContentHash};

/// Result of chain verification.
#[derive(Debug, Clone)]
pub struct ChainVerificationResult {
    /// Whether the chain is valid.
    pub valid: bool,
    /// Number of entries verified.
    pub entries_verified: usize,
    /// Issues found (empty if valid).
    pub issues: Vec<ChainIssue>,
}

/// An issue found during chain verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainIssue {
    /// First entry doesn't have zero previous hash.
    InvalidGenesis {
        /// The entry with invalid genesis.
        entry_id: AuditEntryId,
    },
    /// Sequence numbers are not consecutive.
    SequenceGap {
        /// The entry where the gap shows.
        entry_id: AuditEntryId,
        /// Sequence number that should be here.
        expected: u64,
        /// Sequence number found.
        actual: u64,
    },
    /// Chain link is broken.
    BrokenLink {
        /// The entry with broken link.
        entry_id: AuditEntryId,
        /// Expected previous hash.
        expected_previous: ContentHash,
        /// Actual previous hash in entry.
        actual_previous: ContentHash,
    },
}

impl fmt::Display for ChainIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidGenesis { entry_id } => {
                write!(f, "Invalid genesis at {entry_id}")
            },
            Self::SequenceGap {
                entry_id,
                expected,
                actual,
            } => {
                write!(f, "Sequence gap at {entry_id}: expected {expected}, found {actual}")
            },
            Self::BrokenLink { entry_id, .. } => {
                write!(f, "Broken chain link at {entry_id}")
            },
        }
    }
}

/// Verify entries in the order given: genesis link, consecutive sequence
/// numbers, and hash links.
#[must_use]
pub fn verify_chain(entries: &[AuditEntry]) -> ChainVerificationResult {
    let mut issues = Vec::new();

    let Some(first) = entries.first() else {
        return ChainVerificationResult {
            valid: true,
            entries_verified: 0,
            issues,
        };
    };

    if first.sequence != 0 || !first.previous_hash.is_zero() {
        issues.push(ChainIssue::InvalidGenesis { entry_id: first.id });
    }

    for pair in entries.windows(2) {
        let (prev, curr) = (&pair[0], &pair[1]);

        let expected = prev.sequence.saturating_add(1);
        if curr.sequence != expected {
            issues.push(ChainIssue::SequenceGap {
                entry_id: curr.id,
                expected,
                actual: curr.sequence,
            });
        }

        if !curr.follows(prev) {
            warn!(current = %curr.id, previous = %prev.id, "Chain link broken");
            issues.push(ChainIssue::BrokenLink {
                entry_id: curr.id,
                expected_previous: prev.content_hash(),
                actual_previous: curr.previous_hash,
            });
        }
    }

    ChainVerificationResult {
        valid: issues.is_empty(),
        entries_verified: entries.len(),
        issues,
    }
}
