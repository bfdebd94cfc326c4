//! Byte-level diffing between the baseline and edited renders.
//!
//! The diff itself is delegated to the `similar` crate; everything downstream
//! works on the coalesced [`DiffOp`] sequence so the engine stays independent
//! of the diff backend.

use similar::{ChangeTag, TextDiff};

pub mod segment;

pub use segment::{SegmentDiffs, SegmentOutcome, segment};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffKind {
    Equal,
    Insert,
    Delete,
}

/// One run of a computed difference.
///
/// Concatenating the text of all non-`Insert` ops reconstructs the baseline;
/// concatenating all non-`Delete` ops reconstructs the edited text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffOp {
    pub kind: DiffKind,
    pub text: String,
}

impl DiffOp {
    pub fn equal(text: impl Into<String>) -> Self {
        Self {
            kind: DiffKind::Equal,
            text: text.into(),
        }
    }

    pub fn insert(text: impl Into<String>) -> Self {
        Self {
            kind: DiffKind::Insert,
            text: text.into(),
        }
    }

    pub fn delete(text: impl Into<String>) -> Self {
        Self {
            kind: DiffKind::Delete,
            text: text.into(),
        }
    }

    /// Bytes this op spends against the baseline text. Inserted text has no
    /// baseline counterpart and spends nothing.
    pub fn baseline_len(&self) -> usize {
        match self.kind {
            DiffKind::Equal | DiffKind::Delete => self.text.len(),
            DiffKind::Insert => 0,
        }
    }
}

/// Compute the op sequence transforming `baseline` into `edited`.
///
/// Char-granular, so op boundaries always fall on UTF-8 character boundaries;
/// adjacent changes with the same tag are coalesced into one run.
pub fn diff(baseline: &str, edited: &str) -> Vec<DiffOp> {
    let diff = TextDiff::from_chars(baseline, edited);
    let mut ops: Vec<DiffOp> = Vec::new();
    for change in diff.iter_all_changes() {
        let kind = match change.tag() {
            ChangeTag::Equal => DiffKind::Equal,
            ChangeTag::Insert => DiffKind::Insert,
            ChangeTag::Delete => DiffKind::Delete,
        };
        match ops.last_mut() {
            Some(last) if last.kind == kind => last.text.push_str(change.value()),
            _ => ops.push(DiffOp {
                kind,
                text: change.value().to_string(),
            }),
        }
    }
    tracing::debug!(
        target: "diff.compute",
        ops = ops.len(),
        baseline_bytes = baseline.len(),
        edited_bytes = edited.len(),
        "diff_complete"
    );
    ops
}

/// Baseline text as reconstructed from an op sequence.
pub fn reconstruct_baseline(ops: &[DiffOp]) -> String {
    ops.iter()
        .filter(|op| op.kind != DiffKind::Insert)
        .map(|op| op.text.as_str())
        .collect()
}

/// Edited text as reconstructed from an op sequence.
pub fn reconstruct_edited(ops: &[DiffOp]) -> String {
    ops.iter()
        .filter(|op| op.kind != DiffKind::Delete)
        .map(|op| op.text.as_str())
        .collect()
}
