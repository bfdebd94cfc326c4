//! Attribution of diff operations to trace segments.
//!
//! Trace segments and the diff are computed from independent passes over the
//! baseline render; they line up by position only. The slicer walks both
//! sequences left to right once, counting how many baseline bytes each diff
//! op spends against the current segment's `output_len`. An op that straddles
//! a segment boundary is split: the owned prefix closes the segment, the
//! remainder re-enters the cursor as the next segment's first op.

use crate::DiffOp;
use core_trace::{Trace, TraceSegment};
use tracing::warn;

/// A trace segment together with the diff ops covering its output range.
///
/// An empty `ops` list means the diff ran out before this segment's output
/// range; reapplication treats that as an untrustworthy reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentDiffs {
    pub segment: TraceSegment,
    pub ops: Vec<DiffOp>,
}

/// Result of slicing a diff across a trace.
#[derive(Debug, Default)]
pub struct SegmentOutcome {
    pub segments: Vec<SegmentDiffs>,
    /// Ops left after the last segment closed. Non-empty means the diff and
    /// the trace disagree about the baseline's total length.
    pub leftover: Vec<DiffOp>,
}

/// Cursor over the op sequence. Holds at most one op pushed back by a split
/// so the slice handed to one segment never aliases the sequence still being
/// walked.
struct OpCursor {
    iter: std::vec::IntoIter<DiffOp>,
    pending: Option<DiffOp>,
}

impl OpCursor {
    fn new(ops: Vec<DiffOp>) -> Self {
        Self {
            iter: ops.into_iter(),
            pending: None,
        }
    }

    fn next(&mut self) -> Option<DiffOp> {
        self.pending.take().or_else(|| self.iter.next())
    }

    fn push_back(&mut self, op: DiffOp) {
        debug_assert!(self.pending.is_none(), "cursor already holds a remainder");
        self.pending = Some(op);
    }

    fn drain(mut self) -> Vec<DiffOp> {
        let mut rest: Vec<DiffOp> = self.pending.take().into_iter().collect();
        rest.extend(self.iter);
        rest
    }
}

/// Slice `ops` so each trace segment owns exactly the diff operations
/// covering its portion of the baseline text.
///
/// Single pass over both sequences. Once the ops run out, every remaining
/// segment receives an empty list; ops remaining after the last segment are
/// returned in [`SegmentOutcome::leftover`] and logged as a warning rather
/// than failing the run.
pub fn segment(trace: &Trace, ops: Vec<DiffOp>) -> SegmentOutcome {
    let mut cursor = OpCursor::new(ops);
    let mut segments = Vec::with_capacity(trace.segments.len());
    let mut halted = false;

    for seg in &trace.segments {
        let mut owned: Vec<DiffOp> = Vec::new();
        let mut consumed = 0usize;
        while !halted {
            let Some(op) = cursor.next() else { break };
            consumed += op.baseline_len();
            if consumed > seg.output_len {
                // The op straddles the segment boundary. Keep the prefix that
                // fills the remaining output budget, hand the rest back.
                let keep = op.text.len() - (consumed - seg.output_len);
                if !op.text.is_char_boundary(keep) {
                    warn!(
                        target: "diff.segment",
                        keep,
                        op_len = op.text.len(),
                        "segment_boundary_inside_char"
                    );
                    cursor.push_back(op);
                    halted = true;
                    break;
                }
                let mut head = op;
                let tail = head.text.split_off(keep);
                cursor.push_back(DiffOp {
                    kind: head.kind,
                    text: tail,
                });
                owned.push(head);
                break;
            }
            let filled = consumed == seg.output_len;
            owned.push(op);
            if filled {
                break;
            }
        }
        segments.push(SegmentDiffs {
            segment: seg.clone(),
            ops: owned,
        });
    }

    let leftover = cursor.drain();
    if !leftover.is_empty() {
        let unmatched: usize = leftover.iter().map(DiffOp::baseline_len).sum();
        warn!(
            target: "diff.segment",
            leftover_ops = leftover.len(),
            unmatched_baseline_bytes = unmatched,
            "diff_longer_than_trace"
        );
    }
    SegmentOutcome { segments, leftover }
}
