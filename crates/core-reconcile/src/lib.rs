//! Replay of per-segment diffs onto source file buffers.
//!
//! Each distinct source file gets one [`FileEditState`]: the working buffer
//! plus the history of length corrections already applied to it. A segment's
//! nominal `source_pos` is valid in the file's original coordinates; the
//! correction history translates it into the buffer's current coordinates
//! before the segment's ops are replayed. Segments must arrive in trace
//! order, which keeps corrections in non-decreasing original-position order
//! and makes the translation a single forward scan.

use core_diff::{DiffKind, DiffOp, SegmentDiffs};
use core_trace::{OriginKind, Trace, TraceSegment};
use std::collections::BTreeMap;
use std::io;
use thiserror::Error;
use tracing::{debug, warn};

pub mod writer;

pub use writer::{WriteSummary, write_outputs};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("segment at output offset {output_pos} received no diff operations")]
    MissingDiffSegment { output_pos: usize },
    #[error("generated content at output offset {output_pos} was edited and cannot be mapped back to a source")]
    UneditableSegmentModified { output_pos: usize },
    #[error("position {pos} is outside the working buffer for {name} ({len} bytes)")]
    PositionOutOfBounds { name: String, pos: isize, len: usize },
    #[error("position {pos} does not fall on a character boundary in {name}")]
    NotCharBoundary { name: String, pos: usize },
    #[error("failed to read source file {name}")]
    SourceRead {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {name}")]
    OutputWrite {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// A recorded length change: `delta` bytes were inserted (positive) or
/// removed (negative) at `original_pos`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Correction {
    pub original_pos: usize,
    pub delta: isize,
}

/// Working buffer and correction history for one source file, exclusively
/// owned by the reconciliation run.
#[derive(Debug)]
pub struct FileEditState {
    name: String,
    buffer: String,
    corrections: Vec<Correction>,
}

impl FileEditState {
    pub fn new(name: impl Into<String>, buffer: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            buffer: buffer.into(),
            corrections: Vec::new(),
        }
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn corrections(&self) -> &[Correction] {
        &self.corrections
    }

    /// Translate an original-file position into current buffer coordinates.
    ///
    /// Every correction recorded strictly before `source_pos` shifts the
    /// target by its delta. Corrections at exactly `source_pos` do not apply.
    pub fn translate(&self, source_pos: usize) -> isize {
        let mut pos = source_pos as isize;
        for c in &self.corrections {
            if c.original_pos < source_pos {
                pos -= c.delta;
            }
        }
        pos
    }

    /// Replay one segment's ops starting at the translated `source_pos`.
    ///
    /// `Equal` advances the cursor without mutating; `Insert` and `Delete`
    /// splice the buffer at the cursor and record a correction, leaving the
    /// cursor in place. Any position outside the buffer (or off a character
    /// boundary) poisons the whole file.
    pub fn apply(&mut self, segment: &TraceSegment, ops: &[DiffOp]) -> Result<(), ReconcileError> {
        let translated = self.translate(segment.source_pos);
        let mut cursor = self.checked_pos(translated)?;
        for op in ops {
            match op.kind {
                DiffKind::Equal => cursor += op.text.len(),
                DiffKind::Insert => {
                    self.check_boundary(cursor)?;
                    self.buffer.insert_str(cursor, &op.text);
                    self.corrections.push(Correction {
                        original_pos: cursor,
                        delta: op.text.len() as isize,
                    });
                }
                DiffKind::Delete => {
                    let end = cursor + op.text.len();
                    self.check_boundary(cursor)?;
                    self.check_boundary(end)?;
                    self.buffer.replace_range(cursor..end, "");
                    self.corrections.push(Correction {
                        original_pos: cursor,
                        delta: -(op.text.len() as isize),
                    });
                }
            }
        }
        debug!(
            target: "reconcile.apply",
            file = self.name.as_str(),
            source_pos = segment.source_pos,
            translated,
            ops = ops.len(),
            corrections = self.corrections.len(),
            "segment_applied"
        );
        Ok(())
    }

    fn checked_pos(&self, pos: isize) -> Result<usize, ReconcileError> {
        if pos < 0 || pos as usize > self.buffer.len() {
            return Err(ReconcileError::PositionOutOfBounds {
                name: self.name.clone(),
                pos,
                len: self.buffer.len(),
            });
        }
        Ok(pos as usize)
    }

    fn check_boundary(&self, pos: usize) -> Result<(), ReconcileError> {
        if pos > self.buffer.len() {
            return Err(ReconcileError::PositionOutOfBounds {
                name: self.name.clone(),
                pos: pos as isize,
                len: self.buffer.len(),
            });
        }
        if !self.buffer.is_char_boundary(pos) {
            return Err(ReconcileError::NotCharBoundary {
                name: self.name.clone(),
                pos,
            });
        }
        Ok(())
    }
}

/// Source of initial file contents, keyed by the names recorded in the trace.
pub trait SourceLoader {
    fn load(&self, name: &str) -> io::Result<String>;
}

/// Loads sources from the filesystem, names interpreted as paths.
pub struct FsLoader;

impl SourceLoader for FsLoader {
    fn load(&self, name: &str) -> io::Result<String> {
        std::fs::read_to_string(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// At least one correction was applied; the buffer should be written.
    Modified,
    /// Touched by the trace but byte-identical to the original.
    Unchanged,
    /// A segment-level failure poisoned this file; nothing is written.
    Failed,
}

/// Final per-file result of a reconciliation pass.
#[derive(Debug)]
pub struct FileReport {
    pub name: String,
    pub status: FileStatus,
    /// Final buffer contents; absent for failed files and for files that
    /// were never loaded (only generated content referenced them).
    pub buffer: Option<String>,
    pub corrections: Vec<Correction>,
    pub errors: Vec<ReconcileError>,
}

#[derive(Default)]
struct FileSlot {
    state: Option<FileEditState>,
    errors: Vec<ReconcileError>,
    failed: bool,
}

impl FileSlot {
    fn fail(&mut self, err: ReconcileError) {
        self.errors.push(err);
        self.failed = true;
    }
}

/// Replay every segment's owned ops, in trace order, against lazily loaded
/// per-file buffers. Segment-level failures are collected into the returned
/// reports; they never abort reconciliation of other files.
pub fn reapply(
    trace: &Trace,
    segments: &[SegmentDiffs],
    loader: &dyn SourceLoader,
) -> Vec<FileReport> {
    let mut slots: BTreeMap<&str, FileSlot> = BTreeMap::new();
    let mut output_pos = 0usize;

    for sd in segments {
        let seg = &sd.segment;
        let Some(name) = trace.name_of(seg) else {
            warn!(
                target: "reconcile.apply",
                file_index = seg.file_index,
                "segment_without_source_name"
            );
            output_pos += seg.output_len;
            continue;
        };
        let slot = slots.entry(name).or_default();

        if sd.ops.is_empty() {
            // The slicer ran out of diffs before this segment, so nothing
            // about this file's reconciliation can be trusted. Applies to
            // generated segments as well.
            slot.fail(ReconcileError::MissingDiffSegment { output_pos });
            output_pos += seg.output_len;
            continue;
        }

        match seg.origin_kind {
            OriginKind::Opaque => {
                if sd.ops.iter().any(|op| op.kind != DiffKind::Equal) {
                    slot.errors
                        .push(ReconcileError::UneditableSegmentModified { output_pos });
                }
                // All-equal generated content regenerates identically from
                // source; nothing to do.
            }
            OriginKind::Editable => {
                if !slot.failed {
                    if slot.state.is_none() {
                        match loader.load(name) {
                            Ok(buffer) => slot.state = Some(FileEditState::new(name, buffer)),
                            Err(source) => slot.fail(ReconcileError::SourceRead {
                                name: name.to_string(),
                                source,
                            }),
                        }
                    }
                    let applied = match slot.state.as_mut() {
                        Some(state) => state.apply(seg, &sd.ops),
                        None => Ok(()),
                    };
                    if let Err(err) = applied {
                        slot.fail(err);
                    }
                }
            }
        }
        output_pos += seg.output_len;
    }

    slots
        .into_iter()
        .map(|(name, slot)| {
            let FileSlot {
                state,
                errors,
                failed,
            } = slot;
            let (buffer, corrections) = match state {
                Some(state) if !failed => (Some(state.buffer), state.corrections),
                _ => (None, Vec::new()),
            };
            let status = if failed {
                FileStatus::Failed
            } else if corrections.is_empty() {
                FileStatus::Unchanged
            } else {
                FileStatus::Modified
            };
            FileReport {
                name: name.to_string(),
                status,
                buffer,
                corrections,
                errors,
            }
        })
        .collect()
}
