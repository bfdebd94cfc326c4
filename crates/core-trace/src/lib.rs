//! Render trace data model: which output ranges came from which source bytes.
//!
//! A [`Trace`] is produced while rendering a template and consumed when
//! reconciling an edited render back into the sources. Segments partition the
//! baseline output contiguously: segment `i`'s output starts where segment
//! `i-1`'s ended, so only lengths are stored, never output offsets.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("segment {segment} references source file {file_index} but only {names} are recorded")]
    SourceIndexOutOfRange {
        segment: usize,
        file_index: usize,
        names: usize,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Whether a segment's output bytes can be mapped back to literal source text.
///
/// Serialized as an integer: 0 is editable, any nonzero value is opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", from = "u8")]
pub enum OriginKind {
    /// Literal text copied verbatim from a source file.
    Editable,
    /// Generated content (expression output, control-flow artifacts).
    Opaque,
}

impl From<OriginKind> for u8 {
    fn from(kind: OriginKind) -> Self {
        match kind {
            OriginKind::Editable => 0,
            OriginKind::Opaque => 1,
        }
    }
}

impl From<u8> for OriginKind {
    fn from(raw: u8) -> Self {
        if raw == 0 {
            OriginKind::Editable
        } else {
            OriginKind::Opaque
        }
    }
}

/// One contiguous run of baseline output and its origin.
///
/// `source_pos` is the byte offset of the literal run inside the source file;
/// it carries no meaning for [`OriginKind::Opaque`] segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceSegment {
    pub file_index: usize,
    pub origin_kind: OriginKind,
    pub source_pos: usize,
    pub output_len: usize,
}

/// Ordered mapping from baseline-output ranges back to source files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    pub names: Vec<String>,
    pub segments: Vec<TraceSegment>,
}

impl Trace {
    /// Sum of all segment output lengths. Must equal the baseline render's
    /// byte length for a trace and render produced by the same execution.
    pub fn total_output_len(&self) -> usize {
        self.segments.iter().map(|s| s.output_len).sum()
    }

    /// Source file name for a segment, if its index is in range.
    pub fn name_of(&self, segment: &TraceSegment) -> Option<&str> {
        self.names.get(segment.file_index).map(String::as_str)
    }

    /// Check that every segment's file index resolves through the name table.
    pub fn validate(&self) -> Result<(), TraceError> {
        for (i, seg) in self.segments.iter().enumerate() {
            if seg.file_index >= self.names.len() {
                return Err(TraceError::SourceIndexOutOfRange {
                    segment: i,
                    file_index: seg.file_index,
                    names: self.names.len(),
                });
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, TraceError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate a serialized trace.
    pub fn from_json(raw: &str) -> Result<Self, TraceError> {
        let trace: Trace = serde_json::from_str(raw)?;
        trace.validate()?;
        Ok(trace)
    }
}

/// Incremental trace construction used by the renderer.
#[derive(Debug, Default)]
pub struct TraceBuilder {
    names: Vec<String>,
    index: HashMap<String, usize>,
    segments: Vec<TraceSegment>,
}

impl TraceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source file name, returning its stable index.
    pub fn intern(&mut self, name: &str) -> usize {
        if let Some(&ix) = self.index.get(name) {
            return ix;
        }
        let ix = self.names.len();
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), ix);
        ix
    }

    /// Record a literal run of `output_len` bytes copied from `source_pos`.
    /// Zero-length runs are dropped; they carry no output to reconcile.
    pub fn record_editable(&mut self, file_index: usize, source_pos: usize, output_len: usize) {
        if output_len == 0 {
            return;
        }
        self.segments.push(TraceSegment {
            file_index,
            origin_kind: OriginKind::Editable,
            source_pos,
            output_len,
        });
    }

    /// Record a generated run of `output_len` bytes with no source mapping.
    pub fn record_opaque(&mut self, file_index: usize, output_len: usize) {
        if output_len == 0 {
            return;
        }
        self.segments.push(TraceSegment {
            file_index,
            origin_kind: OriginKind::Opaque,
            source_pos: 0,
            output_len,
        });
    }

    pub fn finish(self) -> Trace {
        tracing::debug!(
            target: "trace.build",
            files = self.names.len(),
            segments = self.segments.len(),
            "trace_complete"
        );
        Trace {
            names: self.names,
            segments: self.segments,
        }
    }
}
