//! Persistence of reconciled buffers.
//!
//! Originals are never overwritten: every modified buffer goes to a sibling
//! path built from the source name plus a suffix.

use crate::{FileReport, FileStatus, ReconcileError};
use std::path::PathBuf;
use tracing::{error, info};

/// What the writer did with each report.
#[derive(Debug, Default)]
pub struct WriteSummary {
    pub written: Vec<PathBuf>,
    pub unchanged: Vec<String>,
    /// Files skipped because reconciliation already failed them.
    pub skipped: Vec<String>,
    pub failures: Vec<ReconcileError>,
}

/// Write every modified buffer to `<name><suffix>`. Unchanged and failed
/// files are skipped; a write failure is recorded and does not stop the
/// remaining files.
pub fn write_outputs(reports: &[FileReport], suffix: &str) -> WriteSummary {
    let mut summary = WriteSummary::default();
    for report in reports {
        match report.status {
            FileStatus::Failed => summary.skipped.push(report.name.clone()),
            FileStatus::Unchanged => {
                info!(target: "reconcile.write", file = report.name.as_str(), "file_unchanged");
                summary.unchanged.push(report.name.clone());
            }
            FileStatus::Modified => {
                let path = PathBuf::from(format!("{}{}", report.name, suffix));
                let Some(buffer) = report.buffer.as_deref() else {
                    continue;
                };
                match std::fs::write(&path, buffer) {
                    Ok(()) => {
                        info!(
                            target: "reconcile.write",
                            file = report.name.as_str(),
                            out = %path.display(),
                            bytes = buffer.len(),
                            "file_written"
                        );
                        summary.written.push(path);
                    }
                    Err(source) => {
                        error!(
                            target: "reconcile.write",
                            file = report.name.as_str(),
                            out = %path.display(),
                            ?source,
                            "file_write_error"
                        );
                        summary.failures.push(ReconcileError::OutputWrite {
                            name: path.display().to_string(),
                            source,
                        });
                    }
                }
            }
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Correction;

    fn report(name: &str, status: FileStatus, buffer: Option<&str>) -> FileReport {
        FileReport {
            name: name.to_string(),
            status,
            buffer: buffer.map(str::to_string),
            corrections: vec![Correction {
                original_pos: 0,
                delta: 1,
            }],
            errors: Vec::new(),
        }
    }

    #[test]
    fn writes_modified_buffers_with_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("page.tmpl");
        let name = src.to_string_lossy().to_string();
        let reports = vec![report(&name, FileStatus::Modified, Some("new content"))];
        let summary = write_outputs(&reports, ".new");
        assert_eq!(summary.written.len(), 1);
        assert!(summary.written[0].to_string_lossy().ends_with("page.tmpl.new"));
        let written = std::fs::read_to_string(&summary.written[0]).unwrap();
        assert_eq!(written, "new content");
        // The original path was never created, let alone overwritten.
        assert!(!src.exists());
    }

    #[test]
    fn unchanged_and_failed_files_are_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let unchanged = dir.path().join("same.tmpl").to_string_lossy().to_string();
        let failed = dir.path().join("broken.tmpl").to_string_lossy().to_string();
        let reports = vec![
            report(&unchanged, FileStatus::Unchanged, Some("text")),
            report(&failed, FileStatus::Failed, None),
        ];
        let summary = write_outputs(&reports, ".new");
        assert!(summary.written.is_empty());
        assert_eq!(summary.unchanged, vec![unchanged]);
        assert_eq!(summary.skipped, vec![failed]);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn write_failure_is_reported_and_does_not_stop_others() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir
            .path()
            .join("no-such-dir")
            .join("page.tmpl")
            .to_string_lossy()
            .to_string();
        let good = dir.path().join("ok.tmpl").to_string_lossy().to_string();
        let reports = vec![
            report(&bad, FileStatus::Modified, Some("x")),
            report(&good, FileStatus::Modified, Some("y")),
        ];
        let summary = write_outputs(&reports, ".new");
        assert_eq!(summary.failures.len(), 1);
        assert!(matches!(
            summary.failures[0],
            ReconcileError::OutputWrite { .. }
        ));
        assert_eq!(summary.written.len(), 1);
        assert!(summary.written[0].to_string_lossy().ends_with("ok.tmpl.new"));
    }
}
