//! Source reconciliation
//!
//! Matches every file of a [`CoverageReport`] against the project's source
//! roots and turns its sparse line hits into a dense per-line record.

mod digest;
mod path;

pub use digest::{count_lines, source_digest};
pub use path::{candidate_path, relative_name};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::coverage::{CoverageReport, LineHits};

/// Coverage of one source file, in the shape Coveralls expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReport {
    /// Path relative to the project root
    pub name: String,
    pub source_digest: String,
    /// One slot per physical line: `Some(1)` executed, `Some(0)` missed, `None` not instrumented
    pub coverage: Vec<Option<u8>>,
}

/// Outcome of reconciling a whole report
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub reports: Vec<SourceReport>,
    /// Report keys that were not found in any source root
    pub unmatched: Vec<String>,
}

/// Reconcile a coverage report against the source roots, in report order
pub fn reconcile<P: AsRef<Path>>(
    report: &CoverageReport,
    source_roots: &[P],
    project_root: &Path,
) -> Result<Vec<SourceReport>> {
    Ok(reconcile_detailed(report, source_roots, project_root)?.reports)
}

/// Like [`reconcile`], also returning the keys that could not be matched
pub fn reconcile_detailed<P: AsRef<Path>>(
    report: &CoverageReport,
    source_roots: &[P],
    project_root: &Path,
) -> Result<Reconciliation> {
    let mut result = Reconciliation::default();

    if source_roots.is_empty() {
        return Ok(result);
    }

    let dirs: Vec<String> = source_roots
        .iter()
        .map(|root| root.as_ref().display().to_string())
        .collect();
    info!("using source directories: [{}]", dirs.join(", "));

    for (key, hits) in report.iter() {
        match find_source(source_roots, key) {
            Some(file) => {
                debug!("found file: {}", file.display());
                result.reports.push(build_report(&file, hits, project_root)?);
            }
            None => {
                info!("{} could not be found in any of the source directories, skipping", key);
                result.unmatched.push(key.to_string());
            }
        }
    }

    Ok(result)
}

/// First source root containing `key` wins
pub fn find_source<P: AsRef<Path>>(source_roots: &[P], key: &str) -> Option<PathBuf> {
    source_roots
        .iter()
        .map(|root| candidate_path(root.as_ref(), key))
        .find(|candidate| candidate.is_file())
}

fn build_report(file: &Path, hits: &LineHits, project_root: &Path) -> Result<SourceReport> {
    let content = fs::read(file)
        .with_context(|| format!("Failed to read source file: {}", file.display()))?;

    let line_count = count_lines(&content);
    let mut coverage = vec![None; line_count];

    for (&index, &hit) in hits {
        match coverage.get_mut(index) {
            Some(slot) => *slot = Some(hit),
            None => debug!(
                "ignoring line {} of {}, file only has {} lines",
                index + 1,
                file.display(),
                line_count
            ),
        }
    }

    Ok(SourceReport {
        name: relative_name(project_root, file),
        source_digest: source_digest(&content),
        coverage,
    })
}
