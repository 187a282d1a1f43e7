//! Coveralls job payload
//!
//! Wraps the reconciled source files into the JSON body accepted by the
//! Coveralls jobs API. Submitting it is left to the caller.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::config::Settings;
use crate::coverage::parse_jacoco;
use crate::source::{reconcile_detailed, SourceReport};

/// Environment variable holding the repository token
pub const REPO_TOKEN_ENV: &str = "COVERALLS_REPO_TOKEN";

#[derive(Debug, Clone, Serialize)]
pub struct Payload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_token: Option<String>,
    pub service_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_job_id: Option<String>,
    pub source_files: Vec<SourceReport>,
}

impl Payload {
    pub fn new(service_name: impl Into<String>, source_files: Vec<SourceReport>) -> Self {
        Self {
            repo_token: None,
            service_name: service_name.into(),
            service_job_id: None,
            source_files,
        }
    }

    pub fn with_repo_token(mut self, token: Option<String>) -> Self {
        self.repo_token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn with_service_job_id(mut self, job_id: Option<String>) -> Self {
        self.service_job_id = job_id;
        self
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        serde_json::to_writer_pretty(&mut writer, self)?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let file = fs::File::create(path)
            .with_context(|| format!("Failed to create payload file: {}", path.display()))?;
        self.write_to(std::io::BufWriter::new(file))
            .with_context(|| format!("Failed to write payload file: {}", path.display()))
    }
}

/// Parse the report, reconcile it and wrap the result, returning the unmatched keys too
///
/// Without source roots there is nothing to report: the payload is empty and
/// the report is never opened.
pub fn assemble(settings: &Settings, repo_token: Option<String>) -> Result<(Payload, Vec<String>)> {
    let payload = Payload::new(settings.service_name.clone(), Vec::new())
        .with_repo_token(repo_token)
        .with_service_job_id(settings.service_job_id.clone());

    if settings.source_roots.is_empty() {
        return Ok((payload, Vec::new()));
    }

    let report = parse_jacoco(&settings.report_path, settings.root_package.as_deref())?;
    let result = reconcile_detailed(&report, &settings.source_roots, &settings.project_root)?;

    let payload = Payload {
        source_files: result.reports,
        ..payload
    };

    Ok((payload, result.unmatched))
}
