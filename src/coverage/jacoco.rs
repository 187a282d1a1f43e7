//! JaCoCo XML format parser

use anyhow::{anyhow, Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs;
use std::path::Path;
use tracing::info;

use super::CoverageReport;

/// Parse a JaCoCo XML report file
///
/// `root_package` is a dot separated package prefix stripped from the start
/// of every package path, e.g. `com.example` turns `com/example/api` into `/api`.
pub fn parse_jacoco(path: &Path, root_package: Option<&str>) -> Result<CoverageReport> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read coverage report: {}", path.display()))?;

    let report = parse_jacoco_string(&content, root_package)
        .with_context(|| format!("Failed to parse coverage report: {}", path.display()))?;

    info!("parsed coverage at {}", path.display());

    Ok(report)
}

/// Parse JaCoCo XML content from a string
///
/// DOCTYPE declarations are skipped, never resolved, so no external DTD is loaded.
pub fn parse_jacoco_string(content: &str, root_package: Option<&str>) -> Result<CoverageReport> {
    let mut reader = Reader::from_str(content);
    reader.trim_text(true);

    let mut builder = ReportBuilder::new(root_package);
    let mut depth = 0usize;
    let mut seen_root = false;

    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                builder
                    .open(e, depth)
                    .with_context(|| format!("at byte {}", reader.buffer_position()))?;
                seen_root = true;
                depth += 1;
            }
            Ok(Event::Empty(ref e)) => {
                builder
                    .open(e, depth)
                    .with_context(|| format!("at byte {}", reader.buffer_position()))?;
                builder.close(depth);
                seen_root = true;
            }
            Ok(Event::End(_)) => {
                depth = depth.saturating_sub(1);
                builder.close(depth);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(anyhow!(
                    "Error parsing JaCoCo XML at byte {}: {}",
                    reader.buffer_position(),
                    e
                ))
            }
            _ => {}
        }
        buf.clear();
    }

    if !seen_root {
        anyhow::bail!("Error parsing JaCoCo XML: document has no root element");
    }
    if depth != 0 {
        anyhow::bail!("Error parsing JaCoCo XML: unexpected end of document");
    }

    Ok(builder.report)
}

/// Normalize a package name into the path prefix of its source files
pub fn package_path(name: &str, root_package: Option<&str>) -> String {
    let path = name.replace('.', "/");

    match root_package {
        Some(root) => {
            let prefix = root.replace('.', "/");
            match path.strip_prefix(prefix.as_str()) {
                Some(stripped) => stripped.to_string(),
                None => path,
            }
        }
        None => path,
    }
}

/// Tracks where in the `report > package > sourcefile > line` tree the reader is
struct ReportBuilder<'a> {
    root_package: Option<&'a str>,
    report: CoverageReport,
    current_package: Option<String>,
    current_file: Option<String>,
}

impl<'a> ReportBuilder<'a> {
    fn new(root_package: Option<&'a str>) -> Self {
        Self {
            root_package,
            report: CoverageReport::new(),
            current_package: None,
            current_file: None,
        }
    }

    /// Handle an element opened at `depth` (the root element sits at depth 0)
    fn open(&mut self, e: &BytesStart, depth: usize) -> Result<()> {
        match (depth, e.name().as_ref()) {
            (1, b"package") => {
                let name = required_attr(e, "name")?;
                self.current_package = Some(package_path(&name, self.root_package));
            }
            (2, b"sourcefile") => {
                if let Some(ref package) = self.current_package {
                    let name = required_attr(e, "name")?;
                    let key = format!("{}/{}", package, name);
                    self.report.file_mut(&key);
                    self.current_file = Some(key);
                }
            }
            (3, b"line") => {
                if let Some(ref key) = self.current_file {
                    let nr = required_attr(e, "nr")?;
                    let ci = required_attr(e, "ci")?;

                    let number: usize = nr
                        .parse()
                        .map_err(|_| anyhow!("Invalid line number nr=\"{}\" in {}", nr, key))?;
                    if number == 0 {
                        anyhow::bail!("Invalid line number nr=\"0\" in {}, lines start at 1", key);
                    }
                    let covered: i64 = ci
                        .parse()
                        .map_err(|_| anyhow!("Invalid instruction count ci=\"{}\" in {}", ci, key))?;

                    // JaCoCo reports covered instructions, not hit counts
                    let hit = if covered > 0 { 1 } else { 0 };
                    self.report.record(key, number - 1, hit);
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Handle an element closed so that `depth` elements remain open
    fn close(&mut self, depth: usize) {
        match depth {
            1 => self.current_package = None,
            2 => self.current_file = None,
            _ => {}
        }
    }
}

fn required_attr(e: &BytesStart, name: &str) -> Result<String> {
    let element = String::from_utf8_lossy(e.name().as_ref()).to_string();

    let attr = e
        .try_get_attribute(name)
        .with_context(|| format!("Malformed attributes on <{}>", element))?
        .ok_or_else(|| anyhow!("<{}> is missing required attribute '{}'", element, name))?;

    let value = attr
        .unescape_value()
        .with_context(|| format!("Malformed '{}' attribute on <{}>", name, element))?;

    Ok(value.into_owned())
}
