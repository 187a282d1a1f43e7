//! Coverage module
//!
//! Provides:
//! - JaCoCo XML parsing
//! - The sparse per-file line hit map consumed by source reconciliation

mod jacoco;

pub use jacoco::*;

use std::collections::{BTreeMap, HashMap};

/// Hit flags (0 or 1) of the instrumented lines of one file, keyed by zero-based line index
pub type LineHits = BTreeMap<usize, u8>;

/// Line coverage of every source file named in a report.
///
/// Files are keyed by their package-relative path (`com/foo/Bar.java`) and
/// iterate in the order they first appeared in the report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageReport {
    files: Vec<(String, LineHits)>,
    index: HashMap<String, usize>,
}

impl CoverageReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the hits of a file, registering the file if it is not known yet
    pub fn file_mut(&mut self, key: &str) -> &mut LineHits {
        let position = match self.index.get(key) {
            Some(&position) => position,
            None => {
                self.files.push((key.to_string(), LineHits::new()));
                self.index.insert(key.to_string(), self.files.len() - 1);
                self.files.len() - 1
            }
        };
        &mut self.files[position].1
    }

    /// Record a hit flag, overwriting any earlier entry for the same line
    pub fn record(&mut self, key: &str, line_index: usize, hit: u8) {
        self.file_mut(key).insert(line_index, hit);
    }

    pub fn get(&self, key: &str) -> Option<&LineHits> {
        self.index.get(key).map(|&position| &self.files[position].1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LineHits)> {
        self.files.iter().map(|(key, hits)| (key.as_str(), hits))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
