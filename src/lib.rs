//! jacoco-coveralls - JaCoCo to Coveralls source reconciliation
//!
//! A library for turning JaCoCo XML coverage reports into Coveralls source files:
//! - JaCoCo report parsing with optional root package stripping
//! - Source root matching (first root containing the file wins)
//! - Dense per-line coverage arrays and MD5 source digests
//! - Coveralls JSON payload assembly

pub mod config;
pub mod coverage;
pub mod payload;
pub mod source;

pub use config::{Config, Overrides, Settings};
pub use coverage::{parse_jacoco, parse_jacoco_string, CoverageReport, LineHits};
pub use payload::{assemble, Payload};
pub use source::{reconcile, reconcile_detailed, Reconciliation, SourceReport};
