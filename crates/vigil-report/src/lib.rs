//! # Vigil Report
//!
//! The report half of the pipeline: fetch raw status-page content over
//! HTTP and parse it into a structured [`Report`].
//!
//! ## Architecture
//! ```text
//! HttpFetcher (reqwest, per-call timeout)
//!   → raw bytes
//!     → parse() — summary block + record cards, per-card tolerance
//!       → ParsedReport { report, warnings }
//! ```
//!
//! The fetcher is a trait so the scheduler can be driven by stubs in tests;
//! the parser is a pure function of its input.

pub mod fetch;
pub mod parse;
pub mod report;

pub use fetch::{HttpFetcher, ReportFetcher};
pub use parse::{parse, ParsedReport};
pub use report::{FailureRecord, Report};
