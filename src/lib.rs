//! # papersurf
//!
//! A literature-discovery pipeline: one search query fans out across several
//! academic databases, every hit is resolved to its canonical DOI, and the
//! result comes back as a normalized tabular report.
//!
//! ## Architecture
//!
//! - [`models`]: Core data structures (ArticleRecord, ReportRow, SearchQuery)
//! - [`sources`]: Database backends with an extensible trait-based architecture
//! - [`pipeline`]: Query execution, report transformation and orchestration
//! - [`resolver`]: Rate-limited canonical identifier resolution
//! - [`utils`]: HTTP client, pacing/retry helpers, duplicate merging
//! - [`config`]: Configuration management

pub mod config;
pub mod models;
pub mod pipeline;
pub mod resolver;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use models::{ArticleRecord, ReportRow, SearchQuery};
pub use pipeline::{Pipeline, ReportOutcome};
pub use resolver::DoiResolver;
pub use sources::{Source, SourceRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
