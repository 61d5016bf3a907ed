//! Database backend plugins for the federated search.
//!
//! This module defines the [`Source`] trait that every database backend
//! implements. New backends can be added by implementing the trait and
//! registering them with the [`SourceRegistry`].
//!
//! # Feature Flags
//!
//! Individual backends can be disabled at compile time using Cargo features:
//!
//! - `source-arxiv` - arXiv backend (default: enabled)
//! - `source-biorxiv` - bioRxiv backend (default: enabled)
//! - `source-pubmed` - PubMed backend (default: enabled)

#[cfg(feature = "source-arxiv")]
mod arxiv;
#[cfg(feature = "source-biorxiv")]
mod biorxiv;
#[cfg(feature = "source-pubmed")]
mod pubmed;
mod registry;

pub mod mock;

#[cfg(feature = "source-arxiv")]
pub use arxiv::ArxivSource;
#[cfg(feature = "source-biorxiv")]
pub use biorxiv::BiorxivSource;
pub use mock::MockSource;
#[cfg(feature = "source-pubmed")]
pub use pubmed::PubMedSource;
pub use registry::SourceRegistry;

use crate::models::{ArticleRecord, SearchQuery};
use async_trait::async_trait;

/// Interface implemented by every database backend.
///
/// A backend turns one [`SearchQuery`] into raw [`ArticleRecord`]s tagged
/// with its own database id. Backends honor `query.limit_per_database` and
/// the `[since, until]` window; merging and global caps happen upstream.
#[async_trait]
pub trait Source: Send + Sync + std::fmt::Debug {
    /// Lowercase identifier used as the database tag (e.g. "arxiv")
    fn id(&self) -> &str;

    /// Human-readable name of this backend
    fn name(&self) -> &str;

    /// Search for articles matching the query
    async fn search(&self, query: &SearchQuery) -> Result<Vec<ArticleRecord>, SourceError>;
}

/// Errors that can occur when interacting with a backend
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(String),

    /// Parsing error (XML, JSON, Atom)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Backend not found in the registry
    #[error("Unknown database: {0}")]
    UnknownDatabase(String),

    /// API error from the backend
    #[error("API error: {0}")]
    Api(String),

    /// IO error (artifact file)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

impl From<quick_xml::DeError> for SourceError {
    fn from(err: quick_xml::DeError) -> Self {
        SourceError::Parse(format!("XML: {}", err))
    }
}
