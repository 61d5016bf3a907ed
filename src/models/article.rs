//! Article model representing one raw search hit from any database.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// URL prefix of the permanent-identifier resolver.
pub const DOI_URL_PREFIX: &str = "https://doi.org/";

/// One article as materialized by the federated search.
///
/// Records are created fresh per search invocation, written to the per-day
/// artifact, mutated once by the resolver (`resolved_url`) and then consumed
/// by the report transformer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    /// Article title as reported by the source
    pub title: String,

    /// Lowercase tags of every database this article was found in
    /// ("arxiv", "biorxiv", "pubmed"); never empty
    pub databases: BTreeSet<String>,

    /// URLs found directly in the raw record, in source order
    #[serde(default)]
    pub urls: Vec<String>,

    /// Keywords, each carrying an opaque 2-character relevance code prefix
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Date string as reported by the source; semantics vary per database
    /// and are treated opaquely downstream
    pub publication_date: String,

    /// Canonical identifier URL, populated by the resolver.
    /// When present it always starts with [`DOI_URL_PREFIX`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_url: Option<String>,
}

impl ArticleRecord {
    /// Create a new record found in a single database
    pub fn new(title: impl Into<String>, database: impl Into<String>) -> Self {
        let mut databases = BTreeSet::new();
        databases.insert(database.into());
        Self {
            title: title.into(),
            databases,
            urls: Vec::new(),
            keywords: Vec::new(),
            publication_date: String::new(),
            resolved_url: None,
        }
    }

    /// Whether this article was found in the PubMed database
    pub fn from_pubmed(&self) -> bool {
        self.databases.contains("pubmed")
    }

    /// First URL already pointing at the permanent-identifier resolver
    pub fn doi_url(&self) -> Option<&str> {
        self.urls
            .iter()
            .map(|u| u.as_str())
            .find(|u| u.starts_with(DOI_URL_PREFIX))
    }
}

/// Builder for constructing [`ArticleRecord`]s
#[derive(Debug, Clone)]
pub struct ArticleRecordBuilder {
    record: ArticleRecord,
}

impl ArticleRecordBuilder {
    /// Create a new builder with the required fields
    pub fn new(title: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            record: ArticleRecord::new(title, database),
        }
    }

    /// Add a URL
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.record.urls.push(url.into());
        self
    }

    /// Add a keyword
    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        self.record.keywords.push(keyword.into());
        self
    }

    /// Set all keywords at once
    pub fn keywords(mut self, keywords: Vec<String>) -> Self {
        self.record.keywords = keywords;
        self
    }

    /// Set the publication date
    pub fn publication_date(mut self, date: impl Into<String>) -> Self {
        self.record.publication_date = date.into();
        self
    }

    /// Set the resolved identifier URL
    pub fn resolved_url(mut self, url: impl Into<String>) -> Self {
        self.record.resolved_url = Some(url.into());
        self
    }

    /// Build the record
    pub fn build(self) -> ArticleRecord {
        self.record
    }
}

/// On-disk schema of the per-day search artifact.
///
/// Written to `<artifact_dir>/<YYYY-MM-DD>.json` after every federated
/// search and overwritten on repeated same-day runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchArtifact {
    /// Merged raw result set across all databases
    pub papers: Vec<ArticleRecord>,
}
