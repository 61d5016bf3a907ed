//! Search request and outcome models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::ArticleRecord;

/// Parameters of one federated search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Main search query string
    pub query: String,

    /// Inclusive lower bound of the publication-date window
    pub since: NaiveDate,

    /// Inclusive upper bound of the publication-date window
    pub until: NaiveDate,

    /// Global cap on merged results
    pub limit: usize,

    /// Cap on results taken from each individual database
    pub limit_per_database: usize,

    /// Database tags to fan out to ("arxiv", "biorxiv", "pubmed")
    pub databases: Vec<String>,
}

impl SearchQuery {
    /// Create a query over a `[since, until]` window with the default caps
    pub fn new(query: impl Into<String>, since: NaiveDate, until: NaiveDate) -> Self {
        Self {
            query: query.into(),
            since,
            until,
            limit: 1200,
            limit_per_database: 400,
            databases: vec![
                "biorxiv".to_string(),
                "arxiv".to_string(),
                "pubmed".to_string(),
            ],
        }
    }

    /// Create a query looking back `days` from `today`
    pub fn lookback(query: impl Into<String>, today: NaiveDate, days: i64) -> Self {
        let since = today - chrono::Duration::days(days);
        Self::new(query, since, today)
    }

    /// Set the global result cap
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Set the per-database result cap
    pub fn limit_per_database(mut self, limit: usize) -> Self {
        self.limit_per_database = limit;
        self
    }

    /// Restrict the databases to fan out to
    pub fn databases(mut self, databases: Vec<String>) -> Self {
        self.databases = databases;
        self
    }

    /// Whether the query text is blank
    pub fn is_empty(&self) -> bool {
        self.query.trim().is_empty()
    }
}

/// Outcome of the federated search step.
///
/// An empty query is a distinct recoverable condition, not an error, so it
/// gets its own discriminant instead of riding on an `Err` variant.
#[derive(Debug, Clone)]
pub enum SearchOutcome {
    /// The query text was blank; nothing was searched
    EmptyQuery,
    /// Merged raw result set, already persisted to the day's artifact
    Results(Vec<ArticleRecord>),
}
