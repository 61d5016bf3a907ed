//! Mock backend for testing purposes.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::models::{ArticleRecord, SearchQuery};
use crate::sources::{Source, SourceError};

/// A mock backend returning predefined records or a canned failure.
#[derive(Debug, Default)]
pub struct MockSource {
    id: String,
    records: Mutex<Vec<ArticleRecord>>,
    fail_with: Mutex<Option<String>>,
}

impl MockSource {
    /// Create a new mock backend with id "mock"
    pub fn new() -> Self {
        Self::with_id("mock")
    }

    /// Create a mock backend masquerading as the given database
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            records: Mutex::new(Vec::new()),
            fail_with: Mutex::new(None),
        }
    }

    /// Set the records to return
    pub fn set_records(&self, records: Vec<ArticleRecord>) {
        *self.records.lock().unwrap() = records;
    }

    /// Make every search fail with a network error
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.fail_with.lock().unwrap() = Some(message.into());
    }
}

#[async_trait]
impl Source for MockSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Mock Source"
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<ArticleRecord>, SourceError> {
        if let Some(message) = self.fail_with.lock().unwrap().clone() {
            return Err(SourceError::Network(message));
        }

        let mut records = self.records.lock().unwrap().clone();
        records.truncate(query.limit_per_database);
        Ok(records)
    }
}
