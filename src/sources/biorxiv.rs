//! bioRxiv database backend.

use async_trait::async_trait;
use nonzero_ext::nonzero;
use serde::Deserialize;

use crate::models::{ArticleRecord, ArticleRecordBuilder, SearchQuery};
use crate::sources::{Source, SourceError};
use crate::utils::HttpClient;

const BIORXIV_API_URL: &str = "https://api.biorxiv.org";

/// Page size of the details endpoint
const PAGE_SIZE: usize = 100;

/// bioRxiv database backend.
///
/// The details API takes a date interval but no query text, so the window is
/// fetched page by page and matched against the query terms locally.
#[derive(Debug, Clone)]
pub struct BiorxivSource {
    client: HttpClient,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    #[serde(default)]
    collection: Vec<Preprint>,
}

#[derive(Debug, Deserialize)]
struct Preprint {
    #[serde(default)]
    doi: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    date: String,
    #[serde(default)]
    category: String,
}

impl BiorxivSource {
    /// Create a new bioRxiv backend
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self {
            client: HttpClient::with_rate_limit(nonzero!(1u32))?,
            base_url: BIORXIV_API_URL.to_string(),
        })
    }

    /// Create with a custom HTTP client and base URL (for testing)
    #[allow(dead_code)]
    pub fn with_client(client: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Fetch one page of the date window
    async fn get_page(&self, query: &SearchQuery, cursor: usize) -> Result<Vec<Preprint>, SourceError> {
        let url = format!(
            "{}/details/biorxiv/{}/{}/{}",
            self.base_url,
            query.since.format("%Y-%m-%d"),
            query.until.format("%Y-%m-%d"),
            cursor,
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to fetch from bioRxiv: {}", e)))?;

        if !response.status().is_success() {
            return Err(SourceError::Api(format!(
                "bioRxiv API returned status: {}",
                response.status()
            )));
        }

        let details: DetailsResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("Failed to parse bioRxiv JSON: {}", e)))?;

        Ok(details.collection)
    }

    /// Whether a preprint matches any term of the query text
    fn matches(preprint: &Preprint, terms: &[String]) -> bool {
        let haystack = format!("{} {}", preprint.title, preprint.category).to_lowercase();
        terms.iter().any(|t| haystack.contains(t.as_str()))
    }

    fn to_record(preprint: Preprint) -> ArticleRecord {
        let mut builder = ArticleRecordBuilder::new(preprint.title, "biorxiv")
            .publication_date(preprint.date);

        if !preprint.doi.is_empty() {
            builder = builder
                .url(format!("https://doi.org/{}", preprint.doi))
                .url(format!("https://www.biorxiv.org/content/{}", preprint.doi));
        }

        if !preprint.category.is_empty() {
            builder = builder.keyword(preprint.category);
        }

        builder.build()
    }
}

#[async_trait]
impl Source for BiorxivSource {
    fn id(&self) -> &str {
        "biorxiv"
    }

    fn name(&self) -> &str {
        "bioRxiv"
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<ArticleRecord>, SourceError> {
        let terms: Vec<String> = query
            .query
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .collect();

        let mut records = Vec::new();
        let mut cursor = 0usize;

        loop {
            let page = self.get_page(query, cursor).await?;
            let page_len = page.len();

            records.extend(
                page.into_iter()
                    .filter(|p| Self::matches(p, &terms))
                    .map(Self::to_record),
            );

            if records.len() >= query.limit_per_database || page_len < PAGE_SIZE {
                break;
            }
            cursor += page_len;
        }

        records.truncate(query.limit_per_database);
        Ok(records)
    }
}
