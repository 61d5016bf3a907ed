//! arXiv database backend.

use async_trait::async_trait;
use feed_rs::parser;
use nonzero_ext::nonzero;

use crate::models::{ArticleRecord, ArticleRecordBuilder, SearchQuery};
use crate::sources::{Source, SourceError};
use crate::utils::HttpClient;

/// Base URL for the arXiv API
const ARXIV_API_URL: &str = "http://export.arxiv.org/api/query";

/// arXiv database backend.
///
/// Queries the Atom export API with the search terms restricted to the
/// requested submission-date window.
#[derive(Debug, Clone)]
pub struct ArxivSource {
    client: HttpClient,
}

impl ArxivSource {
    /// Create a new arXiv backend
    pub fn new() -> Result<Self, SourceError> {
        // arXiv asks for no more than one request per second
        Ok(Self {
            client: HttpClient::with_rate_limit(nonzero!(1u32))?,
        })
    }

    /// Create with a custom HTTP client (for testing)
    #[allow(dead_code)]
    pub fn with_client(client: HttpClient) -> Self {
        Self { client }
    }

    /// Build the arXiv search expression with the submission-date window
    fn build_search_query(query: &SearchQuery) -> String {
        format!(
            "all:{} AND submittedDate:[{}0000 TO {}2359]",
            query.query,
            query.since.format("%Y%m%d"),
            query.until.format("%Y%m%d"),
        )
    }

    /// Parse one Atom entry into an article record
    fn parse_entry(entry: &feed_rs::model::Entry) -> ArticleRecord {
        let title = entry
            .title
            .as_ref()
            .map(|t| t.content.clone())
            .unwrap_or_default();

        let published_date = entry
            .published
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();

        let keywords: Vec<String> = entry
            .categories
            .iter()
            .map(|c| c.term.clone())
            .collect();

        let mut builder = ArticleRecordBuilder::new(title, "arxiv")
            .publication_date(published_date)
            .keywords(keywords);

        // The entry id is the abstract page URL
        builder = builder.url(entry.id.clone());

        // Journal-published entries carry a DOI link; normalize the host so
        // the record exposes the canonical resolver form
        for link in &entry.links {
            if link.title.as_deref() == Some("doi") || link.href.contains("doi.org/") {
                if let Some(doi) = link.href.split("doi.org/").nth(1) {
                    builder = builder.url(format!("https://doi.org/{}", doi));
                }
            }
        }

        builder.build()
    }
}

#[async_trait]
impl Source for ArxivSource {
    fn id(&self) -> &str {
        "arxiv"
    }

    fn name(&self) -> &str {
        "arXiv"
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<ArticleRecord>, SourceError> {
        let search_query = Self::build_search_query(query);
        let url = format!(
            "{}?search_query={}&start=0&max_results={}&sortBy=submittedDate&sortOrder=descending",
            ARXIV_API_URL,
            urlencoding::encode(&search_query),
            query.limit_per_database,
        );

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/atom+xml")
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to fetch arXiv results: {}", e)))?;

        if !response.status().is_success() {
            return Err(SourceError::Api(format!(
                "arXiv API returned status: {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to read response: {}", e)))?;

        let feed = parser::parse(bytes.as_ref())
            .map_err(|e| SourceError::Parse(format!("Failed to parse Atom feed: {}", e)))?;

        let records = feed
            .entries
            .iter()
            .map(Self::parse_entry)
            .take(query.limit_per_database)
            .collect();

        Ok(records)
    }
}
