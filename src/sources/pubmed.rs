//! PubMed database backend using the E-utilities API.

use async_trait::async_trait;
use nonzero_ext::nonzero;
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::models::{ArticleRecord, ArticleRecordBuilder, SearchQuery};
use crate::sources::{Source, SourceError};
use crate::utils::HttpClient;

/// E-utilities base URL
const EUTILS_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// PubMed database backend.
///
/// Searches via `esearch.fcgi` (JSON id list restricted to the
/// publication-date window) and materializes records via `efetch.fcgi`
/// (XML batch fetch).
#[derive(Debug, Clone)]
pub struct PubMedSource {
    client: HttpClient,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct EsearchEnvelope {
    esearchresult: EsearchResult,
}

#[derive(Debug, Deserialize)]
struct EsearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

impl PubMedSource {
    /// Create a new PubMed backend
    pub fn new() -> Result<Self, SourceError> {
        // NCBI allows at most 3 requests per second without an API key
        Ok(Self {
            client: HttpClient::with_rate_limit(nonzero!(3u32))?,
            base_url: EUTILS_BASE_URL.to_string(),
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

    /// Build the esearch URL with the publication-date window
    fn build_search_url(&self, query: &SearchQuery) -> String {
        format!(
            "{}/esearch.fcgi?db=pubmed&term={}&retmode=json&retmax={}&datetype=pdat&mindate={}&maxdate={}",
            self.base_url,
            urlencoding::encode(&query.query),
            query.limit_per_database,
            query.since.format("%Y/%m/%d"),
            query.until.format("%Y/%m/%d"),
        )
    }

    /// Build the efetch URL for a batch of PubMed ids
    fn build_fetch_url(&self, ids: &[String]) -> String {
        format!(
            "{}/efetch.fcgi?db=pubmed&id={}&retmode=xml",
            self.base_url,
            ids.join(","),
        )
    }

    /// Parse the efetch XML into article records
    fn parse_fetch_response(xml: &str) -> Result<Vec<ArticleRecord>, SourceError> {
        #[derive(Debug, Deserialize)]
        struct PubmedArticleSet {
            #[serde(rename = "PubmedArticle", default)]
            articles: Vec<PubmedArticle>,
        }

        #[derive(Debug, Deserialize)]
        struct PubmedArticle {
            #[serde(rename = "MedlineCitation")]
            medline_citation: Option<MedlineCitation>,
        }

        #[derive(Debug, Deserialize)]
        struct MedlineCitation {
            #[serde(rename = "PMID")]
            pmid: Option<Pmid>,
            #[serde(rename = "Article")]
            article: Option<Article>,
            #[serde(rename = "KeywordList", default)]
            keyword_lists: Vec<KeywordList>,
        }

        #[derive(Debug, Deserialize)]
        struct Pmid {
            #[serde(rename = "$text")]
            id: String,
        }

        #[derive(Debug, Deserialize)]
        struct Article {
            #[serde(rename = "ArticleTitle")]
            title: Option<ArticleTitle>,
            #[serde(rename = "Journal")]
            journal: Option<Journal>,
        }

        #[derive(Debug, Deserialize)]
        struct ArticleTitle {
            #[serde(rename = "$text")]
            title: Option<String>,
        }

        #[derive(Debug, Deserialize)]
        struct Journal {
            #[serde(rename = "JournalIssue")]
            issue: Option<JournalIssue>,
        }

        #[derive(Debug, Deserialize)]
        struct JournalIssue {
            #[serde(rename = "PubDate")]
            pub_date: Option<PubDate>,
        }

        #[derive(Debug, Deserialize)]
        struct PubDate {
            #[serde(rename = "Year")]
            year: Option<String>,
            #[serde(rename = "Month")]
            month: Option<String>,
            #[serde(rename = "Day")]
            day: Option<String>,
            #[serde(rename = "MedlineDate")]
            medline_date: Option<String>,
        }

        #[derive(Debug, Deserialize)]
        struct KeywordList {
            #[serde(rename = "Keyword", default)]
            keywords: Vec<Keyword>,
        }

        #[derive(Debug, Deserialize)]
        struct Keyword {
            #[serde(rename = "$text")]
            text: Option<String>,
        }

        let result: PubmedArticleSet = from_str(xml)
            .map_err(|e| SourceError::Parse(format!("Failed to parse PubMed fetch XML: {}", e)))?;

        let mut records = Vec::new();

        for entry in result.articles {
            let Some(citation) = entry.medline_citation else {
                continue;
            };

            let pmid = citation
                .pmid
                .as_ref()
                .map(|p| p.id.clone())
                .unwrap_or_default();

            let title = citation
                .article
                .as_ref()
                .and_then(|a| a.title.as_ref())
                .and_then(|t| t.title.clone())
                .unwrap_or_default();

            let publication_date = citation
                .article
                .as_ref()
                .and_then(|a| a.journal.as_ref())
                .and_then(|j| j.issue.as_ref())
                .and_then(|i| i.pub_date.as_ref())
                .map(|pd| {
                    if let Some(medline) = &pd.medline_date {
                        medline.clone()
                    } else {
                        let mut date = pd.year.clone().unwrap_or_default();
                        if let Some(month) = &pd.month {
                            date = format!("{} {}", date, month);
                        }
                        if let Some(day) = &pd.day {
                            date = format!("{} {}", date, day);
                        }
                        date
                    }
                })
                .unwrap_or_default();

            let keywords: Vec<String> = citation
                .keyword_lists
                .iter()
                .flat_map(|kl| kl.keywords.iter())
                .filter_map(|k| k.text.clone())
                .collect();

            records.push(
                ArticleRecordBuilder::new(title, "pubmed")
                    .url(format!("https://pubmed.ncbi.nlm.nih.gov/{}/", pmid))
                    .keywords(keywords)
                    .publication_date(publication_date)
                    .build(),
            );
        }

        Ok(records)
    }
}

#[async_trait]
impl Source for PubMedSource {
    fn id(&self) -> &str {
        "pubmed"
    }

    fn name(&self) -> &str {
        "PubMed"
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<ArticleRecord>, SourceError> {
        let search_url = self.build_search_url(query);

        let response = self
            .client
            .get(&search_url)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to search PubMed: {}", e)))?;

        if !response.status().is_success() {
            return Err(SourceError::Api(format!(
                "PubMed API returned status: {}",
                response.status()
            )));
        }

        let envelope: EsearchEnvelope = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("Failed to parse PubMed search JSON: {}", e)))?;

        let ids = envelope.esearchresult.idlist;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let fetch_url = self.build_fetch_url(&ids);

        let response = self
            .client
            .get(&fetch_url)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to fetch PubMed details: {}", e)))?;

        if !response.status().is_success() {
            return Err(SourceError::Api(format!(
                "PubMed API returned status: {}",
                response.status()
            )));
        }

        let xml = response
            .text()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to read response: {}", e)))?;

        let mut records = Self::parse_fetch_response(&xml)?;
        records.truncate(query.limit_per_database);
        Ok(records)
    }
}
