//! Canonical identifier resolution.
//!
//! Every article ends up with at most one permanent-identifier URL. Articles
//! found in PubMed go through a two-step E-utilities lookup (id search by
//! title, then metadata fetch); everything else is resolved from the URLs
//! already present in the raw record, without any network traffic.
//!
//! Both external calls share one [`RateGate`], so the cumulative request
//! rate against NCBI stays within its quota across the whole report run.

use quick_xml::de::from_str;
use serde::Deserialize;
use std::time::Duration;

use crate::models::{ArticleRecord, DOI_URL_PREFIX};
use crate::sources::SourceError;
use crate::utils::{with_paced_retry, HttpClient, RateGate, RetryConfig};

/// E-utilities base URL
const EUTILS_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// Minimum interval between E-utilities calls without an API key
const KEYLESS_INTERVAL: Duration = Duration::from_millis(100);

/// Minimum interval when an API key raises the call-rate ceiling
const KEYED_INTERVAL: Duration = Duration::from_millis(50);

/// Resolves one article's canonical identifier URL.
#[derive(Debug)]
pub struct DoiResolver {
    client: HttpClient,
    gate: RateGate,
    retry: RetryConfig,
    base_url: String,
    api_key: Option<String>,
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

impl DoiResolver {
    /// Create a resolver; the API key, when present, is forwarded to NCBI
    /// and shortens the shared inter-call interval
    pub fn new(api_key: Option<String>) -> Result<Self, SourceError> {
        let interval = if api_key.is_some() {
            KEYED_INTERVAL
        } else {
            KEYLESS_INTERVAL
        };

        Ok(Self {
            client: HttpClient::new()?,
            gate: RateGate::new(interval),
            retry: RetryConfig::default(),
            base_url: EUTILS_BASE_URL.to_string(),
            api_key,
        })
    }

    /// Override the E-utilities base URL (for testing)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the shared inter-call interval (for testing)
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.gate = RateGate::new(interval);
        self
    }

    /// The shared inter-call interval currently in force
    pub fn interval(&self) -> Duration {
        self.gate.interval()
    }

    /// Resolve the canonical identifier URL for one article.
    ///
    /// Returns `None` when no identifier could be determined: no matching
    /// PubMed entry, exhausted retries, an unparsable response, or (for
    /// non-PubMed articles) no resolver URL in the raw record. Failures are
    /// logged, never propagated; a missing identifier only drops this one
    /// article from the report.
    pub async fn resolve(&self, article: &ArticleRecord) -> Option<String> {
        if article.from_pubmed() {
            self.resolve_via_pubmed(&article.title).await
        } else {
            article.doi_url().map(|u| u.to_string())
        }
    }

    async fn resolve_via_pubmed(&self, title: &str) -> Option<String> {
        let pubmed_id = match self.lookup_pubmed_id(title).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                tracing::debug!("no PubMed match for \"{}\"", title);
                return None;
            }
            Err(error) => {
                tracing::warn!("PubMed id lookup failed for \"{}\": {}", title, error);
                return None;
            }
        };

        match self.fetch_doi(&pubmed_id).await {
            Ok(Some(doi)) => Some(format!("{}{}", DOI_URL_PREFIX, doi)),
            Ok(None) => {
                tracing::debug!("PubMed entry {} carries no DOI", pubmed_id);
                None
            }
            Err(error) => {
                tracing::warn!("DOI fetch failed for PubMed id {}: {}", pubmed_id, error);
                None
            }
        }
    }

    fn api_key_param(&self) -> String {
        self.api_key
            .as_deref()
            .map(|key| format!("&api_key={}", key))
            .unwrap_or_default()
    }

    /// Search step: find the first candidate PubMed id for a title.
    ///
    /// `Ok(None)` means the service answered but has no match, which is
    /// final; errors are retried with a doubling penalty until the attempt
    /// budget runs out.
    async fn lookup_pubmed_id(&self, title: &str) -> Result<Option<String>, SourceError> {
        let url = format!(
            "{}/esearch.fcgi?db=pubmed&term={}&retmode=json{}",
            self.base_url,
            urlencoding::encode(title),
            self.api_key_param(),
        );

        let client = self.client.clone();
        with_paced_retry(&self.gate, self.retry, move || {
            let client = client.clone();
            let url = url.clone();
            async move {
                let response = client
                    .get(&url)
                    .send()
                    .await
                    .map_err(|e| SourceError::Network(format!("esearch request failed: {}", e)))?;

                if !response.status().is_success() {
                    return Err(SourceError::Api(format!(
                        "esearch returned status: {}",
                        response.status()
                    )));
                }

                let envelope: EsearchEnvelope = response
                    .json()
                    .await
                    .map_err(|e| SourceError::Parse(format!("esearch JSON: {}", e)))?;

                Ok(envelope.esearchresult.idlist.into_iter().next())
            }
        })
        .await
    }

    /// Fetch step: read the entry's metadata and extract the DOI element
    async fn fetch_doi(&self, pubmed_id: &str) -> Result<Option<String>, SourceError> {
        let url = format!(
            "{}/efetch.fcgi?db=pubmed&id={}&retmode=xml{}",
            self.base_url,
            pubmed_id,
            self.api_key_param(),
        );

        self.gate.pace().await;

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("efetch request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(SourceError::Api(format!(
                "efetch returned status: {}",
                response.status()
            )));
        }

        let xml = response
            .text()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to read response: {}", e)))?;

        Self::parse_doi_response(&xml)
    }

    /// Extract the DOI from the efetch XML: the text of the `ELocationID`
    /// element with `EIdType="doi"` nested under `Article`
    fn parse_doi_response(xml: &str) -> Result<Option<String>, SourceError> {
        #[derive(Debug, Deserialize)]
        struct PubmedArticleSet {
            #[serde(rename = "PubmedArticle", default)]
            articles: Vec<PubmedArticle>,
        }

        #[derive(Debug, Deserialize)]
        struct PubmedArticle {
            #[serde(rename = "MedlineCitation")]
            citation: Option<MedlineCitation>,
        }

        #[derive(Debug, Deserialize)]
        struct MedlineCitation {
            #[serde(rename = "Article")]
            article: Option<Article>,
        }

        #[derive(Debug, Deserialize)]
        struct Article {
            #[serde(rename = "ELocationID", default)]
            location_ids: Vec<ELocationId>,
        }

        #[derive(Debug, Deserialize)]
        struct ELocationId {
            #[serde(rename = "@EIdType")]
            id_type: Option<String>,
            #[serde(rename = "$text")]
            value: Option<String>,
        }

        let result: PubmedArticleSet = from_str(xml)
            .map_err(|e| SourceError::Parse(format!("efetch XML: {}", e)))?;

        let doi = result
            .articles
            .iter()
            .filter_map(|a| a.citation.as_ref())
            .filter_map(|c| c.article.as_ref())
            .flat_map(|a| a.location_ids.iter())
            .find(|l| l.id_type.as_deref() == Some("doi"))
            .and_then(|l| l.value.clone());

        Ok(doi)
    }
}
