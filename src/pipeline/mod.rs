//! Pipeline orchestration: query execution, identifier resolution and
//! report transformation for one user request.

mod executor;
mod transform;

pub use executor::QueryExecutor;
pub use transform::transform;

use chrono::Local;
use chrono::NaiveDate;
use indicatif::ProgressBar;

use crate::config::Config;
use crate::models::{ReportRow, SearchOutcome, SearchQuery};
use crate::resolver::DoiResolver;
use crate::sources::{SourceError, SourceRegistry};

/// Outcome of one report run, distinguishable by the caller.
///
/// `Report(vec![])` means the search ran and found nothing — different from
/// `EmptyQuery` (nothing was searched) and from `Err` (the pipeline failed).
#[derive(Debug)]
pub enum ReportOutcome {
    /// The query text was blank; the caller should ask for a real query
    EmptyQuery,
    /// The finished report, one row per resolved article
    Report(Vec<ReportRow>),
}

/// Errors fatal to a whole report run
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Federated search or artifact handling failed
    #[error("federated search failed: {0}")]
    Backend(#[from] SourceError),
}

/// Composes the pipeline for one request:
/// search → per-article resolution → report transformation.
pub struct Pipeline {
    executor: QueryExecutor,
    resolver: DoiResolver,
    progress: Option<ProgressBar>,
}

impl Pipeline {
    /// Build a pipeline from configuration
    pub fn new(config: &Config) -> Result<Self, PipelineError> {
        let registry = SourceRegistry::new()?;
        let executor = QueryExecutor::new(registry, config.search.artifact_dir.clone());
        let resolver = DoiResolver::new(config.api_keys.ncbi.clone())?;

        Ok(Self {
            executor,
            resolver,
            progress: None,
        })
    }

    /// Build a pipeline from preconstructed parts (for testing)
    pub fn from_parts(executor: QueryExecutor, resolver: DoiResolver) -> Self {
        Self {
            executor,
            resolver,
            progress: None,
        }
    }

    /// Attach a progress bar advanced once per resolved article
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Run the pipeline with today's date as the processing date
    pub async fn run(&self, query: &SearchQuery) -> Result<ReportOutcome, PipelineError> {
        self.run_on(query, Local::now().date_naive()).await
    }

    /// Run the pipeline with an explicit processing date (for testing)
    pub async fn run_on(
        &self,
        query: &SearchQuery,
        today: NaiveDate,
    ) -> Result<ReportOutcome, PipelineError> {
        let mut articles = match self.executor.search(query, today).await? {
            SearchOutcome::EmptyQuery => return Ok(ReportOutcome::EmptyQuery),
            SearchOutcome::Results(articles) => articles,
        };

        if let Some(progress) = &self.progress {
            progress.set_length(articles.len() as u64);
        }

        // Resolution is sequential: the external quota is shared across all
        // articles of the run
        for article in articles.iter_mut() {
            let resolved = self.resolver.resolve(&*article).await;
            article.resolved_url = resolved;
            if let Some(progress) = &self.progress {
                progress.inc(1);
            }
        }

        let resolved = articles.iter().filter(|a| a.resolved_url.is_some()).count();
        tracing::info!("resolved {} of {} articles", resolved, articles.len());

        Ok(ReportOutcome::Report(transform(&articles, today)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArticleRecordBuilder;
    use crate::sources::MockSource;
    use std::sync::Arc;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn pipeline_with(records: Vec<crate::models::ArticleRecord>, dir: &std::path::Path) -> Pipeline {
        let mock = MockSource::with_id("arxiv");
        mock.set_records(records);

        let mut registry = SourceRegistry::empty();
        registry.register(Arc::new(mock));

        Pipeline::from_parts(
            QueryExecutor::new(registry, dir),
            DoiResolver::new(None).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_empty_query_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_with(Vec::new(), dir.path());

        let query = SearchQuery::new("", date("2024-06-01"), date("2024-06-08"))
            .databases(vec!["arxiv".to_string()]);
        let outcome = pipeline.run_on(&query, date("2024-06-08")).await.unwrap();

        assert!(matches!(outcome, ReportOutcome::EmptyQuery));
    }

    #[tokio::test]
    async fn test_zero_results_is_an_empty_report() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_with(Vec::new(), dir.path());

        let query = SearchQuery::new("crispr", date("2024-06-01"), date("2024-06-08"))
            .databases(vec!["arxiv".to_string()]);
        let outcome = pipeline.run_on(&query, date("2024-06-08")).await.unwrap();

        match outcome {
            ReportOutcome::Report(rows) => assert!(rows.is_empty()),
            other => panic!("expected empty report, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_report_for_directly_resolvable_articles() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![
            ArticleRecordBuilder::new("Has a DOI", "arxiv")
                .url("https://doi.org/10.1/abc")
                .publication_date("2024-06-02")
                .build(),
            ArticleRecordBuilder::new("No DOI anywhere", "arxiv")
                .url("https://arxiv.org/abs/2406.00001")
                .build(),
        ];
        let pipeline = pipeline_with(records, dir.path());

        let query = SearchQuery::new("doi", date("2024-06-01"), date("2024-06-08"))
            .databases(vec!["arxiv".to_string()]);
        let outcome = pipeline.run_on(&query, date("2024-06-08")).await.unwrap();

        let ReportOutcome::Report(rows) = outcome else {
            panic!("expected report");
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].doi, "10.1/abc");
        assert_eq!(rows[0].is_preprint, "TRUE");
        assert_eq!(rows[0].date, "2024-06-08");
    }

    #[tokio::test]
    async fn test_backend_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockSource::with_id("arxiv");
        mock.fail_with("boom");

        let mut registry = SourceRegistry::empty();
        registry.register(Arc::new(mock));

        let pipeline = Pipeline::from_parts(
            QueryExecutor::new(registry, dir.path()),
            DoiResolver::new(None).unwrap(),
        );

        let query = SearchQuery::new("crispr", date("2024-06-01"), date("2024-06-08"))
            .databases(vec!["arxiv".to_string()]);
        let result = pipeline.run_on(&query, date("2024-06-08")).await;

        assert!(matches!(result, Err(PipelineError::Backend(_))));
    }
}
