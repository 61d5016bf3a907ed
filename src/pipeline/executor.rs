//! Federated query execution.

use chrono::NaiveDate;
use std::path::{Path, PathBuf};

use crate::models::{ArticleRecord, SearchArtifact, SearchOutcome, SearchQuery};
use crate::sources::{SourceError, SourceRegistry};
use crate::utils::merge_duplicates;

/// Executes one federated search and materializes the raw result set.
///
/// Every requested backend must succeed; a single backend failure aborts the
/// whole call with no partial results. The merged set is persisted to a
/// per-day artifact file before being returned, so each day's raw results
/// stay on disk for auditing (same-day re-runs overwrite the file).
#[derive(Debug)]
pub struct QueryExecutor {
    registry: SourceRegistry,
    artifact_dir: PathBuf,
}

impl QueryExecutor {
    /// Create an executor writing artifacts under `artifact_dir`
    pub fn new(registry: SourceRegistry, artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            artifact_dir: artifact_dir.into(),
        }
    }

    /// Artifact path for the given processing date
    pub fn artifact_path(&self, date: NaiveDate) -> PathBuf {
        self.artifact_dir
            .join(format!("{}.json", date.format("%Y-%m-%d")))
    }

    /// Run the federated search for one query.
    ///
    /// A blank query is a no-op reported as [`SearchOutcome::EmptyQuery`].
    pub async fn search(
        &self,
        query: &SearchQuery,
        today: NaiveDate,
    ) -> Result<SearchOutcome, SourceError> {
        if query.is_empty() {
            tracing::info!("query is empty, nothing to search for");
            return Ok(SearchOutcome::EmptyQuery);
        }

        let mut merged = Vec::new();

        for database in &query.databases {
            let source = self.registry.get_required(database)?;
            let mut records = source.search(query).await?;
            records.truncate(query.limit_per_database);

            tracing::info!("{}: {} records", source.name(), records.len());
            merged.extend(records);
        }

        let mut articles = merge_duplicates(merged);
        grade_keywords(&mut articles, &query.query);
        articles.truncate(query.limit);

        let artifact_path = self.artifact_path(today);
        self.persist(&artifact_path, &articles).await?;

        // Return what the artifact actually holds, not the in-memory set
        let articles = Self::load(&artifact_path).await?;
        Ok(SearchOutcome::Results(articles))
    }

    async fn persist(&self, path: &Path, articles: &[ArticleRecord]) -> Result<(), SourceError> {
        tokio::fs::create_dir_all(&self.artifact_dir).await?;

        let artifact = SearchArtifact {
            papers: articles.to_vec(),
        };
        let json = serde_json::to_vec_pretty(&artifact)?;
        tokio::fs::write(path, json).await?;

        tracing::debug!("wrote {} records to {}", articles.len(), path.display());
        Ok(())
    }

    async fn load(path: &Path) -> Result<Vec<ArticleRecord>, SourceError> {
        let json = tokio::fs::read_to_string(path).await?;
        let artifact: SearchArtifact = serde_json::from_str(&json)?;
        Ok(artifact.papers)
    }
}

/// Prefix every keyword with its 2-character relevance code
fn grade_keywords(articles: &mut [ArticleRecord], query: &str) {
    let query_lower = query.to_lowercase();
    for article in articles {
        for keyword in &mut article.keywords {
            let code = relevance_code(keyword, &query_lower);
            *keyword = format!("{}{}", code, keyword);
        }
    }
}

/// Relevance code for one keyword: `A:` when the keyword occurs in the
/// query, `B:` otherwise
fn relevance_code(keyword: &str, query_lower: &str) -> &'static str {
    if query_lower.contains(&keyword.to_lowercase()) {
        "A:"
    } else {
        "B:"
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

    fn registry_with(records: Vec<ArticleRecord>) -> SourceRegistry {
        let mock = MockSource::with_id("arxiv");
        mock.set_records(records);

        let mut registry = SourceRegistry::empty();
        registry.register(Arc::new(mock));
        registry
    }

    fn query_for(databases: &[&str]) -> SearchQuery {
        SearchQuery::new("crispr", date("2024-06-01"), date("2024-06-08"))
            .databases(databases.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_relevance_codes() {
        assert_eq!(relevance_code("crispr", "crispr screening"), "A:");
        assert_eq!(relevance_code("CRISPR", "crispr screening"), "A:");
        assert_eq!(relevance_code("immunology", "crispr screening"), "B:");
    }

    #[test]
    fn test_artifact_path_per_day() {
        let executor = QueryExecutor::new(SourceRegistry::empty(), "/tmp/papersurf");
        let path = executor.artifact_path(date("2024-06-08"));
        assert_eq!(path, PathBuf::from("/tmp/papersurf/2024-06-08.json"));
    }

    #[tokio::test]
    async fn test_empty_query_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let executor = QueryExecutor::new(SourceRegistry::empty(), dir.path());

        let query = SearchQuery::new("   ", date("2024-06-01"), date("2024-06-08"));
        let outcome = executor.search(&query, date("2024-06-08")).await.unwrap();

        assert!(matches!(outcome, SearchOutcome::EmptyQuery));
        // nothing searched, nothing written
        assert!(!executor.artifact_path(date("2024-06-08")).exists());
    }

    #[tokio::test]
    async fn test_search_persists_and_reloads_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![ArticleRecordBuilder::new("CRISPR at scale", "arxiv")
            .url("https://doi.org/10.1/abc")
            .keyword("crispr")
            .keyword("genomics")
            .publication_date("2024-06-02")
            .build()];

        let executor = QueryExecutor::new(registry_with(records), dir.path());
        let today = date("2024-06-08");
        let outcome = executor.search(&query_for(&["arxiv"]), today).await.unwrap();

        let SearchOutcome::Results(articles) = outcome else {
            panic!("expected results");
        };
        assert_eq!(articles.len(), 1);
        // keywords got their relevance codes at merge time
        assert_eq!(articles[0].keywords, vec!["A:crispr", "B:genomics"]);

        let artifact_path = executor.artifact_path(today);
        assert!(artifact_path.exists());
        let json = std::fs::read_to_string(artifact_path).unwrap();
        assert!(json.contains("\"papers\""));
        assert!(json.contains("CRISPR at scale"));
    }

    #[tokio::test]
    async fn test_unknown_database_fails() {
        let dir = tempfile::tempdir().unwrap();
        let executor = QueryExecutor::new(SourceRegistry::empty(), dir.path());

        let result = executor
            .search(&query_for(&["nonexistent"]), date("2024-06-08"))
            .await;
        assert!(matches!(result, Err(SourceError::UnknownDatabase(_))));
    }

    #[tokio::test]
    async fn test_backend_failure_aborts_whole_call() {
        let dir = tempfile::tempdir().unwrap();

        let good = MockSource::with_id("arxiv");
        good.set_records(vec![ArticleRecordBuilder::new("T", "arxiv").build()]);
        let bad = MockSource::with_id("pubmed");
        bad.fail_with("connection refused");

        let mut registry = SourceRegistry::empty();
        registry.register(Arc::new(good));
        registry.register(Arc::new(bad));

        let executor = QueryExecutor::new(registry, dir.path());
        let today = date("2024-06-08");
        let result = executor.search(&query_for(&["arxiv", "pubmed"]), today).await;

        // no partial results, no artifact
        assert!(matches!(result, Err(SourceError::Network(_))));
        assert!(!executor.artifact_path(today).exists());
    }

    #[tokio::test]
    async fn test_global_limit_caps_merged_set() {
        let dir = tempfile::tempdir().unwrap();
        let titles = [
            "Protein folding with transformers",
            "Genome assembly benchmarks",
            "Neural decoding of speech",
            "A survey of cell atlases",
            "Quantum chemistry on GPUs",
        ];
        let records: Vec<_> = titles
            .iter()
            .map(|t| ArticleRecordBuilder::new(*t, "arxiv").build())
            .collect();

        let executor = QueryExecutor::new(registry_with(records), dir.path());
        let query = query_for(&["arxiv"]).limit(3);
        let outcome = executor.search(&query, date("2024-06-08")).await.unwrap();

        let SearchOutcome::Results(articles) = outcome else {
            panic!("expected results");
        };
        assert_eq!(articles.len(), 3);
    }
}
