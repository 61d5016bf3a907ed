//! Integration tests for the papersurf pipeline.
//!
//! The resolver tests run against a mock E-utilities server; the end-to-end
//! tests wire mock database backends into a full pipeline.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use mockito::Matcher;

use papersurf::models::{ArticleRecordBuilder, SearchQuery};
use papersurf::pipeline::{Pipeline, QueryExecutor, ReportOutcome};
use papersurf::resolver::DoiResolver;
use papersurf::sources::{MockSource, SourceRegistry};

const EFETCH_XML_WITH_DOI: &str = r#"<?xml version="1.0" ?>
<PubmedArticleSet>
    <PubmedArticle>
        <MedlineCitation>
            <PMID Version="1">1</PMID>
            <Article PubModel="Print">
                <ArticleTitle>Paper B</ArticleTitle>
                <ELocationID EIdType="pii" ValidYN="Y">S0000-0000(24)00001-1</ELocationID>
                <ELocationID EIdType="doi" ValidYN="Y">10.2/xyz</ELocationID>
            </Article>
        </MedlineCitation>
    </PubmedArticle>
</PubmedArticleSet>"#;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn resolver_against(server: &mockito::Server) -> DoiResolver {
    DoiResolver::new(None)
        .unwrap()
        .with_base_url(server.url())
        .with_interval(Duration::from_millis(1))
}

#[tokio::test]
async fn direct_url_resolution_makes_no_external_calls() {
    let mut server = mockito::Server::new_async().await;
    let esearch = server
        .mock("GET", "/esearch.fcgi")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let efetch = server
        .mock("GET", "/efetch.fcgi")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let resolver = resolver_against(&server);
    let article = ArticleRecordBuilder::new("Paper A", "arxiv")
        .url("https://arxiv.org/abs/2401.00001")
        .url("https://doi.org/10.1/abc")
        .build();

    let resolved = resolver.resolve(&article).await;
    assert_eq!(resolved, Some("https://doi.org/10.1/abc".to_string()));

    esearch.assert_async().await;
    efetch.assert_async().await;
}

#[tokio::test]
async fn pubmed_two_step_lookup_resolves_doi() {
    let mut server = mockito::Server::new_async().await;
    let esearch = server
        .mock("GET", "/esearch.fcgi")
        .match_query(Matcher::UrlEncoded("term".into(), "Paper B".into()))
        .with_header("content-type", "application/json")
        .with_body(r#"{"esearchresult": {"idlist": ["1"]}}"#)
        .expect(1)
        .create_async()
        .await;
    let efetch = server
        .mock("GET", "/efetch.fcgi")
        .match_query(Matcher::UrlEncoded("id".into(), "1".into()))
        .with_header("content-type", "text/xml")
        .with_body(EFETCH_XML_WITH_DOI)
        .expect(1)
        .create_async()
        .await;

    let resolver = resolver_against(&server);
    let article = ArticleRecordBuilder::new("Paper B", "pubmed")
        .url("https://pubmed.ncbi.nlm.nih.gov/1/")
        .build();

    let resolved = resolver.resolve(&article).await;
    assert_eq!(resolved, Some("https://doi.org/10.2/xyz".to_string()));

    esearch.assert_async().await;
    efetch.assert_async().await;
}

#[tokio::test]
async fn empty_candidate_list_skips_the_fetch_step() {
    let mut server = mockito::Server::new_async().await;
    let esearch = server
        .mock("GET", "/esearch.fcgi")
        .match_query(Matcher::Any)
        .with_body(r#"{"esearchresult": {"idlist": []}}"#)
        .expect(1)
        .create_async()
        .await;
    let efetch = server
        .mock("GET", "/efetch.fcgi")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let resolver = resolver_against(&server);
    let article = ArticleRecordBuilder::new("Paper C", "pubmed").build();

    assert_eq!(resolver.resolve(&article).await, None);

    // no match is final: one search call, no retries, no fetch
    esearch.assert_async().await;
    efetch.assert_async().await;
}

#[tokio::test]
async fn search_step_errors_exhaust_retries_then_yield_none() {
    let mut server = mockito::Server::new_async().await;
    let esearch = server
        .mock("GET", "/esearch.fcgi")
        .match_query(Matcher::Any)
        .with_status(500)
        .expect(3)
        .create_async()
        .await;
    let efetch = server
        .mock("GET", "/efetch.fcgi")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let interval = Duration::from_millis(20);
    let resolver = DoiResolver::new(None)
        .unwrap()
        .with_base_url(server.url())
        .with_interval(interval);
    let article = ArticleRecordBuilder::new("Paper D", "pubmed").build();

    let started = Instant::now();
    assert_eq!(resolver.resolve(&article).await, None);

    // two doubling penalties between three attempts: 2W then 4W
    assert!(started.elapsed() >= interval * 6);

    esearch.assert_async().await;
    efetch.assert_async().await;
}

#[tokio::test]
async fn malformed_search_response_is_a_resolution_failure() {
    let mut server = mockito::Server::new_async().await;
    let esearch = server
        .mock("GET", "/esearch.fcgi")
        .match_query(Matcher::Any)
        .with_body("this is not json")
        .expect(3)
        .create_async()
        .await;

    let resolver = resolver_against(&server);
    let article = ArticleRecordBuilder::new("Paper E", "pubmed").build();

    // malformed responses are retried like network errors, then give up
    assert_eq!(resolver.resolve(&article).await, None);
    esearch.assert_async().await;
}

#[tokio::test]
async fn malformed_fetch_response_is_a_resolution_failure() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/esearch.fcgi")
        .match_query(Matcher::Any)
        .with_body(r#"{"esearchresult": {"idlist": ["7"]}}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/efetch.fcgi")
        .match_query(Matcher::Any)
        .with_body("<broken")
        .create_async()
        .await;

    let resolver = resolver_against(&server);
    let article = ArticleRecordBuilder::new("Paper F", "pubmed").build();

    assert_eq!(resolver.resolve(&article).await, None);
}

#[tokio::test]
async fn sequential_search_calls_respect_the_shared_interval() {
    let mut server = mockito::Server::new_async().await;
    let esearch = server
        .mock("GET", "/esearch.fcgi")
        .match_query(Matcher::Any)
        .with_body(r#"{"esearchresult": {"idlist": []}}"#)
        .expect(5)
        .create_async()
        .await;

    let interval = Duration::from_millis(30);
    let resolver = DoiResolver::new(None)
        .unwrap()
        .with_base_url(server.url())
        .with_interval(interval);

    let articles: Vec<_> = (0..5)
        .map(|i| ArticleRecordBuilder::new(format!("Paper {}", i), "pubmed").build())
        .collect();

    let started = Instant::now();
    for article in &articles {
        assert_eq!(resolver.resolve(article).await, None);
    }

    // five calls against one shared gate leave four full waits
    assert!(started.elapsed() >= interval * 4);
    esearch.assert_async().await;
}

#[tokio::test]
async fn end_to_end_report_with_mixed_sources() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/esearch.fcgi")
        .match_query(Matcher::UrlEncoded("term".into(), "Gut flora and immunity".into()))
        .with_body(r#"{"esearchresult": {"idlist": ["1"]}}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/esearch.fcgi")
        .match_query(Matcher::UrlEncoded("term".into(), "Ribosome assembly intermediates".into()))
        .with_body(r#"{"esearchresult": {"idlist": []}}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/efetch.fcgi")
        .match_query(Matcher::UrlEncoded("id".into(), "1".into()))
        .with_body(EFETCH_XML_WITH_DOI)
        .create_async()
        .await;

    let arxiv = MockSource::with_id("arxiv");
    arxiv.set_records(vec![ArticleRecordBuilder::new("Spike timing in cortex", "arxiv")
        .url("https://doi.org/10.1/abc")
        .publication_date("2024-06-02")
        .build()]);

    let pubmed = MockSource::with_id("pubmed");
    pubmed.set_records(vec![
        ArticleRecordBuilder::new("Gut flora and immunity", "pubmed")
            .url("https://pubmed.ncbi.nlm.nih.gov/1/")
            .publication_date("2024 Jun 03")
            .build(),
        ArticleRecordBuilder::new("Ribosome assembly intermediates", "pubmed")
            .url("https://pubmed.ncbi.nlm.nih.gov/2/")
            .publication_date("2024 Jun 04")
            .build(),
    ]);

    let mut registry = SourceRegistry::empty();
    registry.register(Arc::new(arxiv));
    registry.register(Arc::new(pubmed));

    let artifact_dir = tempfile::tempdir().unwrap();
    let executor = QueryExecutor::new(registry, artifact_dir.path());
    let resolver = resolver_against(&server);
    let pipeline = Pipeline::from_parts(executor, resolver);

    let today = date("2024-06-08");
    let query = SearchQuery::new("paper", date("2024-06-01"), today)
        .databases(vec!["arxiv".to_string(), "pubmed".to_string()]);

    let outcome = pipeline.run_on(&query, today).await.unwrap();
    let ReportOutcome::Report(rows) = outcome else {
        panic!("expected a report");
    };

    // C had no PubMed match and is dropped; A and B survive in input order
    assert_eq!(rows.len(), 2);

    let row_a = rows.iter().find(|r| r.title == "Spike timing in cortex").unwrap();
    assert_eq!(row_a.doi, "10.1/abc");
    assert_eq!(row_a.is_preprint, "TRUE");
    assert_eq!(row_a.url, "https://doi.org/10.1/abc");
    assert_eq!(row_a.date, "2024-06-08");

    let row_b = rows.iter().find(|r| r.title == "Gut flora and immunity").unwrap();
    assert_eq!(row_b.doi, "10.2/xyz");
    assert_eq!(row_b.is_preprint, "FALSE");
    assert_eq!(row_b.url, "https://doi.org/10.2/xyz");

    assert!(!rows.iter().any(|r| r.title == "Ribosome assembly intermediates"));

    // the day's raw artifact was written before resolution
    let artifact_path = artifact_dir.path().join("2024-06-08.json");
    let artifact = std::fs::read_to_string(artifact_path).unwrap();
    assert!(artifact.contains("Ribosome assembly intermediates"));
}

#[tokio::test]
async fn same_day_rerun_overwrites_the_artifact() {
    let arxiv = MockSource::with_id("arxiv");
    arxiv.set_records(vec![ArticleRecordBuilder::new("First run", "arxiv").build()]);
    let arxiv = Arc::new(arxiv);

    let mut registry = SourceRegistry::empty();
    registry.register(Arc::clone(&arxiv) as Arc<dyn papersurf::Source>);

    let artifact_dir = tempfile::tempdir().unwrap();
    let executor = QueryExecutor::new(registry, artifact_dir.path());

    let today = date("2024-06-08");
    let query = SearchQuery::new("run", date("2024-06-01"), today)
        .databases(vec!["arxiv".to_string()]);

    executor.search(&query, today).await.unwrap();
    let artifact_path = artifact_dir.path().join("2024-06-08.json");
    assert!(std::fs::read_to_string(&artifact_path)
        .unwrap()
        .contains("First run"));

    arxiv.set_records(vec![ArticleRecordBuilder::new("Second run", "arxiv").build()]);
    executor.search(&query, today).await.unwrap();

    let rewritten = std::fs::read_to_string(&artifact_path).unwrap();
    assert!(rewritten.contains("Second run"));
    assert!(!rewritten.contains("First run"));
}
