//! Result transformation: raw article records into report rows.

use chrono::NaiveDate;

use crate::models::{ArticleRecord, ReportRow};

/// Project resolved articles into report rows.
///
/// Articles without a resolved identifier are dropped; survivors keep their
/// input order. Pure and total: no I/O, no failure modes for well-formed
/// input.
pub fn transform(articles: &[ArticleRecord], today: NaiveDate) -> Vec<ReportRow> {
    let date = today.format("%Y-%m-%d").to_string();

    articles
        .iter()
        .filter_map(|article| {
            let url = article.resolved_url.as_ref()?;
            Some(ReportRow {
                doi: derive_doi(url),
                date: date.clone(),
                posted_date: article.publication_date.clone(),
                is_preprint: if article.from_pubmed() { "FALSE" } else { "TRUE" }.to_string(),
                title: article.title.clone(),
                keywords: join_keywords(&article.keywords),
                url: url.clone(),
            })
        })
        .collect()
}

/// DOI is the substring of the resolved URL from the first `"10."`.
///
/// A resolved URL without the marker violates the resolver's output
/// contract; the row then carries an empty DOI rather than failing.
fn derive_doi(url: &str) -> String {
    match url.find("10.") {
        Some(index) => url[index..].to_string(),
        None => {
            tracing::warn!("resolved URL without DOI marker: {}", url);
            String::new()
        }
    }
}

/// Comma-join keywords with their 2-character relevance codes stripped
fn join_keywords(keywords: &[String]) -> String {
    keywords
        .iter()
        .map(|k| strip_relevance_code(k))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Drop the leading 2-character relevance code
fn strip_relevance_code(keyword: &str) -> &str {
    keyword
        .char_indices()
        .nth(2)
        .map(|(index, _)| &keyword[index..])
        .unwrap_or("")
}
