//! Cross-database duplicate merging for federated search results.

use strsim::jaro_winkler;

use crate::models::ArticleRecord;

/// Title similarity above which two records are considered the same article
const TITLE_SIMILARITY_THRESHOLD: f64 = 0.95;

/// Merge duplicate records from different databases into one record each.
///
/// The first occurrence wins for `title` and `publication_date`; `databases`
/// becomes the union of all tags, and URLs and keywords from later
/// occurrences are appended in order without repeats. Input order of the
/// surviving records is preserved.
pub fn merge_duplicates(records: Vec<ArticleRecord>) -> Vec<ArticleRecord> {
    let mut merged: Vec<ArticleRecord> = Vec::with_capacity(records.len());

    for record in records {
        if let Some(existing) = merged.iter_mut().find(|m| are_duplicates(m, &record)) {
            existing.databases.extend(record.databases);
            for url in record.urls {
                if !existing.urls.contains(&url) {
                    existing.urls.push(url);
                }
            }
            for keyword in record.keywords {
                if !existing.keywords.contains(&keyword) {
                    existing.keywords.push(keyword);
                }
            }
        } else {
            merged.push(record);
        }
    }

    merged
}

/// Check whether two records are likely the same article
fn are_duplicates(a: &ArticleRecord, b: &ArticleRecord) -> bool {
    // A shared permanent-identifier URL is the strongest signal
    if let (Some(doi_a), Some(doi_b)) = (a.doi_url(), b.doi_url()) {
        if doi_a.eq_ignore_ascii_case(doi_b) {
            return true;
        }
    }

    let title_a = a.title.to_lowercase();
    let title_b = b.title.to_lowercase();
    let title_a = title_a.trim();
    let title_b = title_b.trim();

    if jaro_winkler(title_a, title_b) >= TITLE_SIMILARITY_THRESHOLD {
        return true;
    }

    normalize_title(title_a) == normalize_title(title_b)
}

/// Strip punctuation and collapse whitespace for title comparison
fn normalize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
