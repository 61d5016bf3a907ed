//! Report row model: the fixed tabular schema handed to the delivery layer.

use serde::{Deserialize, Serialize};

/// Column names of the report, in their fixed output order
pub const REPORT_COLUMNS: [&str; 7] = [
    "DOI",
    "Date",
    "PostedDate",
    "IsPreprint",
    "Title",
    "Keywords",
    "URL",
];

/// One row of the final report, one per surviving article.
///
/// Field order matches [`REPORT_COLUMNS`]; serialization uses the column
/// names so JSON/CSV output carries the report schema verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    /// Bare DOI, the substring of `url` from the first `"10."`
    #[serde(rename = "DOI")]
    pub doi: String,

    /// Processing date (the day the report was generated), `YYYY-MM-DD`
    #[serde(rename = "Date")]
    pub date: String,

    /// Publication date as reported by the source
    #[serde(rename = "PostedDate")]
    pub posted_date: String,

    /// `"TRUE"` unless the article's sources include PubMed
    #[serde(rename = "IsPreprint")]
    pub is_preprint: String,

    /// Article title
    #[serde(rename = "Title")]
    pub title: String,

    /// Comma-joined keywords with relevance codes stripped
    #[serde(rename = "Keywords")]
    pub keywords: String,

    /// Resolved permanent-identifier URL
    #[serde(rename = "URL")]
    pub url: String,
}

impl ReportRow {
    /// Field values in [`REPORT_COLUMNS`] order, for tabular rendering
    pub fn values(&self) -> [&str; 7] {
        [
            &self.doi,
            &self.date,
            &self.posted_date,
            &self.is_preprint,
            &self.title,
            &self.keywords,
            &self.url,
        ]
    }
}
