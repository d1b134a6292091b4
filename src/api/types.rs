use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised while talking to the AI Navigator backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Wrapped response reported a failure status
    #[error("Server error: {0}")]
    Server(String),
    /// Response body did not match the expected shape
    #[error("Malformed response: {0}")]
    Decode(String),
    /// Response body exceeded the size limit
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    /// Local file I/O failed while saving a download
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Configured base URL is not an http(s) URL
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

// ============================================================================
// Reference Data
// ============================================================================

/// A backend-defined topical grouping of data sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Category reference inside a preference document.
///
/// One lineage of the backend sends `[{ "id": 1 }]`, the other `[1]`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum CategoryRef {
    Object { id: i64 },
    Id(i64),
}

impl CategoryRef {
    pub fn id(self) -> i64 {
        match self {
            CategoryRef::Object { id } | CategoryRef::Id(id) => id,
        }
    }
}

/// Subscription preferences exactly as the server returns them.
///
/// Every field is optional: the backend omits fields the user never set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPreferencesWire {
    #[serde(default)]
    pub categories: Option<Vec<CategoryRef>>,
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
    #[serde(default)]
    pub schedule_time: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

/// Report delivery preferences exactly as the server returns them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportPreferencesWire {
    #[serde(default)]
    pub delivery_time: Option<String>,
    #[serde(default)]
    pub schedule_time: Option<String>,
    #[serde(default)]
    pub email_enabled: Option<bool>,
    #[serde(default)]
    pub pdf_enabled: Option<bool>,
    #[serde(default)]
    pub delivery_method: Option<Vec<String>>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

// ============================================================================
// Reports
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Pdf,
    Html,
    Text,
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ReportFormat::Pdf => "pdf",
            ReportFormat::Html => "html",
            ReportFormat::Text => "text",
        };
        f.write_str(name)
    }
}

/// A generated report. Created by the backend, read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub format: ReportFormat,
}

impl Report {
    /// Label shown in listings: the report type, falling back to its title.
    pub fn label(&self) -> &str {
        self.kind
            .as_deref()
            .or(self.title.as_deref())
            .unwrap_or("report")
    }
}

// ============================================================================
// Data Sources
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Preset,
    Custom,
}

/// An external URL or feed the backend crawls on the user's behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource {
    pub id: i64,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_preset: bool,
    #[serde(default, rename = "type")]
    pub kind: Option<SourceKind>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub crawl_frequency: Option<u32>,
}

fn default_active() -> bool {
    true
}

impl DataSource {
    /// Preset sources are curated by the backend; everything else was added by a user.
    pub fn is_preset(&self) -> bool {
        self.is_preset || self.kind == Some(SourceKind::Preset)
    }
}

/// Crawl interval applied to new sources when none is given, in minutes.
pub const DEFAULT_CRAWL_FREQUENCY: u32 = 30;

/// Payload for registering a custom data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataSourceCreate {
    pub name: String,
    pub url: String,
    pub category_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub crawl_frequency: u32,
}

/// Body returned by the on-demand summary endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryResponse {
    #[serde(default)]
    pub summary: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_ref_accepts_both_encodings() {
        let refs: Vec<CategoryRef> = serde_json::from_str(r#"[{"id": 3}, 7]"#).unwrap();
        let ids: Vec<i64> = refs.into_iter().map(CategoryRef::id).collect();
        assert_eq!(ids, vec![3, 7]);
    }

    #[test]
    fn test_user_preferences_wire_tolerates_missing_fields() {
        let wire: UserPreferencesWire = serde_json::from_str(r#"{"categories": []}"#).unwrap();
        assert!(wire.keywords.is_none());
        assert!(wire.schedule_time.is_none());

        let wire: UserPreferencesWire = serde_json::from_str(r#"{"keywords": null}"#).unwrap();
        assert!(wire.keywords.is_none());
        assert!(wire.categories.is_none());
    }

    #[test]
    fn test_report_label_prefers_type() {
        let report: Report =
            serde_json::from_str(r#"{"id": 1, "type": "daily", "title": "Daily Digest"}"#)
                .unwrap();
        assert_eq!(report.label(), "daily");
        assert_eq!(report.format, ReportFormat::Pdf);

        let report: Report = serde_json::from_str(r#"{"id": 2, "title": "Weekly"}"#).unwrap();
        assert_eq!(report.label(), "Weekly");
    }

    #[test]
    fn test_report_format_decodes_lowercase() {
        let report: Report = serde_json::from_str(r#"{"id": 5, "format": "html"}"#).unwrap();
        assert_eq!(report.format, ReportFormat::Html);
        assert_eq!(report.format.to_string(), "html");
    }

    #[test]
    fn test_data_source_preset_from_either_field() {
        let flagged: DataSource = serde_json::from_str(
            r#"{"id": 1, "name": "HN", "url": "https://news.ycombinator.com", "is_preset": true}"#,
        )
        .unwrap();
        assert!(flagged.is_preset());
        assert!(flagged.active);

        let typed: DataSource = serde_json::from_str(
            r#"{"id": 2, "name": "Blog", "url": "https://blog.example.com", "type": "custom"}"#,
        )
        .unwrap();
        assert!(!typed.is_preset());
    }

    #[test]
    fn test_data_source_create_omits_missing_description() {
        let body = serde_json::to_value(DataSourceCreate {
            name: "Blog".into(),
            url: "https://blog.example.com".into(),
            category_id: 4,
            description: None,
            crawl_frequency: DEFAULT_CRAWL_FREQUENCY,
        })
        .unwrap();
        assert!(body.get("description").is_none());
        assert_eq!(body["crawl_frequency"], 30);
        assert_eq!(body["category_id"], 4);
    }
}
