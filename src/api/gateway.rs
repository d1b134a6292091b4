use async_trait::async_trait;
use tokio::io::AsyncWrite;

use super::types::{
    ApiError, Category, DataSource, DataSourceCreate, Report, ReportPreferencesWire,
    UserPreferencesWire,
};
use crate::prefs::{ReportPreferences, UserPreferences};

/// Data access to the AI Navigator backend.
///
/// Preference documents are always replaced wholesale; there is no partial
/// update. Implementations decide the wire schema (paths, envelope, category
/// encoding), callers only see decoded values.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Category catalog.
    async fn categories(&self) -> Result<Vec<Category>, ApiError>;

    /// Current subscription preferences; `None` when the user never saved any.
    async fn user_preferences(&self) -> Result<Option<UserPreferencesWire>, ApiError>;

    async fn save_user_preferences(&self, prefs: &UserPreferences) -> Result<(), ApiError>;

    /// Current report preferences; `None` when the user never saved any.
    async fn report_preferences(&self) -> Result<Option<ReportPreferencesWire>, ApiError>;

    async fn save_report_preferences(&self, prefs: &ReportPreferences) -> Result<(), ApiError>;

    async fn reports(&self) -> Result<Vec<Report>, ApiError>;

    /// Ask the backend to start generating a report. Returns once the request
    /// is acknowledged, not when the report exists.
    async fn generate_report(&self) -> Result<(), ApiError>;

    /// Stream the binary body of a report into `out`, returning bytes written.
    async fn download_report(
        &self,
        report_id: i64,
        out: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, ApiError>;

    /// Ask the backend mail pipeline to send a report. No delivery confirmation.
    async fn email_report(&self, report_id: i64) -> Result<(), ApiError>;

    /// Trigger an on-demand summary for a user. Returns the summary text if the
    /// backend includes it in the acknowledgment.
    async fn request_summary(&self, user_id: i64) -> Result<Option<String>, ApiError>;

    async fn data_sources(&self, category_id: i64) -> Result<Vec<DataSource>, ApiError>;

    async fn create_data_source(&self, source: &DataSourceCreate) -> Result<(), ApiError>;
}
