//! Report operations: list, request generation, download, email, summary.
//!
//! Generation is asynchronous on the backend. [`ReportActions::generate`]
//! returns as soon as the request is acknowledged; the report shows up in a
//! later [`ReportActions::list`], there is no push notification.
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::api::{ApiError, Gateway, Report};
use crate::notify::{Notice, NotificationSink};

/// File name a downloaded report is saved under.
pub fn report_file_name(report_id: i64) -> String {
    format!("report-{report_id}.pdf")
}

pub struct ReportActions {
    gateway: Arc<dyn Gateway>,
    sink: Arc<dyn NotificationSink>,
}

impl ReportActions {
    pub fn new(gateway: Arc<dyn Gateway>, sink: Arc<dyn NotificationSink>) -> Self {
        Self { gateway, sink }
    }

    fn fail<T>(&self, message: &str, error: ApiError) -> Result<T, ApiError> {
        tracing::warn!(error = %error, "{}", message);
        self.sink.notify(Notice::error(message));
        Err(error)
    }

    pub async fn list(&self) -> Result<Vec<Report>, ApiError> {
        match self.gateway.reports().await {
            Ok(reports) => Ok(reports),
            Err(e) => self.fail("Failed to load reports", e),
        }
    }

    /// Ask the backend to generate a report now.
    pub async fn generate(&self) -> Result<(), ApiError> {
        match self.gateway.generate_report().await {
            Ok(()) => {
                tracing::info!("Report generation requested");
                self.sink.notify(Notice::info(
                    "Generating",
                    "Report generation requested, check the report list later",
                ));
                Ok(())
            }
            Err(e) => self.fail("Failed to generate report", e),
        }
    }

    /// Download a report into `dir` as `report-{id}.pdf`.
    ///
    /// The body is streamed into a hidden temporary file that is renamed into
    /// place once complete, so `dir` never holds a partial report. The
    /// temporary file is removed on any failure. No retry.
    pub async fn download(&self, report_id: i64, dir: &Path) -> Result<PathBuf, ApiError> {
        match self.download_to(report_id, dir).await {
            Ok(path) => {
                tracing::info!(report_id = report_id, path = %path.display(), "Report saved");
                self.sink.notify(Notice::success(
                    "Downloaded",
                    format!("Saved {}", report_file_name(report_id)),
                ));
                Ok(path)
            }
            Err(e) => self.fail("Failed to download report", e),
        }
    }

    async fn download_to(&self, report_id: i64, dir: &Path) -> Result<PathBuf, ApiError> {
        tokio::fs::create_dir_all(dir).await?;

        let target = dir.join(report_file_name(report_id));
        // Unpredictable temp name; create_new refuses to follow a planted file
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let temp_path = dir.join(format!(".report-{report_id}.pdf.part.{suffix:016x}"));

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
            .await?;

        let written = async {
            let bytes = self.gateway.download_report(report_id, &mut file).await?;
            file.sync_all().await?;
            Ok::<u64, ApiError>(bytes)
        }
        .await;
        drop(file);

        let result = match written {
            Ok(bytes) => {
                tracing::debug!(report_id = report_id, bytes = bytes, "Report body complete");
                tokio::fs::rename(&temp_path, &target)
                    .await
                    .map(|_| target)
                    .map_err(ApiError::from)
            }
            Err(e) => Err(e),
        };

        if result.is_err() {
            if let Err(e) = tokio::fs::remove_file(&temp_path).await {
                tracing::debug!(path = %temp_path.display(), error = %e, "Failed to remove partial download");
            }
        }

        result
    }

    /// Ask the backend to mail a report. Success means the request was
    /// accepted, not that the mail was delivered.
    pub async fn email_report(&self, report_id: i64) -> Result<(), ApiError> {
        match self.gateway.email_report(report_id).await {
            Ok(()) => {
                tracing::info!(report_id = report_id, "Report email requested");
                self.sink.notify(Notice::success(
                    "Sent",
                    "The report has been sent to your email",
                ));
                Ok(())
            }
            Err(e) => self.fail("Failed to send report", e),
        }
    }

    /// Trigger today's summary for `user_id`.
    pub async fn request_summary(&self, user_id: i64) -> Result<Option<String>, ApiError> {
        match self.gateway.request_summary(user_id).await {
            Ok(summary) => {
                tracing::info!(user_id = user_id, has_text = summary.is_some(), "Summary requested");
                self.sink
                    .notify(Notice::success("Done", "Daily summary generated"));
                Ok(summary)
            }
            Err(e) => self.fail("Failed to generate daily summary", e),
        }
    }
}
