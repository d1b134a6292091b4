use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::endpoints::{ApiConfig, CategoryEncoding};
use super::gateway::Gateway;
use super::types::{
    ApiError, Category, DataSource, DataSourceCreate, Report, ReportPreferencesWire,
    SummaryResponse, UserPreferencesWire,
};
use crate::prefs::{ReportPreferences, UserPreferences};

/// Limit for JSON response bodies.
const MAX_JSON_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Default limit for report downloads.
pub const DEFAULT_MAX_DOWNLOAD_BYTES: usize = 50 * 1024 * 1024; // 50MB

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// [`Gateway`] over HTTP with `reqwest`.
pub struct HttpGateway {
    client: reqwest::Client,
    config: ApiConfig,
    token: Option<SecretString>,
    timeout: Duration,
    max_download_bytes: usize,
}

impl HttpGateway {
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("navigator/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, config))
    }

    /// Build on an existing client (shares its connection pool).
    pub fn with_client(client: reqwest::Client, config: ApiConfig) -> Self {
        Self {
            client,
            config,
            token: None,
            timeout: DEFAULT_TIMEOUT,
            max_download_bytes: DEFAULT_MAX_DOWNLOAD_BYTES,
        }
    }

    /// Attach a bearer token to every request.
    ///
    /// The token is withheld when the base URL is plain HTTP to a remote host.
    pub fn with_token(mut self, token: Option<SecretString>) -> Self {
        if token.is_some() && self.config.endpoints.is_insecure_remote() {
            tracing::warn!(
                base_url = %self.config.endpoints.base(),
                "Not sending API token over plain HTTP (HTTPS required except for localhost)"
            );
            self.token = None;
        } else {
            self.token = token;
        }
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_download_bytes(mut self, limit: usize) -> Self {
        self.max_download_bytes = limit;
        self
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        tracing::debug!(method = %method, url = %url, "API request");
        let request = self.client.request(method, url);
        match &self.token {
            Some(token) => request.header(
                AUTHORIZATION,
                format!("Bearer {}", token.expose_secret()),
            ),
            None => request,
        }
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| ApiError::Timeout)?
            .map_err(ApiError::Network)?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(status = %status, url = %response.url(), "API request rejected");
            return Err(ApiError::HttpStatus(status.as_u16()));
        }

        Ok(response)
    }

    async fn read_body(&self, response: reqwest::Response) -> Result<Vec<u8>, ApiError> {
        tokio::time::timeout(self.timeout, read_limited_bytes(response, MAX_JSON_SIZE))
            .await
            .map_err(|_| ApiError::Timeout)?
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>, ApiError> {
        let response = self.execute(self.request(Method::GET, url)).await?;
        let body = self.read_body(response).await?;
        self.config.variant.envelope().decode(&body)
    }

    /// Send a request with an optional JSON body and decode the (optional) reply.
    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Option<T>, ApiError> {
        let mut request = self.request(method, url);
        if let Some(body) = body {
            let bytes = serde_json::to_vec(body).map_err(|e| ApiError::Decode(e.to_string()))?;
            request = request.header(CONTENT_TYPE, "application/json").body(bytes);
        }
        let response = self.execute(request).await?;
        let bytes = self.read_body(response).await?;
        self.config.variant.envelope().decode(&bytes)
    }

    /// Like [`HttpGateway::send`] for endpoints whose reply carries nothing we use.
    async fn send_ack(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<(), ApiError> {
        self.send::<serde_json::Value>(method, url, body)
            .await
            .map(|_| ())
    }
}

/// Encode subscription preferences for the configured backend lineage.
pub(crate) fn user_preferences_body(prefs: &UserPreferences, config: &ApiConfig) -> serde_json::Value {
    let categories: Vec<serde_json::Value> = match config.variant.category_encoding() {
        CategoryEncoding::Objects => prefs.categories.iter().map(|id| json!({ "id": id })).collect(),
        CategoryEncoding::Ids => prefs.categories.iter().map(|id| json!(id)).collect(),
    };

    let mut body = json!({
        "categories": categories,
        "keywords": prefs.keywords.as_slice(),
    });

    if config.variant.sends_schedule() {
        body["schedule_time"] = json!(prefs.schedule_time.to_string());
        body["timezone"] = json!(prefs.timezone);
    }

    body
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        let categories: Option<Vec<Category>> = self.get(&self.config.categories_url()).await?;
        Ok(categories.unwrap_or_default())
    }

    async fn user_preferences(&self) -> Result<Option<UserPreferencesWire>, ApiError> {
        self.get(&self.config.preferences_url()).await
    }

    async fn save_user_preferences(&self, prefs: &UserPreferences) -> Result<(), ApiError> {
        let body = user_preferences_body(prefs, &self.config);
        self.send_ack(
            self.config.variant.save_method(),
            &self.config.preferences_url(),
            Some(&body),
        )
        .await
    }

    async fn report_preferences(&self) -> Result<Option<ReportPreferencesWire>, ApiError> {
        self.get(&self.config.report_preferences_url()).await
    }

    async fn save_report_preferences(&self, prefs: &ReportPreferences) -> Result<(), ApiError> {
        let body = serde_json::to_value(prefs).map_err(|e| ApiError::Decode(e.to_string()))?;
        self.send_ack(Method::PUT, &self.config.report_preferences_url(), Some(&body))
            .await
    }

    async fn reports(&self) -> Result<Vec<Report>, ApiError> {
        let reports: Option<Vec<Report>> = self.get(&self.config.reports_url()).await?;
        Ok(reports.unwrap_or_default())
    }

    async fn generate_report(&self) -> Result<(), ApiError> {
        self.send_ack(Method::POST, &self.config.reports_url(), None)
            .await
    }

    async fn download_report(
        &self,
        report_id: i64,
        out: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, ApiError> {
        let url = self.config.report_download_url(report_id);
        let response = self.execute(self.request(Method::GET, &url)).await?;

        let limit = self.max_download_bytes;
        if let Some(len) = response.content_length() {
            if len as usize > limit {
                return Err(ApiError::ResponseTooLarge(limit));
            }
        }

        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(ApiError::Network)?;
            if (written as usize).saturating_add(chunk.len()) > limit {
                return Err(ApiError::ResponseTooLarge(limit));
            }
            out.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        out.flush().await?;

        tracing::debug!(report_id = report_id, bytes = written, "Report downloaded");
        Ok(written)
    }

    async fn email_report(&self, report_id: i64) -> Result<(), ApiError> {
        self.send_ack(Method::POST, &self.config.report_email_url(report_id), None)
            .await
    }

    async fn request_summary(&self, user_id: i64) -> Result<Option<String>, ApiError> {
        let response: Option<SummaryResponse> = self
            .send(Method::POST, &self.config.summary_url(user_id), None)
            .await?;
        Ok(response.and_then(|r| r.summary))
    }

    async fn data_sources(&self, category_id: i64) -> Result<Vec<DataSource>, ApiError> {
        let sources: Option<Vec<DataSource>> = self
            .get(&self.config.sources_by_category_url(category_id))
            .await?;
        Ok(sources.unwrap_or_default())
    }

    async fn create_data_source(&self, source: &DataSourceCreate) -> Result<(), ApiError> {
        let body = serde_json::to_value(source).map_err(|e| ApiError::Decode(e.to_string()))?;
        self.send_ack(Method::POST, &self.config.sources_url(), Some(&body))
            .await
    }
}

async fn read_limited_bytes(response: reqwest::Response, limit: usize) -> Result<Vec<u8>, ApiError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(ApiError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
