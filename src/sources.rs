//! Data-source browser: pick a category, see its sources, register a custom one.
use std::sync::Arc;

use thiserror::Error;

use crate::api::{ApiError, Category, DataSource, DataSourceCreate, Gateway, DEFAULT_CRAWL_FREQUENCY};
use crate::notify::{Notice, NotificationSink};
use crate::prefs::ValidationError;
use crate::util::validate_url;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

pub struct SourceBrowser {
    gateway: Arc<dyn Gateway>,
    sink: Arc<dyn NotificationSink>,
    categories: Vec<Category>,
    selected: Option<i64>,
    sources: Vec<DataSource>,
}

impl SourceBrowser {
    pub fn new(gateway: Arc<dyn Gateway>, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            gateway,
            sink,
            categories: Vec::new(),
            selected: None,
            sources: Vec::new(),
        }
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn selected(&self) -> Option<i64> {
        self.selected
    }

    pub fn sources(&self) -> &[DataSource] {
        &self.sources
    }

    pub fn preset_sources(&self) -> impl Iterator<Item = &DataSource> {
        self.sources.iter().filter(|s| s.is_preset())
    }

    pub fn custom_sources(&self) -> impl Iterator<Item = &DataSource> {
        self.sources.iter().filter(|s| !s.is_preset())
    }

    pub async fn load_categories(&mut self) -> Result<(), SourceError> {
        match self.gateway.categories().await {
            Ok(categories) => {
                self.categories = categories;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load categories");
                self.sink.notify(Notice::error("Failed to load categories"));
                Err(e.into())
            }
        }
    }

    /// Select a category and fetch its sources.
    ///
    /// The selection sticks even if the fetch fails, so a custom source can
    /// still be added to it.
    pub async fn select(&mut self, category_id: i64) -> Result<(), SourceError> {
        self.selected = Some(category_id);
        self.refresh().await
    }

    async fn refresh(&mut self) -> Result<(), SourceError> {
        let category_id = self.selected.ok_or(ValidationError::NoCategorySelected)?;
        match self.gateway.data_sources(category_id).await {
            Ok(sources) => {
                tracing::debug!(category_id = category_id, count = sources.len(), "Loaded data sources");
                self.sources = sources;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(category_id = category_id, error = %e, "Failed to load data sources");
                self.sink.notify(Notice::error("Failed to load data sources"));
                Err(e.into())
            }
        }
    }

    /// Register a custom source under the selected category, then reload the list.
    pub async fn add_custom(&mut self, name: &str, url: &str) -> Result<(), SourceError> {
        let result = self.try_add_custom(name, url).await;
        if let Err(SourceError::Validation(e)) = &result {
            self.sink.notify(Notice::error(e.to_string()));
        }
        result
    }

    async fn try_add_custom(&mut self, name: &str, url: &str) -> Result<(), SourceError> {
        let category_id = self.selected.ok_or(ValidationError::NoCategorySelected)?;

        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptySourceName.into());
        }
        let url = validate_url(url.trim())
            .map_err(|e| ValidationError::InvalidSourceUrl(e.to_string()))?;

        let source = DataSourceCreate {
            name: name.to_owned(),
            url: url.to_string(),
            category_id,
            description: None,
            crawl_frequency: DEFAULT_CRAWL_FREQUENCY,
        };

        if let Err(e) = self.gateway.create_data_source(&source).await {
            tracing::warn!(category_id = category_id, error = %e, "Failed to add custom source");
            self.sink.notify(Notice::error("Failed to add custom source"));
            return Err(e.into());
        }

        tracing::info!(category_id = category_id, name = %source.name, "Custom source added");
        self.sink
            .notify(Notice::success("Added", format!("Added source {}", source.name)));
        self.refresh().await
    }
}
