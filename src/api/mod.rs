//! Data access to the AI Navigator REST backend.
//!
//! - [`Gateway`] - async trait every store and action talks through
//! - [`HttpGateway`] - `reqwest` implementation
//! - [`ApiConfig`] - endpoints plus [`SchemaVariant`], which selects paths,
//!   response envelope and save encoding for one of the backend lineages

mod client;
mod endpoints;
mod envelope;
mod gateway;
mod types;

pub use client::{HttpGateway, DEFAULT_MAX_DOWNLOAD_BYTES, DEFAULT_TIMEOUT};
pub use endpoints::{ApiConfig, CategoryEncoding, Endpoints, SchemaVariant};
pub use envelope::Envelope;
pub use gateway::Gateway;
pub use types::{
    ApiError, Category, CategoryRef, DataSource, DataSourceCreate, Report, ReportFormat,
    ReportPreferencesWire, SourceKind, SummaryResponse, UserPreferencesWire,
    DEFAULT_CRAWL_FREQUENCY,
};
