//! Endpoint layout for the backend lineages the client talks to.
//!
//! Two generations of the backend are deployed: a versioned `/api/v1` service
//! that wraps every body in `{status, message?, data}`, and an older service
//! mounted at the root that returns bare JSON. The subscription screen of the
//! versioned service additionally saves with `PUT` and only sends categories
//! and keywords.
use serde::{Deserialize, Serialize};
use url::{Host, Url};

use super::envelope::Envelope;
use super::types::ApiError;

/// Which backend lineage (and therefore which wire schema) to speak.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVariant {
    /// `/api/v1`, wrapped bodies, `POST` save with `[{id}]` categories.
    #[default]
    Versioned,
    /// `/api/v1`, wrapped bodies, `PUT` save with `[id]` categories and keywords only.
    Subscription,
    /// Root paths, bare bodies, `POST` save with `[id]` categories.
    Legacy,
}

/// How category ids are written in a saved preference document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryEncoding {
    Objects,
    Ids,
}

impl SchemaVariant {
    pub fn envelope(self) -> Envelope {
        match self {
            SchemaVariant::Legacy => Envelope::Bare,
            SchemaVariant::Versioned | SchemaVariant::Subscription => Envelope::Wrapped,
        }
    }

    pub fn save_method(self) -> reqwest::Method {
        match self {
            SchemaVariant::Subscription => reqwest::Method::PUT,
            SchemaVariant::Versioned | SchemaVariant::Legacy => reqwest::Method::POST,
        }
    }

    pub fn category_encoding(self) -> CategoryEncoding {
        match self {
            SchemaVariant::Versioned => CategoryEncoding::Objects,
            SchemaVariant::Subscription | SchemaVariant::Legacy => CategoryEncoding::Ids,
        }
    }

    /// Whether saved subscription preferences carry `schedule_time` and `timezone`.
    pub fn sends_schedule(self) -> bool {
        !matches!(self, SchemaVariant::Subscription)
    }

    fn prefix(self) -> &'static str {
        match self {
            SchemaVariant::Legacy => "",
            SchemaVariant::Versioned | SchemaVariant::Subscription => "/api/v1",
        }
    }

    fn categories_path(self) -> &'static str {
        match self {
            SchemaVariant::Legacy => "/categories",
            SchemaVariant::Versioned | SchemaVariant::Subscription => {
                "/api/v1/data-sources/categories"
            }
        }
    }
}

impl std::fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SchemaVariant::Versioned => "versioned",
            SchemaVariant::Subscription => "subscription",
            SchemaVariant::Legacy => "legacy",
        })
    }
}

impl std::str::FromStr for SchemaVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "versioned" => Ok(SchemaVariant::Versioned),
            "subscription" => Ok(SchemaVariant::Subscription),
            "legacy" => Ok(SchemaVariant::Legacy),
            other => Err(format!(
                "unknown schema variant '{other}' (expected versioned, subscription or legacy)"
            )),
        }
    }
}

/// Base address of the backend.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: String,
    parsed: Url,
}

impl Endpoints {
    /// Validate and normalize the base URL (trailing slashes removed).
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let parsed =
            Url::parse(base_url).map_err(|e| ApiError::InvalidBaseUrl(format!("{base_url}: {e}")))?;
        match parsed.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(ApiError::InvalidBaseUrl(format!(
                    "{base_url}: unsupported scheme {scheme}"
                )))
            }
        }
        Ok(Self {
            base: base_url.trim_end_matches('/').to_owned(),
            parsed,
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// True when the base URL is plain HTTP to a host other than loopback.
    ///
    /// Decided on the parsed host, so userinfo (`http://localhost@host`) and
    /// look-alike names (`localhost.example.com`) count as remote.
    pub fn is_insecure_remote(&self) -> bool {
        if self.parsed.scheme() != "http" {
            return false;
        }
        let loopback = match self.parsed.host() {
            Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
            Some(Host::Ipv4(ip)) => ip.is_loopback(),
            Some(Host::Ipv6(ip)) => ip.is_loopback(),
            None => false,
        };
        !loopback
    }

    fn join(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

/// Endpoints plus schema variant: everything needed to address the backend.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub endpoints: Endpoints,
    pub variant: SchemaVariant,
}

impl ApiConfig {
    pub fn new(endpoints: Endpoints, variant: SchemaVariant) -> Self {
        Self { endpoints, variant }
    }

    pub fn categories_url(&self) -> String {
        self.endpoints.join(self.variant.categories_path())
    }

    pub fn preferences_url(&self) -> String {
        self.endpoints
            .join(&format!("{}/preferences", self.variant.prefix()))
    }

    // Reports and summaries only exist on the versioned service.

    pub fn report_preferences_url(&self) -> String {
        self.endpoints.join("/api/v1/reports/preferences")
    }

    pub fn reports_url(&self) -> String {
        self.endpoints.join("/api/v1/reports")
    }

    pub fn report_download_url(&self, report_id: i64) -> String {
        self.endpoints
            .join(&format!("/api/v1/reports/{report_id}/download"))
    }

    pub fn report_email_url(&self, report_id: i64) -> String {
        self.endpoints
            .join(&format!("/api/v1/reports/{report_id}/email"))
    }

    pub fn summary_url(&self, user_id: i64) -> String {
        self.endpoints
            .join(&format!("/api/v1/subscriptions/user/{user_id}/summary"))
    }

    pub fn sources_by_category_url(&self, category_id: i64) -> String {
        self.endpoints.join(&format!(
            "{}/data-sources/category/{category_id}",
            self.variant.prefix()
        ))
    }

    pub fn sources_url(&self) -> String {
        self.endpoints
            .join(&format!("{}/data-sources", self.variant.prefix()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config(variant: SchemaVariant) -> ApiConfig {
        ApiConfig::new(Endpoints::new("https://nav.example.com/").unwrap(), variant)
    }

    #[test]
    fn test_versioned_paths() {
        let api = config(SchemaVariant::Versioned);
        assert_eq!(
            api.categories_url(),
            "https://nav.example.com/api/v1/data-sources/categories"
        );
        assert_eq!(api.preferences_url(), "https://nav.example.com/api/v1/preferences");
        assert_eq!(
            api.sources_by_category_url(3),
            "https://nav.example.com/api/v1/data-sources/category/3"
        );
    }

    #[test]
    fn test_legacy_paths() {
        let api = config(SchemaVariant::Legacy);
        assert_eq!(api.categories_url(), "https://nav.example.com/categories");
        assert_eq!(api.preferences_url(), "https://nav.example.com/preferences");
        assert_eq!(api.sources_url(), "https://nav.example.com/data-sources");
    }

    #[test]
    fn test_report_paths_ignore_variant() {
        let api = config(SchemaVariant::Legacy);
        assert_eq!(
            api.report_download_url(42),
            "https://nav.example.com/api/v1/reports/42/download"
        );
        assert_eq!(
            api.report_email_url(42),
            "https://nav.example.com/api/v1/reports/42/email"
        );
        assert_eq!(
            api.summary_url(1),
            "https://nav.example.com/api/v1/subscriptions/user/1/summary"
        );
    }

    #[test]
    fn test_variant_wire_rules() {
        assert_eq!(SchemaVariant::Versioned.envelope(), Envelope::Wrapped);
        assert_eq!(SchemaVariant::Legacy.envelope(), Envelope::Bare);
        assert_eq!(SchemaVariant::Subscription.save_method(), reqwest::Method::PUT);
        assert_eq!(SchemaVariant::Legacy.save_method(), reqwest::Method::POST);
        assert_eq!(
            SchemaVariant::Versioned.category_encoding(),
            CategoryEncoding::Objects
        );
        assert!(!SchemaVariant::Subscription.sends_schedule());
    }

    #[test]
    fn test_variant_from_str() {
        assert_eq!("Legacy".parse::<SchemaVariant>(), Ok(SchemaVariant::Legacy));
        assert!("graphql".parse::<SchemaVariant>().is_err());
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        assert!(matches!(
            Endpoints::new("ftp://nav.example.com"),
            Err(ApiError::InvalidBaseUrl(_))
        ));
        assert!(Endpoints::new("not a url").is_err());
    }

    #[test]
    fn test_insecure_remote_detection() {
        assert!(Endpoints::new("http://nav.example.com").unwrap().is_insecure_remote());
        assert!(!Endpoints::new("http://127.0.0.1:8000").unwrap().is_insecure_remote());
        assert!(!Endpoints::new("https://nav.example.com").unwrap().is_insecure_remote());
        assert!(!Endpoints::new("http://LOCALHOST:8000").unwrap().is_insecure_remote());
        assert!(!Endpoints::new("http://[::1]:8000").unwrap().is_insecure_remote());
    }

    #[test]
    fn test_localhost_lookalikes_are_remote() {
        for base in [
            "http://localhost@evil.example.com",
            "http://localhost.evil.example.com",
            "http://127.0.0.1.evil.example.com",
            "http://user:pw@evil.example.com",
        ] {
            assert!(
                Endpoints::new(base).unwrap().is_insecure_remote(),
                "{base} should count as remote"
            );
        }
    }
}
