use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::keywords::KeywordSet;
use super::schedule::ScheduleTime;
use super::selection::CategorySelection;
use super::validation::ValidationError;
use crate::api::{
    ApiError, Category, Gateway, Report, ReportPreferencesWire, UserPreferencesWire,
};

/// Values used for fields the server leaves unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentDefaults {
    pub schedule_time: ScheduleTime,
    pub timezone: String,
}

impl DocumentDefaults {
    pub fn new(timezone: impl Into<String>) -> Self {
        Self {
            schedule_time: ScheduleTime::default(),
            timezone: timezone.into(),
        }
    }
}

/// A preference document the store can load and save.
///
/// Each document travels with reference data fetched alongside it: the
/// category catalog for subscription preferences, the report list for report
/// preferences.
#[async_trait]
pub trait PreferenceDocument: Clone + Send + Sync + 'static {
    type Reference: Clone + Default + Send + Sync + 'static;

    /// Noun used in notices ("Failed to load {LABEL}").
    const LABEL: &'static str;

    fn with_defaults(defaults: &DocumentDefaults) -> Self;

    /// IANA timezone the document's schedule is expressed in.
    fn timezone_mut(&mut self) -> &mut String;

    async fn fetch(gateway: &dyn Gateway, defaults: &DocumentDefaults) -> Result<Self, ApiError>;

    async fn fetch_reference(gateway: &dyn Gateway) -> Result<Self::Reference, ApiError>;

    async fn submit(&self, gateway: &dyn Gateway) -> Result<(), ApiError>;
}

fn schedule_or_default(
    raw: Option<&str>,
    default: ScheduleTime,
) -> Result<ScheduleTime, ApiError> {
    match raw {
        None | Some("") => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|e: ValidationError| ApiError::Decode(e.to_string())),
    }
}

fn non_empty_or(raw: Option<String>, default: &str) -> String {
    raw.filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_owned())
}

// ============================================================================
// Subscription preferences
// ============================================================================

/// Categories, keywords and daily schedule for the subscription digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserPreferences {
    pub categories: CategorySelection,
    pub keywords: KeywordSet,
    pub schedule_time: ScheduleTime,
    pub timezone: String,
}

impl UserPreferences {
    pub fn from_wire(wire: UserPreferencesWire, defaults: &DocumentDefaults) -> Result<Self, ApiError> {
        Ok(Self {
            categories: wire
                .categories
                .unwrap_or_default()
                .into_iter()
                .map(|c| c.id())
                .collect(),
            keywords: wire.keywords.unwrap_or_default().into_iter().collect(),
            schedule_time: schedule_or_default(
                wire.schedule_time.as_deref(),
                defaults.schedule_time,
            )?,
            timezone: non_empty_or(wire.timezone, &defaults.timezone),
        })
    }
}

#[async_trait]
impl PreferenceDocument for UserPreferences {
    type Reference = Vec<Category>;

    const LABEL: &'static str = "preferences";

    fn with_defaults(defaults: &DocumentDefaults) -> Self {
        Self {
            categories: CategorySelection::new(),
            keywords: KeywordSet::new(),
            schedule_time: defaults.schedule_time,
            timezone: defaults.timezone.clone(),
        }
    }

    fn timezone_mut(&mut self) -> &mut String {
        &mut self.timezone
    }

    async fn fetch(gateway: &dyn Gateway, defaults: &DocumentDefaults) -> Result<Self, ApiError> {
        match gateway.user_preferences().await? {
            Some(wire) => Self::from_wire(wire, defaults),
            None => Ok(Self::with_defaults(defaults)),
        }
    }

    async fn fetch_reference(gateway: &dyn Gateway) -> Result<Vec<Category>, ApiError> {
        gateway.categories().await
    }

    async fn submit(&self, gateway: &dyn Gateway) -> Result<(), ApiError> {
        gateway.save_user_preferences(self).await
    }
}

// ============================================================================
// Report preferences
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    Email,
    InApp,
}

impl std::str::FromStr for DeliveryMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(DeliveryMethod::Email),
            "in_app" => Ok(DeliveryMethod::InApp),
            other => Err(format!("unknown delivery method '{other}' (expected email or in_app)")),
        }
    }
}

/// When and how generated reports are delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportPreferences {
    pub delivery_time: ScheduleTime,
    pub email_enabled: bool,
    pub pdf_enabled: bool,
    pub delivery_method: BTreeSet<DeliveryMethod>,
    pub schedule_time: ScheduleTime,
    pub timezone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ReportPreferences {
    pub fn from_wire(wire: ReportPreferencesWire, defaults: &DocumentDefaults) -> Result<Self, ApiError> {
        let delivery_method: BTreeSet<DeliveryMethod> = match wire.delivery_method {
            Some(methods) => methods
                .iter()
                .filter_map(|m| match m.parse::<DeliveryMethod>() {
                    Ok(method) => Some(method),
                    Err(_) => {
                        tracing::warn!(method = %m, "Ignoring unknown delivery method");
                        None
                    }
                })
                .collect(),
            None => Self::default_methods(),
        };

        Ok(Self {
            delivery_time: schedule_or_default(
                wire.delivery_time.as_deref(),
                defaults.schedule_time,
            )?,
            email_enabled: wire.email_enabled.unwrap_or(true),
            pdf_enabled: wire.pdf_enabled.unwrap_or(true),
            delivery_method,
            schedule_time: schedule_or_default(
                wire.schedule_time.as_deref(),
                defaults.schedule_time,
            )?,
            timezone: non_empty_or(wire.timezone, &defaults.timezone),
            email: wire.email.filter(|e| !e.is_empty()),
        })
    }

    fn default_methods() -> BTreeSet<DeliveryMethod> {
        [DeliveryMethod::Email, DeliveryMethod::InApp]
            .into_iter()
            .collect()
    }
}

#[async_trait]
impl PreferenceDocument for ReportPreferences {
    type Reference = Vec<Report>;

    const LABEL: &'static str = "report settings";

    fn with_defaults(defaults: &DocumentDefaults) -> Self {
        Self {
            delivery_time: defaults.schedule_time,
            email_enabled: true,
            pdf_enabled: true,
            delivery_method: Self::default_methods(),
            schedule_time: defaults.schedule_time,
            timezone: defaults.timezone.clone(),
            email: None,
        }
    }

    fn timezone_mut(&mut self) -> &mut String {
        &mut self.timezone
    }

    async fn fetch(gateway: &dyn Gateway, defaults: &DocumentDefaults) -> Result<Self, ApiError> {
        match gateway.report_preferences().await? {
            Some(wire) => Self::from_wire(wire, defaults),
            None => Ok(Self::with_defaults(defaults)),
        }
    }

    async fn fetch_reference(gateway: &dyn Gateway) -> Result<Vec<Report>, ApiError> {
        gateway.reports().await
    }

    async fn submit(&self, gateway: &dyn Gateway) -> Result<(), ApiError> {
        gateway.save_report_preferences(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::CategoryRef;
    use pretty_assertions::assert_eq;

    fn defaults() -> DocumentDefaults {
        DocumentDefaults::new("Asia/Shanghai")
    }

    #[test]
    fn test_user_from_wire_fills_defaults() {
        let wire = UserPreferencesWire {
            categories: Some(vec![CategoryRef::Object { id: 1 }, CategoryRef::Id(4)]),
            keywords: None,
            schedule_time: Some(String::new()),
            timezone: None,
        };
        let prefs = UserPreferences::from_wire(wire, &defaults()).unwrap();
        assert_eq!(prefs.categories.iter().collect::<Vec<_>>(), vec![1, 4]);
        assert!(prefs.keywords.is_empty());
        assert_eq!(prefs.schedule_time.to_string(), "09:00");
        assert_eq!(prefs.timezone, "Asia/Shanghai");
    }

    #[test]
    fn test_user_from_wire_rejects_bad_time() {
        let wire = UserPreferencesWire {
            schedule_time: Some("half past nine".into()),
            ..Default::default()
        };
        assert!(matches!(
            UserPreferences::from_wire(wire, &defaults()),
            Err(ApiError::Decode(_))
        ));
    }

    #[test]
    fn test_report_from_wire() {
        let wire: ReportPreferencesWire = serde_json::from_str(
            r#"{
                "delivery_time": "18:00",
                "email_enabled": false,
                "delivery_method": ["in_app", "carrier_pigeon"],
                "timezone": "Asia/Tokyo"
            }"#,
        )
        .unwrap();
        let prefs = ReportPreferences::from_wire(wire, &defaults()).unwrap();
        assert_eq!(prefs.delivery_time.to_string(), "18:00");
        assert!(!prefs.email_enabled);
        assert!(prefs.pdf_enabled);
        assert_eq!(
            prefs.delivery_method.into_iter().collect::<Vec<_>>(),
            vec![DeliveryMethod::InApp]
        );
        assert_eq!(prefs.timezone, "Asia/Tokyo");
    }

    #[test]
    fn test_report_serializes_full_document() {
        let prefs = ReportPreferences::with_defaults(&defaults());
        let json = serde_json::to_value(&prefs).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "delivery_time": "09:00",
                "email_enabled": true,
                "pdf_enabled": true,
                "delivery_method": ["email", "in_app"],
                "schedule_time": "09:00",
                "timezone": "Asia/Shanghai",
            })
        );
    }

    #[test]
    fn test_delivery_method_parse() {
        assert_eq!("email".parse::<DeliveryMethod>(), Ok(DeliveryMethod::Email));
        assert!("fax".parse::<DeliveryMethod>().is_err());
    }
}
