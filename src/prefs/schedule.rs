//! Delivery schedule values: time of day and timezone.
use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::validation::ValidationError;

/// Time of day in 24h `HH:MM`.
///
/// Parsing also accepts `HH:MM:SS` (some backend versions send seconds);
/// seconds are dropped and the value always displays as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScheduleTime(NaiveTime);

impl ScheduleTime {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }
}

impl Default for ScheduleTime {
    /// 09:00, the backend's default delivery time.
    fn default() -> Self {
        Self(NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN))
    }
}

impl std::str::FromStr for ScheduleTime {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        NaiveTime::parse_from_str(trimmed, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
            .map(|t| Self(t.with_second(0).unwrap_or(t)))
            .map_err(|_| ValidationError::InvalidScheduleTime(s.to_owned()))
    }
}

impl std::fmt::Display for ScheduleTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl Serialize for ScheduleTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ScheduleTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Timezones
// ============================================================================

/// Zones offered by the web settings form.
pub const PRESET_TIMEZONES: &[&str] = &["Asia/Shanghai", "Asia/Tokyo", "Asia/Singapore", "Asia/Seoul"];

/// Source of timezone identifiers.
///
/// Injected into stores so tests can substitute a fixed list for the host's
/// timezone database.
pub trait TimezoneProvider: Send + Sync {
    /// Whether `tz` is an accepted IANA identifier.
    fn is_supported(&self, tz: &str) -> bool;

    /// Every accepted identifier.
    fn supported(&self) -> Vec<String>;

    /// Default timezone for documents the user never saved.
    fn local(&self) -> String;
}

/// Full IANA database from `chrono-tz`; local zone from `$TZ`.
#[derive(Debug, Clone)]
pub struct SystemTimezones {
    fallback: String,
    pinned: bool,
}

impl SystemTimezones {
    /// `fallback` is used when `$TZ` is unset or not a known zone.
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            fallback: fallback.into(),
            pinned: false,
        }
    }

    /// Always report the fallback as local, ignoring `$TZ`.
    pub fn pinned(mut self) -> Self {
        self.pinned = true;
        self
    }
}

impl Default for SystemTimezones {
    fn default() -> Self {
        Self::new("UTC")
    }
}

impl TimezoneProvider for SystemTimezones {
    fn is_supported(&self, tz: &str) -> bool {
        tz.parse::<chrono_tz::Tz>().is_ok()
    }

    fn supported(&self) -> Vec<String> {
        chrono_tz::TZ_VARIANTS
            .iter()
            .map(|tz| tz.name().to_string())
            .collect()
    }

    fn local(&self) -> String {
        if self.pinned {
            return self.fallback.clone();
        }
        match std::env::var("TZ") {
            Ok(tz) => {
                // POSIX allows a leading ':' before a zoneinfo name
                let name = tz.trim_start_matches(':');
                if self.is_supported(name) {
                    return name.to_string();
                }
                tracing::debug!(tz = %tz, fallback = %self.fallback, "Ignoring unrecognized $TZ");
                self.fallback.clone()
            }
            Err(_) => self.fallback.clone(),
        }
    }
}

/// Fixed list of zones.
#[derive(Debug, Clone)]
pub struct FixedTimezones {
    zones: Vec<String>,
    local: String,
}

impl FixedTimezones {
    pub fn new<I, S>(zones: I, local: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            zones: zones.into_iter().map(Into::into).collect(),
            local: local.into(),
        }
    }

    /// The four zones of the web settings form, defaulting to Shanghai.
    pub fn presets() -> Self {
        Self::new(PRESET_TIMEZONES.iter().copied(), "Asia/Shanghai")
    }
}

impl TimezoneProvider for FixedTimezones {
    fn is_supported(&self, tz: &str) -> bool {
        self.zones.iter().any(|z| z == tz)
    }

    fn supported(&self) -> Vec<String> {
        self.zones.clone()
    }

    fn local(&self) -> String {
        self.local.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hh_mm() {
        let t: ScheduleTime = "09:00".parse().unwrap();
        assert_eq!(t.to_string(), "09:00");
        assert_eq!(t, ScheduleTime::default());
    }

    #[test]
    fn test_parse_with_seconds_normalizes() {
        let t: ScheduleTime = "18:30:45".parse().unwrap();
        assert_eq!(t.to_string(), "18:30");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            "25:00".parse::<ScheduleTime>(),
            Err(ValidationError::InvalidScheduleTime(_))
        ));
        assert!("noon".parse::<ScheduleTime>().is_err());
        assert!("".parse::<ScheduleTime>().is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let t = ScheduleTime::new(7, 5).unwrap();
        assert_eq!(serde_json::to_string(&t).unwrap(), r#""07:05""#);
        let back: ScheduleTime = serde_json::from_str(r#""07:05""#).unwrap();
        assert_eq!(back, t);
        assert!(serde_json::from_str::<ScheduleTime>(r#""7pm""#).is_err());
    }

    #[test]
    fn test_system_timezones_knows_iana() {
        let tz = SystemTimezones::default();
        assert!(tz.is_supported("Asia/Shanghai"));
        assert!(tz.is_supported("Europe/Berlin"));
        assert!(!tz.is_supported("Mars/Olympus_Mons"));
        assert!(tz.supported().iter().any(|z| z == "Asia/Tokyo"));
    }

    #[test]
    fn test_fixed_timezones() {
        let tz = FixedTimezones::presets();
        assert!(tz.is_supported("Asia/Seoul"));
        assert!(!tz.is_supported("Europe/Berlin"));
        assert_eq!(tz.local(), "Asia/Shanghai");
        assert_eq!(tz.supported().len(), 4);
    }
}
