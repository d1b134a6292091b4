//! Preference documents and the store that edits and persists them.
//!
//! - [`KeywordSet`] / [`CategorySelection`] - pure, synchronous edit primitives
//! - [`UserPreferences`] / [`ReportPreferences`] - the two server documents
//! - [`PreferenceStore`] - load/edit/save lifecycle, generic over the document

mod document;
mod keywords;
mod schedule;
mod selection;
mod store;
mod validation;

pub use document::{
    DeliveryMethod, DocumentDefaults, PreferenceDocument, ReportPreferences, UserPreferences,
};
pub use keywords::KeywordSet;
pub use schedule::{
    FixedTimezones, ScheduleTime, SystemTimezones, TimezoneProvider, PRESET_TIMEZONES,
};
pub use selection::CategorySelection;
pub use store::{Phase, PreferenceStore, StoreError};
pub use validation::ValidationError;
