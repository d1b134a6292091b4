//! Client for the AI Navigator subscription backend.
//!
//! Loads, edits and saves a user's subscription and report preferences,
//! drives report actions, and browses data sources. Everything talks to the
//! backend through the [`api::Gateway`] trait and reports outcomes through a
//! [`notify::NotificationSink`], so both can be swapped out in tests.

pub mod api;
pub mod config;
pub mod notify;
pub mod prefs;
pub mod reports;
pub mod sources;
pub mod util;
