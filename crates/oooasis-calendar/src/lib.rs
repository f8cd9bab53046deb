//! Google Calendar integration for OOOasis.
//!
//! Provides the Calendar API client and the Out of Office operations built
//! on it.

pub mod client;
pub mod error;
pub mod ooo;
pub mod types;

pub use client::{CalendarClient, CALENDAR_API_BASE};
pub use error::CalendarError;
pub use ooo::{is_weekend, DisableReport, OooCalendar, OooMarker, OooStatus, OOO_DESCRIPTION};
pub use types::{DateRange, EventType, OooEvent};
