//! Calendar API types and data structures.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Deserialize;

use crate::error::CalendarError;

/// Half-open range of calendar dates, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, CalendarError> {
        if start >= end {
            return Err(CalendarError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Today through the end of next month.
    pub fn upcoming(today: NaiveDate) -> Self {
        let end = today
            .with_day(1)
            .and_then(|first| first.checked_add_months(Months::new(2)))
            .unwrap_or(NaiveDate::MAX);
        Self { start: today, end }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Midnight at both ends in `tz`, as instants.
    pub fn bounds(&self, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
        (local_midnight(self.start, tz), local_midnight(self.end, tz))
    }
}

fn local_midnight(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        // Midnight can fall into a DST gap; read it as UTC wall time then.
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
        .with_timezone(&Utc)
}

/// Event types the Calendar API accepts on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventType {
    #[default]
    Default,
    WorkingLocation,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::WorkingLocation => "workingLocation",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("default") {
            Ok(Self::Default)
        } else if s.eq_ignore_ascii_case("workingLocation") {
            Ok(Self::WorkingLocation)
        } else {
            Err(format!(
                "unknown event type '{}', expected 'default' or 'workingLocation'",
                s
            ))
        }
    }
}

/// An Out of Office entry read back from a calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OooEvent {
    pub id: String,
    pub calendar_id: String,
    pub summary: String,
    pub start: NaiveDate,
    /// Exclusive for all-day events, the day the event ends for timed ones.
    pub end: NaiveDate,
    pub all_day: bool,
    pub event_type: String,
}

impl OooEvent {
    /// Convert an API event. Events without usable dates or that were
    /// cancelled yield `None`.
    pub fn from_api(api: ApiEvent, calendar_id: &str, tz: Tz) -> Option<Self> {
        if api.status.as_deref() == Some("cancelled") {
            return None;
        }

        let (start, all_day) = parse_event_date(api.start.as_ref()?, tz)?;
        let (end, _) = parse_event_date(api.end.as_ref()?, tz)?;

        Some(Self {
            id: api.id,
            calendar_id: calendar_id.to_string(),
            summary: api.summary.unwrap_or_default(),
            start,
            end,
            all_day,
            event_type: api.event_type.unwrap_or_else(|| "default".to_string()),
        })
    }

    /// Whether the event blocks out `date`.
    pub fn covers(&self, date: NaiveDate) -> bool {
        if self.all_day {
            self.start <= date && date < self.end
        } else {
            self.start <= date && date <= self.end
        }
    }

    /// Whether the event blocks out any day of `range`.
    pub fn overlaps(&self, range: DateRange) -> bool {
        if self.all_day {
            self.start < range.end() && range.start() < self.end
        } else {
            self.start < range.end() && range.start() <= self.end
        }
    }
}

fn parse_event_date(time: &ApiEventTime, tz: Tz) -> Option<(NaiveDate, bool)> {
    if let Some(date) = &time.date {
        return NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .ok()
            .map(|d| (d, true));
    }

    time.date_time
        .as_deref()
        .and_then(|dt| DateTime::parse_from_rfc3339(dt).ok())
        .map(|dt| (dt.with_timezone(&tz).date_naive(), false))
}

/// Body of an all-day event insert.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub summary: String,
    pub description: String,
    pub range: DateRange,
    pub time_zone: String,
    pub event_type: EventType,
}

impl NewEvent {
    pub fn to_body(&self) -> serde_json::Value {
        let mut body = serde_json::json!({
            "summary": self.summary,
            "description": self.description,
            "start": { "date": self.range.start().to_string(), "timeZone": self.time_zone },
            "end": { "date": self.range.end().to_string(), "timeZone": self.time_zone },
            "status": "confirmed",
            "eventType": self.event_type.as_str(),
        });

        match self.event_type {
            EventType::Default => {
                body["transparency"] = "opaque".into();
                body["visibility"] = "default".into();
            }
            EventType::WorkingLocation => {
                body["transparency"] = "transparent".into();
                body["visibility"] = "public".into();
                body["workingLocationProperties"] = serde_json::json!({
                    "type": "homeOffice",
                    "homeOffice": {},
                });
            }
        }

        body
    }
}

// API Response Types

/// Google Calendar API event response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEvent {
    pub id: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub start: Option<ApiEventTime>,
    pub end: Option<ApiEventTime>,
    pub status: Option<String>,
    pub event_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEventTime {
    pub date_time: Option<String>,
    pub date: Option<String>,
    pub time_zone: Option<String>,
}

/// API response for event list.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventListResponse {
    #[serde(default)]
    pub items: Vec<ApiEvent>,
    pub next_page_token: Option<String>,
}

/// API response for calendar list.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarListResponse {
    #[serde(default)]
    pub items: Vec<ApiCalendar>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCalendar {
    pub id: String,
    pub summary: Option<String>,
    pub time_zone: Option<String>,
    #[serde(default)]
    pub primary: bool,
    pub access_role: Option<String>,
}
