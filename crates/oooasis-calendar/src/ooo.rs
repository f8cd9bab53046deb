//! Out of Office operations on top of [`CalendarClient`].

use chrono::{Datelike, NaiveDate, Weekday};
use chrono_tz::Tz;

use crate::client::CalendarClient;
use crate::error::CalendarError;
use crate::types::{DateRange, EventType, NewEvent, OooEvent};

/// Description attached to every event created here.
pub const OOO_DESCRIPTION: &str = "Out of Office";

/// Identifies one person's OOO events: the title is `"<user> <pattern>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OooMarker {
    username: String,
    title: String,
}

impl OooMarker {
    pub fn new(username: &str, pattern: &str) -> Self {
        let username = username.trim().to_string();
        let title = format!("{} {}", username, pattern.trim());
        Self { username, title }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn matches(&self, summary: &str) -> bool {
        summary.trim() == self.title
    }
}

/// Outcome of deleting every upcoming OOO event.
#[derive(Debug, Default)]
pub struct DisableReport {
    pub deleted: Vec<OooEvent>,
    pub failed: Vec<(OooEvent, CalendarError)>,
}

impl DisableReport {
    /// Number of events deleted.
    pub fn count(&self) -> usize {
        self.deleted.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Answer to "is this person out today?".
#[derive(Debug)]
pub enum OooStatus {
    Weekend,
    OutOfOffice(OooEvent),
    Available,
}

impl OooStatus {
    pub fn is_out(&self) -> bool {
        !matches!(self, Self::Available)
    }
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Calendar access bound to the configured timezone.
pub struct OooCalendar {
    client: CalendarClient,
    timezone: Tz,
}

impl OooCalendar {
    pub fn new(client: CalendarClient, timezone: Tz) -> Self {
        Self { client, timezone }
    }

    pub fn client(&self) -> &CalendarClient {
        &self.client
    }

    /// All events for `marker` overlapping `range`, earliest first.
    ///
    /// The server window is only a prefilter: it is computed from local
    /// midnights while all-day events are placed in the calendar's own
    /// timezone. Overlap is decided on the event dates.
    pub async fn find_ooo(
        &self,
        calendar_id: &str,
        marker: &OooMarker,
        range: DateRange,
    ) -> Result<Vec<OooEvent>, CalendarError> {
        let (time_min, time_max) = range.bounds(self.timezone);
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .client
                .list_events(
                    calendar_id,
                    time_min,
                    time_max,
                    Some(marker.title()),
                    page_token.as_deref(),
                )
                .await?;

            events.extend(
                page.items
                    .into_iter()
                    .filter(|api| marker.matches(api.summary.as_deref().unwrap_or_default()))
                    .filter_map(|api| OooEvent::from_api(api, calendar_id, self.timezone))
                    .filter(|event| event.overlaps(range)),
            );

            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        events.sort_by_key(|event| event.start);
        tracing::debug!("Found {} OOO event(s) for {}", events.len(), marker.title());
        Ok(events)
    }

    /// Create one all-day OOO event over `[start, end)`.
    ///
    /// Fails with [`CalendarError::AlreadyExists`] when an event for the same
    /// marker already overlaps the range; nothing is inserted then.
    pub async fn enable_ooo(
        &self,
        calendar_id: &str,
        marker: &OooMarker,
        start: NaiveDate,
        end: NaiveDate,
        event_type: EventType,
    ) -> Result<OooEvent, CalendarError> {
        let range = DateRange::new(start, end)?;

        let existing = self.find_ooo(calendar_id, marker, range).await?;
        if let Some(event) = existing.first() {
            tracing::warn!("OOO event {} already overlaps {}..{}", event.id, start, end);
            return Err(CalendarError::AlreadyExists(format!(
                "{} from {} until {} (Event ID: {})",
                event.summary, event.start, event.end, event.id
            )));
        }

        let new_event = NewEvent {
            summary: marker.title().to_string(),
            description: OOO_DESCRIPTION.to_string(),
            range,
            time_zone: self.timezone.name().to_string(),
            event_type,
        };

        let created = self.client.insert_event(calendar_id, &new_event).await?;
        let event = OooEvent::from_api(created, calendar_id, self.timezone).ok_or_else(|| {
            CalendarError::InvalidResponse("Created event has no dates".to_string())
        })?;

        tracing::info!("Created OOO event {} on {}", event.id, calendar_id);
        Ok(event)
    }

    /// Delete every upcoming OOO event for `marker`. Individual failures are
    /// collected in the report instead of aborting the rest.
    pub async fn disable_ooo(
        &self,
        calendar_id: &str,
        marker: &OooMarker,
        today: NaiveDate,
    ) -> Result<DisableReport, CalendarError> {
        let events = self
            .find_ooo(calendar_id, marker, DateRange::upcoming(today))
            .await?;

        let mut report = DisableReport::default();
        for event in events {
            match self.client.delete_event(calendar_id, &event.id).await {
                Ok(()) => {
                    tracing::info!("Deleted OOO event {}", event.id);
                    report.deleted.push(event);
                }
                Err(e) => {
                    tracing::warn!("Failed to delete OOO event {}: {}", event.id, e);
                    report.failed.push((event, e));
                }
            }
        }

        Ok(report)
    }

    /// Weekends count as out without asking the calendar.
    pub async fn ooo_status(
        &self,
        calendar_id: &str,
        marker: &OooMarker,
        today: NaiveDate,
    ) -> Result<OooStatus, CalendarError> {
        if is_weekend(today) {
            return Ok(OooStatus::Weekend);
        }

        let day = DateRange::new(today, today.succ_opt().unwrap_or(NaiveDate::MAX))?;
        let status = self
            .find_ooo(calendar_id, marker, day)
            .await?
            .into_iter()
            .find(|event| event.covers(today))
            .map_or(OooStatus::Available, OooStatus::OutOfOffice);

        Ok(status)
    }
}
