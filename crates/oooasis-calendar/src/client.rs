//! Google Calendar API client.

use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::error::{api_message, CalendarError};
use crate::types::*;

pub const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

const MAX_RESULTS: u32 = 250;

pub struct CalendarClient {
    client: reqwest::Client,
    access_token: String,
    base_url: String,
}

impl CalendarClient {
    pub fn new(access_token: &str) -> Self {
        Self::with_base_url(access_token, CALENDAR_API_BASE)
    }

    pub fn with_base_url(access_token: &str, base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token: access_token.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    /// Fetch a calendar's metadata by id.
    #[instrument(skip(self), level = "info")]
    pub async fn get_calendar(&self, calendar_id: &str) -> Result<ApiCalendar, CalendarError> {
        let url = format!(
            "{}/calendars/{}",
            self.base_url,
            urlencoding::encode(calendar_id),
        );

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// List all calendars on the user's calendar list.
    #[instrument(skip(self), level = "info")]
    pub async fn list_calendars(&self) -> Result<Vec<ApiCalendar>, CalendarError> {
        let mut calendars = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = format!("{}/users/me/calendarList", self.base_url);
            if let Some(pt) = &page_token {
                url.push_str(&format!("?pageToken={}", urlencoding::encode(pt)));
            }

            let response = self
                .client
                .get(&url)
                .header("Authorization", self.auth_header())
                .send()
                .await?;

            let page: CalendarListResponse = self.handle_response(response).await?;
            calendars.extend(page.items);

            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(calendars)
    }

    /// List events from a calendar overlapping a time range.
    #[instrument(skip(self), level = "info")]
    pub async fn list_events(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        query: Option<&str>,
        page_token: Option<&str>,
    ) -> Result<EventListResponse, CalendarError> {
        let mut url = format!(
            "{}/calendars/{}/events?timeMin={}&timeMax={}&singleEvents=true&orderBy=startTime&maxResults={}",
            self.base_url,
            urlencoding::encode(calendar_id),
            urlencoding::encode(&time_min.to_rfc3339()),
            urlencoding::encode(&time_max.to_rfc3339()),
            MAX_RESULTS,
        );

        if let Some(q) = query {
            url.push_str(&format!("&q={}", urlencoding::encode(q)));
        }
        if let Some(pt) = page_token {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(pt)));
        }

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Create a new event.
    #[instrument(skip(self, event), fields(summary = %event.summary), level = "info")]
    pub async fn insert_event(
        &self,
        calendar_id: &str,
        event: &NewEvent,
    ) -> Result<ApiEvent, CalendarError> {
        let url = format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(calendar_id),
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&event.to_body())
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Delete an event.
    #[instrument(skip(self), level = "info")]
    pub async fn delete_event(
        &self,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<(), CalendarError> {
        let url = format!(
            "{}/calendars/{}/events/{}",
            self.base_url,
            urlencoding::encode(calendar_id),
            urlencoding::encode(event_id),
        );

        let response = self
            .client
            .delete(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await?;

        // Delete returns 204 No Content on success
        if response.status().is_success() {
            Ok(())
        } else {
            Err(self.error_for(response).await)
        }
    }

    /// Turn a configured calendar reference into an id. The reference may
    /// already be an id, or the display name of a calendar on the user's list.
    #[instrument(skip(self), level = "info")]
    pub async fn resolve_calendar_id(&self, name_or_id: &str) -> Result<String, CalendarError> {
        match self.get_calendar(name_or_id).await {
            Ok(calendar) => return Ok(calendar.id),
            Err(CalendarError::NotFound(_)) => {
                tracing::debug!("'{}' is not a calendar id, searching by name", name_or_id);
            }
            Err(e) => return Err(e),
        }

        self.list_calendars()
            .await?
            .into_iter()
            .find(|calendar| calendar.summary.as_deref() == Some(name_or_id))
            .map(|calendar| calendar.id)
            .ok_or_else(|| CalendarError::CalendarNotFound(name_or_id.to_string()))
    }

    /// Helper to handle API responses and errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, CalendarError> {
        if response.status().is_success() {
            response
                .json()
                .await
                .map_err(|e| CalendarError::InvalidResponse(format!("JSON parse error: {}", e)))
        } else {
            Err(self.error_for(response).await)
        }
    }

    async fn error_for(&self, response: reqwest::Response) -> CalendarError {
        let status = response.status().as_u16();

        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);
        let message = api_message(&response.text().await.unwrap_or_default());

        match status {
            401 => CalendarError::Unauthorized,
            403 => CalendarError::Forbidden(message),
            404 | 410 => CalendarError::NotFound(message),
            429 => CalendarError::RateLimited(retry_after),
            _ => CalendarError::Api { status, message },
        }
    }
}
