//! Terminal rendering. Results go to the writer handed in (stdout in the
//! binary), never to the log.

use std::io::{self, Write};

use oooasis_calendar::{CalendarError, DisableReport, OooEvent, OooStatus};

pub fn event_line(out: &mut impl Write, event: &OooEvent, calendar: &str) -> io::Result<()> {
    writeln!(
        out,
        "☀️ 🏖️ 🌴 {} until {} - {} (Event ID: {}, Type: {}) on {}",
        event.start, event.end, event.summary, event.id, event.event_type, calendar
    )
}

pub fn upcoming(out: &mut impl Write, events: &[OooEvent], calendar: &str) -> io::Result<()> {
    if events.is_empty() {
        return writeln!(out, "No upcoming OOO events found.");
    }

    for event in events {
        event_line(out, event, calendar)?;
    }
    Ok(())
}

pub fn created(out: &mut impl Write, event: &OooEvent, calendar: &str) -> io::Result<()> {
    writeln!(
        out,
        "OutOfOffice event created (Id: {}) from {} until {} on calendar {}",
        event.id, event.start, event.end, calendar
    )
}

pub fn status(out: &mut impl Write, username: &str, status: &OooStatus) -> io::Result<()> {
    match status {
        OooStatus::Weekend => writeln!(
            out,
            "User {} is Out of Office today due to the weekend.",
            username
        ),
        OooStatus::OutOfOffice(event) => writeln!(
            out,
            "User {} is Out of Office today (until {}).",
            username, event.end
        ),
        OooStatus::Available => writeln!(out, "User {} is not Out of Office today.", username),
    }
}

pub fn disabled(
    out: &mut impl Write,
    username: &str,
    calendar: &str,
    report: &DisableReport,
) -> io::Result<()> {
    if report.deleted.is_empty() && report.failed.is_empty() {
        return writeln!(
            out,
            "No Out of Office event found for {} on {}.",
            username, calendar
        );
    }

    for event in &report.deleted {
        writeln!(
            out,
            "Successfully disabled Out of Office for {} on {} ({} until {}).",
            username, calendar, event.start, event.end
        )?;
    }
    for (event, error) in &report.failed {
        delete_failure(out, event, error)?;
    }
    writeln!(out, "Disabled {} Out of Office event(s).", report.count())
}

fn delete_failure(out: &mut impl Write, event: &OooEvent, error: &CalendarError) -> io::Result<()> {
    writeln!(
        out,
        "Failed to disable Out of Office event {} ({} until {}): {}",
        event.id,
        event.start,
        event.end,
        error.user_message()
    )
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use chrono::NaiveDate;

    fn event(id: &str) -> OooEvent {
        OooEvent {
            id: id.to_string(),
            calendar_id: "team".to_string(),
            summary: "alice OOO".to_string(),
            start: NaiveDate::from_ymd_opt(2023, 10, 9).unwrap(),
            end: NaiveDate::from_ymd_opt(2023, 10, 12).unwrap(),
            all_day: true,
            event_type: "default".to_string(),
        }
    }

    fn render(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_upcoming() {
        let text = render(|out| upcoming(out, &[event("e1")], "Team"));
        assert_eq!(
            text,
            "☀️ 🏖️ 🌴 2023-10-09 until 2023-10-12 - alice OOO (Event ID: e1, Type: default) on Team\n"
        );

        let text = render(|out| upcoming(out, &[], "Team"));
        assert_eq!(text, "No upcoming OOO events found.\n");
    }

    #[test]
    fn test_status_lines() {
        let text = render(|out| status(out, "ofamera", &OooStatus::Available));
        assert_eq!(text, "User ofamera is not Out of Office today.\n");

        let text = render(|out| status(out, "ofamera", &OooStatus::Weekend));
        assert!(text.contains("due to the weekend"));
    }

    #[test]
    fn test_disabled_reports_failures() {
        let report = DisableReport {
            deleted: vec![event("ok")],
            failed: vec![(event("bad"), CalendarError::Unauthorized)],
        };

        let text = render(|out| disabled(out, "alice", "Team", &report));
        assert!(text.contains("Successfully disabled Out of Office for alice on Team"));
        assert!(text.contains("Failed to disable Out of Office event bad"));
        assert!(text.ends_with("Disabled 1 Out of Office event(s).\n"));

        let text = render(|out| disabled(out, "alice", "Team", &DisableReport::default()));
        assert_eq!(text, "No Out of Office event found for alice on Team.\n");
    }
}
