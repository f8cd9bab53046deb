//! End-to-end command tests against a mocked Calendar API.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use chrono::NaiveDate;
use clap::Parser;
use oooasis_calendar::{CalendarClient, EventType, OooCalendar};
use oooasis_cli::{app, Cli, Mode};
use oooasis_core::{AppError, Config};
use wiremock::matchers::{any, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CONFIG: &str = "\
[DEFAULT]
default_team_calendar = team
timezone = UTC
default_personal_calendar = alice@example.com
ooo_pattern = OOO

[team]
bob = bob-cal
";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn load_config() -> Config {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.ini");
    std::fs::write(&path, CONFIG).unwrap();
    Config::load(&path).unwrap()
}

fn ooo_event(id: &str, summary: &str, start: &str, end: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "summary": summary,
        "start": {"date": start, "timeZone": "UTC"},
        "end": {"date": end, "timeZone": "UTC"},
        "eventType": "default",
        "status": "confirmed"
    })
}

fn events(items: Vec<serde_json::Value>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({ "items": items }))
}

async fn mount_calendar(server: &MockServer, id: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/calendars/{}", id)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": id, "summary": id})),
        )
        .mount(server)
        .await;
}

async fn execute(
    mode: Mode,
    config: &Config,
    server: &MockServer,
    today: NaiveDate,
) -> (Result<(), AppError>, String) {
    let calendar = OooCalendar::new(
        CalendarClient::with_base_url("test_token", &server.uri()),
        config.timezone(),
    );
    let mut out = Vec::new();
    let result = app::execute(&mode, config, &calendar, today, &mut out).await;
    (result, String::from_utf8(out).unwrap())
}

#[tokio::test]
async fn test_enable_check_disable_check() {
    let server = MockServer::start().await;
    let config = load_config();
    // A Monday, so the events below fall inside the upcoming window.
    let today = date(2023, 10, 2);

    mount_calendar(&server, "team").await;

    // Duplicate check before the insert.
    Mock::given(method("GET"))
        .and(path("/calendars/team/events"))
        .respond_with(events(vec![]))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/calendars/team/events"))
        .and(body_partial_json(serde_json::json!({
            "summary": "alice OOO",
            "description": "Out of Office",
            "start": {"date": "2023-10-09", "timeZone": "UTC"},
            "end": {"date": "2023-10-12", "timeZone": "UTC"},
            "eventType": "default"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(ooo_event(
            "evt-1",
            "alice OOO",
            "2023-10-09",
            "2023-10-12",
        )))
        .expect(1)
        .mount(&server)
        .await;
    // The following check and the lookup before deleting.
    Mock::given(method("GET"))
        .and(path("/calendars/team/events"))
        .respond_with(events(vec![ooo_event(
            "evt-1",
            "alice OOO",
            "2023-10-09",
            "2023-10-12",
        )]))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/calendars/team/events/evt-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    // Everything afterwards sees an empty calendar.
    Mock::given(method("GET"))
        .and(path("/calendars/team/events"))
        .respond_with(events(vec![]))
        .mount(&server)
        .await;

    let enable = Mode::Enable {
        start: date(2023, 10, 9),
        end: date(2023, 10, 12),
        event_type: EventType::Default,
    };
    let (result, out) = execute(enable, &config, &server, today).await;
    result.unwrap();
    assert_eq!(
        out,
        "OutOfOffice event created (Id: evt-1) from 2023-10-09 until 2023-10-12 on calendar team\n"
    );

    let (result, out) = execute(Mode::Check { team_member: None }, &config, &server, today).await;
    result.unwrap();
    assert_eq!(out.lines().count(), 1);
    assert!(out.contains("2023-10-09 until 2023-10-12 - alice OOO (Event ID: evt-1"));

    let (result, out) = execute(Mode::Disable, &config, &server, today).await;
    result.unwrap();
    assert!(out.ends_with("Disabled 1 Out of Office event(s).\n"));

    let (result, out) = execute(Mode::Check { team_member: None }, &config, &server, today).await;
    result.unwrap();
    assert_eq!(out, "No upcoming OOO events found.\n");
}

#[tokio::test]
async fn test_is_ooo_today_for_absent_member_makes_no_changes() {
    let server = MockServer::start().await;
    let config = load_config();

    mount_calendar(&server, "team").await;
    Mock::given(method("GET"))
        .and(path("/calendars/team/events"))
        .respond_with(events(vec![]))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let mode = Mode::IsOooToday {
        team_member: Some("ofamera".to_string()),
    };
    let (result, out) = execute(mode, &config, &server, date(2023, 10, 11)).await;

    result.unwrap();
    assert_eq!(out, "User ofamera is not Out of Office today.\n");
}

#[tokio::test]
async fn test_is_ooo_today_uses_team_mapping() {
    let server = MockServer::start().await;
    let config = load_config();

    mount_calendar(&server, "bob-cal").await;
    Mock::given(method("GET"))
        .and(path("/calendars/bob-cal/events"))
        .respond_with(events(vec![ooo_event(
            "bob-1",
            "bob OOO",
            "2023-10-10",
            "2023-10-13",
        )]))
        .mount(&server)
        .await;

    let mode = Mode::IsOooToday {
        team_member: Some("bob".to_string()),
    };
    let (result, out) = execute(mode, &config, &server, date(2023, 10, 11)).await;

    result.unwrap();
    assert_eq!(out, "User bob is Out of Office today (until 2023-10-13).\n");
}

#[tokio::test]
async fn test_weekend_needs_no_requests() {
    let server = MockServer::start().await;
    let config = load_config();

    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let (result, out) = execute(
        Mode::IsOooToday { team_member: None },
        &config,
        &server,
        date(2023, 10, 15),
    )
    .await;

    result.unwrap();
    assert_eq!(out, "User alice is Out of Office today due to the weekend.\n");
}

#[tokio::test]
async fn test_enable_with_reversed_dates_is_validation_error() {
    let server = MockServer::start().await;
    let config = load_config();

    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let mode = Mode::Enable {
        start: date(2023, 10, 12),
        end: date(2023, 10, 9),
        event_type: EventType::Default,
    };
    let (result, out) = execute(mode, &config, &server, date(2023, 10, 2)).await;

    let err = result.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(err.exit_code(), 5);
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_duplicate_enable_is_conflict() {
    let server = MockServer::start().await;
    let config = load_config();

    mount_calendar(&server, "team").await;
    Mock::given(method("GET"))
        .and(path("/calendars/team/events"))
        .respond_with(events(vec![ooo_event(
            "evt-1",
            "alice OOO",
            "2023-10-09",
            "2023-10-12",
        )]))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mode = Mode::Enable {
        start: date(2023, 10, 9),
        end: date(2023, 10, 12),
        event_type: EventType::Default,
    };
    let (result, _) = execute(mode, &config, &server, date(2023, 10, 2)).await;

    let err = result.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(err.exit_code(), 7);
}

#[tokio::test]
async fn test_partial_disable_failure_exits_with_api_error() {
    let server = MockServer::start().await;
    let config = load_config();

    mount_calendar(&server, "team").await;
    Mock::given(method("GET"))
        .and(path("/calendars/team/events"))
        .respond_with(events(vec![
            ooo_event("evt-1", "alice OOO", "2023-10-09", "2023-10-12"),
            ooo_event("evt-2", "alice OOO", "2023-11-06", "2023-11-07"),
        ]))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/calendars/team/events/evt-1"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "error": {"code": 500, "message": "Backend Error"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/calendars/team/events/evt-2"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let (result, out) = execute(Mode::Disable, &config, &server, date(2023, 10, 2)).await;

    assert!(out.contains("Failed to disable Out of Office event evt-1"));
    assert!(out.contains("Successfully disabled Out of Office for alice on team (2023-11-06"));
    let err = result.unwrap_err();
    assert!(matches!(err, AppError::Api(msg) if msg.starts_with("1 of 2")));
}

#[tokio::test]
async fn test_conflicting_modes_fail_before_reading_config() {
    let cli = Cli::try_parse_from([
        "oooasis",
        "--enable-outofoffice",
        "--disable-outofoffice",
        "--config",
        "/nonexistent/oooasis/config.ini",
    ])
    .unwrap();

    let err = app::run(&cli).await.unwrap_err();
    assert!(matches!(err, AppError::Usage(_)));
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn test_missing_config_is_config_error() {
    let cli = Cli::try_parse_from([
        "oooasis",
        "--check-outofoffice",
        "--config",
        "/nonexistent/oooasis/config.ini",
    ])
    .unwrap();

    let err = app::run(&cli).await.unwrap_err();
    assert!(matches!(err, AppError::Config(_)));
    assert_eq!(err.exit_code(), 3);
}
