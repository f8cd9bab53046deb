use std::io::Write;

use chrono::NaiveDate;
use oooasis_auth::{
    Authenticator, ClientSecrets, FileCredentialStore, GoogleOAuth, LoopbackConsent,
    CALENDAR_SCOPE,
};
use oooasis_calendar::{is_weekend, CalendarClient, DateRange, OooCalendar, OooMarker, OooStatus};
use oooasis_core::{AppError, Config};

use crate::cli::{Cli, Mode};
use crate::output;

/// Run one invocation against Google Calendar, writing results to stdout.
pub async fn run(cli: &Cli) -> Result<(), AppError> {
    let mode = cli.mode()?;
    tracing::debug!("Selected mode: {:?}", mode);

    let config = Config::load(&cli.config)?;

    let secrets = ClientSecrets::load(&cli.client_secrets)?;
    let oauth = GoogleOAuth::new(&secrets)?;
    let authenticator = Authenticator::new(
        oauth,
        FileCredentialStore::new(&cli.token_cache),
        LoopbackConsent::new(),
    );
    let token = authenticator.credential(&[CALENDAR_SCOPE]).await?;

    let calendar = OooCalendar::new(CalendarClient::new(&token.access_token), config.timezone());
    execute(&mode, &config, &calendar, config.today(), &mut std::io::stdout()).await
}

/// Carry out `mode` for the configured user as of `today`.
pub async fn execute(
    mode: &Mode,
    config: &Config,
    calendar: &OooCalendar,
    today: NaiveDate,
    out: &mut impl Write,
) -> Result<(), AppError> {
    let pattern = &config.calendar.ooo_pattern;

    match mode {
        Mode::Check { team_member } => {
            let member = config.member(team_member.as_deref());
            let calendar_id = calendar.client().resolve_calendar_id(&member.calendar).await?;
            let marker = OooMarker::new(&member.name, pattern);

            let events = calendar
                .find_ooo(&calendar_id, &marker, DateRange::upcoming(today))
                .await?;
            output::upcoming(out, &events, &member.calendar)?;
        }
        Mode::IsOooToday { team_member } => {
            let member = config.member(team_member.as_deref());
            let marker = OooMarker::new(&member.name, pattern);

            // Weekends are answered without touching the calendar.
            let status = if is_weekend(today) {
                OooStatus::Weekend
            } else {
                let calendar_id = calendar.client().resolve_calendar_id(&member.calendar).await?;
                calendar.ooo_status(&calendar_id, &marker, today).await?
            };
            output::status(out, marker.username(), &status)?;
        }
        Mode::Enable {
            start,
            end,
            event_type,
        } => {
            // Reject bad ranges before any request, calendar lookup included.
            DateRange::new(*start, *end)?;

            let member = config.member(None);
            let calendar_id = calendar.client().resolve_calendar_id(&member.calendar).await?;
            let marker = OooMarker::new(&member.name, pattern);

            let event = calendar
                .enable_ooo(&calendar_id, &marker, *start, *end, *event_type)
                .await?;
            output::created(out, &event, &member.calendar)?;
        }
        Mode::Disable => {
            let member = config.member(None);
            let calendar_id = calendar.client().resolve_calendar_id(&member.calendar).await?;
            let marker = OooMarker::new(&member.name, pattern);

            let report = calendar.disable_ooo(&calendar_id, &marker, today).await?;
            output::disabled(out, marker.username(), &member.calendar, &report)?;

            if !report.is_complete() {
                return Err(AppError::Api(format!(
                    "{} of {} Out of Office event(s) could not be deleted",
                    report.failed.len(),
                    report.failed.len() + report.count()
                )));
            }
        }
    }

    Ok(())
}
