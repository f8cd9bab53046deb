use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{ArgAction, Parser};
use oooasis_auth::{DEFAULT_CLIENT_SECRETS, DEFAULT_TOKEN_CACHE};
use oooasis_calendar::EventType;
use oooasis_core::{AppError, DEFAULT_CONFIG_FILE};

#[derive(Debug, Parser)]
#[command(name = "oooasis")]
#[command(version, about = "Manage Out of Office events in Google Calendar", long_about = None)]
pub struct Cli {
    /// List upcoming Out of Office events
    #[arg(long = "check-outofoffice")]
    pub check: bool,

    /// Tell whether someone is Out of Office today
    #[arg(long)]
    pub is_ooo_today: bool,

    /// Team member to look up instead of yourself
    #[arg(long, value_name = "NAME")]
    pub team_member: Option<String>,

    /// Create an Out of Office event
    #[arg(long = "enable-outofoffice")]
    pub enable: bool,

    /// First day of the absence
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub start_date: Option<NaiveDate>,

    /// Day you are back (exclusive)
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub end_date: Option<NaiveDate>,

    /// Event type to create: default or workingLocation
    #[arg(long, value_name = "TYPE")]
    pub event_type: Option<EventType>,

    /// Delete your upcoming Out of Office events
    #[arg(long = "disable-outofoffice")]
    pub disable: bool,

    /// Configuration file (INI, or TOML with a .toml extension)
    #[arg(long, env = "OOOASIS_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// OAuth client secrets downloaded from the Google Cloud console
    #[arg(long, env = "OOOASIS_CLIENT_SECRETS", default_value = DEFAULT_CLIENT_SECRETS)]
    pub client_secrets: PathBuf,

    /// Where the OAuth token is cached between runs
    #[arg(long, env = "OOOASIS_TOKEN_CACHE", default_value = DEFAULT_TOKEN_CACHE)]
    pub token_cache: PathBuf,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// The one operation an invocation performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Check { team_member: Option<String> },
    IsOooToday { team_member: Option<String> },
    Enable {
        start: NaiveDate,
        end: NaiveDate,
        event_type: EventType,
    },
    Disable,
}

impl Cli {
    /// Select the mode from the flags. Runs before any file or network
    /// access, so flag mistakes are reported first.
    pub fn mode(&self) -> Result<Mode, AppError> {
        let selected: Vec<&str> = [
            (self.check, "--check-outofoffice"),
            (self.is_ooo_today, "--is-ooo-today"),
            (self.enable, "--enable-outofoffice"),
            (self.disable, "--disable-outofoffice"),
        ]
        .into_iter()
        .filter(|(set, _)| *set)
        .map(|(_, flag)| flag)
        .collect();

        match selected.as_slice() {
            [] => Err(AppError::Usage(
                "Select one of --check-outofoffice, --is-ooo-today, \
                 --enable-outofoffice or --disable-outofoffice"
                    .to_string(),
            )),
            [_] => self.selected_mode(),
            many => Err(AppError::Usage(format!(
                "Only one mode may be selected, got {}",
                many.join(", ")
            ))),
        }
    }

    fn selected_mode(&self) -> Result<Mode, AppError> {
        if self.enable {
            self.reject_team_member("--enable-outofoffice")?;

            let (Some(start), Some(end)) = (self.start_date, self.end_date) else {
                return Err(AppError::Usage(
                    "--enable-outofoffice requires --start-date and --end-date".to_string(),
                ));
            };

            return Ok(Mode::Enable {
                start,
                end,
                event_type: self.event_type.unwrap_or_default(),
            });
        }

        let flag = if self.check {
            "--check-outofoffice"
        } else if self.is_ooo_today {
            "--is-ooo-today"
        } else {
            "--disable-outofoffice"
        };
        if self.start_date.is_some() || self.end_date.is_some() || self.event_type.is_some() {
            return Err(AppError::Usage(format!(
                "--start-date, --end-date and --event-type only apply to --enable-outofoffice, not {}",
                flag
            )));
        }

        if self.disable {
            self.reject_team_member(flag)?;
            return Ok(Mode::Disable);
        }

        let team_member = self.team_member.clone();
        Ok(if self.check {
            Mode::Check { team_member }
        } else {
            Mode::IsOooToday { team_member }
        })
    }

    fn reject_team_member(&self, flag: &str) -> Result<(), AppError> {
        match self.team_member {
            Some(_) => Err(AppError::Usage(format!(
                "--team-member cannot be used with {}",
                flag
            ))),
            None => Ok(()),
        }
    }
}
