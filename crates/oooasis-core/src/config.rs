use std::collections::BTreeMap;
use std::path::Path;

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use ::config::FileFormat;
use serde::Deserialize;

use crate::error::ConfigError;

/// Default configuration file, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.ini";

/// Marker appended to the user name when none is configured.
pub const DEFAULT_OOO_PATTERN: &str = "OOO";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// All errors joined into a single line
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// On-disk layout. The settings section is `[calendar]`, or `[DEFAULT]` for
/// files written for the original script.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(alias = "DEFAULT", alias = "default")]
    calendar: Option<RawCalendarSettings>,

    #[serde(default)]
    team: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawCalendarSettings {
    default_team_calendar: Option<String>,
    timezone: Option<String>,
    default_personal_calendar: Option<String>,
    ooo_pattern: Option<String>,
}

/// Calendar settings as written in the configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarSettings {
    /// Calendar (id or display name) that holds everyone's OOO events
    pub default_team_calendar: String,

    /// IANA timezone name used for event dates and "today"
    pub timezone: String,

    /// The user's own calendar id, normally their e-mail address
    pub default_personal_calendar: String,

    /// Text appended to the user name to form OOO event titles
    pub ooo_pattern: String,
}

impl CalendarSettings {
    /// Validate the settings
    ///
    /// Returns a ValidationResult containing any errors or warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.default_team_calendar.trim().is_empty() {
            result.add_error("default_team_calendar", "Team calendar must not be empty");
        }

        let personal = self.default_personal_calendar.trim();
        if personal.is_empty() {
            result.add_error(
                "default_personal_calendar",
                "Personal calendar must not be empty",
            );
        } else if !personal.contains('@') {
            result.add_warning(
                "default_personal_calendar",
                "Not an e-mail address; the whole value is used as the user name",
            );
        } else if personal.starts_with('@') {
            result.add_error(
                "default_personal_calendar",
                "Cannot derive a user name from an address without a local part",
            );
        }

        if self.timezone.parse::<Tz>().is_err() {
            result.add_error(
                "timezone",
                format!("Unknown IANA timezone: {}", self.timezone),
            );
        }

        if self.ooo_pattern.trim().is_empty() {
            result.add_error("ooo_pattern", "OOO pattern must not be empty");
        }

        result
    }
}

/// A person whose OOO events can be looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamMember {
    /// User name as it appears in OOO event titles
    pub name: String,

    /// Calendar (id or display name) holding this member's OOO events
    pub calendar: String,
}

/// Validated, read-only application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub calendar: CalendarSettings,

    /// Team member name -> calendar holding their OOO events
    pub team: BTreeMap<String, String>,

    timezone: Tz,
}

impl Config {
    /// Build a configuration from already-parsed settings, validating them.
    pub fn new(
        calendar: CalendarSettings,
        team: BTreeMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let mut validation = calendar.validate();
        for (name, cal) in &team {
            if cal.trim().is_empty() {
                validation.add_error(format!("team.{}", name), "Calendar must not be empty");
            }
        }

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()));
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        let timezone = calendar
            .timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::Invalid(format!("timezone: {}", calendar.timezone)))?;

        Ok(Self {
            calendar,
            team,
            timezone,
        })
    }

    /// Load configuration from an INI (default) or TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.is_file() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let format = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => FileFormat::Toml,
            _ => FileFormat::Ini,
        };

        tracing::debug!("Loading configuration from {}", path.display());
        Self::from_source(::config::File::from(path).format(format).required(true))
    }

    /// Parse configuration from an in-memory document.
    pub fn from_str_with_format(contents: &str, format: FileFormat) -> Result<Self, ConfigError> {
        Self::from_source(::config::File::from_str(contents, format))
    }

    fn from_source<S>(source: S) -> Result<Self, ConfigError>
    where
        S: ::config::Source + Send + Sync + 'static,
    {
        let raw: RawConfig = ::config::Config::builder()
            .add_source(source)
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        let section = raw
            .calendar
            .ok_or_else(|| ConfigError::MissingSetting("[calendar] section".to_string()))?;

        let calendar = CalendarSettings {
            default_team_calendar: required(section.default_team_calendar, "default_team_calendar")?,
            timezone: required(section.timezone, "timezone")?,
            default_personal_calendar: required(
                section.default_personal_calendar,
                "default_personal_calendar",
            )?,
            ooo_pattern: section
                .ooo_pattern
                .unwrap_or_else(|| DEFAULT_OOO_PATTERN.to_string()),
        };

        Self::new(calendar, raw.team)
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Current date in the configured timezone
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }

    /// User name of the person running the tool: the local part of the
    /// personal calendar address.
    pub fn personal_username(&self) -> &str {
        let personal = self.calendar.default_personal_calendar.trim();
        personal.split('@').next().unwrap_or(personal)
    }

    /// Resolve an optional team member name to the member to query.
    ///
    /// No name means the configured personal identity. Members listed in
    /// `[team]` use their mapped calendar, everyone else the team calendar.
    pub fn member(&self, name: Option<&str>) -> TeamMember {
        let name = match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None => self.personal_username().to_string(),
        };

        let calendar = self
            .team
            .iter()
            .find(|(member, _)| member.eq_ignore_ascii_case(&name))
            .map(|(_, cal)| cal.trim().to_string())
            .unwrap_or_else(|| self.calendar.default_team_calendar.trim().to_string());

        TeamMember { name, calendar }
    }
}

fn required(value: Option<String>, key: &str) -> Result<String, ConfigError> {
    value.ok_or_else(|| ConfigError::MissingSetting(key.to_string()))
}
