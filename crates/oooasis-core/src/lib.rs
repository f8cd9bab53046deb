pub mod config;
pub mod error;

pub use config::{
    CalendarSettings, Config, TeamMember, ValidationResult, DEFAULT_CONFIG_FILE,
    DEFAULT_OOO_PATTERN,
};
pub use error::{AppError, AuthError, ConfigError};

/// Initialize tracing/logging on stderr.
///
/// `RUST_LOG` wins when set; otherwise `verbosity` picks the level
/// (0 = warn, 1 = info, 2+ = debug) so stdout stays reserved for results.
pub fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();

    tracing::debug!("OOOasis logging initialized");
}
