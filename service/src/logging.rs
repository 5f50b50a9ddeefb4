use crate::config::Config;
use log::{LevelFilter, SetLoggerError};
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

/// Target prefixes of chatty dependencies, muted below TRACE.
const NOISY_DEPENDENCIES: &[&str] = &["sqlx", "sea_orm", "tracing", "hyper", "reqwest", "rustls"];

pub struct Logger {}

impl Logger {
    /// Installs the global terminal logger at the configured level.
    ///
    /// Fails if a global logger was already installed.
    pub fn init_logger(config: &Config) -> Result<(), SetLoggerError> {
        let level = config.log_level_filter;
        TermLogger::init(
            level,
            Self::build_log_config(level),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        )
    }

    /// Dependency targets to mute at `level`. TRACE shows everything.
    fn muted_targets(level: LevelFilter) -> &'static [&'static str] {
        match level {
            LevelFilter::Trace => &[],
            _ => NOISY_DEPENDENCIES,
        }
    }

    fn build_log_config(level: LevelFilter) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder.set_time_format_rfc3339();
        for target in Self::muted_targets(level) {
            builder.add_filter_ignore_str(target);
        }
        builder.build()
    }
}
