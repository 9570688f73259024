//! Logging configuration for the positioning service.

use chrono::Local;
use env_logger::{Builder, Env, Target};
use log::info;
use std::io::Write;

/// Environment variable that overrides the configured log filter.
pub const LOG_ENV: &str = "WIFIPOS_LOG";

/// Initialize the logging system
pub fn init_logging(level: &str) {
    let env = Env::default()
        .filter_or(LOG_ENV, level)
        .write_style_or("WIFIPOS_LOG_STYLE", "auto");

    let installed = Builder::from_env(env)
        .format(|buf, record| {
            let level_color = match record.level() {
                | log::Level::Error => "\x1b[31m", // Red
                | log::Level::Warn => "\x1b[33m",  // Yellow
                | log::Level::Info => "\x1b[32m",  // Green
                | log::Level::Debug => "\x1b[36m", // Cyan
                | log::Level::Trace => "\x1b[35m", // Magenta
            };
            let reset = "\x1b[0m";

            writeln!(
                buf,
                "{} {}{:5}{} [{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                level_color,
                record.level(),
                reset,
                record.target(),
                record.args()
            )
        })
        .target(Target::Stdout)
        .try_init()
        .is_ok();

    if installed {
        info!("Logging initialized at level: {}", level);
    }
}

/// Initialize test logging (for use in tests)
#[cfg(test)]
pub fn init_test_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::{debug, warn};

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging("debug");
        init_logging("info");
        warn!("second init must not panic");
    }

    #[test]
    fn test_test_logging() {
        init_test_logging();
        debug!("visible with --nocapture");
    }
}
