use std::{str::FromStr, time::SystemTime};

use colored::{ColoredString, Colorize};
use log::{Level, LevelFilter};

fn paint(level: Level) -> ColoredString {
    let label = level.to_string();
    match level {
        Level::Error => label.red().bold(),
        Level::Warn => label.yellow(),
        Level::Info => label.green(),
        Level::Debug => label.blue(),
        Level::Trace => label.dimmed(),
    }
}

/// Installs the global logger. `level` falls back to info when absent or unparsable.
pub fn setup_logger(level: Option<&str>) -> Result<(), fern::InitError> {
    let filter = level
        .and_then(|l| LevelFilter::from_str(l).ok())
        .unwrap_or(LevelFilter::Info);

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339_seconds(SystemTime::now()),
                paint(record.level()),
                record.target(),
                message
            ))
        })
        .level(filter)
        .level_for("diesel", LevelFilter::Warn)
        .level_for("hyper", LevelFilter::Warn)
        .level_for("r2d2", LevelFilter::Warn)
        .chain(std::io::stdout())
        .apply()?;

    Ok(())
}
