use std::fs::{File, OpenOptions};
use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::{self, FmtContext};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

/// Used when neither `--log-level` nor `RUST_LOG` is set.
pub const DEFAULT_LEVEL: &str = "info";

const DIM: &str = "\x1b[2m";
const CYAN: &str = "\x1b[36m";
const RESET: &str = "\x1b[0m";

/// Local-time event format: timestamp, level, `file:line`, fields.
struct LocalFmt;

fn level_colour(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "\x1b[1;31m",
        Level::WARN => "\x1b[1;33m",
        Level::INFO => "\x1b[1;32m",
        Level::DEBUG => "\x1b[1;34m",
        Level::TRACE => "\x1b[1;35m",
    }
}

impl<S, N> FormatEvent<S, N> for LocalFmt
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        let ansi = writer.has_ansi_escapes();
        let timestamp = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");

        if ansi {
            write!(
                writer,
                "{DIM}{timestamp}{RESET} {}{:>5}{RESET} ",
                level_colour(meta.level()),
                meta.level()
            )?;
        } else {
            write!(writer, "{timestamp} {:>5} ", meta.level())?;
        }

        let file = meta
            .file()
            .map(|f| f.rsplit_once("src/").map_or(f, |(_, rest)| rest));
        if let (Some(file), Some(line)) = (file, meta.line()) {
            if ansi {
                write!(writer, "{CYAN}{file}:{line}{RESET} ")?;
            } else {
                write!(writer, "{file}:{line} ")?;
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

fn open_log_file(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Builds the filter from `level`, then `RUST_LOG`, then [`DEFAULT_LEVEL`].
fn env_filter(level: Option<&str>) -> Result<EnvFilter> {
    match level {
        Some(level) => EnvFilter::try_new(level)
            .with_context(|| format!("Invalid log level directive: {level}")),
        None => Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))),
    }
}

/// Installs the global subscriber.
///
/// Events go to stderr, coloured only when stderr is a terminal, so report
/// output on stdout stays clean. With `log_file` set, the same events are
/// appended to that file without colour.
pub fn init_logging(
    level: Option<&str>,
    log_file: Option<&Path>,
) -> Result<()> {
    let filter = env_filter(level)?;

    let stderr_layer = fmt::layer()
        .event_format(LocalFmt)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal());

    let file_layer = match log_file {
        Some(path) => {
            let file = open_log_file(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            Some(
                fmt::layer()
                    .event_format(LocalFmt)
                    .with_writer(Mutex::new(file))
                    .with_ansi(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_level_must_parse() {
        assert!(env_filter(Some("debug")).is_ok());
        assert!(env_filter(Some("btl_core=trace,warn")).is_ok());
        assert!(env_filter(Some("btl_core=loud")).is_err());
    }

    #[test]
    fn log_file_is_opened_for_append() {
        let path = std::env::temp_dir().join(format!("btl-log-{}.log", std::process::id()));
        std::fs::write(&path, "existing\n").unwrap();

        {
            use std::io::Write;
            let mut file = open_log_file(&path).unwrap();
            writeln!(file, "appended").unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(contents, "existing\nappended\n");
    }
}
