//! Log record layout for the monitor.
//!
//! Default tracing format: `TIMESTAMP LEVEL span1:span2: target: message`
//! This format:            `[TIMESTAMP] [thread] LEVEL target: span1:span2: message`

use std::fmt;
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::fmt::format::{self, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

use crate::config::DEFAULT_DATE_FORMAT;

/// Thread names are padded or cut to this width
const THREAD_NAME_WIDTH: usize = 20;

/// Event formatter with a local timestamp and the thread name up front
pub struct MonitorFormat {
    date_format: String,
    ansi: bool,
}

impl MonitorFormat {
    /// `date_format` is a chrono strftime pattern
    pub fn new(date_format: impl Into<String>, ansi: bool) -> Self {
        Self {
            date_format: date_format.into(),
            ansi,
        }
    }
}

impl Default for MonitorFormat {
    fn default() -> Self {
        Self::new(DEFAULT_DATE_FORMAT, true)
    }
}

fn thread_label() -> String {
    let current = std::thread::current();
    let name = current.name().unwrap_or("unnamed");
    let name: String = name.chars().take(THREAD_NAME_WIDTH).collect();
    format!("{:<width$}", name, width = THREAD_NAME_WIDTH)
}

impl<S, N> FormatEvent<S, N> for MonitorFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();

        let now = chrono::Local::now();
        write!(writer, "[{}] ", now.format(&self.date_format))?;
        write!(writer, "[{}] ", thread_label())?;

        let level = metadata.level();
        if self.ansi {
            let level_style = match *level {
                tracing::Level::ERROR => "\x1b[31m", // Red
                tracing::Level::WARN => "\x1b[33m",  // Yellow
                tracing::Level::INFO => "\x1b[32m",  // Green
                tracing::Level::DEBUG => "\x1b[34m", // Blue
                tracing::Level::TRACE => "\x1b[35m", // Magenta
            };
            write!(writer, "{}{:>5}\x1b[0m ", level_style, level)?;
        } else {
            write!(writer, "{:>5} ", level)?;
        }

        write!(writer, "{}: ", metadata.target())?;

        if let Some(scope) = ctx.event_scope() {
            let mut first = true;
            for span in scope.from_root() {
                if !first {
                    write!(writer, ":")?;
                }
                write!(writer, "{}", span.name())?;
                first = false;
            }
            if !first {
                write!(writer, ": ")?;
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}
