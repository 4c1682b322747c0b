//! Tracing setup for running as a Stash plugin.
//!
//! Stash reads plugin logs from stderr and expects every line to start with
//! `\x01<level>\x02`, where level is one of `t d i w e`.

use std::fmt;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::{format::Writer, FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{prelude::*, EnvFilter};

pub const ENV_LOG: &str = "ADVANCED_RATING_LOG";

pub fn level_marker(level: Level) -> char {
    match level {
        Level::TRACE => 't',
        Level::DEBUG => 'd',
        Level::INFO => 'i',
        Level::WARN => 'w',
        Level::ERROR => 'e',
    }
}

/// Event formatter emitting the Stash level prefix followed by the fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct StashLogFormat;

impl<S, N> FormatEvent<S, N> for StashLogFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(writer, "\x01{}\x02", level_marker(*event.metadata().level()))?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Install the stderr subscriber. `$ADVANCED_RATING_LOG` overrides the filter.
/// Calling it twice is harmless.
pub fn init(default_filter: &str) {
    let filter =
        EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .event_format(StashLogFormat),
        )
        .try_init();
}
