use std::fmt;
use std::path::Path;
use std::sync::Once;

use tracing::{Event, Subscriber};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    filter::EnvFilter,
    fmt::{
        format::{self, FormatEvent, FormatFields},
        FmtContext, FormattedFields,
    },
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    Layer,
};

use crate::error::Result;

// Log targets, one per stage of the structure recovery.
pub const HEADING: &str = "sections::heading";
pub const AGGREGATE: &str = "sections::aggregate";
pub const FURNITURE: &str = "sections::furniture";
pub const ANNOTATE: &str = "sections::annotate";
pub const PIPELINE: &str = "sections::pipeline";

const DECISION_TARGETS: &[&str] = &[HEADING, AGGREGATE, FURNITURE, ANNOTATE, PIPELINE];

const LOG_FILE_NAME: &str = "sectioner.log";

static INIT: Once = Once::new();

/// Writes `LEVEL target: span{fields} message` lines, one per event, so a log
/// file can be grepped by page or document.
struct DecisionFormatter;

impl<S, N> FormatEvent<S, N> for DecisionFormatter
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
        write!(writer, "{} {}: ", metadata.level(), metadata.target())?;

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                let ext = span.extensions();
                if let Some(fields) = ext.get::<FormattedFields<N>>() {
                    if !fields.fields.is_empty() {
                        write!(writer, "{}{{{}}} ", span.name(), fields.fields)?;
                    }
                }
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// `RUST_LOG` wins when set; otherwise our own targets at `info`
/// (or `debug` with `debug = true`) and everything else at `warn`.
fn decision_filter(debug: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if debug { "debug" } else { "info" };
        let directives = DECISION_TARGETS
            .iter()
            .map(|target| format!("{target}={level}"))
            .collect::<Vec<_>>()
            .join(",");
        EnvFilter::new(format!("warn,{directives}"))
    })
}

/// Log to stderr. Stdout stays free for annotated output.
///
/// Only the first initialisation installs a subscriber and returns its guard;
/// later calls return `None`.
pub fn init_logging(debug: bool) -> Option<WorkerGuard> {
    let mut guard = None;

    INIT.call_once(|| {
        let (writer, worker) = tracing_appender::non_blocking(std::io::stderr());
        guard = Some(worker);
        let stderr_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_writer(writer)
            .with_filter(decision_filter(debug));

        let _ = tracing_subscriber::registry().with(stderr_layer).try_init();
    });

    guard
}

/// Log decisions to `<log_dir>/sectioner.log` and warnings to stderr.
pub fn init_logging_with_dir(debug: bool, log_dir: &Path) -> Result<Option<WorkerGuard>> {
    std::fs::create_dir_all(log_dir)?;
    let mut guard = None;

    INIT.call_once(|| {
        let file_appender = RollingFileAppender::new(Rotation::NEVER, log_dir, LOG_FILE_NAME);
        let (non_blocking_appender, worker) = tracing_appender::non_blocking(file_appender);
        guard = Some(worker);
        let file_layer = tracing_subscriber::fmt::layer()
            .event_format(DecisionFormatter)
            .with_ansi(false)
            .with_writer(non_blocking_appender)
            .with_filter(decision_filter(debug));

        let stderr_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .with_filter(EnvFilter::new("warn"));

        let _ = tracing_subscriber::registry()
            .with(file_layer)
            .with(stderr_layer)
            .try_init();
    });

    Ok(guard)
}
