// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use clap::{Args, ValueEnum};
use owo_colors::{style, OwoColorize, Style};
use std::{fmt, str::FromStr};
use tracing::{
    field::{Field, Visit},
    level_filters::LevelFilter,
    Event, Level, Subscriber,
};
use tracing_subscriber::{
    filter::Targets,
    fmt::{format, FmtContext, FormatEvent, FormatFields},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    Layer,
};

/// The environment variable used to filter log output.
pub const LOG_ENV: &str = "TRX_MERGE_LOG";

/// Log events with this target are printed without an `error:`/`info:` prefix.
pub(crate) const NO_HEADING_TARGET: &str = "trx_merge::no_heading";

pub(crate) mod clap_styles {
    use clap::builder::{
        styling::{AnsiColor, Effects, Style},
        Styles,
    };

    const HEADER: Style = AnsiColor::Green.on_default().effects(Effects::BOLD);
    const USAGE: Style = AnsiColor::Green.on_default().effects(Effects::BOLD);
    const LITERAL: Style = AnsiColor::Cyan.on_default().effects(Effects::BOLD);
    const PLACEHOLDER: Style = AnsiColor::Cyan.on_default();
    const ERROR: Style = AnsiColor::Red.on_default().effects(Effects::BOLD);
    const VALID: Style = AnsiColor::Cyan.on_default().effects(Effects::BOLD);
    const INVALID: Style = AnsiColor::Yellow.on_default().effects(Effects::BOLD);

    pub(crate) const fn style() -> Styles {
        Styles::styled()
            .header(HEADER)
            .usage(USAGE)
            .literal(LITERAL)
            .placeholder(PLACEHOLDER)
            .error(ERROR)
            .valid(VALID)
            .invalid(INVALID)
    }
}

#[derive(Copy, Clone, Debug, Args)]
#[must_use]
pub(crate) struct OutputOpts {
    /// Verbose output
    #[arg(long, short, global = true, env = "TRX_MERGE_VERBOSE")]
    pub(crate) verbose: bool,

    /// Produce color output: auto, always, never
    #[arg(
        long,
        value_enum,
        default_value_t,
        hide_possible_values = true,
        global = true,
        value_name = "WHEN",
        env = "CARGO_TERM_COLOR"
    )]
    pub(crate) color: Color,
}

impl OutputOpts {
    pub(crate) fn init(self) -> OutputContext {
        let OutputOpts { verbose, color } = self;
        color.init(verbose);
        OutputContext { color }
    }
}

/// Console settings, initialized once per process.
#[derive(Copy, Clone, Debug)]
#[must_use]
pub struct OutputContext {
    pub(crate) color: Color,
}

impl OutputContext {
    /// Returns general stderr styles for the current output context.
    pub fn stderr_styles(&self) -> StderrStyles {
        let mut styles = StderrStyles::default();
        if self.color.should_colorize(supports_color::Stream::Stderr) {
            styles.colorize();
        }
        styles
    }

    /// Returns styles for the summary printed to stdout.
    pub fn stdout_styles(&self) -> SummaryStyles {
        let mut styles = SummaryStyles::default();
        if self.color.should_colorize(supports_color::Stream::Stdout) {
            styles.colorize();
        }
        styles
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
#[must_use]
pub enum Color {
    #[default]
    Auto,
    Always,
    Never,
}

static INIT_LOGGER: std::sync::Once = std::sync::Once::new();

struct SimpleFormatter {
    styles: LogStyles,
}

impl<S, N> FormatEvent<S, N> for SimpleFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();

        if metadata.target() != NO_HEADING_TARGET {
            let (heading, style) = match *metadata.level() {
                Level::ERROR => ("error", self.styles.error),
                Level::WARN => ("warning", self.styles.warning),
                Level::INFO => ("info", self.styles.info),
                Level::DEBUG => ("debug", self.styles.debug),
                Level::TRACE => ("trace", self.styles.trace),
            };
            write!(writer, "{}: ", heading.style(style))?;
        }

        let mut visitor = MessageVisitor {
            writer: &mut writer,
            error: None,
        };
        event.record(&mut visitor);
        if let Some(error) = visitor.error {
            return Err(error);
        }

        writeln!(writer)
    }
}

static MESSAGE_FIELD: &str = "message";

struct MessageVisitor<'writer, 'a> {
    writer: &'a mut format::Writer<'writer>,
    error: Option<fmt::Error>,
}

impl Visit for MessageVisitor<'_, '_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == MESSAGE_FIELD {
            if let Err(error) = write!(self.writer, "{:?}", value) {
                self.error = Some(error);
            }
        }
    }
}

impl Color {
    pub(crate) fn init(self, verbose: bool) {
        let mut log_styles = LogStyles::default();
        if self.should_colorize(supports_color::Stream::Stderr) {
            log_styles.colorize();
        }

        INIT_LOGGER.call_once(|| {
            let default_level = if verbose {
                LevelFilter::DEBUG
            } else {
                LevelFilter::INFO
            };

            // An invalid value is reported once the subscriber is up.
            let level_str = std::env::var(LOG_ENV).unwrap_or_default();
            let (targets, parse_error) = log_targets(&level_str, default_level);

            let layer = tracing_subscriber::fmt::layer()
                .event_format(SimpleFormatter { styles: log_styles })
                .with_writer(std::io::stderr)
                .with_filter(targets);
            tracing_subscriber::registry().with(layer).init();

            if let Some(err) = parse_error {
                tracing::warn!("ignoring invalid {LOG_ENV} value `{level_str}`: {err}");
            }
        });
    }

    pub(crate) fn should_colorize(self, stream: supports_color::Stream) -> bool {
        match self {
            Color::Auto => supports_color::on_cached(stream).is_some(),
            Color::Always => true,
            Color::Never => false,
        }
    }
}

/// Parses the value of [`LOG_ENV`], falling back to `default_level` if it's empty or invalid.
fn log_targets(
    value: &str,
    default_level: LevelFilter,
) -> (Targets, Option<<Targets as FromStr>::Err>) {
    if value.is_empty() {
        return (Targets::new().with_default(default_level), None);
    }
    match value.parse::<Targets>() {
        Ok(targets) => (targets, None),
        Err(err) => (Targets::new().with_default(default_level), Some(err)),
    }
}

#[derive(Debug, Default)]
struct LogStyles {
    error: Style,
    warning: Style,
    info: Style,
    debug: Style,
    trace: Style,
}

impl LogStyles {
    fn colorize(&mut self) {
        self.error = style().red().bold();
        self.warning = style().yellow().bold();
        self.info = style().bold();
        self.debug = style().bold();
        self.trace = style().dimmed();
    }
}

/// Styles for error messages.
#[derive(Debug, Default)]
pub struct StderrStyles {
    pub(crate) bold: Style,
}

impl StderrStyles {
    fn colorize(&mut self) {
        self.bold = style().bold();
    }
}

/// Styles for the merge summary.
#[derive(Debug, Default)]
pub struct SummaryStyles {
    pub(crate) bold: Style,
    pub(crate) count: Style,
    pub(crate) pass: Style,
    pub(crate) fail: Style,
}

impl SummaryStyles {
    fn colorize(&mut self) {
        self.bold = style().bold();
        self.count = style().bold();
        self.pass = style().green().bold();
        self.fail = style().red().bold();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::{
        io,
        sync::{Arc, Mutex},
    };

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> String {
            let buf = self.0.lock().expect("lock not poisoned");
            String::from_utf8(buf.clone()).expect("log output is UTF-8")
        }
    }

    impl io::Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let mut inner = self.0.lock().expect("lock not poisoned");
            io::Write::write(&mut *inner, buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture_logs(f: impl FnOnce()) -> String {
        let buffer = SharedBuffer::default();
        let make_writer = {
            let buffer = buffer.clone();
            move || buffer.clone()
        };
        let layer = tracing_subscriber::fmt::layer()
            .event_format(SimpleFormatter {
                styles: LogStyles::default(),
            })
            .with_writer(make_writer);
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, f);
        buffer.contents()
    }

    #[test]
    fn events_are_prefixed_with_level() {
        let logs = capture_logs(|| {
            tracing::error!("failed to read input report `a.trx`");
            tracing::warn!("ignoring invalid value");
            tracing::info!("wrote merged.trx");
        });
        assert_eq!(
            logs,
            "error: failed to read input report `a.trx`\n\
             warning: ignoring invalid value\n\
             info: wrote merged.trx\n"
        );
    }

    #[test]
    fn no_heading_target_is_printed_bare() {
        let logs = capture_logs(|| {
            tracing::error!("failed to write merged report");
            tracing::error!(target: NO_HEADING_TARGET, "\nCaused by:\n  permission denied");
        });
        assert_eq!(
            logs,
            "error: failed to write merged report\n\nCaused by:\n  permission denied\n"
        );
    }

    #[test]
    fn log_env_parsing() {
        let (targets, err) = log_targets("", LevelFilter::INFO);
        assert!(err.is_none());
        assert!(targets.would_enable("trx_merge", &Level::INFO));
        assert!(!targets.would_enable("trx_merge", &Level::DEBUG));

        let (targets, err) = log_targets("trx_merge=trace,warn", LevelFilter::INFO);
        assert!(err.is_none());
        assert!(targets.would_enable("trx_merge::merge", &Level::TRACE));
        assert!(!targets.would_enable("quick_trx", &Level::INFO));

        let (targets, err) = log_targets("trx_merge=loud", LevelFilter::DEBUG);
        assert!(err.is_some(), "invalid level is reported");
        assert!(targets.would_enable("trx_merge", &Level::DEBUG));
        assert!(!targets.would_enable("trx_merge", &Level::TRACE));
    }
}
