//! Console log formatting for the simulator.
//!
//! Lines look like `[timestamp] [component] [level] message`. Events may name
//! their component with the `component_*!` macros; events without one are
//! attributed to the binary itself.

use std::fmt;
use std::io::IsTerminal;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::{format::Writer, FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

const COLOR_RESET: &str = "\x1b[0m";
const COLOR_CYAN: &str = "\x1b[36m";
const COLOR_GREEN: &str = "\x1b[32m";
const COLOR_BRIGHT_YELLOW: &str = "\x1b[93m";
const COLOR_BRIGHT_RED: &str = "\x1b[91m";
const COLOR_BRIGHT_GRAY: &str = "\x1b[90m";

const COMPONENT_WIDTH: usize = 16;
const LOG_LEVEL_WIDTH: usize = 7;

/// Prefix of every component column
const COMPONENT_PREFIX: &str = "lsim";

/// Event formatter for the simulator's console output
pub struct SimLogFormatter {
    default_component: String,
    color_enabled: bool,
}

/// Log at info level on behalf of a named component
#[macro_export]
macro_rules! component_info {
    ($component:expr, $($arg:tt)*) => {
        tracing::info!(component = $component, $($arg)*)
    };
}

/// Log at warn level on behalf of a named component
#[macro_export]
macro_rules! component_warn {
    ($component:expr, $($arg:tt)*) => {
        tracing::warn!(component = $component, $($arg)*)
    };
}

/// Log at debug level on behalf of a named component
#[macro_export]
macro_rules! component_debug {
    ($component:expr, $($arg:tt)*) => {
        tracing::debug!(component = $component, $($arg)*)
    };
}

/// Log at error level on behalf of a named component
#[macro_export]
macro_rules! component_error {
    ($component:expr, $($arg:tt)*) => {
        tracing::error!(component = $component, $($arg)*)
    };
}

impl SimLogFormatter {
    /// Formatter attributing unnamed events to `default_component`
    pub fn new(default_component: impl Into<String>) -> Self {
        Self::with_color(default_component, is_terminal())
    }

    fn with_color(default_component: impl Into<String>, color_enabled: bool) -> Self {
        Self {
            default_component: default_component.into(),
            color_enabled,
        }
    }

    fn format_component(&self, component: Option<&str>) -> String {
        let name = match component {
            Some(component) => format!("{}-{}", COMPONENT_PREFIX, component),
            None => self.default_component.clone(),
        };

        if name.chars().count() > COMPONENT_WIDTH {
            let truncated: String = name.chars().take(COMPONENT_WIDTH - 1).collect();
            format!("{}…", truncated)
        } else {
            format!("{:<width$}", name, width = COMPONENT_WIDTH)
        }
    }

    fn format_level(&self, level: &Level) -> String {
        let label = match *level {
            Level::ERROR => "✗ ERROR",
            Level::WARN => "⚠ WARN",
            Level::INFO => "ℹ INFO",
            Level::DEBUG => "◦ DEBUG",
            Level::TRACE => "◦ TRACE",
        };
        format!("{:<width$}", label, width = LOG_LEVEL_WIDTH)
    }

    fn color_for(&self, level: &Level) -> &'static str {
        if !self.color_enabled {
            return "";
        }
        match *level {
            Level::ERROR => COLOR_BRIGHT_RED,
            Level::WARN => COLOR_BRIGHT_YELLOW,
            Level::INFO => COLOR_GREEN,
            Level::DEBUG | Level::TRACE => COLOR_BRIGHT_GRAY,
        }
    }

    fn render(&self, timestamp: &str, level: &Level, fields: &FieldVisitor) -> String {
        let (cyan, reset) = if self.color_enabled {
            (COLOR_CYAN, COLOR_RESET)
        } else {
            ("", "")
        };
        format!(
            "{}[{}] [{}] [{}{}{}] {}",
            cyan,
            timestamp,
            self.format_component(fields.component.as_deref()),
            self.color_for(level),
            self.format_level(level),
            reset,
            fields.message
        )
    }
}

impl<S, N> FormatEvent<S, N> for SimLogFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let timestamp = chrono::Local::now()
            .format("%Y-%m-%d %H:%M:%S%.3f")
            .to_string();

        let mut fields = FieldVisitor::default();
        event.record(&mut fields);

        writeln!(
            writer,
            "{}",
            self.render(&timestamp, event.metadata().level(), &fields)
        )
    }
}

/// Collects the message and component fields of an event
#[derive(Default)]
struct FieldVisitor {
    message: String,
    component: Option<String>,
}

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        let rendered = format!("{:?}", value);
        let unquoted = rendered
            .strip_prefix('"')
            .and_then(|inner| inner.strip_suffix('"'))
            .map(str::to_string)
            .unwrap_or(rendered);
        match field.name() {
            "message" => self.message = unquoted,
            "component" => self.component = Some(unquoted),
            _ => {}
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        match field.name() {
            "message" => self.message = value.to_string(),
            "component" => self.component = Some(value.to_string()),
            _ => {}
        }
    }
}

/// Whether stdout is an interactive terminal that understands colors
fn is_terminal() -> bool {
    if std::env::var("TERM").map_or(false, |term| term == "dumb") {
        return false;
    }
    std::io::stdout().is_terminal()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_column_is_padded() {
        let formatter = SimLogFormatter::with_color("linkstate-sim", false);
        assert_eq!(formatter.format_component(None), "linkstate-sim   ");
        assert_eq!(formatter.format_component(Some("menu")), "lsim-menu       ");
    }

    #[test]
    fn test_long_component_is_truncated() {
        let formatter = SimLogFormatter::with_color("linkstate-sim", false);
        let column = formatter.format_component(Some("configuration-loader"));
        assert_eq!(column.chars().count(), COMPONENT_WIDTH);
        assert!(column.ends_with('…'));
    }

    #[test]
    fn test_plain_line_layout() {
        let formatter = SimLogFormatter::with_color("linkstate-sim", false);
        let fields = FieldVisitor {
            message: "Routing epoch 1 published".to_string(),
            component: Some("config".to_string()),
        };
        let line = formatter.render("2024-01-01 00:00:00.000", &Level::WARN, &fields);
        assert_eq!(
            line,
            "[2024-01-01 00:00:00.000] [lsim-config     ] [⚠ WARN ] Routing epoch 1 published"
        );
    }

    #[test]
    fn test_colored_line_resets_once() {
        let formatter = SimLogFormatter::with_color("linkstate-sim", true);
        let fields = FieldVisitor {
            message: "Dead letter".to_string(),
            component: None,
        };
        let line = formatter.render("2024-01-01 00:00:00.000", &Level::ERROR, &fields);
        assert_eq!(line.matches(COLOR_RESET).count(), 1);
        assert!(line.starts_with(COLOR_CYAN));
        assert!(line.ends_with("] Dead letter"));
        assert!(line.contains(&format!("{}✗ ERROR{}", COLOR_BRIGHT_RED, COLOR_RESET)));
    }
}
