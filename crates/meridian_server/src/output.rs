//! Terminal output for the CLI commands: styled text, or one JSON object
//! per line with `--output json`. Colors follow `console`, which honors
//! `NO_COLOR` and plain pipes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::cli::OutputFormat;

static JSON_MODE: AtomicBool = AtomicBool::new(false);

pub fn init(format: OutputFormat) {
    JSON_MODE.store(matches!(format, OutputFormat::Json), Ordering::Relaxed);
}

pub fn is_json() -> bool {
    JSON_MODE.load(Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy)]
enum Level {
    Heading,
    Note,
    Success,
    Warning,
    Error,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Level::Heading | Level::Note => "info",
            Level::Success => "success",
            Level::Warning => "warning",
            Level::Error => "error",
        }
    }
}

#[derive(Serialize)]
struct JsonLine<'a> {
    level: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a JsonValue>,
}

fn json_line(level: &str, message: &str, data: Option<&JsonValue>) -> String {
    let line = JsonLine { level, message, data };
    serde_json::to_string(&line).unwrap_or_else(|_| serde_json::json!({ "level": level, "message": message }).to_string())
}

fn emit(level: Level, text: &str) {
    if is_json() {
        let line = json_line(level.as_str(), text, None);
        match level {
            Level::Error => eprintln!("{line}"),
            _ => println!("{line}"),
        }
        return;
    }
    match level {
        Level::Heading => println!("{}", style(text).bold().cyan()),
        Level::Note => println!("{}", style(text).dim()),
        Level::Success => println!("{} {}", style("✓").green(), style(text).bright()),
        Level::Warning => println!("{} {}", style("!").yellow(), style(text).bright()),
        Level::Error => eprintln!("{} {}", style("✗").red(), style(text).bright()),
    }
}

pub fn header(text: &str) {
    emit(Level::Heading, text);
}

pub fn dim(text: &str) {
    emit(Level::Note, text);
}

pub fn success(text: &str) {
    emit(Level::Success, text);
}

pub fn warning(text: &str) {
    emit(Level::Warning, text);
}

pub fn error(text: &str) {
    emit(Level::Error, text);
}

/// `key value` with the key highlighted.
pub fn kv(key: &str, value: &str) {
    if is_json() {
        let data = serde_json::json!({ key: value });
        println!("{}", json_line("info", key, Some(&data)));
    } else {
        println!("  {} {}", style(key).cyan().bold(), value);
    }
}

pub fn json_pretty(value: &JsonValue) {
    if is_json() {
        println!("{}", json_line("data", "", Some(value)));
    } else {
        println!("{}", serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()));
    }
}

/// Any serializable value; pretty JSON in text mode.
pub fn data<T: Serialize>(label: &str, value: &T) {
    let value = serde_json::to_value(value).unwrap_or(JsonValue::Null);
    if is_json() {
        println!("{}", json_line("data", label, Some(&value)));
    } else {
        json_pretty(&value);
    }
}

/// Table with a bold cyan header row.
pub fn table(columns: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            columns
                .iter()
                .map(|c| Cell::new(c).fg(Color::Cyan).add_attribute(Attribute::Bold)),
        );
    table
}

/// First cell green, the rest plain.
pub fn row<I, S>(cells: I) -> Vec<Cell>
where
    I: IntoIterator<Item = S>,
    S: ToString,
{
    cells
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let cell = Cell::new(text.to_string());
            if i == 0 { cell.fg(Color::Green) } else { cell }
        })
        .collect()
}

/// Spinner for a pending call; hidden in JSON mode.
pub fn spinner(message: &str) -> ProgressBar {
    if is_json() {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// Clear the spinner and report how the call ended.
pub fn finish<T, E>(spinner: &ProgressBar, outcome: &Result<T, E>, ok: &str, failed: &str) {
    spinner.finish_and_clear();
    match outcome {
        Ok(_) => success(ok),
        Err(_) => error(failed),
    }
}
