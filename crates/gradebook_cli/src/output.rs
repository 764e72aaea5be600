//! Text and JSON printing shared by command handlers.

use chrono::DateTime;
use serde::Serialize;

#[derive(Serialize)]
struct JsonOut<T> {
    ok: bool,
    data: T,
}

#[derive(Serialize)]
struct JsonError<'a> {
    ok: bool,
    error: &'a str,
}

pub fn print_one<T: Serialize>(
    json: bool,
    data: T,
    render: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&JsonOut { ok: true, data })?
        );
    } else {
        println!("{}", render(&data));
    }
    Ok(())
}

pub fn print_list<T: Serialize>(
    json: bool,
    data: &[T],
    empty: &str,
    row: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&JsonOut { ok: true, data })?
        );
    } else if data.is_empty() {
        println!("{empty}");
    } else {
        for item in data {
            println!("{}", row(item));
        }
    }
    Ok(())
}

/// Reports a failed command once, on stderr.
pub fn print_error(json: bool, err: &anyhow::Error) {
    let message = format!("{err:#}");
    if json {
        if let Ok(body) = serde_json::to_string_pretty(&JsonError {
            ok: false,
            error: &message,
        }) {
            eprintln!("{body}");
            return;
        }
    }
    eprintln!("error: {message}");
}

/// Formats a weight fraction as a percentage, e.g. `0.3` -> `30.00%`.
pub fn weight_percent(weight: f64) -> String {
    format!("{:.2}%", weight * 100.0)
}

/// Formats a 0..100 score with two decimals.
pub fn score_percent(score: f64) -> String {
    format!("{score:.2}%")
}

/// `YYYY-MM-DD` for an epoch-millisecond timestamp.
pub fn format_date(epoch_ms: i64) -> String {
    DateTime::from_timestamp_millis(epoch_ms)
        .map(|at| at.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}
