//! Log formatting and output
//!
//! Console lines are colored and aligned; file lines are plain text with a
//! full timestamp. A broken stdout pipe ends the process quietly.

use super::file::write_to_file;
use super::levels::LogLevel;
use super::tags::LogTag;
use chrono::Local;
use colored::*;
use std::io::{stdout, ErrorKind, Write};

const TAG_WIDTH: usize = 10;
const LEVEL_WIDTH: usize = 7;

pub fn format_and_log(tag: &LogTag, level: LogLevel, message: &str) {
    let now = Local::now();

    let console_line = format!(
        "{} [{}] [{}] {}",
        now.format("%H:%M:%S").to_string().dimmed(),
        tag.colored(TAG_WIDTH),
        format_level(level),
        message
    );
    print_stdout_safe(&console_line);

    write_to_file(&format_file_line(
        &now.format("%Y-%m-%d %H:%M:%S").to_string(),
        tag,
        level,
        message,
    ));
}

/// Plain-text line written to the log file
pub fn format_file_line(timestamp: &str, tag: &LogTag, level: LogLevel, message: &str) -> String {
    format!(
        "{} [{}] [{}] {}",
        timestamp,
        tag.to_plain_string(),
        level.as_str(),
        message
    )
}

fn format_level(level: LogLevel) -> ColoredString {
    let label = format!("{:<width$}", level.as_str(), width = LEVEL_WIDTH);
    match level {
        LogLevel::Error => label.bright_red().bold(),
        LogLevel::Warning => label.bright_yellow().bold(),
        LogLevel::Info => label.white().bold(),
        LogLevel::Debug => label.bright_black(),
        LogLevel::Verbose => label.dimmed(),
    }
}

/// Print to stdout but ignore broken pipe errors
fn print_stdout_safe(message: &str) {
    let mut out = stdout().lock();
    if let Err(e) = writeln!(out, "{}", message) {
        if e.kind() == ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        let _ = writeln!(std::io::stderr(), "Logger stdout error: {}", e);
    }
    if let Err(e) = out.flush() {
        if e.kind() == ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_line_format() {
        let line = format_file_line(
            "2026-01-02 03:04:05",
            &LogTag::Bridge,
            LogLevel::Warning,
            "link lost",
        );
        assert_eq!(line, "2026-01-02 03:04:05 [BRIDGE] [WARNING] link lost");
    }
}
