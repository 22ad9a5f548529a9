use colored::Colorize;
use std::fmt::Display;

/// Severity of a user-facing status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Fatal,
}

impl Level {
    fn prefix(self) -> &'static str {
        match self {
            Level::Info => "[INFO] ",
            Level::Warn => "[WARN] ",
            Level::Fatal => "[ERROR]",
        }
    }
}

fn emit(level: Level, msg: impl Display) {
    let prefix = match level {
        Level::Info => level.prefix().green(),
        Level::Warn => level.prefix().yellow(),
        Level::Fatal => level.prefix().red().bold(),
    };
    eprintln!("{} {}", prefix, msg);
}

/// Progress line for a major step (version chosen, URL fetched, skip decision).
pub fn info(msg: impl Display) {
    emit(Level::Info, msg);
}

/// Non-fatal anomaly; the run continues.
pub fn warn(msg: impl Display) {
    emit(Level::Warn, msg);
}

/// Terminal diagnostic. The caller is responsible for exiting afterwards.
pub fn fatal(msg: impl Display) {
    emit(Level::Fatal, msg);
}
