use std::{fmt, str::FromStr};

use log::{Level, LevelFilter, Record};
use serde::{Deserialize, Serialize};

use crate::error::Error;

pub const DEBUG: &str = "debug";
pub const INFO: &str = "info";
pub const WARNING: &str = "warning";
pub const ERROR: &str = "error";
pub const FATAL: &str = "fatal";

/// Record target marking a fatal entry. The engine has no fatal level, so
/// fatal records travel at `Level::Error` under this target.
pub const FATAL_TARGET: &str = "logs_plus::fatal";
pub(crate) const DEFAULT_TARGET: &str = "logs_plus";

/// Exit status used after a fatal record has been written.
pub const FATAL_EXIT_CODE: i32 = 3;

/// Ordered log importance: debug < info < warning < error < fatal.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Debug,
    Info,
    #[serde(rename = "warning", alias = "warn")]
    Warn,
    Error,
    Fatal,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Debug,
        Severity::Info,
        Severity::Warn,
        Severity::Error,
        Severity::Fatal,
    ];

    pub fn as_str(self) -> &'static str {
        encode_level(self)
    }

    /// Error and fatal records carry a backtrace.
    pub fn captures_backtrace(self) -> bool {
        self >= Severity::Error
    }

    pub(crate) fn engine_level(self) -> Level {
        match self {
            Severity::Debug => Level::Debug,
            Severity::Info => Level::Info,
            Severity::Warn => Level::Warn,
            Severity::Error | Severity::Fatal => Level::Error,
        }
    }

    pub(crate) fn engine_filter(self) -> LevelFilter {
        self.engine_level().to_level_filter()
    }

    pub(crate) fn target(self) -> &'static str {
        match self {
            Severity::Fatal => FATAL_TARGET,
            _ => DEFAULT_TARGET,
        }
    }

    /// Recover the severity of a record built by a `LoggerHandle`.
    pub fn from_record(record: &Record<'_>) -> Self {
        match record.level() {
            Level::Error if record.target() == FATAL_TARGET => Severity::Fatal,
            Level::Error => Severity::Error,
            Level::Warn => Severity::Warn,
            Level::Info => Severity::Info,
            Level::Debug | Level::Trace => Severity::Debug,
        }
    }
}

/// Serialized form of a severity. The engine's warn level is spelled
/// `warning` on the wire.
pub fn encode_level(severity: Severity) -> &'static str {
    match severity {
        Severity::Debug => DEBUG,
        Severity::Info => INFO,
        Severity::Warn => WARNING,
        Severity::Error => ERROR,
        Severity::Fatal => FATAL,
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            DEBUG => Ok(Severity::Debug),
            INFO => Ok(Severity::Info),
            "warn" | WARNING => Ok(Severity::Warn),
            ERROR => Ok(Severity::Error),
            FATAL => Ok(Severity::Fatal),
            _ => Err(Error::InvalidSeverity(s.to_string())),
        }
    }
}
