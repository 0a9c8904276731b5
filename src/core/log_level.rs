//! Log level definitions

use super::error::{LoggerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    #[default]
    Information = 2,
    Warning = 3,
    Error = 4,
    Critical = 5,
    /// Disables logging; never rendered
    None = 6,
}

impl LogLevel {
    pub fn to_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "Trace",
            LogLevel::Debug => "Debug",
            LogLevel::Information => "Information",
            LogLevel::Warning => "Warning",
            LogLevel::Error => "Error",
            LogLevel::Critical => "Critical",
            LogLevel::None => "None",
        }
    }

    /// Four-letter code used by the simple formatter.
    ///
    /// `LogLevel::None` has no code; asking for one is a usage error.
    pub fn short_code(&self) -> Result<&'static str> {
        match self {
            LogLevel::Trace => Ok("TRCE"),
            LogLevel::Debug => Ok("DBUG"),
            LogLevel::Information => Ok("INFO"),
            LogLevel::Warning => Ok("WARN"),
            LogLevel::Error => Ok("EROR"),
            LogLevel::Critical => Ok("CRIT"),
            LogLevel::None => Err(LoggerError::invalid_level(self)),
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        *self != LogLevel::None
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "TRACE" | "TRCE" => Ok(LogLevel::Trace),
            "DEBUG" | "DBUG" => Ok(LogLevel::Debug),
            "INFORMATION" | "INFO" => Ok(LogLevel::Information),
            "WARNING" | "WARN" => Ok(LogLevel::Warning),
            "ERROR" | "EROR" => Ok(LogLevel::Error),
            "CRITICAL" | "CRIT" | "FATAL" => Ok(LogLevel::Critical),
            "NONE" => Ok(LogLevel::None),
            _ => Err(format!("Invalid log level: '{}'", s)),
        }
    }
}
