//! Typed status reported by function results and validation

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity, ordered from harmless to failing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Ok,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Ok => write!(f, "ok"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub severity: Severity,
    pub message: String,
}

impl Status {
    pub fn ok() -> Self {
        Status {
            severity: Severity::Ok,
            message: String::new(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Status {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Status {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Status {
            severity,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.severity == Severity::Ok
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Worst of the given statuses; the first one wins a tie
    pub fn merge<I: IntoIterator<Item = Status>>(statuses: I) -> Status {
        let mut worst = Status::ok();
        for status in statuses {
            if status.severity > worst.severity {
                worst = status;
            }
        }
        worst
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::ok()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.severity)
        } else {
            write!(f, "{}: {}", self.severity, self.message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order() {
        assert!(Severity::Ok < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
    }

    #[test]
    fn test_merge_picks_worst() {
        let merged = Status::merge([
            Status::ok(),
            Status::warning("careful"),
            Status::error("first"),
            Status::error("second"),
        ]);
        assert_eq!(merged, Status::error("first"));
    }

    #[test]
    fn test_merge_empty_is_ok() {
        assert!(Status::merge(Vec::new()).is_ok());
    }

    #[test]
    fn test_display() {
        assert_eq!(Status::ok().to_string(), "ok");
        assert_eq!(Status::warning("w").to_string(), "warning: w");
    }
}
