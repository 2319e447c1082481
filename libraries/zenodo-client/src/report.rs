//! Warning side effects.
//!
//! Defaulted values, destructive overwrites and deletions are reported as
//! [`Notice`]s through a [`Reporter`] owned by the client. They never
//! interrupt control flow.

use std::fmt;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::warn;

/// A non-fatal event worth telling the user about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// No credential file existed, so a placeholder one was written.
    ConfigCreated { path: PathBuf },
    /// An optional argument was missing and a default was used.
    DefaultApplied { field: &'static str, value: String },
    /// An existing token was replaced.
    TokenOverwritten { section: String, key: String },
    /// An existing record field was replaced.
    FieldReplaced { field: &'static str },
    /// A remote resource was deleted.
    Deleted { url: String },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::ConfigCreated { path } => write!(
                f,
                "Created config file {} with a placeholder token; edit it before use",
                path.display()
            ),
            Notice::DefaultApplied { field, value } => {
                write!(f, "'{field}' not given, using '{value}'")
            }
            Notice::TokenOverwritten { section, key } => {
                write!(f, "Rewriting the existing token ({key}) in section [{section}]")
            }
            Notice::FieldReplaced { field } => {
                write!(f, "Replacing the existing '{field}' of the record")
            }
            Notice::Deleted { url } => write!(f, "Deleted the resource at {url}"),
        }
    }
}

/// Sink for [`Notice`]s.
pub trait Reporter: Send + Sync {
    fn notice(&self, notice: Notice);
}

/// Emits every notice as a `tracing` warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn notice(&self, notice: Notice) {
        warn!(notice = ?notice, "{}", notice);
    }
}

/// Keeps notices in memory so callers can inspect them.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    notices: Mutex<Vec<Notice>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything reported so far.
    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.notices.lock() {
            guard.clear();
        }
    }
}

impl Reporter for MemoryReporter {
    fn notice(&self, notice: Notice) {
        if let Ok(mut guard) = self.notices.lock() {
            guard.push(notice);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_reporter_records_in_order() {
        let reporter = MemoryReporter::new();
        reporter.notice(Notice::DefaultApplied {
            field: "sort",
            value: "bestmatch".into(),
        });
        reporter.notice(Notice::Deleted {
            url: "https://zenodo.org/api/deposit/depositions/1".into(),
        });

        let notices = reporter.notices();
        assert_eq!(notices.len(), 2);
        assert!(matches!(notices[0], Notice::DefaultApplied { field: "sort", .. }));

        reporter.clear();
        assert!(reporter.notices().is_empty());
    }

    #[test]
    fn test_notice_display() {
        let notice = Notice::TokenOverwritten {
            section: "ZENODO".into(),
            key: "token".into(),
        };
        assert_eq!(
            notice.to_string(),
            "Rewriting the existing token (token) in section [ZENODO]"
        );
    }
}
