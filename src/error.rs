use log::{debug, error, warn};
use std::cell::RefCell;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("failed to read document")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Xml(#[from] scenedoc_xml::XmlError),
    #[error("document {0} is not a scene description")]
    NotADocument(PathBuf),
    #[error("no document loader is configured (requested {0})")]
    NoLoader(PathBuf),
    #[error("loader failed for {path}: {reason}")]
    LoaderFailed { path: PathBuf, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorLevel {
    Debug,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The document an external reference points into is not available.
    MissingUriTarget,
    /// The referenced id does not exist in the target document.
    InvalidUri,
    /// The loader could not produce the external document.
    ExternalLoadFailed,
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ErrorCode::MissingUriTarget => "missing uri target",
            ErrorCode::InvalidUri => "invalid uri",
            ErrorCode::ExternalLoadFailed => "external document failed to load",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub level: ErrorLevel,
    pub code: ErrorCode,
    pub message: String,
}

/// Receives the `(level, code)` reports of resolution failures. Reports are logged before they get
/// here, so sinks only need to do whatever else their owner wants.
pub trait ErrorSink {
    fn report(&self, report: &Report);
}

/// Keeps every report, for tooling and tests.
#[derive(Debug, Default)]
pub struct CollectingSink {
    reports: RefCell<Vec<Report>>,
}

impl CollectingSink {
    pub fn reports(&self) -> Vec<Report> {
        self.reports.borrow().clone()
    }

    pub fn count(&self, code: ErrorCode) -> usize {
        self.reports.borrow().iter().filter(|r| r.code == code).count()
    }
}

impl ErrorSink for CollectingSink {
    fn report(&self, report: &Report) {
        self.reports.borrow_mut().push(report.clone());
    }
}

pub(crate) fn log_report(report: &Report) {
    match report.level {
        ErrorLevel::Debug => debug!("{}: {}", report.code, report.message),
        ErrorLevel::Warning => warn!("{}: {}", report.code, report.message),
        ErrorLevel::Error => error!("{}: {}", report.code, report.message),
    }
}
