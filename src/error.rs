use thiserror::Error;
use tracing::warn;

/// Longest slice of a block or sequence rendered into an error message.
const DIAGNOSTIC_LIMIT: usize = 1200;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("invalid config file: {0}")]
    InvalidConfigFile(String),

    #[error("bad settings: {0}")]
    Settings(String),

    #[error("navigation failed for {url}: {reason}")]
    NavigationFailure { url: String, reason: String },

    #[error("data block [{start}, {end}) goes out of bounds of {len} fragments:\n{context}")]
    OutOfBounds {
        start: isize,
        end: isize,
        len: usize,
        context: String,
    },

    #[error("unexpected data: {reason}\n{context}")]
    UnexpectedData { reason: String, context: String },

    #[error("failed to read {what}: {reason}")]
    NonCriticalRead { what: String, reason: String },

    #[error("connection to {url} failed after {attempts} attempts: {reason}")]
    Connectivity {
        url: String,
        attempts: u32,
        reason: String,
    },

    #[error("browser error: {0}")]
    Browser(String),

    #[error("interrupted by operator")]
    Interrupted,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ScrapeError {
    pub fn unexpected(reason: impl Into<String>, fragments: &[String]) -> Self {
        ScrapeError::UnexpectedData {
            reason: reason.into(),
            context: render_fragments(fragments),
        }
    }

    /// Soft failures that strict mode escalates and lenient mode skips.
    pub fn is_data_quality(&self) -> bool {
        matches!(
            self,
            ScrapeError::OutOfBounds { .. } | ScrapeError::UnexpectedData { .. }
        )
    }

    /// Failures that end the whole batch rather than a single target.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScrapeError::Interrupted | ScrapeError::Browser(_))
    }
}

impl From<csv::Error> for ScrapeError {
    fn from(e: csv::Error) -> Self {
        match e.into_kind() {
            csv::ErrorKind::Io(io) => ScrapeError::Io(io),
            other => ScrapeError::Io(std::io::Error::other(format!("{:?}", other))),
        }
    }
}

/// Render fragments one per line with their index, truncated for logs.
pub fn render_fragments(fragments: &[String]) -> String {
    let mut out = String::new();
    for (i, f) in fragments.iter().enumerate() {
        out.push_str(&format!("  [{}] {:?}\n", i, f));
        if out.len() > DIAGNOSTIC_LIMIT {
            out.push_str(&format!("  ... ({} fragments total)\n", fragments.len()));
            break;
        }
    }
    out
}

/// The strict-mode switch. Strict turns data-quality warnings into aborts of
/// the current target; lenient logs them and carries on.
#[derive(Debug, Clone, Copy)]
pub struct DataPolicy {
    pub strict: bool,
}

impl DataPolicy {
    pub fn strict() -> Self {
        DataPolicy { strict: true }
    }

    pub fn lenient() -> Self {
        DataPolicy { strict: false }
    }

    /// Returns `Ok(true)` when the check passed, `Ok(false)` when a soft
    /// failure was tolerated, and the error otherwise.
    pub fn check(&self, result: Result<(), ScrapeError>) -> Result<bool, ScrapeError> {
        match result {
            Ok(()) => Ok(true),
            Err(e) if e.is_data_quality() && !self.strict => {
                warn!("Potential bad data, data_strict off so proceeding: {}", e);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Best-effort read. Any failure is logged; strict mode escalates it to
    /// `UnexpectedData`, lenient mode degrades it to `None`.
    pub fn non_critical<T>(&self, result: Result<T, ScrapeError>) -> Result<Option<T>, ScrapeError> {
        match result {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) if self.strict => Err(ScrapeError::UnexpectedData {
                reason: format!("non-critical read failed with data_strict on: {}", e),
                context: String::new(),
            }),
            Err(e) => {
                warn!("Failed to get value, data_strict off so proceeding: {}", e);
                Ok(None)
            }
        }
    }
}
