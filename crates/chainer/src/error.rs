// ABOUTME: Error types for the chainer engine including ErrorCode enum and ChainError struct.
// ABOUTME: Only fatal conditions are errors; degraded pages and chain termination are not.

use std::fmt;

/// Error codes representing the categories of fatal run failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidUrl,
    Fetch,
    Timeout,
    Status,
    Profile,
    Io,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::InvalidUrl => "invalid URL",
            ErrorCode::Fetch => "fetch error",
            ErrorCode::Timeout => "timeout",
            ErrorCode::Status => "HTTP status error",
            ErrorCode::Profile => "invalid profile",
            ErrorCode::Io => "I/O error",
        };
        write!(f, "{}", s)
    }
}

/// The error type for every fallible engine operation.
///
/// `url` names the page (or the profile id, for configuration errors) the
/// failure is about, `op` the operation that failed.
#[derive(Debug, thiserror::Error)]
pub struct ChainError {
    pub code: ErrorCode,
    pub url: String,
    pub op: String,
    #[source]
    pub source: Option<anyhow::Error>,
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chainer: {} {}: {}", self.op, self.url, self.code)?;
        if let Some(ref src) = self.source {
            write!(f, ": {}", src)?;
        }
        Ok(())
    }
}

impl ChainError {
    fn new(
        code: ErrorCode,
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self {
            code,
            url: url.into(),
            op: op.into(),
            source,
        }
    }

    /// Create an InvalidUrl error.
    pub fn invalid_url(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorCode::InvalidUrl, url, op, source)
    }

    /// Create a Fetch error.
    pub fn fetch(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorCode::Fetch, url, op, source)
    }

    /// Create a Timeout error.
    pub fn timeout(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorCode::Timeout, url, op, source)
    }

    /// Create a Status error for a non-2xx response.
    pub fn status(url: impl Into<String>, op: impl Into<String>, status: u16) -> Self {
        Self::new(
            ErrorCode::Status,
            url,
            op,
            Some(anyhow::anyhow!("server answered with status {}", status)),
        )
    }

    /// Create a Profile error. `id` is the profile identifier.
    pub fn profile(
        id: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorCode::Profile, id, op, source)
    }

    /// Create an Io error. `path` is the file the operation touched.
    pub fn io(path: impl Into<String>, op: impl Into<String>, source: std::io::Error) -> Self {
        Self::new(ErrorCode::Io, path, op, Some(anyhow::Error::new(source)))
    }

    /// Returns true for failures of the transport layer (the fail-fast class).
    pub fn is_transport(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::InvalidUrl | ErrorCode::Fetch | ErrorCode::Timeout | ErrorCode::Status
        )
    }

    /// Returns true if this is a Timeout error.
    pub fn is_timeout(&self) -> bool {
        self.code == ErrorCode::Timeout
    }

    /// Returns true if this is a Profile error.
    pub fn is_profile(&self) -> bool {
        self.code == ErrorCode::Profile
    }

    /// Returns true if this is an Io error.
    pub fn is_io(&self) -> bool {
        self.code == ErrorCode::Io
    }

    /// Message of the underlying cause, or the code description when absent.
    pub fn detail(&self) -> String {
        match self.source {
            Some(ref src) => format!("{:#}", src),
            None => self.code.to_string(),
        }
    }
}
