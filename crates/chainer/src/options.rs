// ABOUTME: Configuration options for the chainer engine including Options and ChainerBuilder.
// ABOUTME: ChainerBuilder provides a fluent API for constructing Chainer instances with custom settings.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::chain::Chainer;
use crate::error::ChainError;

/// Browser User-Agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/59.0.3071.115 Safari/537.36";

/// Engine-wide settings, fixed for the lifetime of a Chainer.
#[derive(Debug, Clone)]
pub struct Options {
    pub timeout: Duration,
    pub user_agent: String,
    pub http_client: Option<reqwest::Client>,
    pub headers: HashMap<String, String>,
    /// Directory the output document is written to.
    pub out_dir: PathBuf,
    /// Directory for per-page and deferred-notes temporary files.
    pub work_dir: PathBuf,
    /// Stop after this many pages.
    pub page_limit: Option<u64>,
    /// Replaces the profile's inter-request delay.
    pub delay: Option<Duration>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            http_client: None,
            headers: HashMap::new(),
            out_dir: PathBuf::from("."),
            work_dir: std::env::temp_dir(),
            page_limit: None,
            delay: None,
        }
    }
}

/// Builder for constructing Chainer instances with custom configuration.
#[derive(Debug, Clone)]
pub struct ChainerBuilder {
    opts: Options,
}

impl ChainerBuilder {
    /// Create a new ChainerBuilder with default options.
    pub fn new() -> Self {
        Self {
            opts: Options::default(),
        }
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.opts.timeout = timeout;
        self
    }

    /// Set the User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.opts.user_agent = user_agent.into();
        self
    }

    /// Use a custom HTTP client.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.opts.http_client = Some(client);
        self
    }

    /// Add a custom header to all requests.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.opts.headers.insert(key.into(), value.into());
        self
    }

    pub fn out_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.opts.out_dir = dir.into();
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.opts.work_dir = dir.into();
        self
    }

    /// Stop the chain after `pages` pages.
    pub fn page_limit(mut self, pages: u64) -> Self {
        self.opts.page_limit = Some(pages);
        self
    }

    /// Wait `delay` between fetches instead of the profile's delay.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.opts.delay = Some(delay);
        self
    }

    /// Build the Chainer with the configured options.
    pub fn build(self) -> Result<Chainer, ChainError> {
        Chainer::new(self.opts)
    }
}

impl Default for ChainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = Options::default();
        assert_eq!(opts.timeout, Duration::from_secs(30));
        assert!(opts.user_agent.starts_with("Mozilla/5.0"));
        assert_eq!(opts.out_dir, PathBuf::from("."));
        assert!(opts.page_limit.is_none());
        assert!(opts.delay.is_none());
    }

    #[test]
    fn test_builder_sets_fields() {
        let chainer = ChainerBuilder::new()
            .timeout(Duration::from_secs(5))
            .user_agent("agent/1")
            .header("X-Test", "1")
            .out_dir("/tmp/out")
            .work_dir("/tmp/work")
            .page_limit(3)
            .delay(Duration::from_millis(10))
            .build()
            .expect("build");
        let opts = chainer.options();
        assert_eq!(opts.timeout, Duration::from_secs(5));
        assert_eq!(opts.user_agent, "agent/1");
        assert_eq!(opts.headers.get("X-Test").map(String::as_str), Some("1"));
        assert_eq!(opts.out_dir, PathBuf::from("/tmp/out"));
        assert_eq!(opts.work_dir, PathBuf::from("/tmp/work"));
        assert_eq!(opts.page_limit, Some(3));
        assert_eq!(opts.delay, Some(Duration::from_millis(10)));
    }
}
