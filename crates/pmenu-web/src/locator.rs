#![forbid(unsafe_code)]

//! Polling element discovery with a bounded window.
//!
//! A [`Discovery`] is a plain state machine: the runtime calls
//! [`Discovery::poll`] whenever [`Discovery::next_poll_at`] has passed and
//! acts on the returned [`LocateStep`]. Dropping the discovery cancels it.

use core::time::Duration;

use crate::HOST_CONTAINER_ID;
use crate::document::HostDocument;

const DEFAULT_POLL_INTERVAL_MS: u64 = 50;
const DEFAULT_TIMEOUT_MS: u64 = 5_000;
const MIN_POLL_INTERVAL_MS: u64 = 1;

/// Discovery timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatorConfig {
    /// Gap between two selector queries.
    /// Default: 50ms.
    pub poll_interval: Duration,

    /// Window after which discovery gives up.
    /// Default: 5000ms.
    pub timeout: Duration,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

impl LocatorConfig {
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Clamp values to a usable range.
    ///
    /// - `poll_interval` is at least 1ms
    /// - `timeout` is at least one `poll_interval`
    #[must_use]
    pub fn validated(mut self) -> Self {
        self.poll_interval = self
            .poll_interval
            .max(Duration::from_millis(MIN_POLL_INTERVAL_MS));
        self.timeout = self.timeout.max(self.poll_interval);
        self
    }

    /// Queries issued before giving up: `timeout / poll_interval`.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        let config = self.validated();
        let attempts = config.timeout.as_nanos() / config.poll_interval.as_nanos();
        u32::try_from(attempts).unwrap_or(u32::MAX).max(1)
    }
}

/// Result of one discovery tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocateStep<N> {
    /// The (possibly ascended) attach target.
    Found(N),
    /// Nothing yet; poll again after `retry_in`.
    Pending { retry_in: Duration },
    /// The window elapsed without a match.
    TimedOut { attempts: u32 },
    /// Another mount already owns the host container id.
    AlreadyMounted,
}

/// In-flight search for an attach target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    selector: String,
    ancestor_steps: u32,
    config: LocatorConfig,
    attempts: u32,
    next_poll_at: Duration,
}

impl Discovery {
    /// Start a discovery whose first poll is due at `now`.
    #[must_use]
    pub fn new(
        selector: impl Into<String>,
        ancestor_steps: u32,
        config: LocatorConfig,
        now: Duration,
    ) -> Self {
        Self {
            selector: selector.into(),
            ancestor_steps,
            config: config.validated(),
            attempts: 0,
            next_poll_at: now,
        }
    }

    #[must_use]
    pub fn selector(&self) -> &str {
        &self.selector
    }

    #[must_use]
    pub const fn ancestor_steps(&self) -> u32 {
        self.ancestor_steps
    }

    /// Selector queries issued so far.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub const fn next_poll_at(&self) -> Duration {
        self.next_poll_at
    }

    #[must_use]
    pub fn is_due(&self, now: Duration) -> bool {
        now >= self.next_poll_at
    }

    /// Run one tick at `now`.
    ///
    /// The mount guard is checked before anything else. Once
    /// `max_attempts` queries came back empty, the following tick reports
    /// [`LocateStep::TimedOut`] without querying again.
    pub fn poll<D: HostDocument>(&mut self, doc: &D, now: Duration) -> LocateStep<D::Node> {
        if doc.element_by_id(HOST_CONTAINER_ID).is_some() {
            return LocateStep::AlreadyMounted;
        }
        if self.attempts >= self.config.max_attempts() {
            return LocateStep::TimedOut {
                attempts: self.attempts,
            };
        }

        self.attempts += 1;
        let found = match doc.query_selector(&self.selector) {
            Ok(found) => found,
            Err(err) => {
                tracing::debug!(selector = %self.selector, %err, "selector rejected, treating as not found");
                None
            }
        };
        match found {
            Some(node) => LocateStep::Found(ascend(doc, node, self.ancestor_steps)),
            None => {
                let retry_in = self.config.poll_interval;
                self.next_poll_at = now.saturating_add(retry_in);
                tracing::debug!(
                    selector = %self.selector,
                    attempt = self.attempts,
                    "attach target not found yet"
                );
                LocateStep::Pending { retry_in }
            }
        }
    }
}

/// Walk up to `steps` parent links from `node`, stopping early at the top.
pub fn ascend<D: HostDocument>(doc: &D, node: D::Node, steps: u32) -> D::Node {
    let mut current = node;
    for _ in 0..steps {
        match doc.parent_element(&current) {
            Some(parent) => current = parent,
            None => break,
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDocument;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_window_allows_one_hundred_queries() {
        assert_eq!(LocatorConfig::default().max_attempts(), 100);
    }

    #[test]
    fn validated_clamps_degenerate_timing() {
        let config = LocatorConfig::default()
            .with_poll_interval(Duration::ZERO)
            .with_timeout(Duration::ZERO)
            .validated();
        assert_eq!(config.poll_interval, Duration::from_millis(1));
        assert_eq!(config.timeout, Duration::from_millis(1));
        assert_eq!(config.max_attempts(), 1);
    }

    #[test]
    fn found_target_is_returned_on_first_poll() {
        let mut doc = MemoryDocument::new("example.com");
        let body = doc.body();
        let logo = doc.element(body, "div", &[("id", "logo")]);
        let mut discovery = Discovery::new("#logo", 0, LocatorConfig::default(), Duration::ZERO);
        assert_eq!(discovery.poll(&doc, Duration::ZERO), LocateStep::Found(logo));
        assert_eq!(discovery.attempts(), 1);
    }

    #[test]
    fn ascent_stops_at_the_top_without_error() {
        let mut doc = MemoryDocument::new("example.com");
        let html = doc.document_element();
        let target = doc.element(html, "aside", &[]);
        assert_eq!(ascend(&doc, target, 2), html);
        assert_eq!(ascend(&doc, target, 0), target);
    }

    #[test]
    fn existing_host_container_aborts_discovery() {
        let mut doc = MemoryDocument::new("example.com");
        let body = doc.body();
        doc.element(body, "div", &[("id", HOST_CONTAINER_ID)]);
        let mut discovery = Discovery::new("#logo", 0, LocatorConfig::default(), Duration::ZERO);
        assert_eq!(discovery.poll(&doc, Duration::ZERO), LocateStep::AlreadyMounted);
        assert_eq!(doc.query_count(), 0);
    }

    #[test]
    fn invalid_selector_keeps_polling_until_timeout() {
        let doc = MemoryDocument::new("example.com");
        let config = LocatorConfig::default()
            .with_poll_interval(Duration::from_millis(10))
            .with_timeout(Duration::from_millis(30));
        let mut discovery = Discovery::new("div >", 0, config, Duration::ZERO);
        let mut now = Duration::ZERO;
        for _ in 0..3 {
            assert_eq!(
                discovery.poll(&doc, now),
                LocateStep::Pending {
                    retry_in: Duration::from_millis(10)
                }
            );
            now = discovery.next_poll_at();
        }
        assert_eq!(now, Duration::from_millis(30));
        assert_eq!(discovery.poll(&doc, now), LocateStep::TimedOut { attempts: 3 });
    }
}
