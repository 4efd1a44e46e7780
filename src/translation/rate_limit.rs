/*!
 * Client-side request budget.
 *
 * A `RateLimit` is parsed from strings such as `"10/s"`, `"60/m"` or `"1000/h"`.
 * `SlidingWindow` keeps the timestamps of the requests issued during the last
 * interval and makes the caller sleep until a slot frees up. Time comes from
 * tokio's clock, so tests can pause and advance it.
 */

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Result};
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::time::Instant;

static RATE_LIMIT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d+)\s*/\s*([smh])\s*$").expect("rate limit pattern is valid")
});

/// Maximum number of requests per interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    /// Requests allowed inside one interval
    pub max_requests: usize,
    /// Length of the interval
    pub interval: Duration,
}

impl RateLimit {
    pub fn new(max_requests: usize, interval: Duration) -> Self {
        Self { max_requests, interval }
    }
}

impl FromStr for RateLimit {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let captures = RATE_LIMIT_REGEX
            .captures(s)
            .ok_or_else(|| anyhow!("expected '<count>/<s|m|h>', got '{}'", s))?;

        let max_requests: usize = captures[1].parse()?;
        if max_requests == 0 {
            return Err(anyhow!("request count must be positive"));
        }

        let interval = match &captures[2] {
            "s" => Duration::from_secs(1),
            "m" => Duration::from_secs(60),
            "h" => Duration::from_secs(3600),
            unit => return Err(anyhow!("unsupported rate limit unit '{}'", unit)),
        };

        Ok(Self { max_requests, interval })
    }
}

impl fmt::Display for RateLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self.interval.as_secs() {
            1 => "s",
            60 => "m",
            3600 => "h",
            _ => return write!(f, "{}/{:?}", self.max_requests, self.interval),
        };
        write!(f, "{}/{}", self.max_requests, unit)
    }
}

/// Sliding window of request timestamps
#[derive(Debug)]
pub struct SlidingWindow {
    limit: Option<RateLimit>,
    history: VecDeque<Instant>,
}

impl SlidingWindow {
    /// Create a window enforcing `limit`; `None` never waits
    pub fn new(limit: Option<RateLimit>) -> Self {
        Self {
            limit,
            history: VecDeque::new(),
        }
    }

    /// Window without any budget
    pub fn unlimited() -> Self {
        Self::new(None)
    }

    pub fn limit(&self) -> Option<RateLimit> {
        self.limit
    }

    /// Requests currently counted against the budget
    pub fn in_flight(&self) -> usize {
        self.history.len()
    }

    fn prune(&mut self, now: Instant, interval: Duration) {
        while let Some(oldest) = self.history.front() {
            if now.duration_since(*oldest) >= interval {
                self.history.pop_front();
            } else {
                break;
            }
        }
    }

    /// How long a request issued at `now` would have to wait
    pub fn wait_time(&mut self, now: Instant) -> Option<Duration> {
        let limit = self.limit?;
        self.prune(now, limit.interval);
        if self.history.len() < limit.max_requests {
            return None;
        }
        self.history
            .front()
            .map(|oldest| limit.interval.saturating_sub(now.duration_since(*oldest)))
    }

    /// Wait for a free slot, then record a request at the current instant
    pub async fn acquire(&mut self) {
        let Some(limit) = self.limit else {
            return;
        };

        if let Some(wait) = self.wait_time(Instant::now()) {
            info!(target: "transmem::rate_limit",
                "Rate limit {} reached, sleeping for {:.3}s", limit, wait.as_secs_f64());
            tokio::time::sleep(wait).await;
            self.prune(Instant::now(), limit.interval);
        }

        self.history.push_back(Instant::now());
        debug!(target: "transmem::rate_limit",
            "Request slot taken ({}/{})", self.history.len(), limit.max_requests);
    }
}
