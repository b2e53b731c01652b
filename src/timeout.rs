//! Wall-clock limits for simulator runs
//!
//! The limit comes from the workload's `testing.runTimeout` when it sets one,
//! otherwise from the `run-timeout` setting. Zero means no limit. The
//! enforcer only reports expiry; killing the simulator is the caller's job.

use std::time::{Duration, Instant};

/// Timeout check result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutStatus {
    Ok,
    Expired,
}

impl TimeoutStatus {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TimeoutStatus::Expired)
    }
}

/// Pick the effective limit in seconds: the workload's own value wins.
pub fn effective_limit(workload_seconds: Option<u64>, default_seconds: u64) -> Option<Duration> {
    match workload_seconds.filter(|s| *s > 0) {
        Some(seconds) => Some(Duration::from_secs(seconds)),
        None if default_seconds > 0 => Some(Duration::from_secs(default_seconds)),
        None => None,
    }
}

/// Tracks elapsed time of one simulator run.
#[derive(Debug)]
pub struct TimeoutEnforcer {
    limit: Option<Duration>,
    start_time: Instant,
}

impl TimeoutEnforcer {
    pub fn new(limit: Option<Duration>) -> Self {
        Self {
            limit,
            start_time: Instant::now(),
        }
    }

    /// Create an enforcer with a custom start time (for testing)
    #[cfg(test)]
    pub(crate) fn with_start_time(limit: Option<Duration>, start_time: Instant) -> Self {
        Self { limit, start_time }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn limit(&self) -> Option<Duration> {
        self.limit
    }

    pub fn check(&self) -> TimeoutStatus {
        match self.limit {
            Some(limit) if self.elapsed() >= limit => TimeoutStatus::Expired,
            _ => TimeoutStatus::Ok,
        }
    }

    /// Time until the limit, if any.
    pub fn remaining(&self) -> Option<Duration> {
        self.limit.map(|limit| limit.saturating_sub(self.elapsed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_limit_precedence() {
        assert_eq!(effective_limit(Some(30), 600), Some(Duration::from_secs(30)));
        assert_eq!(effective_limit(Some(0), 600), Some(Duration::from_secs(600)));
        assert_eq!(effective_limit(None, 600), Some(Duration::from_secs(600)));
        assert_eq!(effective_limit(None, 0), None);
    }

    #[test]
    fn test_no_limit_never_expires() {
        let enforcer = TimeoutEnforcer::new(None);
        assert_eq!(enforcer.check(), TimeoutStatus::Ok);
        assert!(enforcer.remaining().is_none());
    }

    #[test]
    fn test_expired() {
        let start = Instant::now() - Duration::from_secs(11);
        let enforcer = TimeoutEnforcer::with_start_time(Some(Duration::from_secs(10)), start);

        assert!(enforcer.check().is_timeout());
        assert_eq!(enforcer.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn test_not_yet_expired() {
        let enforcer = TimeoutEnforcer::new(Some(Duration::from_secs(3600)));
        assert_eq!(enforcer.check(), TimeoutStatus::Ok);
        assert!(enforcer.remaining().unwrap() > Duration::from_secs(3500));
    }
}
