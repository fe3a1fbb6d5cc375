//! Fixed-window consumption records.

use std::time::{Duration, Instant};

use super::policy::{LimitPolicy, PolicyLimits};

/// Outcome of a single admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Policy the point was charged against
    pub policy: LimitPolicy,
    /// Whether the request may proceed
    pub admitted: bool,
    /// Points allowed per window
    pub limit: u32,
    /// Points left in the current window
    pub remaining: u32,
    /// Time until the current window ends
    pub reset_after: Duration,
}

/// Points consumed by one client under one policy in the current window.
///
/// A record is created by the first request (count 1) and lives until the
/// limiter evicts it. Once `now >= window_end` the next request starts a
/// fresh window instead of being counted against the old one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumptionRecord {
    count: u32,
    window_end: Instant,
}

impl ConsumptionRecord {
    /// Open a window for the first request.
    pub fn first(now: Instant, limits: PolicyLimits) -> Self {
        Self {
            count: 1,
            window_end: now + limits.duration(),
        }
    }

    /// Charge one point and report whether it fit in the window.
    ///
    /// A rejected attempt does not increment the count.
    pub fn consume(&mut self, now: Instant, limits: PolicyLimits) -> bool {
        if self.is_expired(now) {
            self.count = 1;
            self.window_end = now + limits.duration();
            return true;
        }

        if self.count < limits.points {
            self.count += 1;
            true
        } else {
            false
        }
    }

    /// Points consumed in the current window.
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn window_end(&self) -> Instant {
        self.window_end
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.window_end
    }

    /// Points still available, as seen at `now`.
    pub fn remaining(&self, now: Instant, limits: PolicyLimits) -> u32 {
        if self.is_expired(now) {
            limits.points
        } else {
            limits.points.saturating_sub(self.count)
        }
    }

    pub fn duration_until_reset(&self, now: Instant) -> Duration {
        self.window_end.saturating_duration_since(now)
    }

    /// Build the decision for an attempt that has just been applied.
    pub fn decision(
        &self,
        policy: LimitPolicy,
        admitted: bool,
        now: Instant,
        limits: PolicyLimits,
    ) -> Decision {
        Decision {
            policy,
            admitted,
            limit: limits.points,
            remaining: self.remaining(now, limits),
            reset_after: self.duration_until_reset(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: PolicyLimits = PolicyLimits::new(5, 60);

    #[test]
    fn test_first_request_opens_window() {
        let now = Instant::now();
        let record = ConsumptionRecord::first(now, LIMITS);

        assert_eq!(record.count(), 1);
        assert_eq!(record.window_end(), now + Duration::from_secs(60));
        assert_eq!(record.remaining(now, LIMITS), 4);
    }

    #[test]
    fn test_consume_within_limit() {
        let now = Instant::now();
        let mut record = ConsumptionRecord::first(now, LIMITS);

        for _ in 0..4 {
            assert!(record.consume(now, LIMITS));
        }

        assert_eq!(record.count(), 5);
        assert_eq!(record.remaining(now, LIMITS), 0);
    }

    #[test]
    fn test_rejection_does_not_increment() {
        let now = Instant::now();
        let mut record = ConsumptionRecord::first(now, LIMITS);
        for _ in 0..4 {
            record.consume(now, LIMITS);
        }

        assert!(!record.consume(now, LIMITS));
        assert!(!record.consume(now, LIMITS));
        assert_eq!(record.count(), 5);
    }

    #[test]
    fn test_expired_window_resets() {
        let start = Instant::now();
        let mut record = ConsumptionRecord::first(start, LIMITS);
        for _ in 0..4 {
            record.consume(start, LIMITS);
        }

        let later = start + Duration::from_secs(60);
        assert!(record.is_expired(later));
        assert_eq!(record.remaining(later, LIMITS), 5);

        assert!(record.consume(later, LIMITS));
        assert_eq!(record.count(), 1);
        assert_eq!(record.window_end(), later + Duration::from_secs(60));
    }

    #[test]
    fn test_window_does_not_slide_on_admit() {
        let start = Instant::now();
        let mut record = ConsumptionRecord::first(start, LIMITS);

        record.consume(start + Duration::from_secs(59), LIMITS);

        assert_eq!(record.window_end(), start + Duration::from_secs(60));
        assert_eq!(
            record.duration_until_reset(start + Duration::from_secs(59)),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn test_decision_reports_quota() {
        let now = Instant::now();
        let record = ConsumptionRecord::first(now, LIMITS);
        let decision = record.decision(LimitPolicy::Strict, true, now, LIMITS);

        assert!(decision.admitted);
        assert_eq!(decision.limit, 5);
        assert_eq!(decision.remaining, 4);
        assert_eq!(decision.reset_after, Duration::from_secs(60));
    }
}
