//! Core rate limiter implementation.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::client::ClientIdentifier;
use crate::response::{too_many_requests, AdmissionResult};

use super::clock::{Clock, SystemClock};
use super::counter::{ConsumptionRecord, Decision};
use super::key::ConsumptionKey;
use super::policy::{LimitPolicy, PolicySet};

/// The in-memory store of consumption records.
///
/// Each check holds the record's shard lock for the whole
/// read-modify-write, so concurrent requests from one client can never be
/// admitted past the policy's points. State is process-local and is lost
/// on restart.
pub struct RateLimiter<C: Clock = SystemClock> {
    /// Consumption records indexed by (policy, client)
    records: DashMap<ConsumptionKey, ConsumptionRecord>,
    /// Limits for each policy
    policies: RwLock<PolicySet>,
    clock: C,
}

impl RateLimiter<SystemClock> {
    /// Create a rate limiter with the default `strict` and `general` limits.
    pub fn new() -> Self {
        Self::with_policies(PolicySet::default())
    }

    pub fn with_policies(policies: PolicySet) -> Self {
        Self::with_clock(policies, SystemClock)
    }
}

impl<C: Clock> RateLimiter<C> {
    /// Create a rate limiter reading time from `clock`.
    pub fn with_clock(policies: PolicySet, clock: C) -> Self {
        Self {
            records: DashMap::new(),
            policies: RwLock::new(policies),
            clock,
        }
    }

    /// Consume one point for `client` under `policy`.
    pub fn check(&self, policy: LimitPolicy, client: &ClientIdentifier) -> Decision {
        let limits = self.policies.read().limits(policy);
        let now = self.clock.now();

        trace!(policy = %policy, client = %client, "Checking rate limit");

        let decision = match self.records.entry(ConsumptionKey::new(policy, client)) {
            Entry::Occupied(mut entry) => {
                let record = entry.get_mut();
                if record.is_expired(now) {
                    debug!(policy = %policy, client = %client, "Starting new window");
                }
                let admitted = record.consume(now, limits);
                record.decision(policy, admitted, now, limits)
            }
            Entry::Vacant(entry) => {
                debug!(
                    policy = %policy,
                    client = %client,
                    points = limits.points,
                    duration_secs = limits.duration_secs,
                    "Creating consumption record"
                );
                let record = entry.insert(ConsumptionRecord::first(now, limits));
                record.decision(policy, true, now, limits)
            }
        };

        if !decision.admitted {
            debug!(
                policy = %policy,
                client = %client,
                reset_after_ms = decision.reset_after.as_millis() as u64,
                "Rate limit exceeded"
            );
        }

        decision
    }

    /// Check and, on rejection, build the response the caller must return.
    pub fn check_rate_limit(&self, policy: LimitPolicy, client: &ClientIdentifier) -> AdmissionResult {
        let decision = self.check(policy, client);
        if decision.admitted {
            Ok(())
        } else {
            Err(too_many_requests(&decision))
        }
    }

    /// Points `client` has consumed in its current `policy` window.
    ///
    /// Returns `None` if no record exists.
    pub fn consumed(&self, policy: LimitPolicy, client: &ClientIdentifier) -> Option<u32> {
        let now = self.clock.now();
        self.records
            .get(&ConsumptionKey::new(policy, client))
            .map(|record| if record.is_expired(now) { 0 } else { record.count() })
    }

    /// Drop every record whose window has ended. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0;
        self.records.retain(|_, record| {
            let keep = !record.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Replace the limits. Existing windows keep their end time and are
    /// judged against the new points from the next request on.
    pub fn set_policies(&self, policies: PolicySet) {
        *self.policies.write() = policies;
    }

    pub fn policies(&self) -> PolicySet {
        *self.policies.read()
    }

    /// Clear all records.
    pub fn clear(&self) {
        self.records.clear();
    }

    /// Get the number of live records.
    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}

impl Default for RateLimiter<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}
