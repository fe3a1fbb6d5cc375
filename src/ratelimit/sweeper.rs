//! Background eviction of expired consumption records.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::clock::Clock;
use super::limiter::RateLimiter;

/// Spawn a task that purges expired records every `every`.
///
/// The task runs until the returned handle is aborted.
pub fn spawn_sweeper<C>(limiter: Arc<RateLimiter<C>>, every: Duration) -> JoinHandle<()>
where
    C: Clock + 'static,
{
    info!(interval_secs = every.as_secs(), "Starting record sweeper");

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let removed = limiter.purge_expired();
            if removed > 0 {
                info!(removed, remaining = limiter.record_count(), "Purged expired records");
            } else {
                debug!(remaining = limiter.record_count(), "No expired records");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientIdentifier;
    use crate::ratelimit::{LimitPolicy, ManualClock, PolicySet};

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_evicts_expired_records() {
        let clock = ManualClock::new();
        let limiter = Arc::new(RateLimiter::with_clock(PolicySet::default(), clock.clone()));
        limiter.check(LimitPolicy::Strict, &ClientIdentifier::new("192.0.2.1"));
        limiter.check(LimitPolicy::General, &ClientIdentifier::new("192.0.2.1"));
        clock.advance(Duration::from_secs(60));

        let handle = spawn_sweeper(Arc::clone(&limiter), Duration::from_secs(60));

        // Before the first interval elapses nothing is purged.
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(limiter.record_count(), 2);

        tokio::time::sleep(Duration::from_secs(31)).await;
        handle.abort();

        assert_eq!(limiter.record_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_keeps_live_records() {
        let limiter = Arc::new(RateLimiter::with_clock(PolicySet::default(), ManualClock::new()));
        limiter.check(LimitPolicy::Strict, &ClientIdentifier::new("192.0.2.1"));

        let handle = spawn_sweeper(Arc::clone(&limiter), Duration::from_secs(5));
        tokio::time::sleep(Duration::from_secs(16)).await;
        handle.abort();

        assert_eq!(limiter.record_count(), 1);
    }
}
