//! Admission backend trait.

use async_trait::async_trait;

use super::clock::Clock;
use super::counter::Decision;
use super::limiter::RateLimiter;
use super::policy::LimitPolicy;
use crate::client::ClientIdentifier;

/// Trait for admission backends.
///
/// The gRPC service and the request guard are written against this trait
/// so a shared store can replace the in-process [`RateLimiter`].
#[async_trait]
pub trait AdmissionBackend: Send + Sync {
    /// Consume one point for `client` under `policy`.
    async fn admit(&self, policy: LimitPolicy, client: &ClientIdentifier) -> Decision;
}

#[async_trait]
impl<C: Clock + 'static> AdmissionBackend for RateLimiter<C> {
    async fn admit(&self, policy: LimitPolicy, client: &ClientIdentifier) -> Decision {
        self.check(policy, client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limiter_backend_matches_check() {
        let limiter = RateLimiter::new();
        let client = ClientIdentifier::new("192.0.2.10");

        let decision = tokio_test::block_on(limiter.admit(LimitPolicy::Strict, &client));

        assert!(decision.admitted);
        assert_eq!(decision.remaining, 4);
        assert_eq!(limiter.consumed(LimitPolicy::Strict, &client), Some(1));
    }
}
