//! Request-level admission checks for in-process route handlers.
//!
//! ```ignore
//! if let Err(response) = guard.check_rate_limit(LimitPolicy::Strict, req.headers(), peer).await {
//!     return response;
//! }
//! ```

use http::{HeaderMap, Request};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::trace;

use crate::client::ClientIdentifier;
use crate::ratelimit::{AdmissionBackend, LimitPolicy, RouteTable};
use crate::response::{too_many_requests, AdmissionResult};

/// Resolves the client from a request and charges it against a policy.
pub struct RateLimitGuard<B: AdmissionBackend> {
    backend: Arc<B>,
    routes: RouteTable,
}

impl<B: AdmissionBackend> RateLimitGuard<B> {
    pub fn new(backend: Arc<B>, routes: RouteTable) -> Self {
        Self { backend, routes }
    }

    /// Charge the request's client one point under `policy`.
    pub async fn check_rate_limit(
        &self,
        policy: LimitPolicy,
        headers: &HeaderMap,
        remote_addr: Option<SocketAddr>,
    ) -> AdmissionResult {
        let client = ClientIdentifier::from_headers(headers, remote_addr);
        let decision = self.backend.admit(policy, &client).await;

        if decision.admitted {
            Ok(())
        } else {
            Err(too_many_requests(&decision))
        }
    }

    /// Classify the request by route and check it. Exempt routes always pass.
    pub async fn check_request<T>(
        &self,
        request: &Request<T>,
        remote_addr: Option<SocketAddr>,
    ) -> AdmissionResult {
        let method = request.method().as_str();
        let path = request.uri().path();

        match self.routes.classify(method, path) {
            Some(policy) => {
                self.check_rate_limit(policy, request.headers(), remote_addr)
                    .await
            }
            None => {
                trace!(method, path, "Route exempt from rate limiting");
                Ok(())
            }
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{FORWARDED_FOR, UNKNOWN_CLIENT};
    use crate::ratelimit::{ManualClock, PolicySet, RateLimiter};
    use http::{HeaderValue, Method, StatusCode};

    fn guard() -> (RateLimitGuard<RateLimiter<ManualClock>>, Arc<RateLimiter<ManualClock>>) {
        let limiter = Arc::new(RateLimiter::with_clock(PolicySet::default(), ManualClock::new()));
        (RateLimitGuard::new(Arc::clone(&limiter), RouteTable::default()), limiter)
    }

    fn post(path: &str, forwarded_for: Option<&'static str>) -> Request<()> {
        let mut request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .body(())
            .unwrap();
        if let Some(value) = forwarded_for {
            request
                .headers_mut()
                .insert(FORWARDED_FOR, HeaderValue::from_static(value));
        }
        request
    }

    #[tokio::test]
    async fn test_contact_form_is_strict() {
        let (guard, _) = guard();
        let request = post("/api/contact", Some("198.51.100.4"));

        for _ in 0..5 {
            assert!(guard.check_request(&request, None).await.is_ok());
        }

        let response = guard.check_request(&request, None).await.unwrap_err();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_form_quota_shared_across_strict_routes() {
        let (guard, _) = guard();
        let peer: SocketAddr = "192.0.2.8:40000".parse().unwrap();

        for path in ["/api/contact", "/api/trip-requests", "/api/upload", "/api/contact", "/api/upload"] {
            assert!(guard.check_request(&post(path, None), Some(peer)).await.is_ok());
        }
        assert!(guard
            .check_request(&post("/api/trip-requests", None), Some(peer))
            .await
            .is_err());

        // Listing circuits uses the general quota.
        let read = Request::get("/api/circuits").body(()).unwrap();
        assert!(guard.check_request(&read, Some(peer)).await.is_ok());
    }

    #[tokio::test]
    async fn test_exempt_route_consumes_nothing() {
        let (guard, limiter) = guard();
        let request = Request::get("/uploads/cover.jpg").body(()).unwrap();

        for _ in 0..100 {
            assert!(guard.check_request(&request, None).await.is_ok());
        }
        assert_eq!(limiter.record_count(), 0);
    }

    #[tokio::test]
    async fn test_unresolvable_client_uses_unknown_bucket() {
        let (guard, limiter) = guard();
        let headers = HeaderMap::new();

        for _ in 0..5 {
            assert!(guard
                .check_rate_limit(LimitPolicy::Strict, &headers, None)
                .await
                .is_ok());
        }
        assert!(guard
            .check_rate_limit(LimitPolicy::Strict, &headers, None)
            .await
            .is_err());

        let unknown = ClientIdentifier::new(UNKNOWN_CLIENT);
        assert_eq!(limiter.consumed(LimitPolicy::Strict, &unknown), Some(5));
    }

    #[tokio::test]
    async fn test_general_end_to_end() {
        let (guard, _) = guard();
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR, HeaderValue::from_static("203.0.113.5"));

        for _ in 0..60 {
            assert!(guard
                .check_rate_limit(LimitPolicy::General, &headers, None)
                .await
                .is_ok());
        }

        let response = guard
            .check_rate_limit(LimitPolicy::General, &headers, None)
            .await
            .unwrap_err();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.body(),
            r#"{"error":"Too many requests. Please try again later."}"#
        );
    }
}
