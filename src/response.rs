//! HTTP responses for rejected requests.

use http::header::{CONTENT_TYPE, RETRY_AFTER};
use http::{HeaderValue, Response, StatusCode};

use crate::ratelimit::Decision;

/// Message returned to clients that ran out of quota.
pub const TOO_MANY_REQUESTS_MESSAGE: &str = "Too many requests. Please try again later.";

/// What a route handler gets back from a rate limit check.
///
/// `Ok(())` means proceed. `Err` carries the response the handler must
/// return without running its own logic.
pub type AdmissionResult = Result<(), Response<String>>;

/// JSON body of a 429 response.
pub fn rejection_body() -> String {
    serde_json::json!({ "error": TOO_MANY_REQUESTS_MESSAGE }).to_string()
}

/// Build the 429 response for a rejected decision.
pub fn too_many_requests(decision: &Decision) -> Response<String> {
    let mut response = Response::new(rejection_body());
    *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;

    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(RETRY_AFTER, HeaderValue::from(retry_after_secs(decision)));

    response
}

/// Whole seconds until the window resets, never less than one.
fn retry_after_secs(decision: &Decision) -> u64 {
    let reset = decision.reset_after;
    let secs = reset.as_secs() + u64::from(reset.subsec_nanos() > 0);
    secs.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::LimitPolicy;
    use std::time::Duration;

    fn rejected(reset_after: Duration) -> Decision {
        Decision {
            policy: LimitPolicy::Strict,
            admitted: false,
            limit: 5,
            remaining: 0,
            reset_after,
        }
    }

    #[test]
    fn test_body_is_exact_json() {
        assert_eq!(
            rejection_body(),
            r#"{"error":"Too many requests. Please try again later."}"#
        );
    }

    #[test]
    fn test_response_shape() {
        let response = too_many_requests(&rejected(Duration::from_secs(42)));

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(response.headers()[RETRY_AFTER], "42");

        let body: serde_json::Value = serde_json::from_str(response.body()).unwrap();
        assert_eq!(body["error"], TOO_MANY_REQUESTS_MESSAGE);
    }

    #[test]
    fn test_retry_after_rounds_up() {
        let response = too_many_requests(&rejected(Duration::from_millis(1500)));
        assert_eq!(response.headers()[RETRY_AFTER], "2");

        let response = too_many_requests(&rejected(Duration::ZERO));
        assert_eq!(response.headers()[RETRY_AFTER], "1");
    }
}
