//! Admission service implementation.

use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::{debug, info, instrument, warn};

use super::proto::tollgate::v1::{
    admission_server::Admission, check_response::Code, CheckRequest, CheckResponse,
};

use crate::client::ClientIdentifier;
use crate::ratelimit::{AdmissionBackend, LimitPolicy, RouteTable};
use crate::response::rejection_body;

/// Implementation of the `tollgate.v1.Admission` gRPC interface.
pub struct AdmissionServiceImpl<B: AdmissionBackend> {
    /// The admission backend
    backend: Arc<B>,
    /// Used when a request names a route instead of a policy
    routes: RouteTable,
}

impl<B: AdmissionBackend> AdmissionServiceImpl<B> {
    pub fn new(backend: Arc<B>, routes: RouteTable) -> Self {
        Self { backend, routes }
    }

    /// Work out which policy applies, or `None` if the route is exempt.
    fn resolve_policy(&self, req: &CheckRequest) -> Result<Option<LimitPolicy>, Status> {
        if !req.policy.is_empty() {
            return req.policy.parse::<LimitPolicy>().map(Some).map_err(|e| {
                warn!(policy = %req.policy, "Received check with unknown policy");
                Status::invalid_argument(e.to_string())
            });
        }

        if req.path.is_empty() {
            warn!("Received check with neither policy nor path");
            return Err(Status::invalid_argument("policy or path is required"));
        }

        Ok(self.routes.classify(&req.method, &req.path))
    }
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

#[tonic::async_trait]
impl<B: AdmissionBackend + 'static> Admission for AdmissionServiceImpl<B> {
    /// Decide whether the described request may proceed.
    #[instrument(
        skip(self, request),
        fields(
            policy = %request.get_ref().policy,
            method = %request.get_ref().method,
            path = %request.get_ref().path
        )
    )]
    async fn check(
        &self,
        request: Request<CheckRequest>,
    ) -> Result<Response<CheckResponse>, Status> {
        let req = request.into_inner();

        let client = ClientIdentifier::resolve(
            non_empty(&req.forwarded_for),
            non_empty(&req.remote_address),
        );

        let Some(policy) = self.resolve_policy(&req)? else {
            debug!(client = %client, "Route exempt from rate limiting");
            return Ok(Response::new(CheckResponse {
                code: Code::Exempt.into(),
                client: client.to_string(),
                ..Default::default()
            }));
        };

        let decision = self.backend.admit(policy, &client).await;

        let (code, http_status, body) = if decision.admitted {
            (Code::Ok, 0, String::new())
        } else {
            (Code::OverLimit, 429, rejection_body())
        };

        info!(
            client = %client,
            policy = %policy,
            code = ?code,
            remaining = decision.remaining,
            "Admission decision made"
        );

        Ok(Response::new(CheckResponse {
            code: code.into(),
            client: client.to_string(),
            policy: policy.to_string(),
            limit: decision.limit,
            remaining: decision.remaining,
            reset_after: Some(prost_types::Duration {
                seconds: decision.reset_after.as_secs() as i64,
                nanos: decision.reset_after.subsec_nanos() as i32,
            }),
            http_status,
            body,
        }))
    }
}
