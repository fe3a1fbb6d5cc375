//! Tollgate - per-client admission control
//!
//! This crate decides whether a request to the tour-operator web API may
//! proceed. Each client, identified by its forwarded or socket address, has
//! an independent quota under each named policy: `strict` for public form
//! submissions and `general` for everything else under `/api`. A rejected
//! request gets a ready-made 429 response instead of an error.
//!
//! Handlers embed [`guard::RateLimitGuard`] in-process, or call the
//! `tollgate.v1.Admission` gRPC service exposed by the binary.

pub mod client;
pub mod config;
pub mod error;
pub mod grpc;
pub mod guard;
pub mod ratelimit;
pub mod response;
