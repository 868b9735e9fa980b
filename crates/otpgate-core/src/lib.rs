//! Shared plumbing for otpgate services: tracing setup, HTTP middleware,
//! health probes, the common error envelope and serde helpers.

pub mod error;
pub mod health;
pub mod middleware;
pub mod serde;
pub mod tracing;
