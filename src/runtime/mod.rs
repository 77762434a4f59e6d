//! Runtime wiring for hosts and tests.
//!
//! - [`Provider`] - selects a [`Controller`](reconcile_framework::Controller) by
//!   resource type name and answers the agent pool lookup
//! - [`Sandbox`] - a provider over the in-memory fake API, with shutdown
//! - [`setup_tracing`] - installs the log subscriber

pub mod provider;
pub mod sandbox;

pub use provider::{Provider, AGENT_POOL_KIND};
pub use reconcile_framework::tracing::setup_tracing;
pub use sandbox::Sandbox;
