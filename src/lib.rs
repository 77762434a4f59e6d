//! # TFE Reconcile
//!
//! Resource kinds for a workspace-management API (HCP Terraform / Terraform
//! Enterprise style), reconciled by the generic engine in
//! [`reconcile_framework`].
//!
//! Each kind is a small synchronous driver: it validates declared attributes, builds
//! wire payloads and maps observed records back. The engine's
//! [`Controller`](reconcile_framework::Controller) owns the remote call sequence,
//! drift detection, cancellation and error mapping for all of them.
//!
//! ## Module Tour
//!
//! ### 1. The Kinds
//! - [`policy`] - Sentinel/OPA policies; the policy text is uploaded separately
//! - [`team_members`] - the member set of an existing team, reconciled by add/remove
//! - [`run_task`] - organization run tasks with a write-only HMAC key
//! - [`test_variable`] - environment variables of a registry module's test runs
//!
//! ### 2. The Registry ([`kinds`])
//! [`ResourceKind`] closes the set and implements
//! [`ResourceDriver`](reconcile_framework::ResourceDriver) by delegation.
//!
//! ### 3. The Runtime ([`runtime`])
//! [`Provider`] hands out controllers by type name and looks up agent pools;
//! [`Sandbox`] runs a provider against the in-memory fake API.
//!
//! ## Quick Start
//!
//! ```rust
//! use tfe_reconcile::runtime::Sandbox;
//! use reconcile_framework::{Attributes, CallContext, DesiredRecord};
//!
//! #[tokio::main]
//! async fn main() {
//!     let sandbox = Sandbox::start();
//!     let ctx = CallContext::new();
//!
//!     let tasks = sandbox.provider.controller("tfe_organization_run_task").unwrap();
//!     let desired = DesiredRecord::new(
//!         "tfe_organization_run_task",
//!         Attributes::new()
//!             .with("organization", "acme")
//!             .with("name", "scanner")
//!             .with("url", "https://scanner.example.com/hook"),
//!     );
//!     let (handle, observed) = tasks.create(&desired, &ctx).await.unwrap();
//!     assert_eq!(observed.attributes.get_bool("enabled"), Some(false));
//!     tasks.delete(&handle, &ctx).await.unwrap();
//!
//!     drop(tasks);
//!     sandbox.shutdown().await.unwrap();
//! }
//! ```

pub mod kinds;
pub mod policy;
pub mod run_task;
pub mod runtime;
pub mod team_members;
pub mod test_variable;

pub use kinds::{ResourceKind, UnknownResourceType};
pub use policy::{EnforceMode, PolicyDriver, PolicyError, PolicyKind};
pub use run_task::{RunTaskDriver, RunTaskError};
pub use runtime::{Provider, Sandbox};
pub use team_members::{TeamMembersDriver, TeamMembersError};
pub use test_variable::{TestVariableDriver, TestVariableError};
