//! # Reconcile Framework
//!
//! This crate is the kind-agnostic reconciliation engine behind the workspace-management
//! resources: it turns a declared configuration record into the minimal sequence of REST
//! calls that makes the remote API match, and turns the API's answers back into local
//! state for drift detection.
//!
//! ## Architecture Overview
//!
//! The engine separates concerns into three layers:
//!
//! 1. **Driver Layer** ([`ResourceDriver`]) - per-kind translation between records and wire payloads
//! 2. **Controller Layer** ([`Controller`]) - the shared Create/Read/Update/Delete/Import state machine
//! 3. **Client Layer** ([`ApiClient`]) - the injected REST collaborator
//!
//! You describe a resource kind **once** in a driver; the controller owns the call
//! ordering, drift handling, cancellation and error context for every kind.
//!
//! Underneath sit three pure building blocks:
//!
//! - [`codec`]: fixed-arity `/`-separated import identifiers
//! - [`membership`]: set difference into an add/remove [`MembershipDelta`]
//! - [`pager`]: a lazy, restartable [`Stream`](futures::Stream) over page-numbered lists
//!
//! ## Example
//!
//! ```rust
//! use reconcile_framework::fake::FakeApi;
//! use reconcile_framework::{
//!     Attributes, CallContext, Controller, DesiredRecord, ImportFormat, ImportKey,
//!     ImportResolution, Options, ReadOutcome, ReconcileError, RemoteRecord, ResourceDriver,
//!     WireRecord,
//! };
//! use std::collections::BTreeSet;
//! use std::sync::Arc;
//!
//! struct Workspace;
//!
//! impl ResourceDriver for Workspace {
//!     fn kind(&self) -> &'static str { "tfe_workspace" }
//!
//!     fn build_create_options(&self, desired: &DesiredRecord) -> Result<Options, ReconcileError> {
//!         Ok(desired.attributes.clone())
//!     }
//!
//!     fn build_update_options(
//!         &self,
//!         desired: &DesiredRecord,
//!         _changed: &BTreeSet<String>,
//!     ) -> Result<Option<Options>, ReconcileError> {
//!         Ok(Some(desired.attributes.clone()))
//!     }
//!
//!     fn apply_observed(&self, wire: WireRecord, _content: Option<Vec<u8>>) -> RemoteRecord {
//!         RemoteRecord::new(self.kind(), wire.id, wire.attributes)
//!     }
//!
//!     fn import_format(&self) -> ImportFormat {
//!         ImportFormat::new("tfe_workspace", &["id"])
//!     }
//!
//!     fn resolve_import(&self, key: &ImportKey) -> Result<ImportResolution, ReconcileError> {
//!         Ok(ImportResolution::Direct {
//!             handle: key.get("id").unwrap_or_default().into(),
//!             seed: Attributes::new(),
//!         })
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let controller = Controller::new(Workspace, Arc::new(FakeApi::spawn()));
//!     let ctx = CallContext::new();
//!
//!     let desired = DesiredRecord::new("tfe_workspace", Attributes::new().with("name", "prod"));
//!     let (handle, _) = controller.create(&desired, &ctx).await.unwrap();
//!
//!     controller.delete(&handle, &ctx).await.unwrap();
//!     let outcome = controller.read(&handle, &ctx).await.unwrap();
//!     assert_eq!(outcome, ReadOutcome::Drifted);
//! }
//! ```
//!
//! ## Concurrency Model
//!
//! - A [`Controller`] holds its driver, an `Arc` of the client and its config. Nothing else.
//! - No instance-keyed cache: calls on distinct handles never share mutable state.
//! - Every remote call runs under the caller's [`CallContext`]; cancelling its token
//!   drops the in-flight request.
//!
//! ## Testing
//!
//! Two test doubles implement [`ApiClient`]:
//!
//! - [`mock::MockApiClient`] - scripted responses and a call journal for exact ordering
//! - [`fake::FakeApi`] - an actor holding an in-memory store for full lifecycles

pub mod cancel;
pub mod client;
pub mod codec;
pub mod config;
pub mod controller;
pub mod driver;
pub mod error;
pub mod fake;
pub mod membership;
pub mod mock;
pub mod pager;
pub mod record;
pub mod tracing;

// Re-export core types for convenience
pub use cancel::CallContext;
pub use client::{ApiClient, ListQuery, Options, Page, WireRecord, MEMBERS_ATTRIBUTE};
pub use codec::{ImportFormat, ImportKey};
pub use config::ControllerConfig;
pub use controller::{Controller, ReadOutcome};
pub use driver::{ImportResolution, Lifecycle, ResourceDriver};
pub use error::{ApiError, Operation, ReconcileError};
pub use membership::{MemberSet, MembershipDelta};
pub use record::{AttrValue, Attributes, DesiredRecord, RemoteRecord, ResourceHandle};
pub use tokio_util::sync::CancellationToken;
