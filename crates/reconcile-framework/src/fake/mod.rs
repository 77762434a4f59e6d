//! # In-Memory Fake API
//!
//! An actor-backed stand-in for the remote workspace-management API: a tokio task
//! ([`FakeApi`]) owns the store and a cloneable handle ([`FakeApiClient`]) implements
//! [`ApiClient`](crate::ApiClient) by message passing. Use it for whole lifecycles
//! (create, read, update, delete, import) where scripting every response with the
//! [`mock`](crate::mock) would be noise.
//!
//! ```rust
//! use reconcile_framework::fake::FakeApi;
//! use reconcile_framework::{ApiClient, Attributes};
//!
//! #[tokio::main]
//! async fn main() {
//!     let api = FakeApi::spawn();
//!     let created = api
//!         .create("tfe_policy", Attributes::new().with("name", "p"))
//!         .await
//!         .unwrap();
//!     assert_eq!(created.id.as_str(), "pol-1");
//! }
//! ```

pub mod client;
pub mod message;
pub mod server;

pub use client::FakeApiClient;
pub use message::{FakeObject, FakeRequest};
pub use server::FakeApi;
