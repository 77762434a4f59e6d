//! # Mock API Client & Testing Guide
//!
//! [`MockApiClient`] implements [`ApiClient`] from a queue of expectations. Each remote
//! call pops the next expectation, checks that it is the same kind of call and returns
//! the canned response. Every call is also appended to a journal so tests can assert
//! the exact order of remote traffic.
//!
//! ## When to use the Mock vs the Fake
//!
//! | Feature | MockApiClient | [`FakeApiClient`](crate::fake::FakeApiClient) |
//! |---------|---------------|---------------------|
//! | **State** | None (scripted responses) | Real in-memory store |
//! | **Error injection** | Easy (`return_err`) | Only what the store produces |
//! | **Call ordering** | Journal via [`MockApiClient::calls`] | Not recorded |
//! | **Use case** | One controller operation, exact traffic | Full lifecycles, concurrency |
//!
//! ## Example
//!
//! ```rust
//! use reconcile_framework::mock::{MockApiClient, RecordedCall};
//! use reconcile_framework::{ApiClient, ApiError, ResourceHandle};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mock = MockApiClient::new();
//!     mock.expect_read("pol-1").return_err(ApiError::NotFound);
//!
//!     let result = mock.read("tfe_policy", &ResourceHandle::from("pol-1")).await;
//!     assert_eq!(result, Err(ApiError::NotFound));
//!
//!     assert!(matches!(&mock.calls()[..], [RecordedCall::Read { .. }]));
//!     mock.verify();
//! }
//! ```
//!
//! A call that does not match the next expectation panics with both sides printed,
//! which fails the calling test.

use crate::client::{ApiClient, ListQuery, Options, Page, WireRecord};
use crate::error::ApiError;
use crate::membership::MemberSet;
use crate::record::ResourceHandle;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// An expected request and the response to give it.
#[derive(Debug)]
enum Expectation {
    Create {
        kind: String,
        response: Result<WireRecord, ApiError>,
    },
    Read {
        id: ResourceHandle,
        response: Result<WireRecord, ApiError>,
    },
    Update {
        id: ResourceHandle,
        response: Result<WireRecord, ApiError>,
    },
    Delete {
        id: ResourceHandle,
        response: Result<(), ApiError>,
    },
    List {
        page: u32,
        response: Result<Page<WireRecord>, ApiError>,
    },
    UploadContent {
        id: ResourceHandle,
        response: Result<(), ApiError>,
    },
    DownloadContent {
        id: ResourceHandle,
        response: Result<Vec<u8>, ApiError>,
    },
    AddMembers {
        id: ResourceHandle,
        response: Result<(), ApiError>,
    },
    RemoveMembers {
        id: ResourceHandle,
        response: Result<(), ApiError>,
    },
}

/// A call the mock received, with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Create { kind: String, options: Options },
    Read { kind: String, id: ResourceHandle },
    Update { kind: String, id: ResourceHandle, options: Options },
    Delete { kind: String, id: ResourceHandle },
    List { kind: String, query: ListQuery, page: u32 },
    UploadContent { kind: String, id: ResourceHandle, content: Vec<u8> },
    DownloadContent { kind: String, id: ResourceHandle },
    AddMembers { kind: String, id: ResourceHandle, members: MemberSet },
    RemoveMembers { kind: String, id: ResourceHandle, members: MemberSet },
}

type Queue = Arc<Mutex<VecDeque<Expectation>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A scripted [`ApiClient`].
#[derive(Default)]
pub struct MockApiClient {
    expectations: Queue,
    calls: Mutex<Vec<RecordedCall>>,
}

/// Builder returned by the `expect_*` methods.
pub struct ExpectationBuilder<T> {
    expectations: Queue,
    make: Box<dyn FnOnce(Result<T, ApiError>) -> Expectation + Send>,
}

impl<T> ExpectationBuilder<T> {
    /// Sets the expectation to return a successful result.
    pub fn return_ok(self, value: T) {
        let expectation = (self.make)(Ok(value));
        lock(&self.expectations).push_back(expectation);
    }

    /// Sets the expectation to return an error.
    pub fn return_err(self, error: ApiError) {
        let expectation = (self.make)(Err(error));
        lock(&self.expectations).push_back(expectation);
    }
}

impl MockApiClient {
    /// Creates a new mock with no expectations.
    pub fn new() -> Self {
        Self::default()
    }

    fn builder<T>(
        &self,
        make: impl FnOnce(Result<T, ApiError>) -> Expectation + Send + 'static,
    ) -> ExpectationBuilder<T> {
        ExpectationBuilder {
            expectations: self.expectations.clone(),
            make: Box::new(make),
        }
    }

    pub fn expect_create(&self, kind: impl Into<String>) -> ExpectationBuilder<WireRecord> {
        let kind = kind.into();
        self.builder(move |response| Expectation::Create { kind, response })
    }

    pub fn expect_read(&self, id: impl Into<ResourceHandle>) -> ExpectationBuilder<WireRecord> {
        let id = id.into();
        self.builder(move |response| Expectation::Read { id, response })
    }

    pub fn expect_update(&self, id: impl Into<ResourceHandle>) -> ExpectationBuilder<WireRecord> {
        let id = id.into();
        self.builder(move |response| Expectation::Update { id, response })
    }

    pub fn expect_delete(&self, id: impl Into<ResourceHandle>) -> ExpectationBuilder<()> {
        let id = id.into();
        self.builder(move |response| Expectation::Delete { id, response })
    }

    pub fn expect_list(&self, page: u32) -> ExpectationBuilder<Page<WireRecord>> {
        self.builder(move |response| Expectation::List { page, response })
    }

    pub fn expect_upload_content(&self, id: impl Into<ResourceHandle>) -> ExpectationBuilder<()> {
        let id = id.into();
        self.builder(move |response| Expectation::UploadContent { id, response })
    }

    pub fn expect_download_content(
        &self,
        id: impl Into<ResourceHandle>,
    ) -> ExpectationBuilder<Vec<u8>> {
        let id = id.into();
        self.builder(move |response| Expectation::DownloadContent { id, response })
    }

    pub fn expect_add_members(&self, id: impl Into<ResourceHandle>) -> ExpectationBuilder<()> {
        let id = id.into();
        self.builder(move |response| Expectation::AddMembers { id, response })
    }

    pub fn expect_remove_members(&self, id: impl Into<ResourceHandle>) -> ExpectationBuilder<()> {
        let id = id.into();
        self.builder(move |response| Expectation::RemoveMembers { id, response })
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let remaining = lock(&self.expectations);
        if !remaining.is_empty() {
            panic!(
                "Not all expectations were met. {} remaining: {:?}",
                remaining.len(),
                remaining
            );
        }
    }

    fn next(&self, call: RecordedCall) -> (RecordedCall, Option<Expectation>) {
        lock(&self.calls).push(call.clone());
        let expectation = lock(&self.expectations).pop_front();
        (call, expectation)
    }
}

fn mismatch(call: &RecordedCall, expectation: Option<Expectation>) -> ! {
    panic!("Unexpected request {call:?}; next expectation was {expectation:?}")
}

#[async_trait]
impl ApiClient for MockApiClient {
    async fn create(&self, kind: &str, options: Options) -> Result<WireRecord, ApiError> {
        match self.next(RecordedCall::Create {
            kind: kind.to_string(),
            options,
        }) {
            (_, Some(Expectation::Create { kind: expected, response })) if expected == kind => response,
            (call, other) => mismatch(&call, other),
        }
    }

    async fn read(&self, kind: &str, id: &ResourceHandle) -> Result<WireRecord, ApiError> {
        match self.next(RecordedCall::Read {
            kind: kind.to_string(),
            id: id.clone(),
        }) {
            (_, Some(Expectation::Read { id: expected, response })) if &expected == id => response,
            (call, other) => mismatch(&call, other),
        }
    }

    async fn update(
        &self,
        kind: &str,
        id: &ResourceHandle,
        options: Options,
    ) -> Result<WireRecord, ApiError> {
        match self.next(RecordedCall::Update {
            kind: kind.to_string(),
            id: id.clone(),
            options,
        }) {
            (_, Some(Expectation::Update { id: expected, response })) if &expected == id => response,
            (call, other) => mismatch(&call, other),
        }
    }

    async fn delete(&self, kind: &str, id: &ResourceHandle) -> Result<(), ApiError> {
        match self.next(RecordedCall::Delete {
            kind: kind.to_string(),
            id: id.clone(),
        }) {
            (_, Some(Expectation::Delete { id: expected, response })) if &expected == id => response,
            (call, other) => mismatch(&call, other),
        }
    }

    async fn list(
        &self,
        kind: &str,
        query: &ListQuery,
        page: u32,
    ) -> Result<Page<WireRecord>, ApiError> {
        match self.next(RecordedCall::List {
            kind: kind.to_string(),
            query: query.clone(),
            page,
        }) {
            (_, Some(Expectation::List { page: expected, response })) if expected == page => response,
            (call, other) => mismatch(&call, other),
        }
    }

    async fn upload_content(
        &self,
        kind: &str,
        id: &ResourceHandle,
        content: Vec<u8>,
    ) -> Result<(), ApiError> {
        match self.next(RecordedCall::UploadContent {
            kind: kind.to_string(),
            id: id.clone(),
            content,
        }) {
            (_, Some(Expectation::UploadContent { id: expected, response })) if &expected == id => {
                response
            }
            (call, other) => mismatch(&call, other),
        }
    }

    async fn download_content(&self, kind: &str, id: &ResourceHandle) -> Result<Vec<u8>, ApiError> {
        match self.next(RecordedCall::DownloadContent {
            kind: kind.to_string(),
            id: id.clone(),
        }) {
            (_, Some(Expectation::DownloadContent { id: expected, response })) if &expected == id => {
                response
            }
            (call, other) => mismatch(&call, other),
        }
    }

    async fn add_members(
        &self,
        kind: &str,
        id: &ResourceHandle,
        members: &MemberSet,
    ) -> Result<(), ApiError> {
        match self.next(RecordedCall::AddMembers {
            kind: kind.to_string(),
            id: id.clone(),
            members: members.clone(),
        }) {
            (_, Some(Expectation::AddMembers { id: expected, response })) if &expected == id => response,
            (call, other) => mismatch(&call, other),
        }
    }

    async fn remove_members(
        &self,
        kind: &str,
        id: &ResourceHandle,
        members: &MemberSet,
    ) -> Result<(), ApiError> {
        match self.next(RecordedCall::RemoveMembers {
            kind: kind.to_string(),
            id: id.clone(),
            members: members.clone(),
        }) {
            (_, Some(Expectation::RemoveMembers { id: expected, response })) if &expected == id => {
                response
            }
            (call, other) => mismatch(&call, other),
        }
    }
}
