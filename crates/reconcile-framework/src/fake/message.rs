//! # Fake API Messages
//!
//! Requests sent from [`FakeApiClient`](super::FakeApiClient) to the
//! [`FakeApi`](super::FakeApi) task. One variant per REST call, plus seeding and
//! inspection requests used by tests to set up parents and check the stored state.

use crate::client::{ListQuery, Options, Page, WireRecord};
use crate::error::ApiError;
use crate::membership::MemberSet;
use crate::record::{Attributes, ResourceHandle};
use tokio::sync::oneshot;

/// The one-shot response channel used by the fake.
pub type Response<T> = oneshot::Sender<Result<T, ApiError>>;

/// A remote object as the fake stores it.
#[derive(Debug, Clone, PartialEq)]
pub struct FakeObject {
    pub kind: String,
    pub attributes: Attributes,
    pub content: Option<Vec<u8>>,
    pub members: MemberSet,
}

#[derive(Debug)]
pub enum FakeRequest {
    Create {
        kind: String,
        options: Options,
        respond_to: Response<WireRecord>,
    },
    Read {
        id: ResourceHandle,
        respond_to: Response<WireRecord>,
    },
    Update {
        id: ResourceHandle,
        options: Options,
        respond_to: Response<WireRecord>,
    },
    Delete {
        id: ResourceHandle,
        respond_to: Response<()>,
    },
    List {
        kind: String,
        query: ListQuery,
        page: u32,
        respond_to: Response<Page<WireRecord>>,
    },
    UploadContent {
        id: ResourceHandle,
        content: Vec<u8>,
        respond_to: Response<()>,
    },
    DownloadContent {
        id: ResourceHandle,
        respond_to: Response<Vec<u8>>,
    },
    AddMembers {
        id: ResourceHandle,
        members: MemberSet,
        respond_to: Response<()>,
    },
    RemoveMembers {
        id: ResourceHandle,
        members: MemberSet,
        respond_to: Response<()>,
    },
    /// Inserts an object under a caller-chosen handle (e.g. a parent team).
    Seed {
        id: ResourceHandle,
        object: FakeObject,
        respond_to: Response<()>,
    },
    /// Returns a copy of the stored object, if any.
    Inspect {
        id: ResourceHandle,
        respond_to: Response<Option<FakeObject>>,
    },
}
