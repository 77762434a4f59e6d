//! # Fake API Client
//!
//! The [`ApiClient`] half of the fake. It forwards each call over the request channel
//! and waits for the answer on a oneshot channel. Cloning is cheap (it only holds a
//! sender), so one fake can back any number of controllers.

use super::message::{FakeObject, FakeRequest, Response};
use crate::client::{ApiClient, ListQuery, Options, Page, WireRecord};
use crate::error::ApiError;
use crate::membership::MemberSet;
use crate::record::{Attributes, ResourceHandle};
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

#[derive(Clone)]
pub struct FakeApiClient {
    sender: mpsc::Sender<FakeRequest>,
}

impl FakeApiClient {
    pub fn new(sender: mpsc::Sender<FakeRequest>) -> Self {
        Self { sender }
    }

    async fn call<T>(&self, request: impl FnOnce(Response<T>) -> FakeRequest) -> Result<T, ApiError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(request(respond_to))
            .await
            .map_err(|_| ApiError::Transient("fake api closed".to_string()))?;
        response
            .await
            .map_err(|_| ApiError::Transient("fake api dropped the request".to_string()))?
    }

    /// Stores an object under `id`, e.g. the team an attached kind points at.
    pub async fn seed(
        &self,
        kind: impl Into<String>,
        id: impl Into<ResourceHandle>,
        attributes: Attributes,
    ) -> Result<(), ApiError> {
        let object = FakeObject {
            kind: kind.into(),
            attributes,
            content: None,
            members: MemberSet::new(),
        };
        let id = id.into();
        self.call(|respond_to| FakeRequest::Seed {
            id,
            object,
            respond_to,
        })
        .await
    }

    /// A copy of the stored object, if it exists.
    pub async fn inspect(&self, id: &ResourceHandle) -> Result<Option<FakeObject>, ApiError> {
        let id = id.clone();
        self.call(|respond_to| FakeRequest::Inspect { id, respond_to })
            .await
    }
}

#[async_trait]
impl ApiClient for FakeApiClient {
    async fn create(&self, kind: &str, options: Options) -> Result<WireRecord, ApiError> {
        let kind = kind.to_string();
        self.call(|respond_to| FakeRequest::Create {
            kind,
            options,
            respond_to,
        })
        .await
    }

    async fn read(&self, _kind: &str, id: &ResourceHandle) -> Result<WireRecord, ApiError> {
        let id = id.clone();
        self.call(|respond_to| FakeRequest::Read { id, respond_to })
            .await
    }

    async fn update(
        &self,
        _kind: &str,
        id: &ResourceHandle,
        options: Options,
    ) -> Result<WireRecord, ApiError> {
        let id = id.clone();
        self.call(|respond_to| FakeRequest::Update {
            id,
            options,
            respond_to,
        })
        .await
    }

    async fn delete(&self, _kind: &str, id: &ResourceHandle) -> Result<(), ApiError> {
        let id = id.clone();
        self.call(|respond_to| FakeRequest::Delete { id, respond_to })
            .await
    }

    async fn list(
        &self,
        kind: &str,
        query: &ListQuery,
        page: u32,
    ) -> Result<Page<WireRecord>, ApiError> {
        let kind = kind.to_string();
        let query = query.clone();
        self.call(|respond_to| FakeRequest::List {
            kind,
            query,
            page,
            respond_to,
        })
        .await
    }

    async fn upload_content(
        &self,
        _kind: &str,
        id: &ResourceHandle,
        content: Vec<u8>,
    ) -> Result<(), ApiError> {
        let id = id.clone();
        self.call(|respond_to| FakeRequest::UploadContent {
            id,
            content,
            respond_to,
        })
        .await
    }

    async fn download_content(&self, _kind: &str, id: &ResourceHandle) -> Result<Vec<u8>, ApiError> {
        let id = id.clone();
        self.call(|respond_to| FakeRequest::DownloadContent { id, respond_to })
            .await
    }

    async fn add_members(
        &self,
        _kind: &str,
        id: &ResourceHandle,
        members: &MemberSet,
    ) -> Result<(), ApiError> {
        let id = id.clone();
        let members = members.clone();
        self.call(|respond_to| FakeRequest::AddMembers {
            id,
            members,
            respond_to,
        })
        .await
    }

    async fn remove_members(
        &self,
        _kind: &str,
        id: &ResourceHandle,
        members: &MemberSet,
    ) -> Result<(), ApiError> {
        let id = id.clone();
        let members = members.clone();
        self.call(|respond_to| FakeRequest::RemoveMembers {
            id,
            members,
            respond_to,
        })
        .await
    }
}
