//! # API Client Contract
//!
//! The remote workspace-management API is an external collaborator. The engine only
//! depends on the REST-shaped [`ApiClient`] trait below; transport, authentication and
//! retry/backoff live behind it.
//!
//! The client is injected into each [`Controller`](crate::Controller) as `Arc<C>`;
//! nothing in the engine reaches for an ambient or global client.

use crate::error::ApiError;
use crate::membership::MemberSet;
use crate::record::{Attributes, ResourceHandle};
use async_trait::async_trait;

/// Creation and update payloads use the same shape as records.
pub type Options = Attributes;

/// Wire attribute that carries the membership of an attached resource.
pub const MEMBERS_ATTRIBUTE: &str = "members";

/// A remote object as the API returned it.
#[derive(Debug, Clone, PartialEq)]
pub struct WireRecord {
    pub id: ResourceHandle,
    pub attributes: Attributes,
}

impl WireRecord {
    pub fn new(id: impl Into<ResourceHandle>, attributes: Attributes) -> Self {
        Self {
            id: id.into(),
            attributes,
        }
    }
}

/// Filter for list endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub organization: String,
    /// Server-side search hint. Servers that do not support it ignore it, so callers
    /// must still match results themselves.
    pub search: Option<String>,
    pub page_size: u32,
}

impl ListQuery {
    pub fn new(organization: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            search: None,
            page_size: 20,
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }
}

/// One page of a list traversal. Traversal ends when `current_page >= total_pages`.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub current_page: u32,
    pub total_pages: u32,
    pub next_page: Option<u32>,
}

impl<T> Page<T> {
    pub fn is_last(&self) -> bool {
        self.current_page >= self.total_pages
    }
}

/// The remote calls the engine issues. `kind` is the driver's kind tag and selects
/// the endpoint.
#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn create(&self, kind: &str, options: Options) -> Result<WireRecord, ApiError>;

    async fn read(&self, kind: &str, id: &ResourceHandle) -> Result<WireRecord, ApiError>;

    async fn update(
        &self,
        kind: &str,
        id: &ResourceHandle,
        options: Options,
    ) -> Result<WireRecord, ApiError>;

    async fn delete(&self, kind: &str, id: &ResourceHandle) -> Result<(), ApiError>;

    /// Fetches one page; `page` starts at 1.
    async fn list(
        &self,
        kind: &str,
        query: &ListQuery,
        page: u32,
    ) -> Result<Page<WireRecord>, ApiError>;

    async fn upload_content(
        &self,
        kind: &str,
        id: &ResourceHandle,
        content: Vec<u8>,
    ) -> Result<(), ApiError>;

    async fn download_content(&self, kind: &str, id: &ResourceHandle) -> Result<Vec<u8>, ApiError>;

    /// Adds members as one unordered batch.
    async fn add_members(
        &self,
        kind: &str,
        id: &ResourceHandle,
        members: &MemberSet,
    ) -> Result<(), ApiError>;

    /// Removes members as one unordered batch.
    async fn remove_members(
        &self,
        kind: &str,
        id: &ResourceHandle,
        members: &MemberSet,
    ) -> Result<(), ApiError>;
}
