//! # Fake API Server
//!
//! [`FakeApi`] owns an in-memory store of remote objects and processes
//! [`FakeRequest`]s one at a time in its own task, so the store needs no lock.
//!
//! Behaviour worth knowing when writing tests:
//!
//! * **Create** allocates `<prefix>-<n>` where the prefix is the first three letters of
//!   the kind's last `_` segment (`tfe_policy` → `pol-1`). A second object of the same
//!   kind with the same `organization` and `name` is a validation error.
//! * **Read/Update/Delete** and the content and membership calls address objects by
//!   handle only; handles are unique across kinds, so the kind is not checked. This
//!   lets an attached kind (team members) operate on a seeded parent (team).
//! * **Read** reports the members under [`MEMBERS_ATTRIBUTE`] when there are any.
//! * **List** filters by kind, `organization` and a substring match of the search hint
//!   on `name`, in creation order, `page_size` items per page.
//! * **DownloadContent** on an object that never had content uploaded returns no bytes.

use super::client::FakeApiClient;
use super::message::{FakeObject, FakeRequest};
use crate::client::{ListQuery, Options, Page, WireRecord, MEMBERS_ATTRIBUTE};
use crate::error::ApiError;
use crate::membership::MemberSet;
use crate::record::ResourceHandle;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

struct Entry {
    seq: u64,
    object: FakeObject,
}

pub struct FakeApi {
    receiver: mpsc::Receiver<FakeRequest>,
    store: HashMap<ResourceHandle, Entry>,
    next_id: u64,
}

impl FakeApi {
    /// Creates the server and its client. `buffer_size` bounds the request channel.
    pub fn new(buffer_size: usize) -> (Self, FakeApiClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let api = Self {
            receiver,
            store: HashMap::new(),
            next_id: 1,
        };
        (api, FakeApiClient::new(sender))
    }

    /// Starts a server on the current runtime and returns its client.
    pub fn spawn() -> FakeApiClient {
        let (api, client) = Self::new(64);
        tokio::spawn(api.run());
        client
    }

    /// Processes requests until every client is dropped.
    pub async fn run(mut self) {
        info!("Fake API started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                FakeRequest::Create {
                    kind,
                    options,
                    respond_to,
                } => {
                    debug!(%kind, ?options, "Create");
                    let _ = respond_to.send(self.create(kind, options));
                }
                FakeRequest::Read { id, respond_to } => {
                    let result = self.lookup(&id).map(|object| wire(&id, object));
                    debug!(%id, found = result.is_ok(), "Read");
                    let _ = respond_to.send(result);
                }
                FakeRequest::Update {
                    id,
                    options,
                    respond_to,
                } => {
                    debug!(%id, ?options, "Update");
                    let result = self.lookup_mut(&id).map(|object| {
                        for (name, value) in options.iter() {
                            object.attributes.insert(name.clone(), value.clone());
                        }
                        wire(&id, object)
                    });
                    let _ = respond_to.send(result);
                }
                FakeRequest::Delete { id, respond_to } => {
                    let result = match self.store.remove(&id) {
                        Some(_) => {
                            info!(%id, size = self.store.len(), "Deleted");
                            Ok(())
                        }
                        None => {
                            warn!(%id, "Not found");
                            Err(ApiError::NotFound)
                        }
                    };
                    let _ = respond_to.send(result);
                }
                FakeRequest::List {
                    kind,
                    query,
                    page,
                    respond_to,
                } => {
                    debug!(%kind, ?query, page, "List");
                    let _ = respond_to.send(Ok(self.list(&kind, &query, page)));
                }
                FakeRequest::UploadContent {
                    id,
                    content,
                    respond_to,
                } => {
                    debug!(%id, bytes = content.len(), "Upload content");
                    let result = self.lookup_mut(&id).map(|object| object.content = Some(content));
                    let _ = respond_to.send(result);
                }
                FakeRequest::DownloadContent { id, respond_to } => {
                    let result = self
                        .lookup(&id)
                        .map(|object| object.content.clone().unwrap_or_default());
                    let _ = respond_to.send(result);
                }
                FakeRequest::AddMembers {
                    id,
                    members,
                    respond_to,
                } => {
                    debug!(%id, ?members, "Add members");
                    let result = self
                        .lookup_mut(&id)
                        .map(|object| object.members.extend(members.into_iter()));
                    let _ = respond_to.send(result);
                }
                FakeRequest::RemoveMembers {
                    id,
                    members,
                    respond_to,
                } => {
                    debug!(%id, ?members, "Remove members");
                    let result = self.lookup_mut(&id).map(|object| {
                        object.members = object.members.difference(&members);
                    });
                    let _ = respond_to.send(result);
                }
                FakeRequest::Seed {
                    id,
                    object,
                    respond_to,
                } => {
                    debug!(%id, kind = %object.kind, "Seed");
                    let seq = self.bump();
                    self.store.insert(id, Entry { seq, object });
                    let _ = respond_to.send(Ok(()));
                }
                FakeRequest::Inspect { id, respond_to } => {
                    let _ = respond_to.send(Ok(self.store.get(&id).map(|e| e.object.clone())));
                }
            }
        }

        info!(size = self.store.len(), "Fake API shutdown");
    }

    fn bump(&mut self) -> u64 {
        let seq = self.next_id;
        self.next_id += 1;
        seq
    }

    fn create(&mut self, kind: String, options: Options) -> Result<WireRecord, ApiError> {
        if let Some(name) = options.get_str("name") {
            let organization = options.get_str("organization");
            let taken = self.store.values().any(|e| {
                e.object.kind == kind
                    && e.object.attributes.get_str("name") == Some(name)
                    && e.object.attributes.get_str("organization") == organization
            });
            if taken {
                warn!(%kind, name, "Create failed");
                return Err(ApiError::Validation("name has already been taken".to_string()));
            }
        }

        let seq = self.bump();
        let id = ResourceHandle::new(format!("{}-{seq}", id_prefix(&kind)));
        let object = FakeObject {
            kind,
            attributes: options,
            content: None,
            members: MemberSet::new(),
        };
        let record = wire(&id, &object);
        self.store.insert(id.clone(), Entry { seq, object });
        info!(%id, size = self.store.len(), "Created");
        Ok(record)
    }

    fn list(&self, kind: &str, query: &ListQuery, page: u32) -> Page<WireRecord> {
        let mut matching: Vec<(&ResourceHandle, &Entry)> = self
            .store
            .iter()
            .filter(|(_, e)| e.object.kind == kind)
            .filter(|(_, e)| {
                e.object.attributes.get_str("organization") == Some(query.organization.as_str())
            })
            .filter(|(_, e)| match &query.search {
                Some(hint) => e
                    .object
                    .attributes
                    .get_str("name")
                    .is_some_and(|name| name.contains(hint.as_str())),
                None => true,
            })
            .collect();
        matching.sort_by_key(|(_, e)| e.seq);

        let page_size = query.page_size.max(1) as usize;
        let total_pages = matching.len().div_ceil(page_size).max(1) as u32;
        let current_page = page.max(1);
        let items = matching
            .into_iter()
            .skip((current_page as usize - 1) * page_size)
            .take(page_size)
            .map(|(id, e)| wire(id, &e.object))
            .collect();

        Page {
            items,
            current_page,
            total_pages,
            next_page: (current_page < total_pages).then_some(current_page + 1),
        }
    }

    fn lookup(&self, id: &ResourceHandle) -> Result<&FakeObject, ApiError> {
        self.store
            .get(id)
            .map(|e| &e.object)
            .ok_or(ApiError::NotFound)
    }

    fn lookup_mut(&mut self, id: &ResourceHandle) -> Result<&mut FakeObject, ApiError> {
        self.store
            .get_mut(id)
            .map(|e| &mut e.object)
            .ok_or(ApiError::NotFound)
    }
}

fn id_prefix(kind: &str) -> String {
    kind.rsplit('_').next().unwrap_or(kind).chars().take(3).collect()
}

fn wire(id: &ResourceHandle, object: &FakeObject) -> WireRecord {
    let mut attributes = object.attributes.clone();
    if !object.members.is_empty() {
        attributes.insert(MEMBERS_ATTRIBUTE, object.members.clone());
    }
    WireRecord::new(id.clone(), attributes)
}
