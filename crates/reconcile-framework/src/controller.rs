//! # Reconciliation Controller
//!
//! [`Controller`] is the generic state machine shared by every resource kind. It
//! sequences the remote calls, asks the [`ResourceDriver`] to translate records, and
//! decides which remote errors are drift and which are failures.
//!
//! ```text
//! Absent --create--> Present --update*--> Present --delete--> Absent
//!                       |                    |
//!                       +------ drift -------+--> Absent
//! ```
//!
//! ## Operations
//!
//! * **Create**:
//!     1. Validates the desired record and builds options (no remote call on failure).
//!     2. Owned kinds: remote create allocates the handle. Attached kinds: the handle
//!        is the parent named by the driver.
//!     3. Adds the desired members, then uploads the content, when the kind has them.
//!        For owned kinds a failure here is [`ReconcileError::PartialCreateFailure`]
//!        and carries the live handle.
//!     4. Reads the result back, retrying briefly while the new object is not visible.
//!
//! * **Read**: not found (on metadata or content) is [`ReadOutcome::Drifted`].
//!
//! * **Update**:
//!     1. Diffs desired against the previous record; immutable changes fail fast.
//!     2. Issues a metadata update only when the driver has changed options.
//!     3. Re-uploads content only when it changed.
//!     4. Reconciles membership: add first, then remove, skipping empty sides.
//!     5. Reads the result back.
//!
//! * **Delete**: not found is success. Attached kinds remove every current member.
//!
//! * **Import**: decodes the id, resolves it directly or by a paged name search,
//!   then reads.
//!
//! The controller keeps no per-handle state. Every call builds its answer from the
//! arguments and fresh remote reads, so any number of calls for distinct handles can
//! run concurrently on clones of one controller.

use crate::cancel::CallContext;
use crate::client::{ApiClient, ListQuery};
use crate::config::ControllerConfig;
use crate::driver::{ImportResolution, Lifecycle, ResourceDriver};
use crate::error::{ApiError, Operation, ReconcileError};
use crate::membership::{self, MemberSet};
use crate::pager;
use crate::record::{DesiredRecord, RemoteRecord, ResourceHandle};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn, Span};

/// Result of a [`Controller::read`].
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    Present(RemoteRecord),
    /// The remote object is gone; local state should be cleared.
    Drifted,
}

impl ReadOutcome {
    pub fn into_record(self) -> Option<RemoteRecord> {
        match self {
            ReadOutcome::Present(record) => Some(record),
            ReadOutcome::Drifted => None,
        }
    }

    pub fn is_drifted(&self) -> bool {
        matches!(self, ReadOutcome::Drifted)
    }
}

/// A failed remote step before it is mapped into a [`ReconcileError`].
type Step<T> = Result<T, (Operation, ApiError)>;

/// Reconciles resources of one kind against the remote API.
pub struct Controller<D, C: ?Sized> {
    driver: D,
    client: Arc<C>,
    config: ControllerConfig,
}

impl<D: Clone, C: ?Sized> Clone for Controller<D, C> {
    fn clone(&self) -> Self {
        Self {
            driver: self.driver.clone(),
            client: self.client.clone(),
            config: self.config.clone(),
        }
    }
}

impl<D, C> Controller<D, C>
where
    D: ResourceDriver,
    C: ApiClient + ?Sized,
{
    pub fn new(driver: D, client: Arc<C>) -> Self {
        Self {
            driver,
            client,
            config: ControllerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    fn kind(&self) -> &'static str {
        self.driver.kind()
    }

    /// Creates the remote resource described by `desired`.
    #[instrument(skip_all, fields(kind = self.driver.kind(), handle = tracing::field::Empty))]
    pub async fn create(
        &self,
        desired: &DesiredRecord,
        ctx: &CallContext,
    ) -> Result<(ResourceHandle, RemoteRecord), ReconcileError> {
        let kind = self.kind();
        debug!(kind, attributes = ?desired.attributes, "Create");
        self.check_kind(desired, Operation::Create)?;
        let options = self
            .driver
            .build_create_options(desired)
            .map_err(|e| self.warned(e))?;

        let lifecycle = self.driver.lifecycle();
        let handle = match lifecycle {
            Lifecycle::Owned => {
                let wire = ctx
                    .run(self.client.create(kind, options))
                    .await
                    .map_err(|e| self.reject(e, Operation::Create, None))?;
                wire.id
            }
            Lifecycle::Attached { parent_attribute } => {
                let parent = desired.attributes.get_str(parent_attribute).ok_or_else(|| {
                    self.warned(ReconcileError::Validation {
                        kind: kind.to_string(),
                        operation: Operation::Create,
                        message: format!("{parent_attribute} is required"),
                    })
                })?;
                ResourceHandle::new(parent)
            }
        };
        Span::current().record("handle", tracing::field::display(&handle));

        if let Err((operation, source)) = self.create_follow_ups(&handle, desired, ctx).await {
            let err = match lifecycle {
                Lifecycle::Owned => ReconcileError::PartialCreateFailure {
                    kind: kind.to_string(),
                    handle: handle.clone(),
                    operation,
                    source,
                },
                // A missing parent is a configuration problem, not drift.
                Lifecycle::Attached { .. } if source == ApiError::NotFound => {
                    ReconcileError::from_api(source, kind, operation, None)
                }
                Lifecycle::Attached { .. } => {
                    ReconcileError::from_api(source, kind, operation, Some(&handle))
                }
            };
            return Err(self.warned(err));
        }

        let record = self.read_after_create(&handle, ctx).await.map_err(|err| {
            let err = match (lifecycle, err) {
                (Lifecycle::Owned, ReconcileError::Transient { operation, message, .. }) => {
                    ReconcileError::PartialCreateFailure {
                        kind: kind.to_string(),
                        handle: handle.clone(),
                        operation,
                        source: ApiError::Transient(message),
                    }
                }
                (_, other) => other,
            };
            self.warned(err)
        })?;
        info!(kind, %handle, "Created");
        Ok((handle, record))
    }

    async fn create_follow_ups(
        &self,
        handle: &ResourceHandle,
        desired: &DesiredRecord,
        ctx: &CallContext,
    ) -> Step<()> {
        let kind = self.kind();
        if let Some(members) = self
            .driver
            .membership_attribute()
            .and_then(|attr| desired.attributes.get_set(attr))
            .filter(|members| !members.is_empty())
        {
            debug!(kind, %handle, count = members.len(), "Add members");
            ctx.run(self.client.add_members(kind, handle, members))
                .await
                .map_err(|e| (Operation::AddMembers, e))?;
        }
        if let Some(content) = self
            .driver
            .content_attribute()
            .and_then(|attr| desired.attributes.get_str(attr))
        {
            debug!(kind, %handle, bytes = content.len(), "Upload content");
            ctx.run(self.client.upload_content(kind, handle, content.as_bytes().to_vec()))
                .await
                .map_err(|e| (Operation::UploadContent, e))?;
        }
        Ok(())
    }

    /// The object was just written, so "not found" here is read-after-write lag
    /// until the attempts run out.
    async fn read_after_create(
        &self,
        handle: &ResourceHandle,
        ctx: &CallContext,
    ) -> Result<RemoteRecord, ReconcileError> {
        let attempts = self.config.vanished_read_attempts.max(1);
        for attempt in 1..=attempts {
            match self.observe(handle, ctx).await {
                Ok(Some(record)) => return Ok(record),
                Ok(None) if attempt < attempts => {
                    debug!(kind = self.kind(), %handle, attempt, "Not visible yet");
                    ctx.sleep(self.config.vanished_backoff)
                        .await
                        .map_err(|e| ReconcileError::from_api(e, self.kind(), Operation::Read, Some(handle)))?;
                }
                Ok(None) => break,
                Err((operation, e)) => {
                    return Err(ReconcileError::from_api(e, self.kind(), operation, Some(handle)))
                }
            }
        }
        Err(ReconcileError::StaleReference {
            kind: self.kind().to_string(),
            handle: handle.clone(),
            operation: Operation::Read,
        })
    }

    /// Reads the current remote state of `handle`.
    #[instrument(skip_all, fields(kind = self.driver.kind(), handle = %handle))]
    pub async fn read(
        &self,
        handle: &ResourceHandle,
        ctx: &CallContext,
    ) -> Result<ReadOutcome, ReconcileError> {
        let kind = self.kind();
        debug!(kind, %handle, "Read");
        match self.observe(handle, ctx).await {
            Ok(Some(record)) => {
                debug!(kind, %handle, "Present");
                Ok(ReadOutcome::Present(record))
            }
            Ok(None) => {
                info!(kind, %handle, "Drifted");
                Ok(ReadOutcome::Drifted)
            }
            Err((operation, e)) => Err(self.reject(e, operation, Some(handle))),
        }
    }

    /// One fresh observation. `Ok(None)` means the remote object is absent.
    async fn observe(&self, handle: &ResourceHandle, ctx: &CallContext) -> Step<Option<RemoteRecord>> {
        let kind = self.kind();
        let wire = match ctx.run(self.client.read(kind, handle)).await {
            Ok(wire) => wire,
            Err(ApiError::NotFound) => return Ok(None),
            Err(e) => return Err((Operation::Read, e)),
        };
        let content = match self.driver.content_attribute() {
            Some(_) => match ctx.run(self.client.download_content(kind, handle)).await {
                Ok(bytes) => Some(bytes),
                Err(ApiError::NotFound) => return Ok(None),
                Err(e) => return Err((Operation::DownloadContent, e)),
            },
            None => None,
        };
        let record = self.driver.apply_observed(wire, content);
        if self.driver.observed_absent(&record) {
            return Ok(None);
        }
        Ok(Some(record))
    }

    /// Converges the remote object on `desired`, given the previously observed record.
    #[instrument(skip_all, fields(kind = self.driver.kind(), handle = %handle))]
    pub async fn update(
        &self,
        handle: &ResourceHandle,
        desired: &DesiredRecord,
        previous: &RemoteRecord,
        ctx: &CallContext,
    ) -> Result<RemoteRecord, ReconcileError> {
        let kind = self.kind();
        self.check_kind(desired, Operation::Update)?;
        let desired = &self.driver.with_defaults(desired);
        let changed = desired.attributes.changed_from(&previous.attributes);
        debug!(kind, %handle, ?changed, "Update");

        let replaced: Vec<String> = self
            .driver
            .immutable_attributes()
            .iter()
            .filter(|attr| {
                changed.contains(**attr)
                    && desired.attributes.contains(attr)
                    && previous.attributes.contains(attr)
            })
            .map(|attr| attr.to_string())
            .collect();
        if !replaced.is_empty() {
            return Err(self.warned(ReconcileError::RequiresReplacement {
                kind: kind.to_string(),
                handle: handle.clone(),
                attributes: replaced,
            }));
        }

        if let Some(options) = self
            .driver
            .build_update_options(desired, &changed)
            .map_err(|e| self.warned(e))?
        {
            ctx.run(self.client.update(kind, handle, options))
                .await
                .map_err(|e| self.reject(e, Operation::Update, Some(handle)))?;
        }

        if let Some(content) = self
            .driver
            .content_attribute()
            .filter(|attr| changed.contains(*attr))
            .and_then(|attr| desired.attributes.get_str(attr))
        {
            debug!(kind, %handle, bytes = content.len(), "Upload content");
            ctx.run(self.client.upload_content(kind, handle, content.as_bytes().to_vec()))
                .await
                .map_err(|e| self.reject(e, Operation::UploadContent, Some(handle)))?;
        }

        if let Some(attr) = self
            .driver
            .membership_attribute()
            .filter(|attr| changed.contains(*attr))
        {
            let none = MemberSet::new();
            let delta = membership::diff(
                desired.attributes.get_set(attr).unwrap_or(&none),
                previous.attributes.get_set(attr).unwrap_or(&none),
            );
            debug!(kind, %handle, to_add = delta.to_add.len(), to_remove = delta.to_remove.len(), "Membership delta");
            // Add before remove so the membership never dips below the desired set.
            if !delta.to_add.is_empty() {
                ctx.run(self.client.add_members(kind, handle, &delta.to_add))
                    .await
                    .map_err(|e| self.reject(e, Operation::AddMembers, Some(handle)))?;
            }
            if !delta.to_remove.is_empty() {
                ctx.run(self.client.remove_members(kind, handle, &delta.to_remove))
                    .await
                    .map_err(|e| self.reject(e, Operation::RemoveMembers, Some(handle)))?;
            }
        }

        match self.observe(handle, ctx).await {
            Ok(Some(record)) => {
                info!(kind, %handle, "Updated");
                Ok(record)
            }
            Ok(None) => Err(self.warned(ReconcileError::StaleReference {
                kind: kind.to_string(),
                handle: handle.clone(),
                operation: Operation::Update,
            })),
            Err((operation, e)) => Err(self.reject(e, operation, Some(handle))),
        }
    }

    /// Removes the remote resource. Already absent counts as success.
    #[instrument(skip_all, fields(kind = self.driver.kind(), handle = %handle))]
    pub async fn delete(&self, handle: &ResourceHandle, ctx: &CallContext) -> Result<(), ReconcileError> {
        let kind = self.kind();
        debug!(kind, %handle, "Delete");
        match self.driver.lifecycle() {
            Lifecycle::Owned => match ctx.run(self.client.delete(kind, handle)).await {
                Ok(()) => info!(kind, %handle, "Deleted"),
                Err(ApiError::NotFound) => info!(kind, %handle, "Already absent"),
                Err(e) => return Err(self.reject(e, Operation::Delete, Some(handle))),
            },
            Lifecycle::Attached { .. } => {
                let current = match self.observe(handle, ctx).await {
                    Ok(Some(record)) => record,
                    Ok(None) => {
                        info!(kind, %handle, "Already absent");
                        return Ok(());
                    }
                    Err((operation, e)) => return Err(self.reject(e, operation, Some(handle))),
                };
                if let Some(members) = self
                    .driver
                    .membership_attribute()
                    .and_then(|attr| current.attributes.get_set(attr))
                    .filter(|members| !members.is_empty())
                {
                    match ctx.run(self.client.remove_members(kind, handle, members)).await {
                        Ok(()) | Err(ApiError::NotFound) => {}
                        Err(e) => return Err(self.reject(e, Operation::RemoveMembers, Some(handle))),
                    }
                }
                info!(kind, %handle, "Deleted");
            }
        }
        Ok(())
    }

    /// Adopts an existing remote object by its import identifier.
    #[instrument(skip_all, fields(kind = self.driver.kind(), import_id = %import_id))]
    pub async fn import(
        &self,
        import_id: &str,
        ctx: &CallContext,
    ) -> Result<(ResourceHandle, RemoteRecord), ReconcileError> {
        let kind = self.kind();
        debug!(kind, import_id, "Import");
        let key = self
            .driver
            .import_format()
            .decode(import_id)
            .map_err(|e| self.warned(e))?;

        let (handle, seed) = match self.driver.resolve_import(&key).map_err(|e| self.warned(e))? {
            ImportResolution::Direct { handle, seed } => (handle, seed),
            ImportResolution::Search {
                organization,
                name_attribute,
                name,
                seed,
            } => {
                let query = ListQuery::new(&organization).with_page_size(self.config.page_size);
                let found =
                    pager::find_by_name(self.client.as_ref(), ctx, kind, query, name_attribute, &name)
                        .await
                        .map_err(|e| self.reject(e, Operation::List, None))?;
                match found {
                    Some(wire) => (wire.id, seed),
                    None => {
                        return Err(self.warned(ReconcileError::NotFoundByName {
                            kind: kind.to_string(),
                            organization,
                            name,
                        }))
                    }
                }
            }
        };

        match self.observe(&handle, ctx).await {
            Ok(Some(mut record)) => {
                record.attributes.merge_missing(&seed);
                info!(kind, %handle, "Imported");
                Ok((handle, record))
            }
            Ok(None) => Err(self.warned(ReconcileError::ImportTargetNotFound {
                kind: kind.to_string(),
                import_id: import_id.to_string(),
            })),
            Err((operation, e)) => Err(self.reject(e, operation, Some(&handle))),
        }
    }

    /// Creates when there is no prior record, updates otherwise.
    pub async fn apply(
        &self,
        desired: &DesiredRecord,
        prior: Option<&RemoteRecord>,
        ctx: &CallContext,
    ) -> Result<(ResourceHandle, RemoteRecord), ReconcileError> {
        match prior {
            None => self.create(desired, ctx).await,
            Some(previous) => {
                let record = self.update(&previous.handle, desired, previous, ctx).await?;
                Ok((previous.handle.clone(), record))
            }
        }
    }

    fn check_kind(&self, desired: &DesiredRecord, operation: Operation) -> Result<(), ReconcileError> {
        if desired.kind == self.kind() {
            return Ok(());
        }
        Err(self.warned(ReconcileError::Validation {
            kind: self.kind().to_string(),
            operation,
            message: format!("desired record is of kind {}", desired.kind),
        }))
    }

    fn reject(&self, err: ApiError, operation: Operation, handle: Option<&ResourceHandle>) -> ReconcileError {
        self.warned(ReconcileError::from_api(err, self.kind(), operation, handle))
    }

    fn warned(&self, err: ReconcileError) -> ReconcileError {
        warn!(kind = self.kind(), error = %err, "Failed");
        err
    }
}
