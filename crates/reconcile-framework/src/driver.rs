//! # ResourceDriver Trait
//!
//! The `ResourceDriver` trait is the contract every resource kind (policy, team
//! membership, run task, ...) implements to be reconciled by the generic
//! [`Controller`](crate::Controller). The controller owns the remote call sequence;
//! the driver only translates between declared attributes and wire payloads and
//! answers a handful of capability questions.
//!
//! Drivers are plain synchronous values. They never talk to the API themselves, which
//! keeps every remote call under the controller's cancellation and error mapping.
//!
//! # Provided Methods
//! Capabilities with a sensible default:
//! - [`ResourceDriver::content_attribute`] / [`ResourceDriver::membership_attribute`]: `None`
//! - [`ResourceDriver::lifecycle`]: [`Lifecycle::Owned`]
//! - [`ResourceDriver::immutable_attributes`]: none
//! - [`ResourceDriver::observed_absent`]: never
//! - [`ResourceDriver::with_defaults`]: the desired record unchanged
//!
//! Override them only when the kind needs it.

use crate::client::{Options, WireRecord};
use crate::codec::{ImportFormat, ImportKey};
use crate::error::ReconcileError;
use crate::record::{Attributes, DesiredRecord, RemoteRecord, ResourceHandle};
use std::collections::BTreeSet;

/// Who owns the remote object behind a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// The resource is a standalone remote object: create allocates it, delete removes it.
    Owned,
    /// The resource is a facet of a parent object named by `parent_attribute`
    /// (e.g. the membership of a team). Its handle is the parent's handle; create
    /// and delete only touch the facet.
    Attached { parent_attribute: &'static str },
}

/// How an import key maps onto a remote object.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportResolution {
    /// The key names the handle directly.
    Direct {
        handle: ResourceHandle,
        seed: Attributes,
    },
    /// The key names an object by organization and name; a paginated search finds it.
    Search {
        organization: String,
        name_attribute: &'static str,
        name: String,
        seed: Attributes,
    },
}

/// Contract for one resource kind.
pub trait ResourceDriver: Send + Sync + 'static {
    /// The kind tag, e.g. `tfe_policy`. Also selects the API endpoint.
    fn kind(&self) -> &'static str;

    /// Validates the desired record and builds the create payload.
    ///
    /// Called before any remote call, so a rejection here has no side effects.
    fn build_create_options(&self, desired: &DesiredRecord) -> Result<Options, ReconcileError>;

    /// Builds the update payload for the changed attribute names.
    ///
    /// `Ok(None)` means the metadata endpoint has nothing to do (e.g. only the content
    /// or the membership changed).
    fn build_update_options(
        &self,
        desired: &DesiredRecord,
        changed: &BTreeSet<String>,
    ) -> Result<Option<Options>, ReconcileError>;

    /// Maps a wire record (plus downloaded content, when the kind has any) into the
    /// observed record.
    fn apply_observed(&self, wire: WireRecord, content: Option<Vec<u8>>) -> RemoteRecord;

    /// Attribute holding a separately uploaded body, if the kind has one.
    fn content_attribute(&self) -> Option<&'static str> {
        None
    }

    /// Attribute holding a [`MemberSet`](crate::MemberSet) reconciled by add/remove batches.
    fn membership_attribute(&self) -> Option<&'static str> {
        None
    }

    fn lifecycle(&self) -> Lifecycle {
        Lifecycle::Owned
    }

    /// Attributes that cannot change in place.
    fn immutable_attributes(&self) -> &'static [&'static str] {
        &[]
    }

    /// Whether an observed record means "nothing is there" even though the read
    /// succeeded (e.g. a team with no members).
    fn observed_absent(&self, _observed: &RemoteRecord) -> bool {
        false
    }

    /// The desired record with every omitted attribute that has a declared default
    /// filled in. Update diffs this against the previous record, so an omitted
    /// immutable attribute is compared by the value it stands for.
    fn with_defaults(&self, desired: &DesiredRecord) -> DesiredRecord {
        desired.clone()
    }

    fn import_format(&self) -> ImportFormat;

    /// Maps a decoded import key to a remote lookup.
    fn resolve_import(&self, key: &ImportKey) -> Result<ImportResolution, ReconcileError>;
}
