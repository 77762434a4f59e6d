//! # Policy
//!
//! `tfe_policy`: a Sentinel or OPA policy owned by an organization. The metadata
//! (name, kind, description, enforcement, OPA query) and the policy text live behind
//! separate endpoints, so the text is the kind's content attribute: uploaded after
//! create, downloaded on every read, and re-uploaded only when it changed.
//!
//! ## Structure
//!
//! - [`enforcement`] - [`PolicyKind`] and [`EnforceMode`] rules per policy language
//! - [`error`] - [`PolicyError`] for local validation
//!
//! ## Import
//!
//! `<organization>/<policy>` where the second field is either a policy handle
//! (`pol-...`) or a policy name, which is looked up by a paged search.
//!
//! A second field starting with `pol-` is always taken as a handle. A policy whose
//! name itself starts with `pol-` cannot be imported by name; import it by handle.

pub mod enforcement;
pub mod error;

pub use enforcement::{EnforceMode, PolicyKind};
pub use error::PolicyError;

use crate::kinds::rejected;
use enforcement::ENFORCE_BLOCK;
use reconcile_framework::{
    Attributes, DesiredRecord, ImportFormat, ImportKey, ImportResolution, Operation, Options,
    ReconcileError, RemoteRecord, ResourceDriver, ResourceHandle, WireRecord,
};
use std::collections::BTreeSet;

pub const KIND: &str = "tfe_policy";
pub const HANDLE_PREFIX: &str = "pol-";

const IMPORT: ImportFormat = ImportFormat::new(KIND, &["organization", "policy"]);

/// Attributes that flow through update unchanged in meaning.
const UPDATABLE: &[&str] = &["description", "enforce_mode", "query"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PolicyDriver;

fn required<'a>(attrs: &'a Attributes, name: &'static str) -> Result<&'a str, PolicyError> {
    attrs
        .get_str(name)
        .filter(|v| !v.is_empty())
        .ok_or(PolicyError::MissingAttribute(name))
}

fn policy_kind(attrs: &Attributes) -> Result<PolicyKind, PolicyError> {
    attrs
        .get_str("kind")
        .map(str::parse)
        .transpose()
        .map(Option::unwrap_or_default)
}

fn create_options(attrs: &Attributes) -> Result<Options, PolicyError> {
    let name = required(attrs, "name")?;
    let organization = required(attrs, "organization")?;
    required(attrs, "policy")?;
    let kind = policy_kind(attrs)?;
    let mode = kind.mode(attrs.get_str("enforce_mode"))?;

    let mut options = Options::new()
        .with("name", name)
        .with("organization", organization)
        .with("kind", kind.as_str())
        .with(ENFORCE_BLOCK, kind.enforcement(name, mode));
    options.copy_from(attrs, "description");
    match (kind, attrs.get_str("query")) {
        (PolicyKind::Opa, Some(query)) => options.insert("query", query),
        (PolicyKind::Sentinel, Some(_)) => return Err(PolicyError::QueryNotSupported),
        (_, None) => {}
    }
    Ok(options)
}

fn update_options(attrs: &Attributes, changed: &BTreeSet<String>) -> Result<Option<Options>, PolicyError> {
    if !UPDATABLE.iter().any(|attr| changed.contains(*attr)) {
        return Ok(None);
    }
    let kind = policy_kind(attrs)?;
    let mut options = Options::new();

    if changed.contains("description") {
        options.insert("description", attrs.get_str("description").unwrap_or_default());
    }
    if changed.contains("enforce_mode") {
        let name = required(attrs, "name")?;
        let mode = kind.mode(attrs.get_str("enforce_mode"))?;
        options.insert(ENFORCE_BLOCK, kind.enforcement(name, mode));
    }
    if changed.contains("query") {
        match kind {
            PolicyKind::Opa => options.insert("query", attrs.get_str("query").unwrap_or_default()),
            PolicyKind::Sentinel if attrs.contains("query") => {
                return Err(PolicyError::QueryNotSupported)
            }
            PolicyKind::Sentinel => {}
        }
    }
    Ok((!options.is_empty()).then_some(options))
}

impl ResourceDriver for PolicyDriver {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn build_create_options(&self, desired: &DesiredRecord) -> Result<Options, ReconcileError> {
        create_options(&desired.attributes).map_err(|e| rejected(KIND, Operation::Create, e))
    }

    fn build_update_options(
        &self,
        desired: &DesiredRecord,
        changed: &BTreeSet<String>,
    ) -> Result<Option<Options>, ReconcileError> {
        update_options(&desired.attributes, changed).map_err(|e| rejected(KIND, Operation::Update, e))
    }

    fn apply_observed(&self, wire: WireRecord, content: Option<Vec<u8>>) -> RemoteRecord {
        let mut attributes = Attributes::new();
        for name in ["name", "organization", "kind", "query"] {
            attributes.copy_from(&wire.attributes, name);
        }
        if let Some(description) = wire.attributes.get_str("description").filter(|d| !d.is_empty()) {
            attributes.insert("description", description);
        }
        // Zero or several enforcement blocks leave the mode unset.
        if let Some([block]) = wire.attributes.get_blocks(ENFORCE_BLOCK) {
            if let Some(mode) = block.get_str("mode") {
                attributes.insert("enforce_mode", mode);
            }
        }
        if let Some(text) = content {
            attributes.insert("policy", String::from_utf8_lossy(&text).into_owned());
        }
        RemoteRecord::new(KIND, wire.id, attributes)
    }

    fn content_attribute(&self) -> Option<&'static str> {
        Some("policy")
    }

    fn immutable_attributes(&self) -> &'static [&'static str] {
        &["name", "organization", "kind"]
    }

    /// An omitted `kind` means Sentinel, both on create and when diffing for update.
    fn with_defaults(&self, desired: &DesiredRecord) -> DesiredRecord {
        let mut desired = desired.clone();
        if !desired.attributes.contains("kind") {
            desired.attributes.insert("kind", PolicyKind::default().as_str());
        }
        desired
    }

    fn import_format(&self) -> ImportFormat {
        IMPORT
    }

    fn resolve_import(&self, key: &ImportKey) -> Result<ImportResolution, ReconcileError> {
        let organization = key.get("organization").unwrap_or_default();
        let policy = key.get("policy").unwrap_or_default();
        let seed = Attributes::new().with("organization", organization);
        if policy.starts_with(HANDLE_PREFIX) {
            return Ok(ImportResolution::Direct {
                handle: ResourceHandle::new(policy),
                seed,
            });
        }
        Ok(ImportResolution::Search {
            organization: organization.to_string(),
            name_attribute: "name",
            name: policy.to_string(),
            seed,
        })
    }
}
