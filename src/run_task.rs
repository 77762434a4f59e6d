//! # Organization Run Task
//!
//! `tfe_organization_run_task`: an external service called during runs. `hmac_key` is
//! write-only: the API never returns it, so it never appears in an observed record and
//! is re-sent on every update that declares it.

use crate::kinds::rejected;
use reconcile_framework::{
    Attributes, DesiredRecord, ImportFormat, ImportKey, ImportResolution, Operation, Options,
    ReconcileError, RemoteRecord, ResourceDriver, WireRecord,
};
use std::collections::BTreeSet;
use thiserror::Error;

pub const KIND: &str = "tfe_organization_run_task";
pub const DEFAULT_CATEGORY: &str = "task";

const IMPORT: ImportFormat = ImportFormat::new(KIND, &["organization", "name"]);

const UPDATABLE: &[&str] = &["name", "url", "category", "hmac_key", "enabled", "description"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunTaskError {
    #[error("{0} is required")]
    MissingAttribute(&'static str),
    #[error("expected url to not be empty")]
    EmptyUrl,
    #[error("expected {0:?} to have a url with schema of: \"http,https\"")]
    UrlScheme(String),
    #[error("category must be \"task\", got {0:?}")]
    Category(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTaskDriver;

fn validate(attrs: &Attributes) -> Result<(), RunTaskError> {
    for name in ["organization", "name"] {
        if attrs.get_str(name).map_or(true, str::is_empty) {
            return Err(RunTaskError::MissingAttribute(name));
        }
    }
    match attrs.get_str("url") {
        None | Some("") => return Err(RunTaskError::EmptyUrl),
        Some(url) if !(url.starts_with("http://") || url.starts_with("https://")) => {
            return Err(RunTaskError::UrlScheme(url.to_string()))
        }
        Some(_) => {}
    }
    match attrs.get_str("category") {
        Some(category) if category != DEFAULT_CATEGORY => {
            Err(RunTaskError::Category(category.to_string()))
        }
        _ => Ok(()),
    }
}

/// `name` with its declared value, or the default when it is not declared.
fn declared_or_default(options: &mut Options, attrs: &Attributes, name: &str) {
    match name {
        "category" => options.insert(name, attrs.get_str(name).unwrap_or(DEFAULT_CATEGORY)),
        "enabled" => options.insert(name, attrs.get_bool(name).unwrap_or(false)),
        _ => options.insert(name, attrs.get_str(name).unwrap_or_default()),
    }
}

impl ResourceDriver for RunTaskDriver {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn build_create_options(&self, desired: &DesiredRecord) -> Result<Options, ReconcileError> {
        let attrs = &desired.attributes;
        validate(attrs).map_err(|e| rejected(KIND, Operation::Create, e))?;
        let mut options = Options::new();
        options.copy_from(attrs, "organization");
        for name in UPDATABLE {
            declared_or_default(&mut options, attrs, name);
        }
        Ok(options)
    }

    fn build_update_options(
        &self,
        desired: &DesiredRecord,
        changed: &BTreeSet<String>,
    ) -> Result<Option<Options>, ReconcileError> {
        let attrs = &desired.attributes;
        validate(attrs).map_err(|e| rejected(KIND, Operation::Update, e))?;
        let mut options = Options::new();
        for name in UPDATABLE.iter().filter(|name| changed.contains(**name)) {
            declared_or_default(&mut options, attrs, name);
        }
        Ok((!options.is_empty()).then_some(options))
    }

    fn apply_observed(&self, wire: WireRecord, _content: Option<Vec<u8>>) -> RemoteRecord {
        let mut attributes = Attributes::new();
        for name in ["organization", "name", "url", "category", "enabled"] {
            attributes.copy_from(&wire.attributes, name);
        }
        if let Some(description) = wire.attributes.get_str("description").filter(|d| !d.is_empty()) {
            attributes.insert("description", description);
        }
        RemoteRecord::new(KIND, wire.id, attributes)
    }

    fn immutable_attributes(&self) -> &'static [&'static str] {
        &["organization"]
    }

    fn import_format(&self) -> ImportFormat {
        IMPORT
    }

    fn resolve_import(&self, key: &ImportKey) -> Result<ImportResolution, ReconcileError> {
        let organization = key.get("organization").unwrap_or_default();
        Ok(ImportResolution::Search {
            organization: organization.to_string(),
            name_attribute: "name",
            name: key.get("name").unwrap_or_default().to_string(),
            seed: Attributes::new().with("organization", organization),
        })
    }
}
