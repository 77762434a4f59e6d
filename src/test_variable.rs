//! # Registry Module Test Variable
//!
//! `tfe_test_variable`: an environment variable set on the test runs of a private
//! registry module. The module coordinates (organization, name, provider) fix where the
//! variable lives and cannot change in place. Sensitive values are write-only.

use crate::kinds::rejected;
use reconcile_framework::{
    Attributes, DesiredRecord, ImportFormat, ImportKey, ImportResolution, Operation, Options,
    ReconcileError, RemoteRecord, ResourceDriver, ResourceHandle, WireRecord,
};
use std::collections::BTreeSet;
use thiserror::Error;

pub const KIND: &str = "tfe_test_variable";
pub const CATEGORY: &str = "env";

const MODULE: &[&str] = &["organization", "module_name", "module_provider"];

const IMPORT: ImportFormat = ImportFormat::new(
    KIND,
    &["organization", "module_name", "module_provider", "variable_id"],
);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TestVariableError {
    #[error("{0} is required")]
    MissingAttribute(&'static str),
    #[error("test variables only support the \"env\" category, got {0:?}")]
    Category(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestVariableDriver;

fn validate(attrs: &Attributes) -> Result<(), TestVariableError> {
    for name in std::iter::once(&"key").chain(MODULE) {
        if attrs.get_str(name).map_or(true, str::is_empty) {
            return Err(TestVariableError::MissingAttribute(*name));
        }
    }
    match attrs.get_str("category") {
        Some(category) if category != CATEGORY => Err(TestVariableError::Category(category.to_string())),
        _ => Ok(()),
    }
}

fn variable_fields(options: &mut Options, attrs: &Attributes, changed: Option<&BTreeSet<String>>) {
    let wanted = |name: &str| changed.map_or(true, |set| set.contains(name));
    for name in ["key", "value", "description"] {
        if wanted(name) {
            options.insert(name, attrs.get_str(name).unwrap_or_default());
        }
    }
    if wanted("category") {
        options.insert("category", CATEGORY);
    }
    for name in ["hcl", "sensitive"] {
        if wanted(name) {
            options.insert(name, attrs.get_bool(name).unwrap_or(false));
        }
    }
}

impl ResourceDriver for TestVariableDriver {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn build_create_options(&self, desired: &DesiredRecord) -> Result<Options, ReconcileError> {
        let attrs = &desired.attributes;
        validate(attrs).map_err(|e| rejected(KIND, Operation::Create, e))?;
        let mut options = Options::new();
        for name in MODULE {
            options.copy_from(attrs, name);
        }
        variable_fields(&mut options, attrs, None);
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
        variable_fields(&mut options, attrs, Some(changed));
        Ok((!options.is_empty()).then_some(options))
    }

    fn apply_observed(&self, wire: WireRecord, _content: Option<Vec<u8>>) -> RemoteRecord {
        let mut attributes = Attributes::new();
        for name in MODULE.iter().chain(&["key", "category", "hcl", "sensitive"]) {
            attributes.copy_from(&wire.attributes, name);
        }
        if let Some(description) = wire.attributes.get_str("description").filter(|d| !d.is_empty()) {
            attributes.insert("description", description);
        }
        if wire.attributes.get_bool("sensitive") != Some(true) {
            attributes.copy_from(&wire.attributes, "value");
        }
        RemoteRecord::new(KIND, wire.id, attributes)
    }

    fn immutable_attributes(&self) -> &'static [&'static str] {
        MODULE
    }

    fn import_format(&self) -> ImportFormat {
        IMPORT
    }

    fn resolve_import(&self, key: &ImportKey) -> Result<ImportResolution, ReconcileError> {
        let seed = key
            .fields()
            .filter(|(field, _)| MODULE.contains(field))
            .collect::<Attributes>();
        Ok(ImportResolution::Direct {
            handle: ResourceHandle::new(key.get("variable_id").unwrap_or_default()),
            seed,
        })
    }
}
