//! # Resource Kinds
//!
//! The closed set of kinds this provider reconciles. [`ResourceKind`] is itself a
//! [`ResourceDriver`] that forwards to the kind's driver, so one
//! [`Controller`](reconcile_framework::Controller) type serves every kind and the
//! provider can pick it by type name at runtime.

use crate::policy::PolicyDriver;
use crate::run_task::RunTaskDriver;
use crate::team_members::TeamMembersDriver;
use crate::test_variable::TestVariableDriver;
use crate::{policy, run_task, team_members, test_variable};
use reconcile_framework::{
    DesiredRecord, ImportFormat, ImportKey, ImportResolution, Lifecycle, Operation, Options,
    ReconcileError, RemoteRecord, ResourceDriver, WireRecord,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{self, Display};
use std::str::FromStr;

/// A local validation failure, reported before any remote call.
pub(crate) fn rejected(kind: &'static str, operation: Operation, err: impl Display) -> ReconcileError {
    ReconcileError::Validation {
        kind: kind.to_string(),
        operation,
        message: err.to_string(),
    }
}

/// Serialized as the resource type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    #[serde(rename = "tfe_policy")]
    Policy,
    #[serde(rename = "tfe_team_members")]
    TeamMembers,
    #[serde(rename = "tfe_organization_run_task")]
    RunTask,
    #[serde(rename = "tfe_test_variable")]
    TestVariable,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Policy,
        ResourceKind::TeamMembers,
        ResourceKind::RunTask,
        ResourceKind::TestVariable,
    ];

    pub fn type_name(&self) -> &'static str {
        match self {
            ResourceKind::Policy => policy::KIND,
            ResourceKind::TeamMembers => team_members::KIND,
            ResourceKind::RunTask => run_task::KIND,
            ResourceKind::TestVariable => test_variable::KIND,
        }
    }

    pub fn from_type_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.type_name() == name)
    }

    fn driver(&self) -> &'static dyn ResourceDriver {
        match self {
            ResourceKind::Policy => &PolicyDriver,
            ResourceKind::TeamMembers => &TeamMembersDriver,
            ResourceKind::RunTask => &RunTaskDriver,
            ResourceKind::TestVariable => &TestVariableDriver,
        }
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown resource type {0:?}")]
pub struct UnknownResourceType(pub String);

impl FromStr for ResourceKind {
    type Err = UnknownResourceType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_type_name(s).ok_or_else(|| UnknownResourceType(s.to_string()))
    }
}

impl ResourceDriver for ResourceKind {
    fn kind(&self) -> &'static str {
        self.driver().kind()
    }

    fn build_create_options(&self, desired: &DesiredRecord) -> Result<Options, ReconcileError> {
        self.driver().build_create_options(desired)
    }

    fn build_update_options(
        &self,
        desired: &DesiredRecord,
        changed: &BTreeSet<String>,
    ) -> Result<Option<Options>, ReconcileError> {
        self.driver().build_update_options(desired, changed)
    }

    fn apply_observed(&self, wire: WireRecord, content: Option<Vec<u8>>) -> RemoteRecord {
        self.driver().apply_observed(wire, content)
    }

    fn content_attribute(&self) -> Option<&'static str> {
        self.driver().content_attribute()
    }

    fn membership_attribute(&self) -> Option<&'static str> {
        self.driver().membership_attribute()
    }

    fn lifecycle(&self) -> Lifecycle {
        self.driver().lifecycle()
    }

    fn immutable_attributes(&self) -> &'static [&'static str] {
        self.driver().immutable_attributes()
    }

    fn observed_absent(&self, observed: &RemoteRecord) -> bool {
        self.driver().observed_absent(observed)
    }

    fn with_defaults(&self, desired: &DesiredRecord) -> DesiredRecord {
        self.driver().with_defaults(desired)
    }

    fn import_format(&self) -> ImportFormat {
        self.driver().import_format()
    }

    fn resolve_import(&self, key: &ImportKey) -> Result<ImportResolution, ReconcileError> {
        self.driver().resolve_import(key)
    }
}
