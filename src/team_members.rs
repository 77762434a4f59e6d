//! # Team Members
//!
//! `tfe_team_members`: the full membership of an existing team. The team itself is
//! not managed here, so the kind is attached to its `team_id` and the team's handle is
//! the resource handle. Membership changes go out as add/remove batches; a team with
//! no members at all is reported as drift.

use crate::kinds::rejected;
use reconcile_framework::{
    Attributes, DesiredRecord, ImportFormat, ImportKey, ImportResolution, Lifecycle, MemberSet,
    Operation, Options, ReconcileError, RemoteRecord, ResourceDriver, ResourceHandle, WireRecord,
    MEMBERS_ATTRIBUTE,
};
use std::collections::BTreeSet;
use thiserror::Error;

pub const KIND: &str = "tfe_team_members";

const IMPORT: ImportFormat = ImportFormat::new(KIND, &["team_id"]);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TeamMembersError {
    #[error("team_id is required")]
    MissingTeam,
    #[error("usernames must contain at least one user")]
    NoUsernames,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeamMembersDriver;

fn validate(attrs: &Attributes) -> Result<(), TeamMembersError> {
    if attrs.get_str("team_id").map_or(true, str::is_empty) {
        return Err(TeamMembersError::MissingTeam);
    }
    if attrs.get_set("usernames").map_or(true, MemberSet::is_empty) {
        return Err(TeamMembersError::NoUsernames);
    }
    Ok(())
}

impl ResourceDriver for TeamMembersDriver {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn build_create_options(&self, desired: &DesiredRecord) -> Result<Options, ReconcileError> {
        validate(&desired.attributes).map_err(|e| rejected(KIND, Operation::Create, e))?;
        Ok(Options::new())
    }

    fn build_update_options(
        &self,
        desired: &DesiredRecord,
        _changed: &BTreeSet<String>,
    ) -> Result<Option<Options>, ReconcileError> {
        validate(&desired.attributes).map_err(|e| rejected(KIND, Operation::Update, e))?;
        Ok(None)
    }

    fn apply_observed(&self, wire: WireRecord, _content: Option<Vec<u8>>) -> RemoteRecord {
        let usernames = wire
            .attributes
            .get_set(MEMBERS_ATTRIBUTE)
            .cloned()
            .unwrap_or_default();
        let attributes = Attributes::new()
            .with("team_id", wire.id.as_str())
            .with("usernames", usernames);
        RemoteRecord::new(KIND, wire.id, attributes)
    }

    fn membership_attribute(&self) -> Option<&'static str> {
        Some("usernames")
    }

    fn lifecycle(&self) -> Lifecycle {
        Lifecycle::Attached {
            parent_attribute: "team_id",
        }
    }

    fn immutable_attributes(&self) -> &'static [&'static str] {
        &["team_id"]
    }

    fn observed_absent(&self, observed: &RemoteRecord) -> bool {
        observed
            .attributes
            .get_set("usernames")
            .map_or(true, MemberSet::is_empty)
    }

    fn import_format(&self) -> ImportFormat {
        IMPORT
    }

    fn resolve_import(&self, key: &ImportKey) -> Result<ImportResolution, ReconcileError> {
        let team_id = key.get("team_id").unwrap_or_default();
        Ok(ImportResolution::Direct {
            handle: ResourceHandle::new(team_id),
            seed: Attributes::new().with("team_id", team_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_usernames_rejected_before_any_call() {
        let desired = DesiredRecord::new(
            KIND,
            Attributes::new()
                .with("team_id", "team-1")
                .with("usernames", MemberSet::new()),
        );
        let err = TeamMembersDriver.build_create_options(&desired).unwrap_err();
        assert_eq!(err.to_string(), "invalid tfe_team_members configuration (create): usernames must contain at least one user");
    }

    #[test]
    fn test_no_members_observed_is_absent() {
        let wire = WireRecord::new("team-1", Attributes::new().with("name", "owners"));
        let record = TeamMembersDriver.apply_observed(wire, None);
        assert_eq!(record.attributes.get_str("team_id"), Some("team-1"));
        assert!(TeamMembersDriver.observed_absent(&record));

        let members: MemberSet = ["alice"].into_iter().collect();
        let wire = WireRecord::new("team-1", Attributes::new().with(MEMBERS_ATTRIBUTE, members));
        assert!(!TeamMembersDriver.observed_absent(&TeamMembersDriver.apply_observed(wire, None)));
    }
}
