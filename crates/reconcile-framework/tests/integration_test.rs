use async_trait::async_trait;
use reconcile_framework::fake::{FakeApi, FakeApiClient};
use reconcile_framework::tracing::try_setup_tracing;
use reconcile_framework::{
    ApiClient, ApiError, Attributes, CallContext, Controller, DesiredRecord, ImportFormat,
    ImportKey, ImportResolution, Lifecycle, ListQuery, MemberSet, Options, Page, ReadOutcome,
    ReconcileError, RemoteRecord, ResourceDriver, ResourceHandle, WireRecord, MEMBERS_ATTRIBUTE,
};
use std::collections::BTreeSet;
use std::sync::Arc;

// --- Test Drivers ---

#[derive(Clone)]
struct Workspace;

impl ResourceDriver for Workspace {
    fn kind(&self) -> &'static str {
        "tfe_workspace"
    }

    fn build_create_options(&self, desired: &DesiredRecord) -> Result<Options, ReconcileError> {
        Ok(desired.attributes.clone())
    }

    fn build_update_options(
        &self,
        desired: &DesiredRecord,
        changed: &BTreeSet<String>,
    ) -> Result<Option<Options>, ReconcileError> {
        let options: Options = changed
            .iter()
            .filter_map(|name| desired.attributes.get(name).map(|v| (name.clone(), v.clone())))
            .collect();
        Ok((!options.is_empty()).then_some(options))
    }

    fn apply_observed(&self, wire: WireRecord, _content: Option<Vec<u8>>) -> RemoteRecord {
        RemoteRecord::new(self.kind(), wire.id, wire.attributes)
    }

    fn import_format(&self) -> ImportFormat {
        ImportFormat::new("tfe_workspace", &["organization", "name"])
    }

    fn resolve_import(&self, key: &ImportKey) -> Result<ImportResolution, ReconcileError> {
        Ok(ImportResolution::Search {
            organization: key.get("organization").unwrap_or_default().to_string(),
            name_attribute: "name",
            name: key.get("name").unwrap_or_default().to_string(),
            seed: Attributes::new(),
        })
    }
}

/// Membership of a seeded group, reconciled by add/remove batches.
#[derive(Clone)]
struct GroupMembers;

impl ResourceDriver for GroupMembers {
    fn kind(&self) -> &'static str {
        "group_members"
    }

    fn build_create_options(&self, _desired: &DesiredRecord) -> Result<Options, ReconcileError> {
        Ok(Options::new())
    }

    fn build_update_options(
        &self,
        _desired: &DesiredRecord,
        _changed: &BTreeSet<String>,
    ) -> Result<Option<Options>, ReconcileError> {
        Ok(None)
    }

    fn apply_observed(&self, wire: WireRecord, _content: Option<Vec<u8>>) -> RemoteRecord {
        let members = wire
            .attributes
            .get_set(MEMBERS_ATTRIBUTE)
            .cloned()
            .unwrap_or_default();
        let attributes = Attributes::new()
            .with("group_id", wire.id.as_str())
            .with("members", members);
        RemoteRecord::new(self.kind(), wire.id, attributes)
    }

    fn membership_attribute(&self) -> Option<&'static str> {
        Some("members")
    }

    fn lifecycle(&self) -> Lifecycle {
        Lifecycle::Attached {
            parent_attribute: "group_id",
        }
    }

    fn immutable_attributes(&self) -> &'static [&'static str] {
        &["group_id"]
    }

    fn observed_absent(&self, observed: &RemoteRecord) -> bool {
        observed
            .attributes
            .get_set("members")
            .map_or(true, MemberSet::is_empty)
    }

    fn import_format(&self) -> ImportFormat {
        ImportFormat::new("group_members", &["group_id"])
    }

    fn resolve_import(&self, key: &ImportKey) -> Result<ImportResolution, ReconcileError> {
        Ok(ImportResolution::Direct {
            handle: key.get("group_id").unwrap_or_default().into(),
            seed: Attributes::new(),
        })
    }
}

/// Cancels the call context right after the first successful add, so the update stops
/// between its add and its remove.
struct CancelAfterAdd {
    inner: FakeApiClient,
    ctx: CallContext,
}

#[async_trait]
impl ApiClient for CancelAfterAdd {
    async fn create(&self, kind: &str, options: Options) -> Result<WireRecord, ApiError> {
        self.inner.create(kind, options).await
    }

    async fn read(&self, kind: &str, id: &ResourceHandle) -> Result<WireRecord, ApiError> {
        self.inner.read(kind, id).await
    }

    async fn update(
        &self,
        kind: &str,
        id: &ResourceHandle,
        options: Options,
    ) -> Result<WireRecord, ApiError> {
        self.inner.update(kind, id, options).await
    }

    async fn delete(&self, kind: &str, id: &ResourceHandle) -> Result<(), ApiError> {
        self.inner.delete(kind, id).await
    }

    async fn list(&self, kind: &str, query: &ListQuery, page: u32) -> Result<Page<WireRecord>, ApiError> {
        self.inner.list(kind, query, page).await
    }

    async fn upload_content(&self, kind: &str, id: &ResourceHandle, content: Vec<u8>) -> Result<(), ApiError> {
        self.inner.upload_content(kind, id, content).await
    }

    async fn download_content(&self, kind: &str, id: &ResourceHandle) -> Result<Vec<u8>, ApiError> {
        self.inner.download_content(kind, id).await
    }

    async fn add_members(&self, kind: &str, id: &ResourceHandle, members: &MemberSet) -> Result<(), ApiError> {
        let result = self.inner.add_members(kind, id, members).await;
        self.ctx.token().cancel();
        result
    }

    async fn remove_members(&self, kind: &str, id: &ResourceHandle, members: &MemberSet) -> Result<(), ApiError> {
        self.inner.remove_members(kind, id, members).await
    }
}

fn workspace(name: &str) -> DesiredRecord {
    DesiredRecord::new(
        "tfe_workspace",
        Attributes::new().with("organization", "acme").with("name", name),
    )
}

fn group(members: &[&str]) -> DesiredRecord {
    DesiredRecord::new(
        "group_members",
        Attributes::new()
            .with("group_id", "grp-1")
            .with("members", members.iter().copied().collect::<MemberSet>()),
    )
}

// --- Tests ---

#[tokio::test]
async fn test_delete_twice_is_idempotent_and_read_reports_drift() {
    try_setup_tracing();
    let controller = Controller::new(Workspace, Arc::new(FakeApi::spawn()));
    let ctx = CallContext::new();

    let (handle, record) = controller.create(&workspace("prod"), &ctx).await.unwrap();
    assert_eq!(record.attributes.get_str("name"), Some("prod"));

    controller.delete(&handle, &ctx).await.unwrap();
    controller.delete(&handle, &ctx).await.unwrap();

    let outcome = controller.read(&handle, &ctx).await.unwrap();
    assert_eq!(outcome, ReadOutcome::Drifted);
}

#[tokio::test]
async fn test_update_after_remote_delete_is_stale_reference() {
    try_setup_tracing();
    let api = FakeApi::spawn();
    let controller = Controller::new(Workspace, Arc::new(api.clone()));
    let ctx = CallContext::new();

    let (handle, previous) = controller.create(&workspace("prod"), &ctx).await.unwrap();
    api.delete("tfe_workspace", &handle).await.unwrap();

    let err = controller
        .update(&handle, &workspace("renamed"), &previous, &ctx)
        .await
        .unwrap_err();
    assert!(err.is_stale_reference());
    assert_eq!(err.handle(), Some(&handle));
}

#[tokio::test]
async fn test_import_by_name_walks_pages() {
    try_setup_tracing();
    let api = FakeApi::spawn();
    let controller = Controller::new(Workspace, Arc::new(api)).with_config(
        reconcile_framework::ControllerConfig::default().with_page_size(2),
    );
    let ctx = CallContext::new();

    // The search hint matches three of these, so the exact match sits on page 2.
    for name in ["alpha", "target-old", "target-x", "target"] {
        controller.create(&workspace(name), &ctx).await.unwrap();
    }

    let (handle, record) = controller.import("acme/target", &ctx).await.unwrap();
    assert_eq!(handle.as_str(), "wor-4");
    assert_eq!(record.attributes.get_str("name"), Some("target"));

    let err = controller.import("acme/missing", &ctx).await.unwrap_err();
    assert!(matches!(err, ReconcileError::NotFoundByName { .. }));
}

#[tokio::test]
async fn test_attached_membership_lifecycle() {
    try_setup_tracing();
    let api = FakeApi::spawn();
    api.seed("group", "grp-1", Attributes::new().with("name", "owners"))
        .await
        .unwrap();
    let controller = Controller::new(GroupMembers, Arc::new(api.clone()));
    let ctx = CallContext::new();

    let (handle, previous) = controller.create(&group(&["bob", "carol"]), &ctx).await.unwrap();
    assert_eq!(handle.as_str(), "grp-1");

    let record = controller
        .update(&handle, &group(&["alice", "bob"]), &previous, &ctx)
        .await
        .unwrap();
    let members: Vec<&str> = record.attributes.get_set("members").unwrap().iter().collect();
    assert_eq!(members, vec!["alice", "bob"]);

    controller.delete(&handle, &ctx).await.unwrap();
    assert_eq!(controller.read(&handle, &ctx).await.unwrap(), ReadOutcome::Drifted);

    // The parent itself survives; only its membership was managed.
    let parent = api.inspect(&handle).await.unwrap().unwrap();
    assert!(parent.members.is_empty());
}

#[tokio::test]
async fn test_cancel_between_add_and_remove_leaves_superset() {
    try_setup_tracing();
    let api = FakeApi::spawn();
    api.seed("group", "grp-1", Attributes::new()).await.unwrap();
    let setup = Controller::new(GroupMembers, Arc::new(api.clone()));
    let (handle, previous) = setup
        .create(&group(&["bob", "carol"]), &CallContext::new())
        .await
        .unwrap();

    let ctx = CallContext::new();
    let client = Arc::new(CancelAfterAdd {
        inner: api.clone(),
        ctx: ctx.clone(),
    });
    let controller = Controller::new(GroupMembers, client);

    let err = controller
        .update(&handle, &group(&["alice", "bob"]), &previous, &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::Cancelled { .. }));

    let stored = api.inspect(&handle).await.unwrap().unwrap();
    let desired: MemberSet = ["alice", "bob"].into_iter().collect();
    assert!(desired.is_subset(&stored.members));
    assert!(stored.members.contains("carol"));
}

#[tokio::test]
async fn test_controller_keeps_no_per_handle_state() {
    try_setup_tracing();
    let api = FakeApi::spawn();
    let controller = Controller::new(Workspace, Arc::new(api.clone()));
    let ctx = CallContext::new();

    let (handle, _) = controller.create(&workspace("prod"), &ctx).await.unwrap();
    api.update(
        "tfe_workspace",
        &handle,
        Attributes::new().with("description", "changed out of band"),
    )
    .await
    .unwrap();

    // A clone sees the same fresh remote state, and so does the original.
    let from_clone = controller.clone().read(&handle, &ctx).await.unwrap();
    let from_original = controller.read(&handle, &ctx).await.unwrap();
    assert_eq!(from_clone, from_original);
    let record = from_original.into_record().unwrap();
    assert_eq!(record.attributes.get_str("description"), Some("changed out of band"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_distinct_handles_reconcile_concurrently() {
    try_setup_tracing();
    let controller = Controller::new(Workspace, Arc::new(FakeApi::spawn()));

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let controller = controller.clone();
            tokio::spawn(async move {
                let ctx = CallContext::new();
                let (handle, previous) = controller
                    .create(&workspace(&format!("ws-{i}")), &ctx)
                    .await?;
                let desired = DesiredRecord::new(
                    "tfe_workspace",
                    previous.attributes.clone().with("description", format!("d-{i}")),
                );
                let updated = controller.update(&handle, &desired, &previous, &ctx).await?;
                controller.delete(&handle, &ctx).await?;
                Ok::<_, ReconcileError>(updated)
            })
        })
        .collect();

    let mut handles = BTreeSet::new();
    for (i, task) in tasks.into_iter().enumerate() {
        let record = task.await.unwrap().unwrap();
        assert_eq!(
            record.attributes.get_str("description"),
            Some(format!("d-{i}").as_str())
        );
        handles.insert(record.handle);
    }
    assert_eq!(handles.len(), 16);
}
