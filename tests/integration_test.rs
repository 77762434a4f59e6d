//! Whole lifecycles against the in-memory fake API: every kind is created, read,
//! updated, imported and deleted through the provider exactly as a host would.

use futures::future::join_all;
use reconcile_framework::{
    Attributes, CallContext, ControllerConfig, DesiredRecord, MemberSet, ReadOutcome,
    ReconcileError, ResourceHandle,
};
use tfe_reconcile::runtime::Sandbox;

fn members(names: &[&str]) -> MemberSet {
    names.iter().copied().collect()
}

fn policy(name: &str, text: &str) -> DesiredRecord {
    DesiredRecord::new(
        "tfe_policy",
        Attributes::new()
            .with("name", name)
            .with("organization", "acme")
            .with("policy", text),
    )
}

fn run_task(name: &str) -> Attributes {
    Attributes::new()
        .with("organization", "acme")
        .with("name", name)
        .with("url", "https://scanner.example.com/hook")
}

fn test_variable() -> Attributes {
    Attributes::new()
        .with("organization", "acme")
        .with("module_name", "vpc")
        .with("module_provider", "aws")
        .with("key", "key_test")
        .with("value", "value_test")
        .with("description", "some description")
}

#[tokio::test]
async fn test_policy_lifecycle() {
    let sandbox = Sandbox::start();
    let ctx = CallContext::new();
    let policies = sandbox.provider.controller("tfe_policy").unwrap();

    let (handle, created) = policies
        .create(&policy("deny-all", "main = rule { false }"), &ctx)
        .await
        .unwrap();
    assert_eq!(handle.as_str(), "pol-1");
    assert_eq!(created.attributes.get_str("kind"), Some("sentinel"));
    assert_eq!(created.attributes.get_str("enforce_mode"), Some("soft-mandatory"));
    assert_eq!(created.attributes.get_str("policy"), Some("main = rule { false }"));

    let desired = DesiredRecord::new(
        "tfe_policy",
        policy("deny-all", "main = rule { true }")
            .attributes
            .with("enforce_mode", "hard-mandatory")
            .with("description", "blocks everything"),
    );
    let updated = policies.update(&handle, &desired, &created, &ctx).await.unwrap();
    assert_eq!(updated.attributes.get_str("enforce_mode"), Some("hard-mandatory"));
    assert_eq!(updated.attributes.get_str("description"), Some("blocks everything"));
    assert_eq!(updated.attributes.get_str("policy"), Some("main = rule { true }"));

    // Renaming is not an in-place change.
    let renamed = DesiredRecord::new(
        "tfe_policy",
        desired.attributes.clone().with("name", "deny-most"),
    );
    let err = policies.update(&handle, &renamed, &updated, &ctx).await.unwrap_err();
    assert!(matches!(err, ReconcileError::RequiresReplacement { ref attributes, .. } if attributes == &["name"]));

    policies.delete(&handle, &ctx).await.unwrap();
    assert_eq!(policies.read(&handle, &ctx).await.unwrap(), ReadOutcome::Drifted);
    policies.delete(&handle, &ctx).await.unwrap();

    drop(policies);
    sandbox.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_policy_import_walks_pages() {
    let sandbox = Sandbox::start();
    let ctx = CallContext::new();
    let provider = sandbox
        .provider
        .clone()
        .with_config(ControllerConfig::default().with_page_size(1));
    let policies = provider.controller("tfe_policy").unwrap();

    for name in ["infra-policy-old", "network", "infra-policy"] {
        policies.create(&policy(name, "main = rule { true }"), &ctx).await.unwrap();
    }

    let (handle, record) = policies.import("acme/infra-policy", &ctx).await.unwrap();
    assert_eq!(handle.as_str(), "pol-3");
    assert_eq!(record.attributes.get_str("name"), Some("infra-policy"));

    let (handle, _) = policies.import("acme/pol-1", &ctx).await.unwrap();
    assert_eq!(handle.as_str(), "pol-1");

    assert!(matches!(
        policies.import("acme/missing", &ctx).await,
        Err(ReconcileError::NotFoundByName { .. })
    ));
    assert!(matches!(
        policies.import("acme/pol-99", &ctx).await,
        Err(ReconcileError::ImportTargetNotFound { .. })
    ));
}

#[tokio::test]
async fn test_team_members_lifecycle() {
    let sandbox = Sandbox::start();
    let ctx = CallContext::new();
    let team = ResourceHandle::new("team-1");
    sandbox
        .api
        .seed("tfe_team", team.clone(), Attributes::new().with("name", "owners"))
        .await
        .unwrap();
    let teams = sandbox.provider.controller("tfe_team_members").unwrap();
    let desired = |names: &[&str]| {
        DesiredRecord::new(
            "tfe_team_members",
            Attributes::new()
                .with("team_id", "team-1")
                .with("usernames", members(names)),
        )
    };

    let (handle, created) = teams.create(&desired(&["alice", "bob"]), &ctx).await.unwrap();
    assert_eq!(handle, team);
    assert_eq!(created.attributes.get_set("usernames"), Some(&members(&["alice", "bob"])));

    let updated = teams
        .update(&handle, &desired(&["bob", "carol"]), &created, &ctx)
        .await
        .unwrap();
    assert_eq!(updated.attributes.get_set("usernames"), Some(&members(&["bob", "carol"])));

    let (imported, record) = teams.import("team-1", &ctx).await.unwrap();
    assert_eq!(imported, team);
    assert_eq!(record, updated);

    teams.delete(&handle, &ctx).await.unwrap();
    assert!(teams.read(&handle, &ctx).await.unwrap().is_drifted());

    // Only the membership went away; the team itself is untouched.
    let object = sandbox.api.inspect(&team).await.unwrap().unwrap();
    assert!(object.members.is_empty());
    assert_eq!(object.attributes.get_str("name"), Some("owners"));
}

#[tokio::test]
async fn test_team_members_for_missing_team() {
    let sandbox = Sandbox::start();
    let teams = sandbox.provider.controller("tfe_team_members").unwrap();
    let desired = DesiredRecord::new(
        "tfe_team_members",
        Attributes::new()
            .with("team_id", "team-404")
            .with("usernames", members(&["alice"])),
    );

    let err = teams.create(&desired, &CallContext::new()).await.unwrap_err();
    assert!(matches!(err, ReconcileError::Validation { .. }), "{err:?}");
}

#[tokio::test]
async fn test_run_task_lifecycle() {
    let sandbox = Sandbox::start();
    let ctx = CallContext::new();
    let tasks = sandbox.provider.controller("tfe_organization_run_task").unwrap();

    let desired = DesiredRecord::new(
        "tfe_organization_run_task",
        run_task("scanner").with("hmac_key", "somepassword"),
    );
    let (handle, created) = tasks.create(&desired, &ctx).await.unwrap();
    assert_eq!(created.attributes.get_str("category"), Some("task"));
    assert_eq!(created.attributes.get_bool("enabled"), Some(false));
    assert!(!created.attributes.contains("hmac_key"));
    assert!(!created.attributes.contains("description"));

    let desired = DesiredRecord::new(
        "tfe_organization_run_task",
        desired
            .attributes
            .clone()
            .with("enabled", true)
            .with("description", "scans plans"),
    );
    let (same, updated) = tasks.apply(&desired, Some(&created), &ctx).await.unwrap();
    assert_eq!(same, handle);
    assert_eq!(updated.attributes.get_bool("enabled"), Some(true));
    assert_eq!(updated.attributes.get_str("description"), Some("scans plans"));

    let (imported, _) = tasks.import("acme/scanner", &ctx).await.unwrap();
    assert_eq!(imported, handle);

    let bad = DesiredRecord::new(
        "tfe_organization_run_task",
        run_task("other").with("url", "ftp://a.valid.url/path"),
    );
    assert!(matches!(
        tasks.create(&bad, &ctx).await,
        Err(ReconcileError::Validation { .. })
    ));

    tasks.delete(&handle, &ctx).await.unwrap();
    assert!(tasks.read(&handle, &ctx).await.unwrap().is_drifted());
}

#[tokio::test]
async fn test_test_variable_lifecycle() {
    let sandbox = Sandbox::start();
    let ctx = CallContext::new();
    let variables = sandbox.provider.controller("tfe_test_variable").unwrap();

    let desired = DesiredRecord::new("tfe_test_variable", test_variable());
    let (handle, created) = variables.create(&desired, &ctx).await.unwrap();
    assert_eq!(created.attributes.get_str("category"), Some("env"));
    assert_eq!(created.attributes.get_str("value"), Some("value_test"));

    let sensitive = DesiredRecord::new(
        "tfe_test_variable",
        test_variable()
            .with("key", "key_updated")
            .with("value", "value_updated")
            .with("sensitive", true),
    );
    let updated = variables.update(&handle, &sensitive, &created, &ctx).await.unwrap();
    assert_eq!(updated.attributes.get_str("key"), Some("key_updated"));
    assert!(!updated.attributes.contains("value"));

    let moved = DesiredRecord::new(
        "tfe_test_variable",
        test_variable().with("module_provider", "gcp"),
    );
    assert!(matches!(
        variables.update(&handle, &moved, &updated, &ctx).await,
        Err(ReconcileError::RequiresReplacement { .. })
    ));

    let import_id = format!("acme/vpc/aws/{handle}");
    let (imported, record) = variables.import(&import_id, &ctx).await.unwrap();
    assert_eq!(imported, handle);
    assert_eq!(record.attributes.get_str("module_name"), Some("vpc"));

    variables.delete(&handle, &ctx).await.unwrap();
    assert!(variables.read(&handle, &ctx).await.unwrap().is_drifted());
}

#[tokio::test]
async fn test_agent_pool_lookup() {
    let sandbox = Sandbox::start();
    let ctx = CallContext::new();
    for (id, name) in [("apool-1", "build-old"), ("apool-2", "build")] {
        sandbox
            .api
            .seed(
                "tfe_agent_pool",
                id,
                Attributes::new().with("name", name).with("organization", "acme"),
            )
            .await
            .unwrap();
    }

    let id = sandbox.provider.agent_pool_id("acme", "build", &ctx).await.unwrap();
    assert_eq!(id.as_str(), "apool-2");
    assert!(matches!(
        sandbox.provider.agent_pool_id("other", "build", &ctx).await,
        Err(ReconcileError::NotFoundByName { .. })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_for_distinct_handles() {
    let sandbox = Sandbox::start();
    let tasks = sandbox.provider.controller("tfe_organization_run_task").unwrap();

    let creates = (0..8).map(|i| {
        let tasks = tasks.clone();
        async move {
            let desired = DesiredRecord::new("tfe_organization_run_task", run_task(&format!("task-{i}")));
            tasks.create(&desired, &CallContext::new()).await
        }
    });
    let results = join_all(creates).await;

    let mut handles: Vec<ResourceHandle> = results
        .into_iter()
        .map(|result| result.unwrap().0)
        .collect();
    handles.sort();
    handles.dedup();
    assert_eq!(handles.len(), 8);
}

#[tokio::test]
async fn test_sandbox_shutdown_cancels_its_contexts() {
    let sandbox = Sandbox::start();
    let ctx = sandbox.context();
    let tasks = sandbox.provider.controller("tfe_organization_run_task").unwrap();
    let desired = DesiredRecord::new("tfe_organization_run_task", run_task("scanner"));
    let (handle, _) = tasks.create(&desired, &ctx).await.unwrap();
    assert!(!ctx.token().is_cancelled());

    drop(tasks);
    sandbox.shutdown().await.unwrap();
    assert!(ctx.token().is_cancelled());

    // The stale context refuses calls even against a live API.
    let next = Sandbox::start();
    let tasks = next.provider.controller("tfe_organization_run_task").unwrap();
    let err = tasks.read(&handle, &ctx).await.unwrap_err();
    assert!(matches!(err, ReconcileError::Cancelled { .. }), "{err:?}");
    assert!(tasks.read(&handle, &next.context()).await.unwrap().is_drifted());
}
