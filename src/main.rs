use reconcile_framework::{Attributes, DesiredRecord, MemberSet, ReadOutcome};
use tfe_reconcile::runtime::{setup_tracing, Sandbox};
use tracing::{info, Instrument};

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    info!("Starting sandbox provider");
    let sandbox = Sandbox::start();
    let ctx = sandbox.context();

    // The team exists outside this provider; only its membership is managed.
    sandbox
        .api
        .seed("tfe_team", "team-1", Attributes::new().with("name", "owners").with("organization", "acme"))
        .await
        .map_err(|e| e.to_string())?;

    let policies = sandbox.provider.controller("tfe_policy").map_err(|e| e.to_string())?;
    let policy = DesiredRecord::new(
        "tfe_policy",
        Attributes::new()
            .with("name", "deny-all")
            .with("organization", "acme")
            .with("policy", "main = rule { false }"),
    );
    let (policy_id, observed) = policies
        .create(&policy, &ctx)
        .instrument(tracing::info_span!("policy_creation"))
        .await
        .map_err(|e| e.to_string())?;
    info!(policy_id = %policy_id, mode = ?observed.attributes.get_str("enforce_mode"), "Policy created");

    let members = sandbox
        .provider
        .controller("tfe_team_members")
        .map_err(|e| e.to_string())?;
    let desired = |names: &[&str]| {
        DesiredRecord::new(
            "tfe_team_members",
            Attributes::new()
                .with("team_id", "team-1")
                .with("usernames", names.iter().copied().collect::<MemberSet>()),
        )
    };
    let (team_id, observed) = members
        .create(&desired(&["alice", "bob"]), &ctx)
        .await
        .map_err(|e| e.to_string())?;
    let observed = members
        .update(&team_id, &desired(&["bob", "carol"]), &observed, &ctx)
        .await
        .map_err(|e| e.to_string())?;
    info!(team_id = %team_id, usernames = ?observed.attributes.get_set("usernames"), "Team members reconciled");

    members.delete(&team_id, &ctx).await.map_err(|e| e.to_string())?;
    policies.delete(&policy_id, &ctx).await.map_err(|e| e.to_string())?;

    match policies.read(&policy_id, &ctx).await.map_err(|e| e.to_string())? {
        ReadOutcome::Drifted => info!(policy_id = %policy_id, "Policy is gone"),
        ReadOutcome::Present(_) => return Err(format!("{policy_id} still exists")),
    }

    drop(policies);
    drop(members);
    sandbox.shutdown().await
}
