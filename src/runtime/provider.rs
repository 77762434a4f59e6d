use crate::kinds::{ResourceKind, UnknownResourceType};
use reconcile_framework::{
    pager, ApiClient, CallContext, Controller, ControllerConfig, ListQuery, Operation,
    ReconcileError, ResourceHandle,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Kind tag of the agent pool lookup. Agent pools are read, never reconciled.
pub const AGENT_POOL_KIND: &str = "tfe_agent_pool";

/// Entry point for a host: hands out controllers by resource type name over one
/// shared API client.
///
/// The provider holds no per-resource state. Controllers it returns are cheap to
/// create and can be used concurrently for distinct handles.
///
/// # Example
///
/// ```ignore
/// let provider = Provider::new(Arc::new(client));
/// let policies = provider.controller("tfe_policy")?;
/// let (handle, observed) = policies.create(&desired, &CallContext::new()).await?;
/// ```
pub struct Provider<C: ?Sized> {
    client: Arc<C>,
    config: ControllerConfig,
}

impl<C: ?Sized> Clone for Provider<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            config: self.config.clone(),
        }
    }
}

impl<C> Provider<C>
where
    C: ApiClient + ?Sized,
{
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            config: ControllerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// The controller for a resource type name such as `tfe_policy`.
    pub fn controller(&self, type_name: &str) -> Result<Controller<ResourceKind, C>, UnknownResourceType> {
        let kind = type_name.parse::<ResourceKind>().map_err(|e| {
            warn!(type_name, "Unknown resource type");
            e
        })?;
        Ok(self.controller_for(kind))
    }

    pub fn controller_for(&self, kind: ResourceKind) -> Controller<ResourceKind, C> {
        Controller::new(kind, Arc::clone(&self.client)).with_config(self.config.clone())
    }

    /// Finds the handle of the agent pool called exactly `name` in `organization`.
    ///
    /// Walks the paged listing with `name` as the search hint and stops at the first
    /// exact match.
    #[instrument(skip(self, ctx))]
    pub async fn agent_pool_id(
        &self,
        organization: &str,
        name: &str,
        ctx: &CallContext,
    ) -> Result<ResourceHandle, ReconcileError> {
        debug!(organization, name, "Lookup agent pool");
        let query = ListQuery::new(organization).with_page_size(self.config.page_size);
        let found = pager::find_by_name(self.client.as_ref(), ctx, AGENT_POOL_KIND, query, "name", name)
            .await
            .map_err(|e| ReconcileError::from_api(e, AGENT_POOL_KIND, Operation::List, None))?;

        match found {
            Some(pool) => {
                info!(organization, name, id = %pool.id, "Found agent pool");
                Ok(pool.id)
            }
            None => {
                warn!(organization, name, "Agent pool not found");
                Err(ReconcileError::NotFoundByName {
                    kind: AGENT_POOL_KIND.to_string(),
                    organization: organization.to_string(),
                    name: name.to_string(),
                })
            }
        }
    }
}
