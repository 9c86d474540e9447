use async_trait::async_trait;

use crate::error::DockmanResult;
use crate::types::{Namespace, Network, Pod, ReplicationController, Tenant};

/// Operations of the dockman API used to run a compute cluster.
///
/// Listing operations return every item across all pages.
#[async_trait]
pub trait DockmanApi: Send + Sync {
    async fn list_tenants(&self) -> DockmanResult<Vec<Tenant>>;

    async fn get_tenant(&self, ns: &str) -> DockmanResult<Tenant>;

    async fn create_tenant(&self, tenant: &Tenant) -> DockmanResult<()>;

    async fn delete_tenant(&self, ns: &str) -> DockmanResult<()>;

    async fn list_namespaces(&self) -> DockmanResult<Vec<Namespace>>;

    async fn get_namespace(&self, ns: &str) -> DockmanResult<Namespace>;

    async fn list_networks(&self) -> DockmanResult<Vec<Network>>;

    /// List pods of `ns`, optionally narrowed by a `labels.<key>:<value>` filter.
    async fn list_pods(&self, ns: &str, filters: Option<&str>) -> DockmanResult<Vec<Pod>>;

    async fn delete_pod(&self, ns: &str, name: &str) -> DockmanResult<()>;

    async fn create_replication_controller(
        &self,
        ns: &str,
        rc: &ReplicationController,
    ) -> DockmanResult<()>;

    async fn delete_replication_controller(&self, ns: &str, name: &str) -> DockmanResult<()>;
}
