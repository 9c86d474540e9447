//! Per-run state: the API handle, settings, and lazily resolved lookups.
//!
//! Steps of one run share a [`Session`] so the tenant, network and pod
//! lookups hit the API once. Pod-mutating steps invalidate the pod list.

use std::sync::Arc;

use tracing::debug;
use yarnctl_dockman::{DockmanApi, Pod, Tenant};

use crate::config::{RunOptions, Settings};
use crate::error::{CliError, CliResult};

/// Label of the per-tenant docker registry pod.
pub const REGISTRY_LABEL: &str = "docker-registry";

/// Label of the consul pod.
pub const CONSUL_LABEL: &str = "consul";

/// Values memoised for the rest of a run.
#[derive(Debug, Default)]
pub struct ConfigCache {
    tenant_name: Option<String>,
    tenant: Option<Tenant>,
    network: Option<String>,
    registry_ip: Option<String>,
    consul_ip: Option<String>,
    pods: Option<Vec<Pod>>,
}

/// Resolve the tenant namespace without caching it.
///
/// The first tenant wins. Without tenants the first namespace is used,
/// which only happens on test appliances.
pub async fn lookup_tenant_name(api: &dyn DockmanApi) -> CliResult<Option<String>> {
    let tenants = match api.list_tenants().await {
        Ok(tenants) => tenants,
        Err(err) if err.is_not_found() => return Err(CliError::ApiNotFound),
        Err(err) => return Err(err.into()),
    };
    if let Some(first) = tenants.first() {
        return Ok(first.ns().map(str::to_owned));
    }

    let namespaces = api.list_namespaces().await?;
    Ok(namespaces.into_iter().next().map(|n| n.ns))
}

/// First address of the first addressed pod labelled `name=<label>`.
fn labelled_ip(pods: &[Pod], label: &str) -> Option<String> {
    pods.iter()
        .filter(|pod| pod.label_name() == Some(label))
        .find_map(|pod| pod.first_ip().map(str::to_owned))
}

pub struct Session {
    api: Arc<dyn DockmanApi>,
    settings: Settings,
    options: RunOptions,
    cache: ConfigCache,
}

impl Session {
    pub fn new(api: Arc<dyn DockmanApi>, settings: Settings, options: RunOptions) -> Self {
        Self {
            api,
            settings,
            options,
            cache: ConfigCache::default(),
        }
    }

    pub fn api(&self) -> &dyn DockmanApi {
        self.api.as_ref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    pub fn verbose(&self) -> bool {
        self.options.verbose
    }

    /// Namespace of the tenant the cluster lives in.
    pub async fn tenant_name(&mut self) -> CliResult<String> {
        if let Some(name) = &self.cache.tenant_name {
            return Ok(name.clone());
        }
        let name = lookup_tenant_name(self.api())
            .await?
            .ok_or(CliError::NoTenant)?;
        debug!(tenant = %name, "resolved tenant");
        self.cache.tenant_name = Some(name.clone());
        Ok(name)
    }

    /// The tenant record, composed from its namespace and the first network
    /// when the tenant endpoint does not know it.
    pub async fn tenant(&mut self) -> CliResult<Tenant> {
        if let Some(tenant) = &self.cache.tenant {
            return Ok(tenant.clone());
        }
        let ns = self.tenant_name().await?;

        let tenant = match self.api.get_tenant(&ns).await {
            Ok(tenant) => tenant,
            Err(err) if err.is_fatal() => return Err(err.into()),
            Err(err) => {
                debug!(tenant = %ns, error = %err, "tenant lookup failed, composing from namespace");
                self.compose_tenant(&ns).await?
            }
        };
        self.cache.tenant = Some(tenant.clone());
        Ok(tenant)
    }

    async fn compose_tenant(&self, ns: &str) -> CliResult<Tenant> {
        let lookup = async {
            let namespace = self.api.get_namespace(ns).await?;
            let network = self.api.list_networks().await?.into_iter().next();
            Ok::<_, yarnctl_dockman::DockmanError>(Tenant {
                namespace: Some(namespace),
                network,
            })
        };
        match lookup.await {
            Ok(tenant) if tenant.network.is_some() => Ok(tenant),
            Ok(_) => Err(CliError::TenantNotFound(ns.to_owned())),
            Err(err) if err.is_fatal() => Err(err.into()),
            Err(_) => Err(CliError::TenantNotFound(ns.to_owned())),
        }
    }

    /// Name of the tenant network pods attach to.
    pub async fn network(&mut self) -> CliResult<String> {
        if let Some(network) = &self.cache.network {
            return Ok(network.clone());
        }
        let tenant = self.tenant().await?;
        let network = tenant
            .network_name()
            .map(str::to_owned)
            .ok_or_else(|| CliError::NetworkNotFound(tenant.ns().unwrap_or_default().to_owned()))?;
        self.cache.network = Some(network.clone());
        Ok(network)
    }

    /// Every pod of the tenant.
    pub async fn pods(&mut self) -> CliResult<Vec<Pod>> {
        if let Some(pods) = &self.cache.pods {
            return Ok(pods.clone());
        }
        let ns = self.tenant_name().await?;
        let pods = self.api.list_pods(&ns, None).await?;
        debug!(tenant = %ns, count = pods.len(), "listed pods");
        self.cache.pods = Some(pods.clone());
        Ok(pods)
    }

    /// Address of the tenant docker registry.
    pub async fn registry_ip(&mut self) -> CliResult<String> {
        if let Some(ip) = &self.cache.registry_ip {
            return Ok(ip.clone());
        }
        let pods = self.pods().await?;
        let ip = labelled_ip(&pods, REGISTRY_LABEL).ok_or(CliError::RegistryIpNotFound)?;
        self.cache.registry_ip = Some(ip.clone());
        Ok(ip)
    }

    /// Address of the consul server.
    pub async fn consul_ip(&mut self) -> CliResult<String> {
        if let Some(ip) = &self.cache.consul_ip {
            return Ok(ip.clone());
        }
        let pods = self.pods().await?;
        let ip = labelled_ip(&pods, CONSUL_LABEL).ok_or(CliError::ConsulIpNotFound)?;
        self.cache.consul_ip = Some(ip.clone());
        Ok(ip)
    }

    /// Forget the pod list so the next read fetches it again.
    pub fn invalidate_pods(&mut self) {
        self.cache.pods = None;
    }

    /// Forget the tenant after it was removed.
    pub fn invalidate_tenant(&mut self) {
        self.cache.tenant_name = None;
        self.cache.tenant = None;
    }
}
