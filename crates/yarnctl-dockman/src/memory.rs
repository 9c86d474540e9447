//! In-memory dockman API for tests and dry runs.
//!
//! Replication controllers stamp out pods on creation. Pods start without a
//! phase and turn `Running` with an address after a configurable number of
//! pod listings, which lets callers exercise readiness polling.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::{DockmanError, DockmanResult};
use crate::traits::DockmanApi;
use crate::types::{Namespace, Network, Pod, PodStatus, ReplicationController, Tenant};

/// API operations, used to inject failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListTenants,
    GetTenant,
    CreateTenant,
    DeleteTenant,
    ListNamespaces,
    GetNamespace,
    ListNetworks,
    ListPods,
    DeletePod,
    CreateReplicationController,
    DeleteReplicationController,
}

#[derive(Debug, Default)]
struct State {
    tenants: Vec<Tenant>,
    namespaces: Vec<Namespace>,
    networks: Vec<Network>,
    pods: BTreeMap<String, Vec<Pod>>,
    /// Remaining listings before a pod turns `Running`, keyed by (ns, pod).
    starting: HashMap<(String, String), usize>,
    rcs: BTreeMap<(String, String), ReplicationController>,
    failures: HashMap<Operation, u16>,
    requests: Vec<String>,
    next_ip: u32,
}

impl State {
    fn record(&mut self, op: Operation, request: String) -> DockmanResult<()> {
        let result = match self.failures.get(&op) {
            Some(401) => Err(DockmanError::Unauthorized),
            Some(403) => Err(DockmanError::Forbidden),
            Some(code) => Err(DockmanError::status(*code, request.clone(), "")),
            None => Ok(()),
        };
        self.requests.push(request);
        result
    }

    fn assign_ip(&mut self) -> String {
        self.next_ip += 1;
        format!("10.0.{}.{}", self.next_ip / 256, self.next_ip % 256)
    }

    fn advance_startup(&mut self) {
        let mut ready = Vec::new();
        for (key, remaining) in &mut self.starting {
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                ready.push(key.clone());
            }
        }
        for key in ready {
            self.starting.remove(&key);
            self.mark_running(&key.0, &key.1);
        }
    }

    fn mark_running(&mut self, ns: &str, name: &str) {
        let ip = self.assign_ip();
        if let Some(pod) = self
            .pods
            .get_mut(ns)
            .and_then(|pods| pods.iter_mut().find(|p| p.name == name))
        {
            pod.status = PodStatus {
                phase: Some("Running".to_owned()),
                pod_ips: Some(vec![ip]),
            };
        }
    }
}

/// Matches a `labels.<key>:<value>` filter against a pod.
fn matches_filter(pod: &Pod, filters: Option<&str>) -> bool {
    let Some(filter) = filters else {
        return true;
    };
    let Some((key, value)) = filter
        .strip_prefix("labels.")
        .and_then(|rest| rest.split_once(':'))
    else {
        return false;
    };
    pod.labels.get(key).is_some_and(|v| v == value)
}

/// Dockman API backed by process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryDockman {
    state: Arc<Mutex<State>>,
    startup_polls: usize,
}

impl MemoryDockman {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pods created by replication controllers turn `Running` after this
    /// many pod listings. Zero makes them `Running` immediately.
    #[must_use]
    pub fn with_startup_polls(mut self, polls: usize) -> Self {
        self.startup_polls = polls;
        self
    }

    /// Seed a tenant with its namespace and a named network.
    #[must_use]
    pub fn with_tenant(self, ns: &str, network: &str) -> Self {
        {
            let mut state = self.lock();
            state.tenants.push(Tenant {
                namespace: Some(Namespace::new(ns)),
                network: Some(Network::named(network)),
            });
            state.namespaces.push(Namespace::new(ns));
            state.networks.push(Network::named(network));
        }
        self
    }

    /// Seed a namespace that has no tenant record.
    #[must_use]
    pub fn with_namespace(self, ns: &str, network: &str) -> Self {
        {
            let mut state = self.lock();
            state.namespaces.push(Namespace::new(ns));
            state.networks.push(Network::named(network));
        }
        self
    }

    /// Seed a running pod labelled `name=<label>` with one address.
    #[must_use]
    pub fn with_running_pod(self, ns: &str, name: &str, label: &str, ip: &str) -> Self {
        self.insert_pod(
            ns,
            Pod {
                name: name.to_owned(),
                labels: crate::types::name_labels(label),
                status: PodStatus {
                    phase: Some("Running".to_owned()),
                    pod_ips: Some(vec![ip.to_owned()]),
                },
            },
        );
        self
    }

    pub fn insert_pod(&self, ns: &str, pod: Pod) {
        self.lock().pods.entry(ns.to_owned()).or_default().push(pod);
    }

    /// Make every call of `op` fail with `status`.
    pub fn fail(&self, op: Operation, status: u16) {
        self.lock().failures.insert(op, status);
    }

    pub fn clear_failure(&self, op: Operation) {
        self.lock().failures.remove(&op);
    }

    pub fn pods(&self, ns: &str) -> Vec<Pod> {
        self.lock().pods.get(ns).cloned().unwrap_or_default()
    }

    pub fn replication_controllers(&self, ns: &str) -> Vec<ReplicationController> {
        self.lock()
            .rcs
            .iter()
            .filter(|((rc_ns, _), _)| rc_ns == ns)
            .map(|(_, rc)| rc.clone())
            .collect()
    }

    pub fn tenants(&self) -> Vec<Tenant> {
        self.lock().tenants.clone()
    }

    /// Requests served so far, as `METHOD path` strings.
    pub fn requests(&self) -> Vec<String> {
        self.lock().requests.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl DockmanApi for MemoryDockman {
    async fn list_tenants(&self) -> DockmanResult<Vec<Tenant>> {
        let mut state = self.lock();
        state.record(Operation::ListTenants, "GET tenant".to_owned())?;
        Ok(state.tenants.clone())
    }

    async fn get_tenant(&self, ns: &str) -> DockmanResult<Tenant> {
        let mut state = self.lock();
        let request = format!("GET tenant/{ns}");
        state.record(Operation::GetTenant, request.clone())?;
        state
            .tenants
            .iter()
            .find(|t| t.ns() == Some(ns))
            .cloned()
            .ok_or_else(|| DockmanError::not_found(request))
    }

    async fn create_tenant(&self, tenant: &Tenant) -> DockmanResult<()> {
        let mut state = self.lock();
        state.record(Operation::CreateTenant, "POST tenant".to_owned())?;
        let ns = tenant.ns().unwrap_or_default().to_owned();
        if state.tenants.iter().any(|t| t.ns() == Some(ns.as_str())) {
            return Err(DockmanError::conflict("POST tenant"));
        }
        state.tenants.push(tenant.clone());
        state.namespaces.push(Namespace::new(ns));
        Ok(())
    }

    async fn delete_tenant(&self, ns: &str) -> DockmanResult<()> {
        let mut state = self.lock();
        let request = format!("DELETE tenant/{ns}");
        state.record(Operation::DeleteTenant, request.clone())?;
        let before = state.tenants.len();
        state.tenants.retain(|t| t.ns() != Some(ns));
        if state.tenants.len() == before {
            return Err(DockmanError::not_found(request));
        }
        state.namespaces.retain(|n| n.ns != ns);
        Ok(())
    }

    async fn list_namespaces(&self) -> DockmanResult<Vec<Namespace>> {
        let mut state = self.lock();
        state.record(Operation::ListNamespaces, "GET ns".to_owned())?;
        Ok(state.namespaces.clone())
    }

    async fn get_namespace(&self, ns: &str) -> DockmanResult<Namespace> {
        let mut state = self.lock();
        let request = format!("GET ns/{ns}");
        state.record(Operation::GetNamespace, request.clone())?;
        state
            .namespaces
            .iter()
            .find(|n| n.ns == ns)
            .cloned()
            .ok_or_else(|| DockmanError::not_found(request))
    }

    async fn list_networks(&self) -> DockmanResult<Vec<Network>> {
        let mut state = self.lock();
        state.record(Operation::ListNetworks, "GET network".to_owned())?;
        Ok(state.networks.clone())
    }

    async fn list_pods(&self, ns: &str, filters: Option<&str>) -> DockmanResult<Vec<Pod>> {
        let mut state = self.lock();
        state.record(Operation::ListPods, format!("GET ns/{ns}/pods"))?;
        state.advance_startup();
        Ok(state
            .pods
            .get(ns)
            .map(|pods| {
                pods.iter()
                    .filter(|p| matches_filter(p, filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete_pod(&self, ns: &str, name: &str) -> DockmanResult<()> {
        let mut state = self.lock();
        let request = format!("DELETE ns/{ns}/pods/{name}");
        state.record(Operation::DeletePod, request.clone())?;
        let pods = state.pods.entry(ns.to_owned()).or_default();
        let before = pods.len();
        pods.retain(|p| p.name != name);
        if pods.len() == before {
            return Err(DockmanError::not_found(request));
        }
        state.starting.remove(&(ns.to_owned(), name.to_owned()));
        Ok(())
    }

    async fn create_replication_controller(
        &self,
        ns: &str,
        rc: &ReplicationController,
    ) -> DockmanResult<()> {
        let mut state = self.lock();
        let request = format!("POST ns/{ns}/replicationcontrollers");
        state.record(Operation::CreateReplicationController, request.clone())?;
        let key = (ns.to_owned(), rc.name.clone());
        if state.rcs.contains_key(&key) {
            return Err(DockmanError::conflict(request));
        }
        state.rcs.insert(key, rc.clone());

        for i in 0..rc.spec.replicas {
            let name = format!("{}-{i}", rc.name);
            state.pods.entry(ns.to_owned()).or_default().push(Pod {
                name: name.clone(),
                labels: rc.labels().clone(),
                status: PodStatus::default(),
            });
            if self.startup_polls == 0 {
                state.mark_running(ns, &name);
            } else {
                state
                    .starting
                    .insert((ns.to_owned(), name), self.startup_polls);
            }
        }
        Ok(())
    }

    async fn delete_replication_controller(&self, ns: &str, name: &str) -> DockmanResult<()> {
        let mut state = self.lock();
        let request = format!("DELETE ns/{ns}/replicationcontrollers/{name}");
        state.record(Operation::DeleteReplicationController, request.clone())?;
        state
            .rcs
            .remove(&(ns.to_owned(), name.to_owned()))
            .map(|_| ())
            .ok_or_else(|| DockmanError::not_found(request))
    }
}
