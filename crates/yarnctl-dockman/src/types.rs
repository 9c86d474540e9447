//! Wire types for the dockman API.
//!
//! Field names follow the JSON the API speaks, which mixes `snake_case`
//! (`on_networks`) with `camelCase` (`podTemplate`, `volumeMounts`).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Label set attached to pods and used as replica selector.
pub type Labels = BTreeMap<String, String>;

/// Label key every role is selected by.
pub const NAME_LABEL: &str = "name";

/// Build the single-entry `{name: <value>}` label set.
#[must_use]
pub fn name_labels(value: impl Into<String>) -> Labels {
    Labels::from([(NAME_LABEL.to_owned(), value.into())])
}

/// Pagination metadata of a collection response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    /// Total number of items across all pages.
    pub count: u64,
}

/// One page of a collection response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub meta: PageMeta,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// A namespace reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    pub ns: String,
}

impl Namespace {
    pub fn new(ns: impl Into<String>) -> Self {
        Self { ns: ns.into() }
    }
}

/// IPv4 network of a VLAN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct V4Network {
    pub subnet: String,
}

/// VLAN settings of a tenant network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vlan {
    pub vlanid: u32,
    pub v4network: V4Network,
}

/// Network allocated to a tenant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlan: Option<Vlan>,
}

impl Network {
    /// A named network, as reported by the API.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

/// A tenant: an isolated namespace plus its network allocation.
///
/// Used both for listings and for tenant creation, so every part is optional
/// on the way in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<Namespace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<Network>,
}

impl Tenant {
    /// A tenant on a VLAN-mode network.
    pub fn vlan(ns: impl Into<String>, vlanid: u32, subnet: impl Into<String>) -> Self {
        Self {
            namespace: Some(Namespace::new(ns)),
            network: Some(Network {
                name: None,
                mode: Some("VLAN".to_owned()),
                vlan: Some(Vlan {
                    vlanid,
                    v4network: V4Network {
                        subnet: subnet.into(),
                    },
                }),
            }),
        }
    }

    /// Namespace name, if the tenant carries one.
    pub fn ns(&self) -> Option<&str> {
        self.namespace.as_ref().map(|n| n.ns.as_str())
    }

    /// Name of the tenant network, if assigned.
    pub fn network_name(&self) -> Option<&str> {
        self.network.as_ref().and_then(|n| n.name.as_deref())
    }
}

/// Observed state of a pod.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(rename = "podIPs", default, skip_serializing_if = "Option::is_none")]
    pub pod_ips: Option<Vec<String>>,
}

/// A deployed pod.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pod {
    pub name: String,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub status: PodStatus,
}

impl Pod {
    /// Value of the `name` label.
    pub fn label_name(&self) -> Option<&str> {
        self.labels.get(NAME_LABEL).map(String::as_str)
    }

    pub fn phase(&self) -> Option<&str> {
        self.status.phase.as_deref()
    }

    /// Assigned IP addresses; empty until the pod is scheduled.
    pub fn ips(&self) -> &[String] {
        self.status.pod_ips.as_deref().unwrap_or_default()
    }

    pub fn first_ip(&self) -> Option<&str> {
        self.ips().first().map(String::as_str)
    }
}

impl fmt::Display for Pod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pod {} with labels {:?}", self.name, self.labels)
    }
}

/// Environment variable of a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

impl EnvVar {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeMount {
    pub name: String,
    #[serde(rename = "mountPath")]
    pub mount_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub name: String,
    pub hostname: String,
    pub image: String,
    pub env: Vec<EnvVar>,
    pub command: Vec<String>,
    #[serde(rename = "volumeMounts")]
    pub volume_mounts: Vec<VolumeMount>,
}

/// Scratch disk that lives as long as the pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EphemeralDisk {
    #[serde(rename = "sizeMB")]
    pub size_mb: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeSource {
    #[serde(rename = "cohoEphemeralDisk")]
    pub ephemeral_disk: EphemeralDisk,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub name: String,
    pub source: VolumeSource,
}

impl Volume {
    pub fn ephemeral(name: impl Into<String>, size_mb: u64) -> Self {
        Self {
            name: name.into(),
            source: VolumeSource {
                ephemeral_disk: EphemeralDisk { size_mb },
            },
        }
    }
}

/// Attachment of a pod to a tenant network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkAttachment {
    pub addresses: Vec<String>,
    pub name: String,
}

impl NetworkAttachment {
    /// Attach to `name` with API-assigned addresses.
    pub fn dynamic(name: impl Into<String>) -> Self {
        Self {
            addresses: Vec::new(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodSpec {
    pub on_networks: Vec<NetworkAttachment>,
    pub volumes: Vec<Volume>,
    pub containers: Vec<Container>,
    #[serde(rename = "restartPolicy", default, skip_serializing_if = "Option::is_none")]
    pub restart_policy: Option<String>,
}

/// Pod shape stamped out by a replication controller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodTemplate {
    pub spec: PodSpec,
    pub labels: Labels,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationControllerSpec {
    pub replicas: u32,
    #[serde(rename = "replicaSelector")]
    pub replica_selector: Labels,
    #[serde(rename = "podTemplate")]
    pub pod_template: PodTemplate,
}

/// Desired replica count of a pod template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationController {
    pub name: String,
    pub ns: String,
    pub spec: ReplicationControllerSpec,
}

impl ReplicationController {
    /// Create a controller whose selector equals the template labels.
    pub fn new(
        name: impl Into<String>,
        ns: impl Into<String>,
        replicas: u32,
        labels: Labels,
        spec: PodSpec,
    ) -> Self {
        Self {
            name: name.into(),
            ns: ns.into(),
            spec: ReplicationControllerSpec {
                replicas,
                replica_selector: labels.clone(),
                pod_template: PodTemplate { spec, labels },
            },
        }
    }

    pub fn labels(&self) -> &Labels {
        &self.spec.pod_template.labels
    }
}

impl fmt::Display for ReplicationController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} with labels {:?}", self.name, self.labels())
    }
}
