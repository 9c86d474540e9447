//! Replication controller specs for the cluster roles.
//!
//! Builders here are pure: they turn role parameters into the wire records
//! of `yarnctl_dockman` and never talk to the API.

use std::fmt;

use yarnctl_dockman::{
    name_labels, Container, EnvVar, NetworkAttachment, PodSpec, ReplicationController, Volume,
    VolumeMount,
};

/// Port the tenant registry listens on.
pub const REGISTRY_PORT: u16 = 5000;

pub const CONSUL_IMAGE: &str = "registry:5000/coho/consul";

const CONSUL_COMMAND: &str = "agent -bootstrap -server -data-dir=/var/lib/consul -log-level=debug";

/// Entry point of the YARN image; reads `ROLE` to pick the daemon.
pub const HADOOP_RUN: &str = "/usr/local/bin/cio-hadoop-run";

/// Seconds between consul connection attempts inside YARN containers.
const CONSUL_RETRY_INTERVAL: &str = "5";

const CONTAINER_NAME: &str = "container";

/// Cluster roles, each deployed as one replication controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Consul,
    ResourceManager,
    NodeManager,
    HistoryServer,
}

impl Role {
    /// Controller name and `name` label of the role.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Consul => "consul",
            Self::ResourceManager => "resourcemanager",
            Self::NodeManager => "nodemanager",
            Self::HistoryServer => "historyserver",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Consul => "consul",
            Self::ResourceManager => "resource manager",
            Self::NodeManager => "node manager",
            Self::HistoryServer => "history server",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Ephemeral disk mounted into the role container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeSpec {
    pub name: String,
    pub size_mb: u64,
    pub mount_path: String,
}

impl VolumeSpec {
    pub fn new(name: impl Into<String>, size_mb: u64, mount_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size_mb,
            mount_path: mount_path.into(),
        }
    }
}

/// Parameters of a single-container role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSpec {
    pub name: String,
    pub image: String,
    pub command: Vec<String>,
    pub volumes: Vec<VolumeSpec>,
    pub replicas: u32,
    pub hostname: String,
    pub env: Vec<EnvVar>,
    pub network: String,
}

impl RoleSpec {
    pub fn new(network: impl Into<String>, name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            command: Vec::new(),
            volumes: Vec::new(),
            replicas: 1,
            hostname: String::new(),
            env: Vec::new(),
            network: network.into(),
        }
    }

    #[must_use]
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command.push(command.into());
        self
    }

    #[must_use]
    pub fn with_volume(mut self, volume: VolumeSpec) -> Self {
        self.volumes.push(volume);
        self
    }

    #[must_use]
    pub fn with_replicas(mut self, replicas: u32) -> Self {
        self.replicas = replicas;
        self
    }

    #[must_use]
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    #[must_use]
    pub fn with_env(mut self, env: impl IntoIterator<Item = EnvVar>) -> Self {
        self.env.extend(env);
        self
    }

    /// Build the controller that runs this role in namespace `ns`.
    pub fn into_replication_controller(self, ns: &str) -> ReplicationController {
        let volumes = self
            .volumes
            .iter()
            .map(|v| Volume::ephemeral(v.name.clone(), v.size_mb))
            .collect();
        let volume_mounts = self
            .volumes
            .into_iter()
            .map(|v| VolumeMount {
                name: v.name,
                mount_path: v.mount_path,
            })
            .collect();

        let pod = PodSpec {
            on_networks: vec![NetworkAttachment::dynamic(self.network)],
            volumes,
            containers: vec![Container {
                name: CONTAINER_NAME.to_owned(),
                hostname: self.hostname,
                image: self.image,
                env: self.env,
                command: self.command,
                volume_mounts,
            }],
            restart_policy: None,
        };

        let labels = name_labels(self.name.clone());
        ReplicationController::new(self.name, ns, self.replicas, labels, pod)
    }
}

/// Join a path-like tail onto a base, the way image references are
/// composed: an absolute tail replaces the base.
pub fn join_path(base: &str, tail: &str) -> String {
    if tail.starts_with('/') || base.is_empty() {
        tail.to_owned()
    } else if base.ends_with('/') {
        format!("{base}{tail}")
    } else {
        format!("{base}/{tail}")
    }
}

/// Image reference inside the tenant registry.
pub fn registry_image(registry_ip: &str, image: &str) -> String {
    join_path(&format!("{registry_ip}:{REGISTRY_PORT}"), image)
}

/// Environment every YARN role needs to find consul.
pub fn consul_env(consul_ip: &str) -> Vec<EnvVar> {
    vec![
        EnvVar::new("CONSUL_IP", consul_ip),
        EnvVar::new("CONSUL_RETRY_INTERVAL", CONSUL_RETRY_INTERVAL),
    ]
}

pub fn consul(network: &str) -> RoleSpec {
    RoleSpec::new(network, Role::Consul.label(), CONSUL_IMAGE)
        .with_volume(VolumeSpec::new("consulvolume", 1_000_000, "/var/lib/consul"))
        .with_command(CONSUL_COMMAND)
}

/// Where YARN roles run and what they connect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YarnPlacement {
    pub network: String,
    pub registry_ip: String,
    pub consul_ip: String,
    pub yarn_image: String,
}

impl YarnPlacement {
    fn role(&self, role: Role) -> RoleSpec {
        RoleSpec::new(
            self.network.as_str(),
            role.label(),
            registry_image(&self.registry_ip, &self.yarn_image),
        )
        .with_command(HADOOP_RUN)
        .with_env(consul_env(&self.consul_ip))
        .with_env([EnvVar::new("ROLE", role.label())])
    }
}

pub fn resource_manager(placement: &YarnPlacement) -> RoleSpec {
    placement
        .role(Role::ResourceManager)
        .with_hostname(Role::ResourceManager.label())
}

pub fn node_manager(placement: &YarnPlacement, replicas: u32) -> RoleSpec {
    placement
        .role(Role::NodeManager)
        .with_volume(VolumeSpec::new("nmdatadir", 3_000_000, "/mnt"))
        .with_replicas(replicas)
}

pub fn history_server(placement: &YarnPlacement) -> RoleSpec {
    placement
        .role(Role::HistoryServer)
        .with_hostname(Role::HistoryServer.label())
}
