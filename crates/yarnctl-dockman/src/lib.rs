//! Client for the dockman container orchestration API.
//!
//! [`DockmanApi`] is the seam every caller goes through. [`HttpDockman`]
//! talks to a live appliance; [`MemoryDockman`] (feature `memory`) keeps
//! everything in process memory.

mod error;
mod http;
mod pagination;
mod traits;
mod types;

#[cfg(any(test, feature = "memory"))]
mod memory;

pub use error::{DockmanError, DockmanResult};
pub use http::{api_url, Credentials, HttpConfig, HttpDockman, MAX_REDIRECTS};
pub use pagination::{collect_pages, page_count, PAGE_SIZE};
pub use traits::DockmanApi;
pub use types::{
    name_labels, Container, EnvVar, EphemeralDisk, Labels, Namespace, Network, NetworkAttachment,
    Page, PageMeta, Pod, PodSpec, PodStatus, PodTemplate, ReplicationController,
    ReplicationControllerSpec, Tenant, V4Network, Vlan, Volume, VolumeMount, VolumeSource,
    NAME_LABEL,
};

#[cfg(any(test, feature = "memory"))]
pub use memory::{MemoryDockman, Operation};
