//! Pod readiness polling.
//!
//! Pods are listed with a label filter and checked against a target phase.
//! A failed check costs one attempt; attempts are spaced by a fixed
//! interval.

use std::time::Duration;

use tracing::debug;
use yarnctl_dockman::{DockmanApi, Pod};

use crate::error::{CliError, CliResult};

/// Phase every deployed role must reach.
pub const RUNNING: &str = "Running";

/// Attempt budget of a readiness wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl PollPolicy {
    pub const fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }

    /// Total time the wait is allowed to take.
    pub fn budget(&self) -> Duration {
        self.interval.saturating_mul(self.attempts)
    }
}

/// Why a set of pods is not ready yet.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotReady {
    #[error("Could not find Pod that matches {0}")]
    NoPods(String),

    #[error("{0} has not been scheduled")]
    Unscheduled(String),

    #[error("{pod} is {phase}, not {target}")]
    WrongPhase {
        pod: String,
        phase: String,
        target: String,
    },

    #[error("{0} does not have an IP")]
    NoAddress(String),
}

/// Pods a wait is looking for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodWait {
    /// Name reported when the wait times out.
    pub name: String,
    pub namespace: String,
    /// `labels.<key>:<value>` filter; empty lists every pod.
    pub filter: String,
    pub phase: String,
    /// Also require every pod to have an address.
    pub check_ips: bool,
}

impl PodWait {
    /// Wait for the pods labelled `name=<label>` to run, addresses or not.
    pub fn running(namespace: &str, name: &str, label: &str) -> Self {
        Self {
            name: name.to_owned(),
            namespace: namespace.to_owned(),
            filter: format!("labels.name:{label}"),
            phase: RUNNING.to_owned(),
            check_ips: false,
        }
    }

    /// Check one listing of the matching pods.
    pub fn check(&self, pods: &[Pod]) -> Result<(), NotReady> {
        if pods.is_empty() {
            return Err(NotReady::NoPods(self.filter.clone()));
        }

        for pod in pods {
            let Some(phase) = pod.phase() else {
                return Err(NotReady::Unscheduled(pod.to_string()));
            };
            if phase != self.phase {
                return Err(NotReady::WrongPhase {
                    pod: pod.to_string(),
                    phase: phase.to_owned(),
                    target: self.phase.clone(),
                });
            }
            if self.check_ips && pod.ips().is_empty() {
                return Err(NotReady::NoAddress(pod.to_string()));
            }
        }
        Ok(())
    }
}

/// Poll until every pod matching `wait` is ready or the attempts run out.
///
/// Fatal API errors end the wait at once; any other failure costs an
/// attempt like a pod that is not ready.
pub async fn wait_for_pods(
    api: &dyn DockmanApi,
    wait: &PodWait,
    policy: PollPolicy,
) -> CliResult<()> {
    let filter = (!wait.filter.is_empty()).then_some(wait.filter.as_str());
    let mut reason = String::from("no attempt made");

    for attempt in 1..=policy.attempts {
        match api.list_pods(&wait.namespace, filter).await {
            Ok(pods) => match wait.check(&pods) {
                Ok(()) => {
                    debug!(pod = %wait.name, attempt, "pods ready");
                    return Ok(());
                }
                Err(not_ready) => reason = not_ready.to_string(),
            },
            Err(err) if err.is_fatal() => return Err(err.into()),
            Err(err) => reason = err.to_string(),
        }
        debug!(pod = %wait.name, attempt, %reason, "pods not ready");

        if attempt < policy.attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    Err(CliError::PodTimeout {
        pod: wait.name.clone(),
        namespace: wait.namespace.clone(),
        waited_secs: policy.budget().as_secs(),
        reason,
    })
}
