//! Submitting replication controllers and tearing them down again.

use tracing::{debug, info};
use yarnctl_dockman::ReplicationController;

use crate::error::{CliError, CliResult};
use crate::readiness::{wait_for_pods, PodWait, PollPolicy};
use crate::session::Session;

/// Submit `rcs` to namespace `ns`, then wait for the pods labelled
/// `name=<label>` to run.
///
/// A controller that already exists is reported and left alone. Any other
/// failure stops the deployment.
pub async fn deploy_replication_controllers(
    session: &mut Session,
    ns: &str,
    rcs: &[ReplicationController],
    label: &str,
    policy: PollPolicy,
) -> CliResult<()> {
    if session.verbose() {
        println!("Data:\n{}", serde_json::to_string_pretty(rcs)?);
    }

    for rc in rcs {
        match session.api().create_replication_controller(ns, rc).await {
            Ok(()) => info!(rc = %rc.name, namespace = %ns, "replication controller created"),
            Err(err) if err.is_conflict() => {
                info!(rc = %rc.name, namespace = %ns, "replication controller already exists");
                println!("Pod {rc} already exists.");
            }
            Err(err) if err.is_fatal() => return Err(err.into()),
            Err(err) => {
                return Err(CliError::DeployFailed {
                    pod: rc.to_string(),
                    source: err,
                })
            }
        }
    }

    for rc in rcs {
        let wait = PodWait::running(ns, &rc.name, label);
        wait_for_pods(session.api(), &wait, policy).await?;
        session.invalidate_pods();
    }
    Ok(())
}

/// Remove the controller `label` and every pod labelled `name=<label>`.
///
/// Returns the soft errors to record against the step, joined with `; `:
/// a controller that is already gone, a pod listing that failed, or a
/// delete the API refused. Only fatal errors are returned as `Err`.
pub async fn teardown(session: &mut Session, label: &str) -> CliResult<Option<String>> {
    let ns = session.tenant_name().await?;
    let mut soft_errors = Vec::new();

    debug!(rc = %label, namespace = %ns, "deleting replication controller");
    match session.api().delete_replication_controller(&ns, label).await {
        Ok(()) => info!(rc = %label, namespace = %ns, "replication controller deleted"),
        Err(err) if err.is_fatal() => return Err(err.into()),
        Err(err) if err.is_not_found() => soft_errors.push(format!("{label} not found")),
        Err(err) => soft_errors.push(format!("Unable to delete {label} ({err})")),
    }

    let pods = match session.pods().await {
        Ok(pods) => pods,
        Err(err) if err.is_fatal() => return Err(err),
        Err(err) => {
            soft_errors.push(err.to_string());
            return Ok(join_errors(soft_errors));
        }
    };

    let mut deleted_any = false;
    let mut fatal = None;
    for pod in pods.iter().filter(|pod| pod.label_name() == Some(label)) {
        debug!(pod = %pod.name, namespace = %ns, "deleting pod");
        match session.api().delete_pod(&ns, &pod.name).await {
            Ok(()) => deleted_any = true,
            Err(err) if err.is_fatal() => {
                fatal = Some(err);
                break;
            }
            Err(err) => {
                debug!(pod = %pod.name, error = %err, "pod delete failed");
                soft_errors.push(format!("Unable to delete pod {} ({err})", pod.name));
            }
        }
    }

    if deleted_any {
        session.invalidate_pods();
    }
    match fatal {
        Some(err) => Err(err.into()),
        None => Ok(join_errors(soft_errors)),
    }
}

fn join_errors(errors: Vec<String>) -> Option<String> {
    (!errors.is_empty()).then(|| errors.join("; "))
}
