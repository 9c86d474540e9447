//! Deploying and removing the cluster roles.

use tracing::info;

use crate::commands::{RunContext, Step};
use crate::deploy::{deploy_replication_controllers, teardown};
use crate::error::CliResult;
use crate::session::Session;
use crate::spec::{self, Role, YarnPlacement};

/// Submit the controller of `role` and wait for its pods.
pub async fn deploy(session: &mut Session, role: Role) -> CliResult<()> {
    let ns = session.tenant_name().await?;
    let network = session.network().await?;

    let (role_spec, policy) = match role {
        Role::Consul => (spec::consul(&network), session.settings().deploy.consul_policy()),
        yarn => {
            println!("Deploying {}.", yarn.description());
            let placement = YarnPlacement {
                network,
                registry_ip: session.registry_ip().await?,
                consul_ip: session.consul_ip().await?,
                yarn_image: session.settings().cluster.yarn_image.clone(),
            };
            let role_spec = match yarn {
                Role::ResourceManager => spec::resource_manager(&placement),
                Role::HistoryServer => spec::history_server(&placement),
                _ => spec::node_manager(&placement, session.options().instances),
            };
            (role_spec, session.settings().deploy.pod_policy())
        }
    };

    let rc = role_spec.into_replication_controller(&ns);
    deploy_replication_controllers(session, &ns, &[rc], role.label(), policy).await
}

/// Tear down `role`, recording anything short of a fatal error against
/// `step`.
pub async fn remove(
    session: &mut Session,
    ctx: &mut RunContext,
    step: Step,
    role: Role,
) -> CliResult<()> {
    let soft = match teardown(session, role.label()).await {
        Ok(soft) => soft,
        Err(err) if err.is_fatal() => return Err(err),
        Err(err) => Some(err.to_string()),
    };
    if let Some(error) = soft {
        info!(%step, %error, "teardown incomplete");
        ctx.record_error(step, error);
    }
    Ok(())
}
