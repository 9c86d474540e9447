use tracing::{debug, info};
use yarnctl_dockman::Tenant;

use crate::error::CliResult;
use crate::session::{lookup_tenant_name, Session};

/// Create the VLAN tenant unless one already exists.
pub async fn create(session: &mut Session) -> CliResult<()> {
    let existing = match lookup_tenant_name(session.api()).await {
        Ok(name) => name,
        Err(err) if err.is_fatal() => return Err(err),
        Err(err) => {
            debug!(error = %err, "tenant lookup failed");
            None
        }
    };
    if let Some(ns) = existing {
        println!("Tenant {ns} already exists.");
        return Ok(());
    }

    let cluster = &session.settings().cluster;
    let tenant = Tenant::vlan(
        cluster.tenant_namespace.as_str(),
        cluster.vlan_id,
        cluster.vlan_subnet.as_str(),
    );
    println!("Creating tenant: VLAN-SUBNET={}", cluster.vlan_subnet);
    if session.verbose() {
        println!("Data:\n{}", serde_json::to_string_pretty(&tenant)?);
    }
    session.api().create_tenant(&tenant).await?;
    info!(tenant = %cluster.tenant_namespace, vlan = cluster.vlan_id, "tenant created");

    session.invalidate_tenant();
    Ok(())
}

/// Delete the tenant the session resolved.
pub async fn remove(session: &mut Session) -> CliResult<()> {
    let ns = session.tenant_name().await?;
    println!("Removing the tenant {ns}");
    match session.api().delete_tenant(&ns).await {
        Ok(()) => {
            info!(tenant = %ns, "tenant deleted");
            println!("Finished removing tenant");
        }
        Err(err) if err.is_not_found() => println!("tenant {ns} not found"),
        Err(err) => return Err(err.into()),
    }
    session.invalidate_tenant();
    Ok(())
}
