use yarnctl_dockman::Pod;

use crate::error::CliResult;
use crate::session::Session;
use crate::spec::Role;

/// Addresses of the resource manager pods.
pub fn resource_manager_ips(pods: &[Pod]) -> Vec<&str> {
    pods.iter()
        .filter(|pod| pod.label_name() == Some(Role::ResourceManager.label()))
        .filter_map(Pod::first_ip)
        .collect()
}

pub async fn resource_manager(session: &mut Session) -> CliResult<()> {
    let pods = session.pods().await?;
    let ips = resource_manager_ips(&pods);
    if ips.is_empty() {
        println!("No resource manager found.  Is compute cluster deployed?");
    }
    for ip in ips {
        println!("Resource manager: {ip}");
    }
    Ok(())
}
