//! Image publishing instructions for the tenant registry.
//!
//! The tenant registry is only reachable from the tenant network, so
//! `mk-images` prints the docker commands instead of running them.

use crate::error::CliResult;
use crate::session::Session;
use crate::spec::{join_path, registry_image};

/// Docker commands that copy `image` from `registry_url` into the tenant
/// registry at `registry_ip`.
pub fn publish_commands(registry_url: &str, registry_ip: &str, image: &str, tag: &str) -> Vec<String> {
    let tag = if tag.is_empty() {
        String::new()
    } else {
        format!(":{tag}")
    };
    let source = format!("{}{tag}", join_path(registry_url, image));
    let dest = format!("{}{tag}", registry_image(registry_ip, image));

    vec![
        format!("docker pull {source}"),
        format!("docker tag {source} {dest}"),
        format!("docker push {dest}"),
    ]
}

pub async fn publish(session: &mut Session) -> CliResult<()> {
    let registry_ip = session.registry_ip().await?;
    let commands = publish_commands(
        &session.options().registry_url,
        &registry_ip,
        &session.settings().cluster.yarn_image,
        &session.options().tag,
    );

    println!("# Run the following commands from a machine with access to the tenant network.");
    for command in commands {
        println!("{command}");
    }
    Ok(())
}
