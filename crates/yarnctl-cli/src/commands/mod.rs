//! Steps and the commands that sequence them.
//!
//! Every command is an ordered list of [`Step`]s run against one
//! [`Session`]. `manual` takes its step list from the command line.

pub mod cluster;
pub mod images;
pub mod show;
pub mod tenant;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::error::{CliError, CliResult};
use crate::session::Session;
use crate::spec::Role;

/// A named unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Step {
    MkTenant,
    MkImages,
    RmImages,
    RmTenant,
    MkConsul,
    MkRm,
    MkHs,
    MkNm,
    GetRm,
    RmNm,
    RmHs,
    RmRm,
    RmConsul,
}

impl Step {
    pub const ALL: [Self; 13] = [
        Self::MkTenant,
        Self::MkImages,
        Self::RmImages,
        Self::RmTenant,
        Self::MkConsul,
        Self::MkRm,
        Self::MkHs,
        Self::MkNm,
        Self::GetRm,
        Self::RmNm,
        Self::RmHs,
        Self::RmRm,
        Self::RmConsul,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::MkTenant => "mk-tenant",
            Self::MkImages => "mk-images",
            Self::RmImages => "rm-images",
            Self::RmTenant => "rm-tenant",
            Self::MkConsul => "mk-consul",
            Self::MkRm => "mk-rm",
            Self::MkHs => "mk-hs",
            Self::MkNm => "mk-nm",
            Self::GetRm => "get-rm",
            Self::RmNm => "rm-nm",
            Self::RmHs => "rm-hs",
            Self::RmRm => "rm-rm",
            Self::RmConsul => "rm-consul",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Step {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|step| step.name() == s)
            .ok_or_else(|| CliError::InvalidStep(s.to_owned()))
    }
}

/// Parse step names, rejecting the run if any name is unknown.
pub fn parse_steps<S: AsRef<str>>(names: &[S]) -> CliResult<Vec<Step>> {
    names.iter().map(|name| name.as_ref().parse()).collect()
}

/// Top-level commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Create,
    Show,
    Delete,
    Manual,
}

impl CommandKind {
    /// Steps a command runs when none are given explicitly.
    pub const fn default_steps(self) -> &'static [Step] {
        match self {
            Self::Create => &[
                Step::MkConsul,
                Step::MkRm,
                Step::MkHs,
                Step::MkNm,
                Step::GetRm,
            ],
            Self::Show => &[Step::GetRm],
            Self::Delete => &[Step::RmNm, Step::RmHs, Step::RmRm, Step::RmConsul],
            Self::Manual => &[],
        }
    }
}

/// Errors recorded by steps that keep going after a failure.
#[derive(Debug, Default)]
pub struct RunContext {
    errors: BTreeMap<Step, String>,
}

impl RunContext {
    pub fn record_error(&mut self, step: Step, error: impl Into<String>) {
        self.errors.insert(step, error.into());
    }

    pub fn error(&self, step: Step) -> Option<&str> {
        self.errors.get(&step).map(String::as_str)
    }

    /// Recorded errors of `steps`, in step order.
    pub fn errors_for<'a>(&'a self, steps: &'a [Step]) -> impl Iterator<Item = &'a str> + 'a {
        steps.iter().filter_map(|step| self.error(*step))
    }
}

/// Run one step.
pub async fn execute(step: Step, session: &mut Session, ctx: &mut RunContext) -> CliResult<()> {
    match step {
        Step::MkTenant => tenant::create(session).await,
        Step::RmTenant => tenant::remove(session).await,
        Step::MkImages => images::publish(session).await,
        Step::RmImages => Ok(()),
        Step::MkConsul => cluster::deploy(session, Role::Consul).await,
        Step::MkRm => cluster::deploy(session, Role::ResourceManager).await,
        Step::MkHs => cluster::deploy(session, Role::HistoryServer).await,
        Step::MkNm => cluster::deploy(session, Role::NodeManager).await,
        Step::GetRm => show::resource_manager(session).await,
        Step::RmNm => cluster::remove(session, ctx, step, Role::NodeManager).await,
        Step::RmHs => cluster::remove(session, ctx, step, Role::HistoryServer).await,
        Step::RmRm => cluster::remove(session, ctx, step, Role::ResourceManager).await,
        Step::RmConsul => cluster::remove(session, ctx, step, Role::Consul).await,
    }
}

/// Run `steps` in order. The first error stops the run.
pub async fn run(steps: &[Step], session: &mut Session) -> CliResult<RunContext> {
    let mut ctx = RunContext::default();
    for &step in steps {
        if session.verbose() {
            println!("----------------------------------------------------------");
            println!(">>> Starting {step}");
        }
        debug!(%step, "starting step");
        execute(step, session, &mut ctx).await?;
        if session.verbose() {
            println!("<<< Completed {step}");
        }
    }
    Ok(ctx)
}

/// `[a, b, c]` rendering of a step list.
pub fn format_steps(steps: &[Step]) -> String {
    let names: Vec<_> = steps.iter().map(|s| s.name()).collect();
    format!("[{}]", names.join(", "))
}

/// Closing lines printed after a successful run.
pub fn summary(kind: CommandKind, steps: &[Step], ctx: &RunContext) -> Vec<String> {
    match kind {
        CommandKind::Create => vec!["Success: compute cluster created.".to_owned()],
        CommandKind::Show => Vec::new(),
        CommandKind::Delete => {
            let errors: String = ctx.errors_for(steps).map(|e| format!("\n  {e}")).collect();
            if errors.is_empty() {
                vec!["Success: compute cluster deleted.".to_owned()]
            } else {
                vec![
                    format!("Errors encountered:{errors}"),
                    "Success: all compute cluster containers removed.".to_owned(),
                ]
            }
        }
        CommandKind::Manual => vec![format!("Success: {}", format_steps(steps))],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use rstest::rstest;
    use yarnctl_dockman::{DockmanError, MemoryDockman, Operation};

    use crate::config::{RunOptions, Settings};

    const NS: &str = "namespace1";

    fn session(api: &MemoryDockman, instances: u32) -> Session {
        let mut settings = Settings::default();
        settings.deploy.poll_interval_secs = 1;
        settings.deploy.consul_poll_attempts = 5;
        settings.deploy.pod_poll_attempts = 5;
        Session::new(
            Arc::new(api.clone()),
            settings,
            RunOptions {
                instances,
                ..RunOptions::default()
            },
        )
    }

    fn appliance() -> MemoryDockman {
        MemoryDockman::new()
            .with_tenant(NS, "tenant-net")
            .with_running_pod(NS, "docker-registry-0", "docker-registry", "10.9.0.2")
    }

    #[rstest]
    #[case("mk-tenant", Step::MkTenant)]
    #[case("rm-images", Step::RmImages)]
    #[case("get-rm", Step::GetRm)]
    #[case("rm-consul", Step::RmConsul)]
    fn step_names_parse(#[case] name: &str, #[case] step: Step) {
        assert_eq!(name.parse::<Step>().unwrap(), step);
        assert_eq!(step.to_string(), name);
    }

    #[test]
    fn every_step_round_trips_its_name() {
        for step in Step::ALL {
            assert_eq!(step.name().parse::<Step>().unwrap(), step);
        }
    }

    #[test]
    fn unknown_step_rejects_whole_list() {
        let err = parse_steps(&["mk-consul", "mk-everything"]).unwrap_err();
        assert_eq!(err.to_string(), "Invalid step: mk-everything!");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn delete_summary_without_errors() {
        let steps = CommandKind::Delete.default_steps();
        assert_eq!(
            summary(CommandKind::Delete, steps, &RunContext::default()),
            vec!["Success: compute cluster deleted."]
        );
    }

    #[test]
    fn manual_summary_lists_steps() {
        let steps = [Step::MkTenant, Step::MkImages];
        assert_eq!(
            summary(CommandKind::Manual, &steps, &RunContext::default()),
            vec!["Success: [mk-tenant, mk-images]"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn create_deploys_every_role() {
        let api = appliance();
        let mut session = session(&api, 3);
        let steps = CommandKind::Create.default_steps();

        let ctx = run(steps, &mut session).await.unwrap();

        let rcs = api.replication_controllers(NS);
        let names: Vec<_> = rcs.iter().map(|rc| rc.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["consul", "historyserver", "nodemanager", "resourcemanager"]
        );
        let nodemanager = rcs.iter().find(|rc| rc.name == "nodemanager").unwrap();
        assert_eq!(nodemanager.spec.replicas, 3);
        assert_eq!(
            nodemanager.spec.pod_template.spec.containers[0].image,
            "10.9.0.2:5000/yarn"
        );
        assert_eq!(
            summary(CommandKind::Create, steps, &ctx),
            vec!["Success: compute cluster created."]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn create_then_delete_leaves_only_the_registry() {
        let api = appliance();
        let mut create = session(&api, 2);
        run(CommandKind::Create.default_steps(), &mut create)
            .await
            .unwrap();

        let mut delete = session(&api, 2);
        let steps = CommandKind::Delete.default_steps();
        let ctx = run(steps, &mut delete).await.unwrap();

        assert!(api.replication_controllers(NS).is_empty());
        let pods: Vec<_> = api.pods(NS).into_iter().map(|p| p.name).collect();
        assert_eq!(pods, vec!["docker-registry-0"]);
        assert_eq!(
            summary(CommandKind::Delete, steps, &ctx),
            vec!["Success: compute cluster deleted."]
        );
    }

    #[tokio::test]
    async fn delete_of_torn_down_cluster_reports_soft_errors() {
        let api = appliance();
        let mut session = session(&api, 1);
        let steps = CommandKind::Delete.default_steps();

        let ctx = run(steps, &mut session).await.unwrap();

        let errors: Vec<_> = ctx.errors_for(steps).collect();
        assert_eq!(
            errors,
            vec![
                "nodemanager not found",
                "historyserver not found",
                "resourcemanager not found",
                "consul not found",
            ]
        );
        assert_eq!(
            summary(CommandKind::Delete, steps, &ctx),
            vec![
                "Errors encountered:\n  nodemanager not found\n  historyserver not found\n  resourcemanager not found\n  consul not found",
                "Success: all compute cluster containers removed.",
            ]
        );
    }

    #[tokio::test]
    async fn delete_continues_past_failed_listing() {
        let api = appliance();
        api.fail(Operation::ListPods, 500);
        let mut session = session(&api, 1);
        let steps = CommandKind::Delete.default_steps();

        let ctx = run(steps, &mut session).await.unwrap();

        assert_eq!(ctx.errors_for(steps).count(), 4);
        assert_eq!(
            ctx.error(Step::RmConsul),
            Some("consul not found; Code (500) for URL (GET ns/namespace1/pods)")
        );
    }

    #[tokio::test]
    async fn delete_stops_on_fatal_error() {
        let api = appliance();
        api.fail(Operation::DeleteReplicationController, 401);
        let mut session = session(&api, 1);

        let err = run(CommandKind::Delete.default_steps(), &mut session)
            .await
            .unwrap_err();

        assert!(matches!(err, CliError::Api(DockmanError::Unauthorized)));
        let deletes = api
            .requests()
            .iter()
            .filter(|r| r.starts_with("DELETE"))
            .count();
        assert_eq!(deletes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn create_stops_at_first_failure() {
        let api = MemoryDockman::new().with_tenant(NS, "tenant-net");
        let mut session = session(&api, 1);

        let err = run(CommandKind::Create.default_steps(), &mut session)
            .await
            .unwrap_err();

        assert!(matches!(err, CliError::RegistryIpNotFound));
        let names: Vec<_> = api
            .replication_controllers(NS)
            .into_iter()
            .map(|rc| rc.name)
            .collect();
        assert_eq!(names, vec!["consul"]);
    }

    #[tokio::test(start_paused = true)]
    async fn consul_that_never_starts_times_out() {
        let api = appliance().with_startup_polls(100);
        let mut session = session(&api, 1);

        let err = run(&[Step::MkConsul], &mut session).await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "Unable to start consul (namespace1); timeout after 5s."
        );
    }
}
