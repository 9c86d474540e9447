//! Configuration for yarnctl.

use std::path::Path;
use std::time::Duration;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;
use yarnctl_dockman::{api_url, Credentials, HttpConfig};

use crate::error::{CliError, CliResult};
use crate::readiness::PollPolicy;

/// Default settings file, looked up from the working directory upwards.
pub const DEFAULT_CONFIG_FILE: &str = "yarnctl.toml";

/// Top-level settings.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub cluster: ClusterSettings,

    #[serde(default)]
    pub deploy: DeploySettings,
}

impl Settings {
    /// Load settings from the default sources.
    ///
    /// Later sources override earlier ones:
    /// 1. Default values
    /// 2. `path`, or `yarnctl.toml` when no path is given (if present)
    /// 3. Environment variables with the `YARNCTL_` prefix, nested with `__`
    pub fn load(path: Option<&Path>) -> CliResult<Self> {
        let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        Figment::new()
            .merge(Toml::file(file))
            .merge(Env::prefixed("YARNCTL_").split("__"))
            .extract()
            .map_err(|e| CliError::config(e.to_string()))
    }

    /// HTTP client settings for the management API at `address`.
    pub fn http_config(&self, address: &str, password: Option<String>) -> HttpConfig {
        let mut config = HttpConfig::new(api_url(address));
        config.accept_invalid_certs = self.api.accept_invalid_certs;
        if self.api.timeout_secs > 0 {
            config = config.with_timeout(Duration::from_secs(self.api.timeout_secs));
        }
        if let Some(password) = password {
            config = config.with_credentials(Credentials::new(self.api.user.clone(), password));
        }
        config
    }
}

/// Management API connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSettings {
    /// Basic-auth user; the password comes from the command line.
    #[serde(default = "default_user")]
    pub user: String,

    /// Per-request timeout in seconds. Zero disables the timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_accept_invalid_certs")]
    pub accept_invalid_certs: bool,
}

fn default_user() -> String {
    "admin".to_owned()
}

const fn default_timeout_secs() -> u64 {
    60
}

const fn default_accept_invalid_certs() -> bool {
    true
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            user: default_user(),
            timeout_secs: default_timeout_secs(),
            accept_invalid_certs: default_accept_invalid_certs(),
        }
    }
}

/// What gets deployed, and where.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterSettings {
    /// Image name of the YARN roles inside the tenant registry.
    #[serde(default = "default_yarn_image")]
    pub yarn_image: String,

    /// Namespace given to a tenant created by `mk-tenant`.
    #[serde(default = "default_tenant_namespace")]
    pub tenant_namespace: String,

    #[serde(default = "default_vlan_id")]
    pub vlan_id: u32,

    #[serde(default = "default_vlan_subnet")]
    pub vlan_subnet: String,
}

fn default_yarn_image() -> String {
    "yarn".to_owned()
}

fn default_tenant_namespace() -> String {
    "namespace1".to_owned()
}

const fn default_vlan_id() -> u32 {
    2100
}

fn default_vlan_subnet() -> String {
    "172.20.31.0/24".to_owned()
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            yarn_image: default_yarn_image(),
            tenant_namespace: default_tenant_namespace(),
            vlan_id: default_vlan_id(),
            vlan_subnet: default_vlan_subnet(),
        }
    }
}

/// Pod readiness polling.
#[derive(Debug, Clone, Deserialize)]
pub struct DeploySettings {
    /// Seconds between pod status checks.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Checks before giving up on consul.
    #[serde(default = "default_consul_poll_attempts")]
    pub consul_poll_attempts: u32,

    /// Checks before giving up on a YARN role.
    #[serde(default = "default_pod_poll_attempts")]
    pub pod_poll_attempts: u32,
}

const fn default_poll_interval_secs() -> u64 {
    5
}

const fn default_consul_poll_attempts() -> u32 {
    120
}

const fn default_pod_poll_attempts() -> u32 {
    1200
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            consul_poll_attempts: default_consul_poll_attempts(),
            pod_poll_attempts: default_pod_poll_attempts(),
        }
    }
}

impl DeploySettings {
    pub fn consul_policy(&self) -> PollPolicy {
        PollPolicy::new(
            self.consul_poll_attempts,
            Duration::from_secs(self.poll_interval_secs),
        )
    }

    pub fn pod_policy(&self) -> PollPolicy {
        PollPolicy::new(
            self.pod_poll_attempts,
            Duration::from_secs(self.poll_interval_secs),
        )
    }
}

/// Options taken from the command line for a single run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Node manager replicas.
    pub instances: u32,
    /// Where `mk-images` pulls the YARN image from.
    pub registry_url: String,
    /// Image tag for `mk-images`; empty means untagged.
    pub tag: String,
    /// Print step banners and request payloads.
    pub verbose: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            instances: 1,
            registry_url: String::new(),
            tag: String::new(),
            verbose: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_match_appliance_layout() {
        let settings = Settings::default();
        assert_eq!(settings.api.user, "admin");
        assert_eq!(settings.cluster.yarn_image, "yarn");
        assert_eq!(settings.cluster.vlan_id, 2100);
        assert_eq!(settings.cluster.vlan_subnet, "172.20.31.0/24");
        assert_eq!(settings.deploy.consul_policy().attempts, 120);
        assert_eq!(settings.deploy.pod_policy().attempts, 1200);
        assert_eq!(
            settings.deploy.pod_policy().interval,
            Duration::from_secs(5)
        );
    }

    #[test]
    fn file_then_env_override_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "yarnctl.toml",
                r#"
                [cluster]
                yarn_image = "yarn-test"

                [deploy]
                poll_interval_secs = 2
                "#,
            )?;
            jail.set_env("YARNCTL_DEPLOY__POLL_INTERVAL_SECS", "1");
            jail.set_env("YARNCTL_API__USER", "operator");

            let settings = Settings::load(None).expect("settings load");
            assert_eq!(settings.cluster.yarn_image, "yarn-test");
            assert_eq!(settings.deploy.poll_interval_secs, 1);
            assert_eq!(settings.api.user, "operator");
            assert_eq!(settings.deploy.consul_poll_attempts, 120);
            Ok(())
        });
    }

    #[test]
    fn explicit_file_is_used() {
        Jail::expect_with(|jail| {
            jail.create_file("custom.toml", "[api]\ntimeout_secs = 0\n")?;
            let settings = Settings::load(Some(Path::new("custom.toml"))).expect("settings load");
            assert_eq!(settings.api.timeout_secs, 0);
            Ok(())
        });
    }

    #[test]
    fn invalid_value_is_config_error() {
        Jail::expect_with(|jail| {
            jail.set_env("YARNCTL_CLUSTER__VLAN_ID", "not-a-number");
            let err = Settings::load(None).unwrap_err();
            assert!(matches!(err, CliError::Config(_)));
            Ok(())
        });
    }

    #[test]
    fn http_config_carries_credentials_and_timeout() {
        let settings = Settings::default();
        let config = settings.http_config("10.0.0.1", Some("secret".to_owned()));
        assert_eq!(config.base_url, "https://10.0.0.1/api/dockman");
        assert_eq!(config.timeout, Some(Duration::from_secs(60)));
        assert_eq!(config.credentials.map(|c| c.user).as_deref(), Some("admin"));

        let config = settings.http_config("10.0.0.1", None);
        assert!(config.credentials.is_none());
    }
}
