use std::{collections::BTreeMap, fmt, path::PathBuf, time::Duration};

use tether_control::ControlConfig;

use crate::error_payload;

const DEFAULT_SSH_PORT: u16 = 22;
const DEFAULT_SSH_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_SERVER_PORT: u16 = 25565;

/// Connection flags; each falls back to its `TETHER_*` variable.
#[derive(Debug, Clone, Default, clap::Args)]
pub(crate) struct ConnectionArgs {
    /// SSH host [env: TETHER_SSH_HOST]
    #[arg(long, global = true)]
    pub(crate) host: Option<String>,

    /// SSH port [env: TETHER_SSH_PORT, default 22]
    #[arg(long, global = true)]
    pub(crate) ssh_port: Option<u16>,

    /// SSH user [env: TETHER_SSH_USER]
    #[arg(long, global = true)]
    pub(crate) user: Option<String>,

    /// Private key file [env: TETHER_SSH_KEY_PATH]
    #[arg(long, global = true)]
    pub(crate) key: Option<PathBuf>,

    /// Transport timeout in milliseconds [env: TETHER_SSH_TIMEOUT_MS]
    #[arg(long, global = true)]
    pub(crate) timeout_ms: Option<u64>,

    /// Screen session name prefix [env: TETHER_NAME_PREFIX]
    #[arg(long, global = true)]
    pub(crate) name_prefix: Option<String>,

    /// Game server port [env: TETHER_SERVER_PORT, default 25565]
    #[arg(long, global = true)]
    pub(crate) port: Option<u16>,
}

#[derive(Clone)]
pub(crate) struct SshSettings {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) user: String,
    /// Login password, or the key passphrase when a key is set.
    pub(crate) password: Option<String>,
    pub(crate) key_path: Option<PathBuf>,
    pub(crate) timeout: Duration,
}

impl fmt::Debug for SshSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SshSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("has_password", &self.password.is_some())
            .field("key_path", &self.key_path)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub(crate) ssh: SshSettings,
    pub(crate) server_port: u16,
    pub(crate) control: ControlConfig,
}

fn env_string(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_u64(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<u64> {
    env_string(lookup, name).and_then(|v| v.parse::<u64>().ok())
}

fn env_u16(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<u16> {
    env_string(lookup, name).and_then(|v| v.parse::<u16>().ok())
}

impl Settings {
    pub(crate) fn from_env(args: &ConnectionArgs) -> anyhow::Result<Self> {
        Self::resolve(args, |name| std::env::var(name).ok())
    }

    pub(crate) fn resolve(
        args: &ConnectionArgs,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let host = args
            .host
            .clone()
            .or_else(|| env_string(&lookup, "TETHER_SSH_HOST"));
        let user = args
            .user
            .clone()
            .or_else(|| env_string(&lookup, "TETHER_SSH_USER"));

        let mut missing = BTreeMap::new();
        if host.is_none() {
            missing.insert("TETHER_SSH_HOST".to_string(), "required".to_string());
        }
        if user.is_none() {
            missing.insert("TETHER_SSH_USER".to_string(), "required".to_string());
        }
        let (Some(host), Some(user)) = (host, user) else {
            return Err(error_payload::anyhow(
                "invalid_config",
                "SSH connection settings are incomplete",
                Some(missing),
                Some("set them in the environment or pass --host/--user".to_string()),
            ));
        };

        let timeout_ms = args
            .timeout_ms
            .or_else(|| env_u64(&lookup, "TETHER_SSH_TIMEOUT_MS"))
            .map(|v| v.clamp(1_000, 600_000))
            .unwrap_or(DEFAULT_SSH_TIMEOUT_MS);

        let ssh = SshSettings {
            host,
            port: args
                .ssh_port
                .or_else(|| env_u16(&lookup, "TETHER_SSH_PORT"))
                .unwrap_or(DEFAULT_SSH_PORT),
            user,
            password: lookup("TETHER_SSH_PASSWORD").filter(|v| !v.is_empty()),
            key_path: args
                .key
                .clone()
                .or_else(|| env_string(&lookup, "TETHER_SSH_KEY_PATH").map(PathBuf::from)),
            timeout: Duration::from_millis(timeout_ms),
        };

        let mut control = ControlConfig::from_lookup(&lookup)?;
        if let Some(prefix) = args.name_prefix.as_deref().filter(|p| !p.trim().is_empty()) {
            control.name_prefix = prefix.trim().to_string();
        }

        Ok(Self {
            ssh,
            server_port: args
                .port
                .or_else(|| env_u16(&lookup, "TETHER_SERVER_PORT"))
                .unwrap_or(DEFAULT_SERVER_PORT),
            control,
        })
    }
}

/// Launch settings for `start`; flags fall back to `TETHER_SERVER_JAR` and
/// `TETHER_JAVA_PARAMS`.
pub(crate) fn launch_settings(
    jar: Option<&str>,
    java_params: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<(String, Vec<String>)> {
    let jar = jar
        .map(str::to_string)
        .or_else(|| env_string(&lookup, "TETHER_SERVER_JAR"))
        .ok_or_else(|| {
            let mut fields = BTreeMap::new();
            fields.insert("TETHER_SERVER_JAR".to_string(), "required".to_string());
            error_payload::anyhow(
                "invalid_config",
                "no server jar to start",
                Some(fields),
                Some("pass --jar or set TETHER_SERVER_JAR".to_string()),
            )
        })?;

    let params = java_params
        .map(str::to_string)
        .or_else(|| env_string(&lookup, "TETHER_JAVA_PARAMS"))
        .map(|p| p.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();

    Ok((jar, params))
}
