use std::fmt;

use tether_process::ColumnLayout;

use crate::error::Result;
use crate::template::{self, CommandTemplate};

pub const DEFAULT_NAME_PREFIX: &str = "mcserv";
pub const DEFAULT_FILE_EXTENSION: &str = "jar";
pub const DEFAULT_PROMPT_PATTERN: &str = r".*@.*[$#]";
pub const DEFAULT_PASSWORD_PATTERN: &str = r".*[pP]assword.*";

/// Sudo password. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct SudoPassword(String);

impl SudoPassword {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SudoPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SudoPassword(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Templates {
    pub search: CommandTemplate,
    pub start: CommandTemplate,
    pub stop: CommandTemplate,
    pub kill: CommandTemplate,
    pub uptime: CommandTemplate,
    pub memory: CommandTemplate,
    pub cpu: CommandTemplate,
    pub file_exists: CommandTemplate,
}

impl Default for Templates {
    fn default() -> Self {
        Self {
            search: template::SEARCH.into(),
            start: template::START.into(),
            stop: template::STOP.into(),
            kill: template::KILL.into(),
            uptime: template::UPTIME.into(),
            memory: template::MEMORY.into(),
            cpu: template::CPU.into(),
            file_exists: template::FILE_EXISTS.into(),
        }
    }
}

/// Everything the terminal, controller and monitors need to know about the
/// remote host's conventions. Passed to every constructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlConfig {
    /// Managed screen session name is `name_prefix` + port.
    pub name_prefix: String,
    pub sudo_password: Option<SudoPassword>,
    /// Required extension of the launched artifact, without the dot.
    pub file_extension: String,
    pub layout: ColumnLayout,
    pub templates: Templates,
    pub prompt_pattern: String,
    pub password_pattern: String,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            sudo_password: None,
            file_extension: DEFAULT_FILE_EXTENSION.to_string(),
            layout: ColumnLayout::default(),
            templates: Templates::default(),
            prompt_pattern: DEFAULT_PROMPT_PATTERN.to_string(),
            password_pattern: DEFAULT_PASSWORD_PATTERN.to_string(),
        }
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn column(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: usize) -> usize {
    lookup(name)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .map(|v| v.min(64))
        .unwrap_or(default)
}

impl ControlConfig {
    pub fn with_sudo_password(mut self, password: impl Into<String>) -> Self {
        self.sudo_password = Some(SudoPassword::new(password));
        self
    }

    pub fn server_name(&self, port: u16) -> String {
        format!("{}{}", self.name_prefix, port)
    }

    /// Reads `TETHER_*` variables over the defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut cfg = Self::default();

        if let Some(v) = non_empty(lookup("TETHER_NAME_PREFIX")) {
            cfg.name_prefix = v;
        }
        // Passwords may legitimately carry surrounding spaces.
        if let Some(v) = lookup("TETHER_SUDO_PASSWORD").filter(|v| !v.is_empty()) {
            cfg.sudo_password = Some(SudoPassword::new(v));
        }
        if let Some(v) = non_empty(lookup("TETHER_FILE_EXTENSION")) {
            cfg.file_extension = v.trim_start_matches('.').to_string();
        }

        let defaults = ColumnLayout::default();
        cfg.layout = ColumnLayout {
            pid: column(&lookup, "TETHER_COLUMN_PID", defaults.pid),
            cpu: column(&lookup, "TETHER_COLUMN_CPU", defaults.cpu),
            memory: column(&lookup, "TETHER_COLUMN_MEMORY", defaults.memory),
            command: column(&lookup, "TETHER_COLUMN_COMMAND", defaults.command),
        };

        let t = &mut cfg.templates;
        for (name, slot) in [
            ("TETHER_CMD_SEARCH", &mut t.search),
            ("TETHER_CMD_START", &mut t.start),
            ("TETHER_CMD_STOP", &mut t.stop),
            ("TETHER_CMD_KILL", &mut t.kill),
            ("TETHER_CMD_UPTIME", &mut t.uptime),
            ("TETHER_CMD_MEMORY", &mut t.memory),
            ("TETHER_CMD_CPU", &mut t.cpu),
            ("TETHER_CMD_FILE_EXISTS", &mut t.file_exists),
        ] {
            if let Some(v) = non_empty(lookup(name)) {
                *slot = CommandTemplate::new(v);
            }
        }

        if let Some(v) = non_empty(lookup("TETHER_PROMPT_PATTERN")) {
            cfg.prompt_pattern = v;
        }
        if let Some(v) = non_empty(lookup("TETHER_PASSWORD_PATTERN")) {
            cfg.password_pattern = v;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Checks that every template carries the placeholders its operation
    /// fills in and that the prompt patterns compile.
    pub fn validate(&self) -> Result<()> {
        let t = &self.templates;
        t.search.require(&["PATTERN"])?;
        t.start.require(&["NAME"])?;
        t.stop.require(&["NAME"])?;
        t.kill.require(&["PID"])?;
        t.uptime.require(&["PID"])?;
        t.file_exists.require(&["PATH"])?;
        regex::Regex::new(&self.prompt_pattern)?;
        regex::Regex::new(&self.password_pattern)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use pretty_assertions::assert_eq;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_follow_minecraft_conventions() {
        let cfg = ControlConfig::default();
        assert_eq!(cfg.server_name(25565), "mcserv25565");
        assert_eq!(cfg.file_extension, "jar");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn env_overrides_apply() {
        let cfg = ControlConfig::from_lookup(lookup_from(&[
            ("TETHER_NAME_PREFIX", "srv"),
            ("TETHER_SUDO_PASSWORD", "hunter2"),
            ("TETHER_FILE_EXTENSION", ".JAR"),
            ("TETHER_COLUMN_COMMAND", "999"),
            ("TETHER_CMD_STOP", "screen -S {NAME} -X stuff 'stop\\n'"),
        ]))
        .unwrap();

        assert_eq!(cfg.server_name(7777), "srv7777");
        assert_eq!(cfg.sudo_password, Some(SudoPassword::new("hunter2")));
        assert_eq!(cfg.file_extension, "JAR");
        assert_eq!(cfg.layout.command, 64);
        assert_eq!(cfg.templates.stop.as_str(), "screen -S {NAME} -X stuff 'stop\\n'");
    }

    #[test]
    fn env_template_without_placeholder_is_rejected() {
        let err = ControlConfig::from_lookup(lookup_from(&[("TETHER_CMD_KILL", "kill -9")]))
            .unwrap_err();
        assert_eq!(err.code(), "invalid_template");
    }

    #[test]
    fn bad_prompt_pattern_is_rejected() {
        let err = ControlConfig::from_lookup(lookup_from(&[("TETHER_PROMPT_PATTERN", "(")]))
            .unwrap_err();
        assert_eq!(err.code(), "invalid_pattern");
    }

    #[test]
    fn password_is_redacted_in_debug() {
        let cfg = ControlConfig::default().with_sudo_password("hunter2");
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }
}
