use crate::error::{Error, Result};

pub const SEARCH: &str = "ps -aux | grep --color=never {PATTERN}";
pub const START: &str =
    "cd {PATH}; screen -dmS {NAME} java {PARAMS} -jar {FILE} nogui --port {PORT}";
pub const STOP: &str = "screen -X -S {NAME} quit";
pub const KILL: &str = "kill -{SIGNAL} {PID}";
pub const UPTIME: &str = "ps -p {PID} -o etime";
pub const MEMORY: &str = "free -m";
pub const CPU: &str = "ps -aux";
pub const FILE_EXISTS: &str = "test -f {PATH} && echo 1 || echo 0";

/// A shell command with `{KEY}` placeholders, materialized right before it
/// is issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate(String);

impl CommandTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn has_placeholder(&self, key: &str) -> bool {
        self.0.contains(&format!("{{{key}}}"))
    }

    /// Fails when any of `keys` is missing from the template.
    pub fn require(&self, keys: &[&str]) -> Result<()> {
        let missing: Vec<&str> = keys
            .iter()
            .copied()
            .filter(|k| !self.has_placeholder(k))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        Err(Error::InvalidTemplate(format!(
            "`{}` is missing {}",
            self.0,
            missing
                .iter()
                .map(|k| format!("{{{k}}}"))
                .collect::<Vec<_>>()
                .join(", ")
        )))
    }

    /// Substitutes every `{KEY}` listed in `values`. Unknown placeholders are
    /// left untouched.
    pub fn render(&self, values: &[(&str, &str)]) -> String {
        let mut out = self.0.clone();
        for (key, value) in values {
            out = out.replace(&format!("{{{key}}}"), value);
        }
        out
    }
}

impl From<&str> for CommandTemplate {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Single-quotes `raw` for a POSIX shell.
pub fn shell_quote(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', r"'\''"))
}
