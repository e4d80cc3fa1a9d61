use std::fmt;

/// A recoverable anomaly. Reported alongside a result, never raised.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    AlreadyRunning { port: u16 },
    AlreadyStopped { port: u16 },
    DidNotStart { port: u16 },
    DidNotStop { port: u16 },
    NotKilled { port: u16 },
    MalformedLine { line: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::AlreadyRunning { port } => write!(f, "the server for port {port} is running"),
            Warning::AlreadyStopped { port } => write!(f, "the server for port {port} is stopped"),
            Warning::DidNotStart { port } => write!(f, "the server for port {port} failed to start"),
            Warning::DidNotStop { port } => write!(f, "the server for port {port} failed to stop"),
            Warning::NotKilled { port } => write!(f, "the server for port {port} was not killed"),
            Warning::MalformedLine { line } => {
                write!(f, "the process could not be processed properly: {line:?}")
            }
        }
    }
}

/// A value plus the warnings collected while producing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub value: T,
    pub warnings: Vec<Warning>,
}

impl<T> Outcome<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    /// Records `warning` and logs it.
    pub fn warn(mut self, warning: Warning) -> Self {
        self.push(warning);
        self
    }

    pub fn push(&mut self, warning: Warning) {
        tracing::warn!(%warning, "soft failure");
        self.warnings.push(warning);
    }

    pub fn extend(&mut self, warnings: impl IntoIterator<Item = Warning>) {
        for w in warnings {
            self.push(w);
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            warnings: self.warnings,
        }
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_accumulate() {
        let out = Outcome::new(false)
            .warn(Warning::AlreadyStopped { port: 25565 })
            .map(|v| !v);
        assert!(out.value);
        assert_eq!(out.warnings, vec![Warning::AlreadyStopped { port: 25565 }]);
        assert_eq!(out.warnings[0].to_string(), "the server for port 25565 is stopped");
    }

    #[test]
    fn warning_serializes_with_kind_tag() {
        let json = serde_json::to_value(Warning::DidNotStart { port: 7 }).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "did_not_start", "port": 7 }));
    }
}
