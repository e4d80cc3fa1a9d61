use std::time::Instant;

use tether_control::{MachineInfo, ServerInfo, Warning};

/// What a subcommand produced on top of the common fields.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub(crate) enum Details {
    Status {},
    Start { try_start: bool },
    Stop { try_stop: bool },
    Kill { try_kill: bool },
    Server(ServerInfo),
    Machine(MachineInfo),
}

/// One JSON line on stdout per invocation.
#[derive(Debug, Clone, serde::Serialize)]
pub(crate) struct Report {
    #[serde(rename = "type")]
    pub(crate) kind: &'static str,
    pub(crate) is_running: bool,
    #[serde(flatten)]
    pub(crate) details: Details,
    pub(crate) warnings: Vec<Warning>,
    /// Seconds spent talking to the host.
    pub(crate) ping: f64,
    pub(crate) request_id: String,
}

impl Report {
    pub(crate) fn new(
        kind: &'static str,
        is_running: bool,
        details: Details,
        warnings: Vec<Warning>,
        started: Instant,
        request_id: String,
    ) -> Self {
        let ping = (started.elapsed().as_secs_f64() * 1000.0).round() / 1000.0;
        Self {
            kind,
            is_running,
            details,
            warnings,
            ping,
            request_id,
        }
    }
}
