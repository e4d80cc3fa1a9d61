use specta::Type;

mod elapsed;
mod memory;
mod record;
mod tokenize;

pub use elapsed::parse_elapsed;
pub use memory::{MemorySnapshot, parse_xmx_mb, round2};
pub use record::{ColumnLayout, Lookup, ProcessRecord, find_by_name, find_by_pid, is_search_artifact};
pub use tokenize::{tokenize, tokenize_with};

/// How a memory metric is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize, Type)]
pub enum MetricFormat {
    #[default]
    Percentage,
    Units,
}

/// Metrics of one managed server process.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize, Type)]
pub struct ServerInfo {
    /// Seconds since the process started.
    pub uptime: u64,
    pub cpu_usage: f64,
    /// Share of host memory, in percent.
    pub memory_usage: f64,
    /// Heap ceiling from `-Xmx`, in MiB (0 when unknown).
    pub memory: u64,
}

/// Host-wide metrics.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize, Type)]
pub struct MachineInfo {
    /// Sum of the cpu column over every process.
    pub cpu_usage: f64,
    pub memory_usage: f64,
    /// Total memory in MiB.
    pub memory: u64,
    pub memory_free: f64,
}
