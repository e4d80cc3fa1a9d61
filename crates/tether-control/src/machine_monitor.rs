use tether_process::{ColumnLayout, MachineInfo, MemorySnapshot, MetricFormat, ProcessRecord};

use crate::config::ControlConfig;
use crate::error::{Error, Result};
use crate::template::CommandTemplate;
use crate::terminal::Executor;

/// Host-wide cpu and memory figures.
///
/// The `free -m` snapshot is read once and reused until [`Self::refresh`].
#[derive(Debug)]
pub struct MachineMonitor<E> {
    executor: E,
    memory_cmd: CommandTemplate,
    cpu_cmd: CommandTemplate,
    layout: ColumnLayout,
    snapshot: Option<MemorySnapshot>,
}

impl<E: Executor> MachineMonitor<E> {
    pub fn new(executor: E, config: &ControlConfig) -> Result<Self> {
        if !executor.is_connected() {
            return Err(Error::NotConnected);
        }
        Ok(Self {
            executor,
            memory_cmd: config.templates.memory.clone(),
            cpu_cmd: config.templates.cpu.clone(),
            layout: config.layout,
            snapshot: None,
        })
    }

    pub fn into_inner(self) -> E {
        self.executor
    }

    /// Drops the cached memory snapshot.
    pub fn refresh(&mut self) {
        self.snapshot = None;
    }

    fn snapshot(&mut self) -> Result<MemorySnapshot> {
        if let Some(snapshot) = self.snapshot {
            return Ok(snapshot);
        }

        let raw = self.executor.run(self.memory_cmd.as_str())?;
        match MemorySnapshot::parse_free(&raw) {
            Some(snapshot) => {
                self.snapshot = Some(snapshot);
                Ok(snapshot)
            }
            // Not cached: a later call may get a readable answer.
            None => Ok(MemorySnapshot::default()),
        }
    }

    /// Total memory in MiB.
    pub fn memory(&mut self) -> Result<u64> {
        Ok(self.snapshot()?.total)
    }

    pub fn memory_free(&mut self, format: MetricFormat) -> Result<f64> {
        let snapshot = self.snapshot()?;
        Ok(match format {
            MetricFormat::Units => snapshot.free as f64,
            MetricFormat::Percentage => snapshot.percent_of_total(snapshot.free),
        })
    }

    pub fn memory_usage(&mut self, format: MetricFormat) -> Result<f64> {
        let snapshot = self.snapshot()?;
        let usage = snapshot.usage();
        Ok(match format {
            MetricFormat::Units => usage as f64,
            MetricFormat::Percentage => snapshot.percent_of_total(usage),
        })
    }

    /// Sum of the cpu column over every listed process.
    pub fn cpu_usage(&mut self) -> Result<f64> {
        let raw = self.executor.run(self.cpu_cmd.as_str())?;
        let layout = self.layout;
        Ok(raw
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| ProcessRecord::parse(line, layout))
            .filter(|record| record.field(layout.cpu).is_some())
            .map(|record| record.cpu())
            .sum())
    }

    pub fn info(&mut self) -> Result<MachineInfo> {
        Ok(MachineInfo {
            cpu_usage: self.cpu_usage()?,
            memory_usage: self.memory_usage(MetricFormat::Percentage)?,
            memory: self.memory()?,
            memory_free: self.memory_free(MetricFormat::Percentage)?,
        })
    }
}
