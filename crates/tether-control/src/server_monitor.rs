use std::collections::HashMap;

use tether_process::{MetricFormat, ProcessRecord, ServerInfo, parse_elapsed, parse_xmx_mb, round2};

use crate::config::ControlConfig;
use crate::diagnostics::Warning;
use crate::error::{Error, Result};
use crate::process_table::ProcessTable;
use crate::template::CommandTemplate;
use crate::terminal::Executor;

/// Per-process metrics of a running server, looked up by pid.
///
/// Process lookups are memoized per pid until [`Self::forget`], so one
/// `info` call costs a single search.
#[derive(Debug)]
pub struct ServerMonitor<E> {
    executor: E,
    table: ProcessTable,
    uptime_cmd: CommandTemplate,
    records: HashMap<u32, Option<ProcessRecord>>,
    warnings: Vec<Warning>,
}

impl<E: Executor> ServerMonitor<E> {
    pub fn new(executor: E, config: &ControlConfig) -> Result<Self> {
        if !executor.is_connected() {
            return Err(Error::NotConnected);
        }
        Ok(Self {
            executor,
            table: ProcessTable::new(config),
            uptime_cmd: config.templates.uptime.clone(),
            records: HashMap::new(),
            warnings: Vec::new(),
        })
    }

    pub fn into_inner(self) -> E {
        self.executor
    }

    /// Drops memoized lookups and collected warnings.
    pub fn forget(&mut self) {
        self.records.clear();
        self.warnings.clear();
    }

    /// Data-quality warnings collected by lookups so far.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    fn record(&mut self, pid: u32) -> Result<Option<&ProcessRecord>> {
        if !self.records.contains_key(&pid) {
            let outcome = self.table.find_by_pid(&mut self.executor, pid)?;
            self.warnings.extend(outcome.warnings);
            self.records.insert(pid, outcome.value);
        }
        Ok(self.records.get(&pid).and_then(Option::as_ref))
    }

    pub fn cpu_usage(&mut self, pid: u32) -> Result<f64> {
        Ok(self.record(pid)?.map(ProcessRecord::cpu).unwrap_or(0.0))
    }

    /// Memory share in percent, or in MiB of the `-Xmx` ceiling.
    pub fn memory_usage(&mut self, pid: u32, format: MetricFormat) -> Result<f64> {
        let Some(record) = self.record(pid)? else {
            return Ok(0.0);
        };
        let percent = record.memory();
        Ok(match format {
            MetricFormat::Percentage => percent,
            MetricFormat::Units => {
                let ceiling = record.command().and_then(parse_xmx_mb).unwrap_or(0);
                round2(percent * ceiling as f64 / 100.0)
            }
        })
    }

    /// Heap ceiling in MiB; 0 when the command line carries no `-Xmx`.
    pub fn memory(&mut self, pid: u32) -> Result<u64> {
        Ok(self
            .record(pid)?
            .and_then(ProcessRecord::command)
            .and_then(parse_xmx_mb)
            .unwrap_or(0))
    }

    /// Seconds since the process started.
    pub fn uptime(&mut self, pid: u32) -> Result<u64> {
        let command = self.uptime_cmd.render(&[("PID", &pid.to_string())]);
        let raw = self.executor.run(&command)?;
        Ok(parse_elapsed(&raw).unwrap_or(0))
    }

    pub fn info(&mut self, pid: u32) -> Result<ServerInfo> {
        Ok(ServerInfo {
            uptime: self.uptime(pid)?,
            cpu_usage: self.cpu_usage(pid)?,
            memory_usage: self.memory_usage(pid, MetricFormat::Percentage)?,
            memory: self.memory(pid)?,
        })
    }
}
