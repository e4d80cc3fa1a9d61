use tether_process::{ColumnLayout, Lookup, ProcessRecord, find_by_name, find_by_pid, is_search_artifact};

use crate::config::ControlConfig;
use crate::diagnostics::{Outcome, Warning};
use crate::error::Result;
use crate::template::CommandTemplate;
use crate::terminal::Executor;

/// Finds processes by running the search template and parsing its output.
#[derive(Debug, Clone)]
pub struct ProcessTable {
    search: CommandTemplate,
    layout: ColumnLayout,
}

impl ProcessTable {
    pub fn new(config: &ControlConfig) -> Self {
        Self {
            search: config.templates.search.clone(),
            layout: config.layout,
        }
    }

    fn search(&self, executor: &mut dyn Executor, pattern: &str) -> Result<String> {
        let command = self.search.render(&[("PATTERN", pattern)]);
        executor.exec(&command)
    }

    /// First process whose command line contains `name`.
    ///
    /// The search's own `grep` (and the shell running it) always match the
    /// pattern, so those lines are dropped before the first line is taken.
    pub fn find_by_name(
        &self,
        executor: &mut dyn Executor,
        name: &str,
    ) -> Result<Outcome<Option<ProcessRecord>>> {
        let raw = self.search(executor, name)?;
        let layout = self.layout;
        let kept: Vec<&str> = raw
            .lines()
            .filter(|line| {
                let record = ProcessRecord::parse(line, layout);
                !record.command().is_some_and(is_search_artifact)
            })
            .collect();

        if kept.iter().all(|l| l.trim().is_empty()) {
            return Ok(Outcome::new(None));
        }

        Ok(into_outcome(find_by_name(name, &kept.join("\n"), layout)))
    }

    /// Process whose pid column equals `pid`.
    pub fn find_by_pid(
        &self,
        executor: &mut dyn Executor,
        pid: u32,
    ) -> Result<Outcome<Option<ProcessRecord>>> {
        let raw = self.search(executor, &pid.to_string())?;
        Ok(into_outcome(find_by_pid(pid, &raw, self.layout)))
    }
}

fn into_outcome(lookup: Lookup) -> Outcome<Option<ProcessRecord>> {
    let mut out = Outcome::new(lookup.record);
    out.extend(
        lookup
            .malformed
            .into_iter()
            .map(|line| Warning::MalformedLine { line }),
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeExecutor, running_line, stopped_line};
    use pretty_assertions::assert_eq;

    #[test]
    fn finds_running_server() {
        let mut exec = FakeExecutor::with(&[Some(&running_line(937, 25565))]);
        let table = ProcessTable::new(&ControlConfig::default());

        let out = table.find_by_name(&mut exec, "mcserv25565").unwrap();
        assert!(out.warnings.is_empty());
        assert_eq!(out.value.map(|r| r.pid()), Some(937));
        assert_eq!(exec.issued, vec!["ps -aux | grep --color=never mcserv25565".to_string()]);
    }

    #[test]
    fn grep_only_output_is_not_found_without_warning() {
        let mut exec = FakeExecutor::with(&[Some(&stopped_line(25565))]);
        let table = ProcessTable::new(&ControlConfig::default());

        let out = table.find_by_name(&mut exec, "mcserv25565").unwrap();
        assert_eq!(out, Outcome::new(None));
    }

    #[test]
    fn truncated_line_warns() {
        let line = "bubanga  14693  0.0  0.1  40100  3576 pts/0    R+   19:49   0:00\n";
        let mut exec = FakeExecutor::with(&[Some(line)]);
        let table = ProcessTable::new(&ControlConfig::default());

        let out = table.find_by_name(&mut exec, "mcserv25565").unwrap();
        assert!(out.value.is_none());
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn execution_failure_propagates() {
        let mut exec = FakeExecutor::with(&[None]);
        let table = ProcessTable::new(&ControlConfig::default());
        let err = table.find_by_name(&mut exec, "mcserv25565").unwrap_err();
        assert_eq!(err.code(), "execution_failed");

        let mut exec = FakeExecutor::with(&[Some("")]);
        assert!(table.find_by_pid(&mut exec, 937).is_err());
    }

    #[test]
    fn finds_by_pid() {
        let mut exec = FakeExecutor::with(&[Some(&running_line(937, 25565))]);
        let table = ProcessTable::new(&ControlConfig::default());

        let out = table.find_by_pid(&mut exec, 937).unwrap();
        let record = out.value.expect("record");
        assert_eq!(record.cpu(), 12.5);
        assert_eq!(exec.issued, vec!["ps -aux | grep --color=never 937".to_string()]);
    }
}
