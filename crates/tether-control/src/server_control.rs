use tether_process::ProcessRecord;

use crate::config::ControlConfig;
use crate::diagnostics::{Outcome, Warning};
use crate::error::{Error, Result};
use crate::locator::Locator;
use crate::process_table::ProcessTable;
use crate::terminal::Executor;

pub const DEFAULT_KILL_SIGNAL: i32 = 9;

/// Starts, stops and kills the screen-hosted server bound to a port.
///
/// Nothing is cached: every call re-reads the remote process list, and every
/// action is followed by a fresh check of whether it took effect.
#[derive(Debug)]
pub struct ServerControl<E> {
    executor: E,
    config: ControlConfig,
    table: ProcessTable,
}

impl<E: Executor> ServerControl<E> {
    pub fn new(executor: E, config: ControlConfig) -> Result<Self> {
        if !executor.is_connected() {
            return Err(Error::NotConnected);
        }
        config.validate()?;

        let table = ProcessTable::new(&config);
        Ok(Self {
            executor,
            config,
            table,
        })
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    pub fn into_inner(self) -> E {
        self.executor
    }

    pub fn server_name(&self, port: u16) -> String {
        self.config.server_name(port)
    }

    /// Raw text of the last shell response.
    pub fn last_response(&self) -> Option<&str> {
        self.executor.last_response()
    }

    fn lookup(&mut self, port: u16) -> Result<Outcome<Option<ProcessRecord>>> {
        let name = self.server_name(port);
        self.table.find_by_name(&mut self.executor, &name)
    }

    /// Pid of the server on `port`, if one is running.
    pub fn get_pid(&mut self, port: u16) -> Result<Option<u32>> {
        Ok(self.pid_outcome(port)?.into_value())
    }

    fn pid_outcome(&mut self, port: u16) -> Result<Outcome<Option<u32>>> {
        Ok(self
            .lookup(port)?
            .map(|record| record.map(|r| r.pid()).filter(|pid| *pid > 0)))
    }

    pub fn is_running(&mut self, port: u16) -> Result<bool> {
        Ok(self.get_pid(port)?.is_some())
    }

    /// Launches the artifact behind `locator` in a detached screen session
    /// named after `port`.
    ///
    /// `Ok(true)` only once the process shows up in the process list.
    pub fn start(
        &mut self,
        locator: &dyn Locator,
        port: u16,
        parameters: &[String],
    ) -> Result<Outcome<bool>> {
        if !locator.is_file_exist(&mut self.executor)? {
            return Err(Error::NotFoundFile {
                path: locator.full_path(),
            });
        }

        let extension = &self.config.file_extension;
        if !has_extension(locator.file(), extension) {
            return Err(Error::BadFileType {
                file: locator.file().to_string(),
                extension: extension.clone(),
            });
        }

        let before = self.pid_outcome(port)?;
        if before.value.is_some() {
            let mut out = Outcome::new(false);
            out.extend(before.warnings);
            return Ok(out.warn(Warning::AlreadyRunning { port }));
        }

        let name = self.server_name(port);
        let params = parameters.join(" ");
        let port_text = port.to_string();
        let command = self.config.templates.start.render(&[
            ("PATH", locator.path()),
            ("NAME", &name),
            ("PARAMS", &params),
            ("FILE", locator.file()),
            ("PORT", &port_text),
        ]);
        self.executor.run(&command)?;

        let mut out = self.verify(port, true)?;
        if out.value {
            tracing::info!(port, name = %name, "server started");
        } else {
            out.push(Warning::DidNotStart { port });
        }
        Ok(out)
    }

    /// Asks the screen session to quit.
    pub fn stop(&mut self, port: u16) -> Result<Outcome<bool>> {
        let before = self.pid_outcome(port)?;
        if before.value.is_none() {
            return Ok(already_stopped(before, port));
        }

        let name = self.server_name(port);
        let command = self.config.templates.stop.render(&[("NAME", &name)]);
        self.executor.run(&command)?;

        let mut out = self.verify(port, false)?;
        if out.value {
            tracing::info!(port, name = %name, "server stopped");
        } else {
            out.push(Warning::DidNotStop { port });
        }
        Ok(out)
    }

    /// `kill -9` on the server's pid.
    pub fn kill(&mut self, port: u16) -> Result<Outcome<bool>> {
        self.kill_with(port, DEFAULT_KILL_SIGNAL)
    }

    pub fn kill_with(&mut self, port: u16, signal: i32) -> Result<Outcome<bool>> {
        let before = self.pid_outcome(port)?;
        let Some(pid) = before.value else {
            return Ok(already_stopped(before, port));
        };

        let pid_text = pid.to_string();
        let signal_text = signal.to_string();
        let command = self
            .config
            .templates
            .kill
            .render(&[("SIGNAL", &signal_text), ("PID", &pid_text)]);
        self.executor.run(&command)?;

        let mut out = self.verify(port, false)?;
        if out.value {
            tracing::info!(port, pid, signal, "server killed");
        } else {
            out.push(Warning::NotKilled { port });
        }
        Ok(out)
    }

    /// `true` when the server's presence now matches `want_running`.
    fn verify(&mut self, port: u16, want_running: bool) -> Result<Outcome<bool>> {
        Ok(self
            .pid_outcome(port)?
            .map(|pid| pid.is_some() == want_running))
    }
}

fn already_stopped(before: Outcome<Option<u32>>, port: u16) -> Outcome<bool> {
    before.map(|_| false).warn(Warning::AlreadyStopped { port })
}

fn has_extension(file: &str, extension: &str) -> bool {
    let suffix = format!(".{}", extension.trim_start_matches('.'));
    file.len() > suffix.len()
        && file
            .get(file.len() - suffix.len()..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(&suffix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::RemoteLocator;
    use crate::testing::{FakeExecutor, running_line, stopped_line};
    use pretty_assertions::assert_eq;

    const PORT: u16 = 25565;

    fn control(responses: &[Option<&str>]) -> ServerControl<FakeExecutor> {
        ServerControl::new(FakeExecutor::with(responses), ControlConfig::default())
            .expect("control")
    }

    #[test]
    fn rejects_disconnected_executor() {
        let mut exec = FakeExecutor::new();
        exec.disconnected = true;
        let err = ServerControl::new(exec, ControlConfig::default()).unwrap_err();
        assert_eq!(err.code(), "not_connected");
    }

    #[test]
    fn get_pid_reads_running_server() {
        let running = running_line(937, PORT);
        let stopped = stopped_line(PORT);
        let mut ctl = control(&[Some(&running), Some(&stopped)]);

        assert_eq!(ctl.get_pid(PORT).unwrap(), Some(937));
        assert!(!ctl.is_running(PORT).unwrap());
    }

    #[test]
    fn garbled_pid_is_not_running() {
        let line = "mc  abc  1.0  1.0 1 1 ?  S  10:02  0:01 SCREEN -dmS mcserv25565 java -jar server.jar\n";
        let mut ctl = control(&[Some(line)]);
        assert_eq!(ctl.get_pid(PORT).unwrap(), None);
    }

    #[test]
    fn start_issues_command_and_confirms() {
        let running = running_line(937, PORT);
        let stopped = stopped_line(PORT);
        let mut ctl = control(&[Some("1"), Some(&stopped), Some(""), Some(&running)]);
        let locator = RemoteLocator::new("/srv/mc/server.jar");

        let out = ctl
            .start(&locator, PORT, &["-Xmx2G".to_string(), "-Xms1G".to_string()])
            .unwrap();
        assert_eq!(out, Outcome::new(true));

        let exec = ctl.into_inner();
        assert_eq!(
            exec.issued[2],
            "cd /srv/mc; screen -dmS mcserv25565 java -Xmx2G -Xms1G -jar server.jar nogui --port 25565"
        );
        assert_eq!(exec.issued.len(), 4);
    }

    #[test]
    fn start_when_running_issues_nothing() {
        let running = running_line(937, PORT);
        let mut ctl = control(&[Some("1"), Some(&running)]);
        let locator = RemoteLocator::new("/srv/mc/server.jar");

        let out = ctl.start(&locator, PORT, &[]).unwrap();
        assert!(!out.value);
        assert_eq!(out.warnings, vec![Warning::AlreadyRunning { port: PORT }]);
        assert_eq!(ctl.into_inner().issued.len(), 2);
    }

    #[test]
    fn start_that_never_shows_up_warns() {
        let stopped = stopped_line(PORT);
        let mut ctl = control(&[Some("1"), Some(&stopped), Some(""), Some(&stopped)]);
        let locator = RemoteLocator::new("/srv/mc/server.jar");

        let out = ctl.start(&locator, PORT, &[]).unwrap();
        assert!(!out.value);
        assert_eq!(out.warnings, vec![Warning::DidNotStart { port: PORT }]);
    }

    #[test]
    fn start_preflight_errors() {
        let mut ctl = control(&[Some("0")]);
        let err = ctl
            .start(&RemoteLocator::new("/srv/mc/server.jar"), PORT, &[])
            .unwrap_err();
        assert_eq!(err.to_string(), "the path /srv/mc/server.jar does not exist");

        let mut ctl = control(&[Some("1")]);
        let err = ctl
            .start(&RemoteLocator::new("/srv/mc/server.zip"), PORT, &[])
            .unwrap_err();
        assert_eq!(err.to_string(), "the server.zip file must be of the .jar type");

        let running = running_line(937, PORT);
        let mut ctl = control(&[Some("1"), Some(&running)]);
        let out = ctl
            .start(&RemoteLocator::new("/srv/mc/SERVER.JAR"), PORT, &[])
            .unwrap();
        assert_eq!(out.warnings, vec![Warning::AlreadyRunning { port: PORT }]);
    }

    #[test]
    fn start_execution_failure_names_command() {
        let stopped = stopped_line(PORT);
        let mut ctl = control(&[Some("1"), Some(&stopped), None]);
        let err = ctl
            .start(&RemoteLocator::new("/srv/mc/server.jar"), PORT, &[])
            .unwrap_err();
        assert!(err.to_string().contains("screen -dmS mcserv25565"));
    }

    #[test]
    fn stop_twice_is_idempotent() {
        let stopped = stopped_line(PORT);
        let mut ctl = control(&[Some(&stopped), Some(&stopped)]);

        for _ in 0..2 {
            let out = ctl.stop(PORT).unwrap();
            assert!(!out.value);
            assert_eq!(out.warnings, vec![Warning::AlreadyStopped { port: PORT }]);
        }
        assert_eq!(ctl.into_inner().issued.len(), 2);
    }

    #[test]
    fn stop_verifies_absence() {
        let running = running_line(937, PORT);
        let stopped = stopped_line(PORT);

        let mut ctl = control(&[Some(&running), Some(""), Some(&stopped)]);
        assert_eq!(ctl.stop(PORT).unwrap(), Outcome::new(true));
        assert_eq!(
            ctl.into_inner().issued[1],
            "screen -X -S mcserv25565 quit"
        );

        let mut ctl = control(&[Some(&running), Some(""), Some(&running)]);
        let out = ctl.stop(PORT).unwrap();
        assert!(!out.value);
        assert_eq!(out.warnings, vec![Warning::DidNotStop { port: PORT }]);
    }

    #[test]
    fn kill_sends_signal_to_pid() {
        let running = running_line(937, PORT);
        let stopped = stopped_line(PORT);

        let mut ctl = control(&[Some(&running), Some(""), Some(&stopped)]);
        assert!(ctl.kill(PORT).unwrap().value);
        assert_eq!(ctl.into_inner().issued[1], "kill -9 937");

        let mut ctl = control(&[Some(&running), Some(""), Some(&running)]);
        let out = ctl.kill_with(PORT, 15).unwrap();
        assert_eq!(out.warnings, vec![Warning::NotKilled { port: PORT }]);
        assert_eq!(ctl.last_response(), Some(running.as_str()));
    }

    #[test]
    fn kill_without_server_warns() {
        let mut ctl = control(&[Some(&stopped_line(PORT))]);
        let out = ctl.kill(PORT).unwrap();
        assert!(!out.value);
        assert_eq!(out.warnings, vec![Warning::AlreadyStopped { port: PORT }]);
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(has_extension("server.jar", "jar"));
        assert!(has_extension("Server.JAR", ".jar"));
        assert!(!has_extension(".jar", "jar"));
        assert!(!has_extension("server.jar.zip", "jar"));
    }
}
