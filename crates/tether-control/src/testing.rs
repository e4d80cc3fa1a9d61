//! Scripted stand-ins for a remote shell.

use std::collections::VecDeque;

use regex::Regex;

use crate::channel::ShellChannel;
use crate::error::{Error, Result};
use crate::terminal::Executor;

/// Replays canned exec results and interactive reads in order.
#[derive(Debug, Default)]
pub(crate) struct ScriptedChannel {
    pub(crate) disconnected: bool,
    pub(crate) exec_script: VecDeque<Option<String>>,
    pub(crate) read_script: VecDeque<String>,
    pub(crate) executed: Vec<String>,
    pub(crate) written: Vec<String>,
    pub(crate) patterns: Vec<String>,
}

impl ScriptedChannel {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn disconnected() -> Self {
        Self {
            disconnected: true,
            ..Self::default()
        }
    }

    pub(crate) fn push_exec(&mut self, out: Option<&str>) {
        self.exec_script.push_back(out.map(str::to_string));
    }

    pub(crate) fn push_read(&mut self, chunk: &str) {
        self.read_script.push_back(chunk.to_string());
    }
}

impl ShellChannel for ScriptedChannel {
    fn is_connected(&self) -> bool {
        !self.disconnected
    }

    fn exec(&mut self, command: &str) -> Result<Option<String>> {
        self.executed.push(command.to_string());
        Ok(self.exec_script.pop_front().flatten())
    }

    fn write(&mut self, data: &str) -> Result<()> {
        self.written.push(data.to_string());
        Ok(())
    }

    fn read_until(&mut self, pattern: &Regex) -> Result<String> {
        self.patterns.push(pattern.as_str().to_string());
        self.read_script
            .pop_front()
            .ok_or_else(|| Error::Channel("read script exhausted".to_string()))
    }

    fn read(&mut self) -> Result<String> {
        Ok(self.read_script.pop_front().unwrap_or_default())
    }
}

/// A pty-like stream: reads consume what they return, each write of a line
/// queues the next scripted reply, and a read that never matches runs dry.
#[derive(Debug, Default)]
pub(crate) struct PtyChannel {
    pending: String,
    replies: VecDeque<String>,
    exec_script: VecDeque<String>,
    pub(crate) written: Vec<String>,
}

impl PtyChannel {
    pub(crate) fn new(banner: &str) -> Self {
        Self {
            pending: banner.to_string(),
            ..Self::default()
        }
    }

    pub(crate) fn reply(&mut self, text: &str) {
        self.replies.push_back(text.to_string());
    }

    pub(crate) fn push_exec(&mut self, out: &str) {
        self.exec_script.push_back(out.to_string());
    }
}

impl ShellChannel for PtyChannel {
    fn is_connected(&self) -> bool {
        true
    }

    fn exec(&mut self, _command: &str) -> Result<Option<String>> {
        Ok(self.exec_script.pop_front())
    }

    fn write(&mut self, data: &str) -> Result<()> {
        self.written.push(data.to_string());
        if let Some(reply) = self.replies.pop_front() {
            self.pending.push_str(&reply);
        }
        Ok(())
    }

    fn read_until(&mut self, pattern: &Regex) -> Result<String> {
        let read = std::mem::take(&mut self.pending);
        if pattern.is_match(&read) {
            Ok(read)
        } else {
            Err(Error::NoAnswer)
        }
    }

    fn read(&mut self) -> Result<String> {
        Ok(std::mem::take(&mut self.pending))
    }
}

/// Answers commands from a queue; `None` entries are unacknowledged commands.
#[derive(Debug, Default)]
pub(crate) struct FakeExecutor {
    pub(crate) disconnected: bool,
    pub(crate) script: VecDeque<Option<String>>,
    pub(crate) issued: Vec<String>,
    pub(crate) last: Option<String>,
}

impl FakeExecutor {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with(responses: &[Option<&str>]) -> Self {
        let mut fake = Self::new();
        for r in responses {
            fake.push(*r);
        }
        fake
    }

    pub(crate) fn push(&mut self, out: Option<&str>) {
        self.script.push_back(out.map(str::to_string));
    }

    fn answer(&mut self, command: &str, require_output: bool) -> Result<String> {
        self.issued.push(command.to_string());
        match self.script.pop_front().flatten() {
            Some(out) if !require_output || !out.is_empty() => {
                self.last = Some(out.clone());
                Ok(out)
            }
            _ => Err(Error::ExecutionFailed {
                command: command.to_string(),
            }),
        }
    }
}

impl Executor for FakeExecutor {
    fn is_connected(&self) -> bool {
        !self.disconnected
    }

    fn exec(&mut self, command: &str) -> Result<String> {
        self.answer(command, true)
    }

    fn run(&mut self, command: &str) -> Result<String> {
        self.answer(command, false)
    }

    fn last_response(&self) -> Option<&str> {
        self.last.as_deref()
    }
}

/// `ps -aux | grep` output for a running server on `port` with `pid`.
pub(crate) fn running_line(pid: u32, port: u16) -> String {
    format!(
        "mc  {pid}  12.5  4.1 4412340 338112 ?  Ssl  10:02  5:31 SCREEN -dmS mcserv{port} java -Xmx2G -jar server.jar nogui --port {port}\n\
         mc  {grep}  0.0  0.0   6432   724 ?  S    10:09  0:00 grep --color=never mcserv{port}\n",
        grep = pid + 1000,
    )
}

/// `ps -aux | grep` output when only the search itself shows up.
pub(crate) fn stopped_line(port: u16) -> String {
    format!(
        "mc  4242  0.0  0.0   6432   724 ?  S    10:09  0:00 grep --color=never mcserv{port}\n"
    )
}
