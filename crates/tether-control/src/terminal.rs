use std::{fmt, sync::OnceLock};

use regex::Regex;

use crate::channel::ShellChannel;
use crate::config::{ControlConfig, SudoPassword};
use crate::error::{Error, Result};

/// Command execution as seen by the controller and monitors.
pub trait Executor {
    fn is_connected(&self) -> bool;

    /// Runs a command whose output is needed; empty output is a failure.
    fn exec(&mut self, command: &str) -> Result<String>;

    /// Runs a command that may legitimately print nothing (e.g. launching a
    /// detached `screen`). Only a missing acknowledgement is a failure.
    fn run(&mut self, command: &str) -> Result<String>;

    /// Raw text of the last successful response.
    fn last_response(&self) -> Option<&str>;
}

impl<E: Executor + ?Sized> Executor for &mut E {
    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn exec(&mut self, command: &str) -> Result<String> {
        (**self).exec(command)
    }

    fn run(&mut self, command: &str) -> Result<String> {
        (**self).run(command)
    }

    fn last_response(&self) -> Option<&str> {
        (**self).last_response()
    }
}

fn elevation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(?:\Asudo|;sudo|; sudo)").expect("valid sudo regex"))
}

/// True when `command` starts with `sudo` or chains into one after `;`.
pub fn is_elevating(command: &str) -> bool {
    elevation_re().is_match(command)
}

/// Steps of the interactive sudo dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Elevation {
    AwaitPrompt,
    SendCommand,
    AwaitReply,
    SendCredential,
    AwaitFinalPrompt,
    Done,
}

struct Patterns {
    prompt: Regex,
    password: Regex,
    prompt_or_password: Regex,
}

impl Patterns {
    fn compile(prompt: &str, password: &str) -> Result<Self> {
        Ok(Self {
            prompt: Regex::new(prompt)?,
            password: Regex::new(password)?,
            prompt_or_password: Regex::new(&format!("(?:{prompt})|(?:{password})"))?,
        })
    }
}

/// Executes commands over a [`ShellChannel`], answering the sudo password
/// prompt when one shows up.
pub struct Terminal<C> {
    channel: C,
    sudo_password: Option<SudoPassword>,
    password_pattern: String,
    patterns: Patterns,
    last_response: Option<String>,
    /// The interactive stream is idle at a prompt that has already been read.
    at_prompt: bool,
}

impl<C: ShellChannel> Terminal<C> {
    pub fn new(channel: C, config: &ControlConfig) -> Result<Self> {
        if !channel.is_connected() {
            return Err(Error::NotConnected);
        }

        Ok(Self {
            channel,
            sudo_password: config.sudo_password.clone(),
            password_pattern: config.password_pattern.clone(),
            patterns: Patterns::compile(&config.prompt_pattern, &config.password_pattern)?,
            last_response: None,
            at_prompt: false,
        })
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        self.at_prompt = false;
        &mut self.channel
    }

    pub fn into_inner(self) -> C {
        self.channel
    }

    pub fn has_sudo_password(&self) -> bool {
        self.sudo_password.is_some()
    }

    pub fn set_sudo_password(&mut self, password: Option<SudoPassword>) {
        self.sudo_password = password;
    }

    /// Reads the channel and returns its last non-blank line, which on an idle
    /// shell is the prompt.
    pub fn detect_prompt(&mut self) -> Result<String> {
        self.at_prompt = false;
        let read = self.channel.read()?;
        let prompt = read
            .lines()
            .map(|l| l.trim_end_matches('\r'))
            .rfind(|l| !l.trim().is_empty())
            .map(str::to_string)
            .ok_or(Error::NoAnswer)?;
        self.at_prompt = true;
        Ok(prompt)
    }

    /// Like [`Self::detect_prompt`], then waits for that exact prompt from
    /// now on instead of the generic pattern.
    pub fn learn_prompt(&mut self) -> Result<String> {
        let prompt = self.detect_prompt()?;
        let literal = regex::escape(prompt.trim_end());
        self.patterns = Patterns::compile(&literal, &self.password_pattern)?;
        tracing::debug!(prompt = %prompt.trim_end(), "learned shell prompt");
        Ok(prompt)
    }

    fn dispatch(&mut self, command: &str, require_output: bool) -> Result<String> {
        if !self.channel.is_connected() {
            return Err(Error::NotConnected);
        }

        let elevated = is_elevating(command);
        tracing::debug!(command, elevated, "exec");

        let output = if elevated {
            if self.sudo_password.is_none() {
                return Err(Error::MissingCredential);
            }
            self.exec_elevated(command)?
        } else {
            match self.channel.exec(command)? {
                Some(out) if !require_output || !out.is_empty() => out,
                _ => {
                    return Err(Error::ExecutionFailed {
                        command: command.to_string(),
                    });
                }
            }
        };

        if elevated && output.is_empty() {
            return Err(Error::ExecutionFailed {
                command: command.to_string(),
            });
        }

        self.last_response = Some(output.clone());
        Ok(output)
    }

    /// Drives the sudo dialogue on the interactive stream.
    ///
    /// Each read consumes what it matched, so the prompt left by the previous
    /// dialogue is never seen again; waiting for it would block until the
    /// transport times out.
    fn exec_elevated(&mut self, command: &str) -> Result<String> {
        let mut step = if std::mem::take(&mut self.at_prompt) {
            Elevation::SendCommand
        } else {
            Elevation::AwaitPrompt
        };
        let mut output = String::new();

        while step != Elevation::Done {
            tracing::trace!(?step, "elevation");
            step = match step {
                Elevation::AwaitPrompt => {
                    self.channel.read_until(&self.patterns.prompt)?;
                    Elevation::SendCommand
                }
                Elevation::SendCommand => {
                    self.channel.write(&format!("{command}\n"))?;
                    Elevation::AwaitReply
                }
                Elevation::AwaitReply => {
                    output = self.channel.read_until(&self.patterns.prompt_or_password)?;
                    if self.patterns.password.is_match(&output) {
                        Elevation::SendCredential
                    } else {
                        Elevation::Done
                    }
                }
                Elevation::SendCredential => {
                    let password = self.sudo_password.as_ref().ok_or(Error::MissingCredential)?;
                    let line = format!("{}\n", password.expose());
                    self.channel.write(&line)?;
                    Elevation::AwaitFinalPrompt
                }
                Elevation::AwaitFinalPrompt => {
                    output = self.channel.read_until(&self.patterns.prompt)?;
                    Elevation::Done
                }
                Elevation::Done => Elevation::Done,
            };
        }

        self.at_prompt = true;
        Ok(output)
    }
}

impl<C: ShellChannel> Executor for Terminal<C> {
    fn is_connected(&self) -> bool {
        self.channel.is_connected()
    }

    fn exec(&mut self, command: &str) -> Result<String> {
        self.dispatch(command, true)
    }

    fn run(&mut self, command: &str) -> Result<String> {
        self.dispatch(command, false)
    }

    fn last_response(&self) -> Option<&str> {
        self.last_response.as_deref()
    }
}

impl<C> fmt::Debug for Terminal<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Terminal")
            .field("has_sudo_password", &self.sudo_password.is_some())
            .field("prompt", &self.patterns.prompt.as_str())
            .finish_non_exhaustive()
    }
}
