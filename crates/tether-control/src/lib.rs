//! Start, stop, kill and monitor a game server over a remote shell.
//!
//! Every component borrows one [`Executor`] and issues a single command at a
//! time. [`Terminal`] adapts a [`ShellChannel`] into an executor and answers
//! `sudo` password prompts.

mod channel;
mod config;
mod diagnostics;
mod error;
mod locator;
mod machine_monitor;
mod process_table;
mod server_control;
mod server_monitor;
pub mod template;
mod terminal;

#[cfg(test)]
mod testing;

pub use channel::ShellChannel;
pub use config::{
    ControlConfig, DEFAULT_FILE_EXTENSION, DEFAULT_NAME_PREFIX, DEFAULT_PASSWORD_PATTERN,
    DEFAULT_PROMPT_PATTERN, SudoPassword, Templates,
};
pub use diagnostics::{Outcome, Warning};
pub use error::{Error, Result};
pub use locator::{Locator, RemoteLocator};
pub use machine_monitor::MachineMonitor;
pub use process_table::ProcessTable;
pub use server_control::{DEFAULT_KILL_SIGNAL, ServerControl};
pub use server_monitor::ServerMonitor;
pub use template::CommandTemplate;
pub use terminal::{Executor, Terminal, is_elevating};

pub use tether_process::{MachineInfo, MetricFormat, ServerInfo};
