use std::{process::ExitCode, time::Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tether_control::{
    Executor, MachineMonitor, RemoteLocator, ServerControl, ServerInfo, ServerMonitor, Terminal,
    Warning,
};
use uuid::Uuid;

mod config;
mod error_payload;
mod report;
mod ssh;

use config::{ConnectionArgs, Settings};
use report::{Details, Report};

/// Start, stop and monitor a screen-hosted game server over SSH.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Pretty-print the JSON report
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report whether the server is running
    Status,
    /// Launch the server jar in a detached screen session
    Start {
        /// Remote path of the server jar [env: TETHER_SERVER_JAR]
        #[arg(long)]
        jar: Option<String>,
        /// JVM parameters, space separated [env: TETHER_JAVA_PARAMS]
        #[arg(long, allow_hyphen_values = true)]
        java_params: Option<String>,
    },
    /// Ask the screen session to quit
    Stop,
    /// Send a signal to the server process
    Kill {
        #[arg(long, default_value_t = tether_control::DEFAULT_KILL_SIGNAL)]
        signal: i32,
    },
    /// Uptime, cpu and memory of the server process
    InfoServer,
    /// Cpu and memory of the whole host
    InfoMachine,
}

impl Command {
    fn kind(&self) -> &'static str {
        match self {
            Command::Status => "status",
            Command::Start { .. } => "start",
            Command::Stop => "stop",
            Command::Kill { .. } => "kill",
            Command::InfoServer => "info_server",
            Command::InfoMachine => "info_machine",
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let request_id = Uuid::new_v4().to_string();
    let span = tracing::info_span!("tether", %request_id, command = cli.command.kind());
    let _enter = span.enter();

    match run(&cli, &request_id) {
        Ok(report) => {
            let json = if cli.pretty {
                serde_json::to_string_pretty(&report)
            } else {
                serde_json::to_string(&report)
            };
            match json {
                Ok(json) => {
                    println!("{json}");
                    ExitCode::SUCCESS
                }
                Err(err) => {
                    eprintln!("{}", error_payload::encode("internal", err.to_string(), None, None));
                    ExitCode::FAILURE
                }
            }
        }
        Err(err) => {
            tracing::error!(error = %error_payload::format_error_chain(&err), "command failed");
            eprintln!("{}", error_payload::from_error(&err, &request_id));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, request_id: &str) -> anyhow::Result<Report> {
    let settings = Settings::from_env(&cli.connection).context("loading settings")?;
    tracing::debug!(ssh = ?settings.ssh, port = settings.server_port, "resolved settings");

    let started = Instant::now();
    let channel = ssh::SshChannel::connect(&settings.ssh)
        .with_context(|| format!("connecting to {}:{}", settings.ssh.host, settings.ssh.port))?;
    let mut terminal = Terminal::new(channel, &settings.control)?;

    let mut warnings = Vec::new();
    let details = execute(&cli.command, &settings, &mut terminal, &mut warnings)?;

    let is_running = ServerControl::new(&mut terminal, settings.control.clone())?
        .is_running(settings.server_port)
        .context("checking server state")?;

    Ok(Report::new(
        cli.command.kind(),
        is_running,
        details,
        warnings,
        started,
        request_id.to_string(),
    ))
}

fn execute(
    command: &Command,
    settings: &Settings,
    terminal: &mut impl Executor,
    warnings: &mut Vec<Warning>,
) -> anyhow::Result<Details> {
    let port = settings.server_port;
    let mut control = ServerControl::new(&mut *terminal, settings.control.clone())?;

    let details = match command {
        Command::Status => Details::Status {},
        Command::Start { jar, java_params } => {
            let (jar, params) = config::launch_settings(
                jar.as_deref(),
                java_params.as_deref(),
                |name| std::env::var(name).ok(),
            )?;
            let locator = RemoteLocator::new(&jar)
                .with_check(settings.control.templates.file_exists.clone());
            let out = control
                .start(&locator, port, &params)
                .with_context(|| format!("starting {}", control.server_name(port)))?;
            warnings.extend(out.warnings);
            Details::Start {
                try_start: out.value,
            }
        }
        Command::Stop => {
            let out = control.stop(port).context("stopping server")?;
            warnings.extend(out.warnings);
            Details::Stop {
                try_stop: out.value,
            }
        }
        Command::Kill { signal } => {
            let out = control.kill_with(port, *signal).context("killing server")?;
            warnings.extend(out.warnings);
            Details::Kill {
                try_kill: out.value,
            }
        }
        Command::InfoServer => {
            let info = match control.get_pid(port)? {
                Some(pid) => {
                    let mut monitor = ServerMonitor::new(&mut *terminal, &settings.control)?;
                    let info = monitor.info(pid).context("reading server metrics")?;
                    warnings.extend(monitor.warnings().iter().cloned());
                    info
                }
                None => ServerInfo::default(),
            };
            Details::Server(info)
        }
        Command::InfoMachine => {
            let mut monitor = MachineMonitor::new(&mut *terminal, &settings.control)?;
            Details::Machine(monitor.info().context("reading machine metrics")?)
        }
    };

    Ok(details)
}
