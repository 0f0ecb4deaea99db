//! `conproxy` — the constraint-reinforcement MCP proxy binary.
//!
//! Reads a JSON constraint pack, wires up the dispatcher, and runs it over
//! stdin/stdout until the client sends `shutdown` or closes the pipe.

mod pack_loader;

use anyhow::{Context, Result};
use clap::Parser;
use conproxy_logging::{conproxy_home, open_rolling_writer, LogConfig};
use conproxy_mcp::events::{EventLogger, WriterSink};
use conproxy_mcp::server::{McpServer, ProxyConfig};
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

/// Constraint-reinforcement MCP proxy.
#[derive(Debug, Parser)]
#[command(name = "conproxy", version, about, long_about = None)]
struct Cli {
    /// Path to the JSON constraint pack to load.
    #[arg(long, value_name = "PATH")]
    config: PathBuf,

    /// Inject every Nth interaction instead of the pack's own scheduling.
    #[arg(long, value_name = "N")]
    every_n: Option<u32>,

    /// Write decision events to stdout instead of the rotating events log.
    #[arg(long)]
    events_stdout: bool,

    /// Raise the console log layer to the same verbosity as the file layer.
    #[arg(long)]
    verbose: bool,

    /// Per-request deadline in milliseconds before falling back to pass-through.
    #[arg(long, value_name = "N")]
    deadline_ms: Option<u64>,
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!("conproxy: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    conproxy_logging::init_logging(LogConfig {
        app_name: "conproxy",
        verbose: cli.verbose,
    })
    .context("failed to initialize logging")?;

    info!(home = %conproxy_home().display(), "constraint proxy starting");

    let loaded = pack_loader::load(&cli.config)
        .with_context(|| format!("failed to load constraint pack: {}", cli.config.display()))?;

    let mut config = ProxyConfig::default();
    if let Some(scheduler) = loaded.scheduler {
        config.scheduler = scheduler;
    }
    if let Some(every_n) = cli.every_n {
        config.scheduler.every_n = every_n;
    }
    if let Some(ms) = cli.deadline_ms {
        config.deadline = Duration::from_millis(ms);
    }

    let logger = if cli.events_stdout {
        EventLogger::new(Box::new(WriterSink::new(io::stdout())))
    } else {
        let writer = open_rolling_writer("events")
            .context("failed to open rotating events log")?;
        EventLogger::new(Box::new(WriterSink::new(writer)))
    };

    let mut server = McpServer::new(config, loaded.library, logger);

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut reader = BufReader::new(stdin.lock());
    let mut writer = stdout.lock();

    let result = server.run(&mut reader, &mut writer);
    if let Err(err) = &result {
        error!(error = %err, "dispatcher exited with an error");
    }
    result
}
