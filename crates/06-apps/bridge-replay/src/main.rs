//! Replays a scripted host session against the batched bridge.

mod demo;
mod replay;
mod script;

use std::io;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Result;
use bridge_queue::{log_spy, DebuggerState, MessageQueue, QueueConfig};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

/// Drive the demo script-side modules from a JSON script of host steps.
#[derive(Parser, Debug)]
#[command(author, version, about = "Replay host steps against the batched bridge", long_about = None)]
struct Cli {
    /// JSON file with the steps to replay.
    #[arg(value_name = "SCRIPT")]
    script: PathBuf,

    /// Run without diagnostics (no validation, unknown callbacks ignored).
    #[arg(long)]
    production: bool,

    /// Log every call crossing the bridge.
    #[arg(long)]
    spy: bool,

    /// Return the first handler failure instead of reporting it.
    #[arg(long)]
    pause_on_throw: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let script = script::load(&cli.script)?;

    let config = if cli.production {
        QueueConfig::production()
    } else {
        QueueConfig::development()
    };
    let queue = MessageQueue::builder()
        .config(config)
        .debugger(Rc::new(DebuggerState::new(cli.pause_on_throw)))
        .build();
    if cli.spy {
        queue.install_spy(Some(log_spy()));
    }
    demo::install(queue)?;

    let stdout = io::stdout();
    replay::run(script, &mut stdout.lock())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Batches go to stdout, so logs stay on stderr.
    let _ = fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .try_init();
}
