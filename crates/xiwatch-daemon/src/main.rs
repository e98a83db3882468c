//! xiwatch daemon
//!
//! Watches the XInput2 device hierarchy and runs a command for every
//! actionable change, with the change attributes exposed to the child
//! as environment variables.

mod dispatch;
mod session;

use anyhow::{bail, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::dispatch::Invoker;
use crate::session::Session;

#[derive(Parser, Debug)]
#[command(name = "xiwatchd")]
#[command(about = "Run a command on XInput2 device hierarchy changes")]
#[command(version)]
struct Args {
    /// X display to connect to (defaults to $DISPLAY)
    #[arg(long, value_name = "DISPLAY")]
    display: Option<String>,

    /// Decode and log events without running the command
    #[arg(short = 'n', long)]
    no_act: bool,

    /// On startup, replay added/enabled events for devices already present
    #[arg(short = '0', long)]
    bootstrap: bool,

    /// Command (and arguments) to run for each device change
    #[arg(
        value_name = "COMMAND",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    command: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let Some((program, command_args)) = args.command.split_first() else {
        bail!("usage: xiwatchd [OPTIONS] COMMAND [ARGS]...");
    };
    let invoker = Invoker::new(program.clone(), command_args.to_vec(), args.no_act);

    let session = Session::connect(args.display.as_deref())?;
    session.subscribe()?;

    if args.bootstrap {
        session.replay_existing_devices(&invoker)?;
    }

    tracing::info!("watching for input device hierarchy changes");
    session.run(&invoker)
}
