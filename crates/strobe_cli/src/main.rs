//! Strobe CLI: the command-line interface for the Strobe gate-level simulator.
//!
//! Provides `strobe run` for simulating a netlist snapshot against a TOML
//! simulation file and `strobe check` for validating a netlist (and optionally
//! a simulation file) without running it.

#![warn(missing_docs)]

mod check;
mod run;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use log::LevelFilter;

/// Strobe: an event-driven gate-level logic simulator.
#[derive(Parser, Debug)]
#[command(name = "strobe", version, about = "Strobe gate-level simulator")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Simulate a netlist.
    Run(RunArgs),
    /// Validate a netlist and simulation file without simulating.
    Check(CheckArgs),
}

/// Arguments for the `strobe run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Netlist snapshot (JSON).
    pub netlist: PathBuf,

    /// Simulation file (TOML) with clocks, stimulus and waveform settings.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write a VCD waveform here, overriding `[waveform].path`.
    #[arg(long)]
    pub vcd: Option<PathBuf>,

    /// Stop after this timestamp, overriding `[simulation].until`.
    #[arg(long)]
    pub until: Option<u64>,

    /// Replay the value changes of a recorded VCD as extra stimulus.
    #[arg(long)]
    pub replay: Option<PathBuf>,
}

/// Arguments for the `strobe check` subcommand.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Netlist snapshot (JSON).
    pub netlist: PathBuf,

    /// Simulation file (TOML) to resolve against the netlist.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
}

impl GlobalArgs {
    /// Log level selected by `-q`/`-v`.
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::Error
        } else if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
    };

    env_logger::Builder::new()
        .filter_level(global.log_level())
        .parse_default_env()
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Command::Run(ref args) => run::run(args, &global),
        Command::Check(ref args) => check::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
