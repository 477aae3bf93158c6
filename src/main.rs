/*!
 * procsup - Process Supervisor
 *
 * Entry point providing:
 * - `supervise`: spawn one child job and wait for it
 * - `child`: the child side of a supervised job (spawned by `supervise`)
 * - `count-signals`: count interrupt deliveries and exit at a threshold
 */

use clap::{Parser, Subcommand};
use proc_supervisor::core::errors::SerializableError;
use proc_supervisor::core::limits::{EXIT_FAILURE, EXIT_SUCCESS};
use proc_supervisor::core::types::ExitCode;
use proc_supervisor::process::{parent_failure_code, run_child, run_parent};
use proc_supervisor::{
    init_tracing, ChildJob, InputExchange, ProcessSupervisor, Role, RuntimeConfig, Signal,
    SignalCounter,
};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "procsup")]
#[command(about = "Supervise a child process or count interrupt signals")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Emit logs as JSON (same as PROCSUP_TRACE_JSON=1)
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Spawn a child running JOB, wait for it, and exit with its status
    Supervise {
        /// Feed these lines to the child's stdin instead of sharing ours
        #[arg(long = "line", value_name = "TEXT")]
        lines: Vec<String>,
        /// Print a JSON report after the child finishes
        #[arg(long)]
        json: bool,
        #[command(subcommand)]
        job: JobCommand,
    },
    /// Child side of `supervise`
    #[command(hide = true)]
    Child {
        #[command(subcommand)]
        job: JobCommand,
    },
    /// Count deliveries of a signal and exit once the threshold is reached
    CountSignals {
        /// Signal to intercept (default: SIGINT or PROCSUP_SIGNAL)
        #[arg(long)]
        signal: Option<Signal>,
        /// Deliveries before exiting (default: 3 or PROCSUP_SIGNAL_THRESHOLD)
        #[arg(long)]
        threshold: Option<u64>,
    },
}

#[derive(Subcommand, Clone)]
enum JobCommand {
    /// Echo lines read from stdin
    Echo {
        /// Stop after N lines instead of at end of input
        #[arg(long = "lines", value_name = "N")]
        max_lines: Option<usize>,
    },
    /// Copy SOURCE to DEST, prompting on stdin for any path not given
    Copy {
        source: Option<PathBuf>,
        dest: Option<PathBuf>,
    },
}

impl From<JobCommand> for ChildJob {
    fn from(cmd: JobCommand) -> Self {
        match cmd {
            JobCommand::Echo { max_lines } => ChildJob::Echo { max_lines },
            JobCommand::Copy { source, dest } => ChildJob::Copy { source, dest },
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let code = match RuntimeConfig::from_env() {
        Ok(config) => {
            let trace_json = config.trace_json || cli.json_logs;
            let config = config.with_trace_json(trace_json);
            init_tracing(config.trace_json);
            run(cli.command, config)
        }
        Err(e) => {
            init_tracing(cli.json_logs);
            error!(error = %e, "invalid configuration");
            eprintln!("procsup: {}", e);
            e.exit_code()
        }
    };

    std::process::exit(code);
}

fn run(command: Commands, config: RuntimeConfig) -> ExitCode {
    match command {
        Commands::Supervise { lines, json, job } => {
            let input = if lines.is_empty() {
                InputExchange::Inherit
            } else {
                InputExchange::Lines(lines)
            };
            dispatch(
                Role::Parent {
                    job: job.into(),
                    input,
                },
                json,
            )
        }
        Commands::Child { job } => dispatch(Role::Child { job: job.into() }, false),
        Commands::CountSignals { signal, threshold } => {
            let mut config = config;
            if let Some(signal) = signal {
                config = config.with_signal(signal);
            }
            if let Some(threshold) = threshold {
                config = config.with_threshold(threshold);
            }
            count_signals(config)
        }
    }
}

fn dispatch(role: Role, json: bool) -> ExitCode {
    match role {
        Role::Child { job } => {
            let stdin = io::stdin();
            run_child(&job, stdin.lock(), io::stdout().lock(), io::stderr())
        }
        Role::Parent { job, input } => supervise(&job, input, json),
    }
}

fn supervise(job: &ChildJob, input: InputExchange, json: bool) -> ExitCode {
    let program = match std::env::current_exe() {
        Ok(path) => path.to_string_lossy().into_owned(),
        Err(e) => {
            error!(error = %e, "cannot locate own executable");
            eprintln!("parent: cannot locate own executable: {}", e);
            return EXIT_FAILURE;
        }
    };

    let supervisor = ProcessSupervisor::new();
    match run_parent(&supervisor, &program, job, input, io::stdout().lock()) {
        Ok(report) => {
            if json {
                print_json(&report);
            }
            report.status.as_exit_code()
        }
        Err(e) => {
            if json {
                print_json(&SerializableError::from(&e));
            }
            parent_failure_code(&e, io::stderr())
        }
    }
}

fn count_signals(config: RuntimeConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        eprintln!("procsup: {}", e);
        return e.exit_code();
    }

    // Handler must be live before the ready line is printed
    let mut counter = match SignalCounter::install(config.signal, config.threshold) {
        Ok(counter) => counter,
        Err(e) => {
            error!(error = %e, "handler install failed");
            eprintln!("Error setting {} handler: {}", config.signal, e);
            return EXIT_FAILURE;
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let ready = if config.signal == Signal::SIGINT {
        writeln!(
            out,
            "Press Ctrl+C to send a SIGINT signal. (pid={})",
            std::process::id()
        )
    } else {
        writeln!(out, "Send {} to pid {}.", config.signal, std::process::id())
    };
    if let Err(e) = ready.and_then(|_| out.flush()) {
        eprintln!("procsup: {}", e);
        return EXIT_FAILURE;
    }

    match counter.run(&mut out) {
        Ok(termination) => {
            info!(
                signal = %termination.signal,
                count = termination.count,
                "terminating after threshold"
            );
            EXIT_SUCCESS
        }
        Err(e) => {
            error!(error = %e, "signal counter failed");
            eprintln!("procsup: {}", e);
            EXIT_FAILURE
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{}", line),
        Err(e) => error!(error = %e, "failed to serialize report"),
    }
}
