use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

use transport_fsm::script::load_script;
use transport_fsm::{
    create_dispatch_span, generate_correlation_id, init_telemetry, ApiCall, LocateWhileLocating,
    SimulatedEngine, TransitionRecord, TransportConfig, TransportSnapshot, TransportStats,
};

#[derive(Parser)]
#[command(name = "transport-fsm")]
#[command(about = "Replay transport control events against a simulated engine")]
#[command(long_about = "Feeds a JSON Lines event script through the transport state machine, \
                       backed by a simulated engine that answers stops, locates and butler \
                       requests with completion events, and prints every transition.")]
struct Cli {
    /// Configuration file (defaults to ./transport-fsm.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay an event script and print the resulting transitions
    Replay {
        /// Path to the event script (one JSON event per line)
        script: PathBuf,
        /// Do not let the simulated engine submit completion events
        #[arg(long, help = "Only record engine calls, never auto-complete them")]
        manual: bool,
        /// A locate arriving mid-locate replaces the in-flight one
        #[arg(long, help = "Interrupt in-flight locates instead of resuming roll")]
        interrupt_locates: bool,
        /// Require a butler pass before every locate completes
        #[arg(long)]
        butler_on_locate: bool,
        /// Print a JSON report instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration as TOML
    ShowConfig,
}

#[derive(Serialize)]
struct ReplayReport {
    snapshot: TransportSnapshot,
    stats: TransportStats,
    history: Vec<TransitionRecord>,
    calls: Vec<ApiCall>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => TransportConfig::load_from(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => transport_fsm::config()
            .map_err(|e| anyhow!("Failed to load configuration: {e}"))?
            .clone(),
    };
    init_telemetry(&config.observability);

    match cli.command {
        Commands::Replay {
            script,
            manual,
            interrupt_locates,
            butler_on_locate,
            json,
        } => {
            let mut config = config;
            if manual {
                config.simulator.auto_complete = false;
            }
            if butler_on_locate {
                config.simulator.butler_on_locate = true;
            }
            if interrupt_locates {
                config.machine.locate_while_locating = LocateWhileLocating::Interrupt;
            }
            replay_command(&config, &script, json)
        }
        Commands::ShowConfig => {
            let rendered =
                toml::to_string_pretty(&config).context("Failed to render configuration")?;
            print!("{rendered}");
            Ok(())
        }
    }
}

fn replay_command(config: &TransportConfig, script: &Path, json: bool) -> Result<()> {
    let events = load_script(script)
        .with_context(|| format!("Failed to read event script {}", script.display()))?;

    let correlation_id = generate_correlation_id();
    let span = create_dispatch_span("replay", &correlation_id);
    let _entered = span.enter();
    tracing::info!(events = events.len(), script = %script.display(), "Replaying event script");

    let (engine, machine) = SimulatedEngine::with_machine(config);
    for event in events {
        machine.submit(event);
    }

    if config.observability.metrics_enabled {
        machine.metrics().log_stats();
    }

    let report = ReplayReport {
        snapshot: machine.snapshot(),
        stats: machine.stats(),
        history: machine.history(),
        calls: engine.calls(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("transitions:");
    for record in &report.history {
        println!(
            "  #{:<4} {:<16} {:>12} -> {:<12} ({})",
            record.sequence,
            record.event.kind(),
            record.from,
            record.to,
            record.disposition
        );
    }
    println!("engine calls:");
    for call in &report.calls {
        println!("  {call}");
    }
    if report.snapshot.deferred > 0 {
        println!("held events: {}", report.snapshot.deferred);
    }
    println!("final state: {}", report.snapshot.state);
    Ok(())
}
