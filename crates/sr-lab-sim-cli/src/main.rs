use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use sr_lab_abstract::{ProtocolConfig, RetransmitPolicy, SimConfig, TestScenario};
use sr_lab_simulator::{SimulationReport, Simulator, scenario_runner};

#[derive(Parser, Debug)]
#[command(author, version, about = "Selective Repeat ARQ simulator")]
struct Args {
    /// Load a scenario from disk.
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Number of lettered messages to send when no scenario is given.
    #[arg(long, default_value_t = 20)]
    messages: usize,

    /// Gap between generated messages, in ms.
    #[arg(long, default_value_t = 50)]
    interval: u64,

    #[arg(long)]
    window_size: Option<u32>,
    #[arg(long)]
    seq_space: Option<u32>,

    /// Retransmission timeout in ms.
    #[arg(long)]
    rtt_ms: Option<u64>,

    #[arg(long)]
    max_retransmissions: Option<u32>,

    /// Timeout behaviour: `oldest` or `all`.
    #[arg(long)]
    policy: Option<RetransmitPolicy>,

    #[arg(long)]
    loss_rate: Option<f64>,
    #[arg(long)]
    corrupt_rate: Option<f64>,
    #[arg(long)]
    seed: Option<u64>,

    /// Write a JSON trace of the finished simulation.
    #[arg(long)]
    trace_out: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging();
    info!("sr-lab-sim-cli starting");

    let report = match &args.scenario {
        Some(path) => {
            let scenario = scenario_runner::load_scenario(path)?;
            run_scenario(&args, scenario)?
        }
        None => run_default_sim(&args)?,
    };

    info!(
        "Delivered {} of {} messages in {} ms with {} sender packets",
        report.delivered_data.len(),
        report.app.offered,
        report.duration_ms,
        report.sender_packet_count
    );

    if let Some(trace_path) = &args.trace_out {
        write_trace(trace_path, &report)?;
    }

    Ok(())
}

impl Args {
    /// Command-line flags win over whatever `config` already holds.
    fn apply_protocol(&self, config: &mut ProtocolConfig) {
        if let Some(v) = self.window_size {
            config.window_size = v;
        }
        if let Some(v) = self.seq_space {
            config.seq_space = v;
        }
        if let Some(v) = self.rtt_ms {
            config.rtt_ms = v;
        }
        if let Some(v) = self.max_retransmissions {
            config.max_retransmissions = v;
        }
        if let Some(v) = self.policy {
            config.retransmit_policy = v;
        }
    }

    fn apply_sim(&self, config: &mut SimConfig) {
        if let Some(v) = self.loss_rate {
            config.loss_rate = v;
        }
        if let Some(v) = self.corrupt_rate {
            config.corrupt_rate = v;
        }
        if let Some(v) = self.seed {
            config.seed = v;
        }
    }
}

fn init_logging() {
    tracing_subscriber::fmt::init();
}

fn run_default_sim(args: &Args) -> Result<SimulationReport> {
    let mut protocol = ProtocolConfig::default();
    args.apply_protocol(&mut protocol);
    let (sender, receiver) =
        sr_lab_protocol::peers(&protocol).context("Invalid protocol configuration")?;

    let mut config = SimConfig {
        loss_rate: 0.1,
        seed: 42,
        ..Default::default()
    };
    args.apply_sim(&mut config);
    config.validate().context("Invalid link configuration")?;

    let mut sim = Simulator::new(config, sender, receiver);
    sim.schedule_lettered(0, args.interval, args.messages);

    info!("Starting default headless simulation");
    sim.run_until_complete();
    info!("Simulation complete.");

    let report = sim.export_report();
    if !report.delivered_in_order() {
        anyhow::bail!(
            "delivered {} payloads, expected the {} accepted messages in order",
            report.delivered_data.len(),
            report.app.accepted.len()
        );
    }
    Ok(report)
}

fn run_scenario(args: &Args, mut scenario: TestScenario) -> Result<SimulationReport> {
    let mut protocol = ProtocolConfig::default();
    scenario.protocol.apply_to(&mut protocol);
    args.apply_protocol(&mut protocol);
    let (sender, receiver) = sr_lab_protocol::peers(&protocol)
        .with_context(|| format!("Invalid protocol configuration in '{}'", scenario.name))?;

    // Flags override the scenario's own link settings.
    if let Some(v) = args.loss_rate {
        scenario.config.loss_rate = Some(v);
    }
    if let Some(v) = args.corrupt_rate {
        scenario.config.corrupt_rate = Some(v);
    }
    if let Some(v) = args.seed {
        scenario.config.seed = Some(v);
    }

    scenario_runner::run(&scenario, sender, receiver)
}

fn write_trace(path: &Path, report: &SimulationReport) -> Result<()> {
    let data = serde_json::to_vec_pretty(report).context("Failed to serialize simulation trace")?;
    fs::write(path, &data)
        .with_context(|| format!("Failed to write trace file {}", path.display()))?;
    Ok(())
}
