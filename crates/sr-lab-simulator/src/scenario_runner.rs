use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use sr_lab_abstract::{
    Message, SimConfig, TestAction, TestAssertion, TestScenario, TransportProtocol,
};
use tracing::{error, info};

use crate::engine::Simulator;
use crate::trace::SimulationReport;

pub fn load_scenario(path: &Path) -> Result<TestScenario> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse scenario file {}", path.display()))
}

/// Build a simulator for `scenario` with every action scheduled.
pub fn build_simulator(
    scenario: &TestScenario,
    sender: Box<dyn TransportProtocol>,
    receiver: Box<dyn TransportProtocol>,
) -> Result<Simulator> {
    let mut config = SimConfig::default();
    scenario.config.apply_to(&mut config);
    config
        .validate()
        .with_context(|| format!("Invalid link configuration in '{}'", scenario.name))?;
    let mut sim = Simulator::new(config, sender, receiver);
    configure_actions(&mut sim, &scenario.actions)?;
    Ok(sim)
}

pub fn configure_actions(sim: &mut Simulator, actions: &[TestAction]) -> Result<()> {
    for action in actions {
        match action {
            TestAction::AppSend { time, data } => {
                let message = Message::new(data.as_bytes())
                    .with_context(|| format!("app_send at {time} ms"))?;
                sim.schedule_app_send(*time, message);
            }
            TestAction::DropNextFromSenderSeq { seq } => {
                sim.add_drop_sender_seq_once(*seq);
            }
            TestAction::DropNextFromReceiverAck { ack } => {
                sim.add_drop_receiver_ack_once(*ack);
            }
            TestAction::CorruptNextFromSenderSeq { seq } => {
                sim.add_corrupt_sender_seq_once(*seq);
            }
        }
    }
    Ok(())
}

/// Describe every assertion `report` violates.
pub fn check_assertions(report: &SimulationReport, assertions: &[TestAssertion]) -> Vec<String> {
    let mut failures = Vec::new();
    for assertion in assertions {
        match assertion {
            TestAssertion::DataDelivered { data } => {
                let expected = match Message::new(data.as_bytes()) {
                    Ok(message) => message,
                    Err(err) => {
                        failures.push(format!("data_delivered '{data}': {err}"));
                        continue;
                    }
                };
                if !report
                    .delivered_data
                    .iter()
                    .any(|d| d.as_slice() == expected.as_bytes())
                {
                    failures.push(format!("data '{data}' was never delivered"));
                }
            }
            TestAssertion::DeliveredInOrder => {
                if !report.delivered_in_order() {
                    failures.push(format!(
                        "delivered {} payloads, expected the {} accepted messages in order",
                        report.delivered_data.len(),
                        report.app.accepted.len()
                    ));
                }
            }
            TestAssertion::SenderPacketCount { min, max } => {
                let count = report.sender_packet_count;
                if count < *min || max.is_some_and(|max| count > max) {
                    failures.push(format!(
                        "sender sent {count} packets, expected between {min} and {}",
                        max.map_or("unbounded".to_string(), |m| m.to_string())
                    ));
                }
            }
            TestAssertion::MetricAtLeast { name, value } => {
                let actual = report.metric(name);
                if actual < *value {
                    failures.push(format!("metric {name} is {actual}, expected at least {value}"));
                }
            }
            TestAssertion::MaxDuration { ms } => {
                if report.duration_ms > *ms {
                    failures.push(format!(
                        "simulation took {} ms, limit {ms} ms",
                        report.duration_ms
                    ));
                }
            }
        }
    }
    failures
}

/// Run an already-loaded scenario and check its assertions.
pub fn run(
    scenario: &TestScenario,
    sender: Box<dyn TransportProtocol>,
    receiver: Box<dyn TransportProtocol>,
) -> Result<SimulationReport> {
    info!("Running scenario '{}': {}", scenario.name, scenario.description);
    let mut sim = build_simulator(scenario, sender, receiver)?;
    sim.run_until_complete();
    let report = sim.export_report();

    let failures = check_assertions(&report, &scenario.assertions);
    if !failures.is_empty() {
        for failure in &failures {
            error!("[{}] {}", scenario.name, failure);
        }
        anyhow::bail!(
            "scenario '{}' failed {} assertion(s): {}",
            scenario.name,
            failures.len(),
            failures.join("; ")
        );
    }
    info!(
        "Scenario '{}' passed ({} assertions)",
        scenario.name,
        scenario.assertions.len()
    );
    Ok(report)
}

pub fn run_scenario(
    path: &str,
    sender: Box<dyn TransportProtocol>,
    receiver: Box<dyn TransportProtocol>,
) -> Result<SimulationReport> {
    let scenario = load_scenario(Path::new(path))?;
    run(&scenario, sender, receiver)
}
