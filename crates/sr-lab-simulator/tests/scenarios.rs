use std::fs;
use std::path::{Path, PathBuf};

use sr_lab_abstract::ProtocolConfig;
use sr_lab_simulator::scenario_runner;

fn scenario_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../scenarios")
}

fn run(path: &Path) -> anyhow::Result<sr_lab_simulator::SimulationReport> {
    let scenario = scenario_runner::load_scenario(path)?;
    let mut protocol = ProtocolConfig::default();
    scenario.protocol.apply_to(&mut protocol);
    let (sender, receiver) = sr_lab_protocol::peers(&protocol)?;
    scenario_runner::run(&scenario, sender, receiver)
}

#[test]
fn bundled_scenarios_pass() {
    let mut paths: Vec<PathBuf> = fs::read_dir(scenario_dir())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    paths.sort();
    assert!(paths.len() >= 5, "found {paths:?}");

    for path in paths {
        if let Err(err) = run(&path) {
            panic!("{}: {err:#}", path.display());
        }
    }
}

#[test]
fn failed_assertions_are_reported() {
    let scenario: sr_lab_abstract::TestScenario = toml::from_str(
        r#"
        name = "impossible"
        description = "expects fewer packets than messages"

        [config]
        min_latency = 10
        max_latency = 10

        [[actions]]
        type = "app_send"
        time = 0
        data = "hello"

        [[actions]]
        type = "app_send"
        time = 0
        data = "world"

        [[assertions]]
        type = "sender_packet_count"
        min = 0
        max = 1

        [[assertions]]
        type = "data_delivered"
        data = "never sent"
        "#,
    )
    .unwrap();
    let (sender, receiver) = sr_lab_protocol::peers(&ProtocolConfig::default()).unwrap();
    let err = scenario_runner::run(&scenario, sender, receiver).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("failed 2 assertion(s)"), "{message}");
    assert!(message.contains("never sent"), "{message}");
}

#[test]
fn oversized_app_send_is_rejected_at_load() {
    let scenario: sr_lab_abstract::TestScenario = toml::from_str(
        r#"
        name = "oversized"
        description = "payload longer than a packet"

        [config]

        [[actions]]
        type = "app_send"
        time = 0
        data = "this message is far too long for one packet"

        [[assertions]]
        type = "delivered_in_order"
        "#,
    )
    .unwrap();
    let (sender, receiver) = sr_lab_protocol::peers(&ProtocolConfig::default()).unwrap();
    assert!(scenario_runner::build_simulator(&scenario, sender, receiver).is_err());
}

#[test]
fn impossible_link_settings_are_rejected_before_running() {
    for link in [
        "min_latency = 100\nmax_latency = 10",
        "loss_rate = 7.5",
    ] {
        let scenario: sr_lab_abstract::TestScenario = toml::from_str(&format!(
            r#"
            name = "bad-link"
            description = "link settings no channel can honour"

            [config]
            {link}

            [[actions]]
            type = "app_send"
            time = 0
            data = "hello"

            [[assertions]]
            type = "delivered_in_order"
            "#
        ))
        .unwrap();
        let (sender, receiver) = sr_lab_protocol::peers(&ProtocolConfig::default()).unwrap();
        let err = match scenario_runner::build_simulator(&scenario, sender, receiver) {
            Ok(_) => panic!("{link}: simulator was built"),
            Err(err) => err,
        };
        assert!(
            format!("{err:#}").contains("Invalid link configuration"),
            "{err:#}"
        );
    }
}
