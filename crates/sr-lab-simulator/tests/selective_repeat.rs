use sr_lab_abstract::{Message, ProtocolConfig, RetransmitPolicy, SimConfig};
use sr_lab_simulator::{SimulationReport, Simulator};

const POLICIES: [RetransmitPolicy; 2] = [RetransmitPolicy::Oldest, RetransmitPolicy::AllOutstanding];

fn protocol(policy: RetransmitPolicy) -> ProtocolConfig {
    ProtocolConfig {
        window_size: 6,
        seq_space: 12,
        rtt_ms: 250,
        max_retransmissions: 50,
        retransmit_policy: policy,
    }
}

/// Fixed 10 ms latency in both directions, no random faults.
fn clean_link() -> SimConfig {
    SimConfig {
        min_latency: 10,
        max_latency: 10,
        ..Default::default()
    }
}

fn simulate(
    protocol: &ProtocolConfig,
    link: SimConfig,
    setup: impl FnOnce(&mut Simulator),
) -> SimulationReport {
    let (sender, receiver) = sr_lab_protocol::peers(protocol).unwrap();
    let mut sim = Simulator::new(link, sender, receiver);
    setup(&mut sim);
    sim.run_until_complete();
    sim.export_report()
}

fn letters(report: &SimulationReport) -> Vec<u8> {
    report.delivered_data.iter().map(|d| d[0]).collect()
}

fn alphabet(n: usize) -> Vec<u8> {
    (0..n).map(|i| Message::lettered(i).data[0]).collect()
}

#[test]
fn clean_link_delivers_everything_in_order_without_resends() {
    for policy in POLICIES {
        let report = simulate(&protocol(policy), clean_link(), |sim| {
            sim.schedule_lettered(0, 7, 30);
        });
        assert!(report.delivered_in_order(), "{policy}");
        assert_eq!(letters(&report), alphabet(30));
        assert_eq!(report.sender_packet_count, 30);
        assert_eq!(report.metric("packets_resent"), 0.0);
        assert_eq!(report.backlog_remaining, 0);
    }
}

#[test]
fn twenty_messages_wrap_the_sequence_space() {
    for policy in POLICIES {
        let report = simulate(&protocol(policy), clean_link(), |sim| {
            sim.schedule_lettered(0, 0, 20);
        });
        assert_eq!(letters(&report), alphabet(20), "{policy}");
        assert_eq!(report.app.accepted.len(), 20);
        assert!(report.app.rejections > 0);
        assert_eq!(report.metric("packets_delivered"), 20.0);
        assert_eq!(report.metric("out_of_window_packets"), 0.0);
    }
}

#[test]
fn lost_first_ack_resends_only_the_oldest_packet() {
    for policy in POLICIES {
        let report = simulate(&protocol(policy), clean_link(), |sim| {
            sim.add_drop_receiver_ack_once(0);
            sim.schedule_lettered(0, 0, 6);
            sim.schedule_app_send(1, Message::lettered(6));
        });
        assert!(report.delivered_in_order(), "{policy}");
        assert_eq!(letters(&report), alphabet(7));
        // Six first transmissions, one resend of packet 0, then packet 6.
        assert_eq!(report.sender_packet_count, 8);
        assert_eq!(report.metric("packets_resent"), 1.0);
        assert_eq!(report.metric("duplicate_packets"), 1.0);
        assert!(report.app.rejections >= 1);
        assert_eq!(report.duration_ms, 290);
    }
}

#[test]
fn lost_data_is_buffered_around_and_recovered() {
    let mut durations = Vec::new();
    for policy in POLICIES {
        let report = simulate(&protocol(policy), clean_link(), |sim| {
            sim.add_drop_sender_seq_once(1);
            sim.add_drop_sender_seq_once(3);
            sim.schedule_lettered(0, 0, 6);
        });
        assert_eq!(letters(&report), alphabet(6), "{policy}");
        assert_eq!(report.sender_packet_count, 8);
        assert_eq!(report.metric("packets_resent"), 2.0);
        assert_eq!(report.metric("duplicate_packets"), 0.0);
        durations.push(report.duration_ms);
    }
    // One timeout covers both gaps when every outstanding packet is resent.
    assert_eq!(durations, vec![560, 290]);
}

#[test]
fn resent_duplicates_are_acknowledged_but_not_redelivered() {
    for policy in POLICIES {
        let report = simulate(&protocol(policy), clean_link(), |sim| {
            sim.add_drop_receiver_ack_once(2);
            sim.add_drop_receiver_ack_once(4);
            sim.schedule_lettered(0, 0, 6);
        });
        assert_eq!(letters(&report), alphabet(6), "{policy}");
        assert_eq!(report.metric("packets_delivered"), 6.0);
        assert!(report.metric("duplicate_packets") >= 2.0);
    }
}

#[test]
fn corrupted_packet_is_discarded_and_resent() {
    for policy in POLICIES {
        let report = simulate(&protocol(policy), clean_link(), |sim| {
            sim.add_corrupt_sender_seq_once(0);
            sim.schedule_lettered(0, 5, 3);
        });
        assert_eq!(letters(&report), alphabet(3), "{policy}");
        assert_eq!(report.metric("corrupted_packets"), 1.0);
        assert_eq!(report.metric("packets_resent"), 1.0);
        // The receiver answered the corrupt copy with ACK 11, which the sender
        // recognises as a repeat of base - 1.
        assert_eq!(report.metric("duplicate_acks"), 1.0);
        assert_eq!(report.sender_packet_count, 4);
    }
}

#[test]
fn timer_is_disarmed_once_everything_is_acknowledged() {
    for policy in POLICIES {
        let report = simulate(&protocol(policy), clean_link(), |sim| {
            sim.schedule_lettered(0, 0, 4);
            sim.schedule_lettered(1000, 0, 2);
        });
        assert_eq!(report.metric("packets_resent"), 0.0, "{policy}");
        assert_eq!(report.sender_packet_count, 6);
        // Last ACK lands 20 ms after the second burst; no timer fires later.
        assert_eq!(report.duration_ms, 1020);
    }
}

#[test]
fn lossy_link_still_delivers_exactly_once_in_order() {
    for policy in POLICIES {
        for seed in [1, 7, 42, 2024] {
            let link = SimConfig {
                loss_rate: 0.2,
                corrupt_rate: 0.1,
                min_latency: 10,
                max_latency: 100,
                seed,
                ..Default::default()
            };
            let report = simulate(&protocol(policy), link, |sim| {
                sim.schedule_lettered(0, 15, 40);
            });
            assert!(
                report.delivered_in_order(),
                "policy {policy}, seed {seed}: delivered {:?}",
                letters(&report)
            );
            assert_eq!(report.delivered_data.len(), 40);
            assert_eq!(report.metric("forced_acks"), 0.0);
            assert_eq!(report.backlog_remaining, 0);
        }
    }
}

#[test]
fn larger_sequence_space_behaves_the_same() {
    let config = ProtocolConfig {
        window_size: 4,
        seq_space: 16,
        ..protocol(RetransmitPolicy::Oldest)
    };
    let link = SimConfig {
        loss_rate: 0.15,
        seed: 3,
        ..Default::default()
    };
    let report = simulate(&config, link, |sim| {
        sim.schedule_lettered(0, 10, 50);
    });
    assert!(report.delivered_in_order());
    assert_eq!(report.delivered_data.len(), 50);
}
