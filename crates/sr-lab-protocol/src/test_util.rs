use std::collections::{BTreeSet, HashMap};

use sr_lab_abstract::{Packet, SystemContext};

/// Context double that records everything a peer asks of its environment.
#[derive(Default)]
pub struct RecordingContext {
    pub sent: Vec<Packet>,
    pub timers_started: Vec<(u64, u32)>,
    pub timers_cancelled: Vec<u32>,
    pub delivered: Vec<Vec<u8>>,
    pub logs: Vec<String>,
    pub metrics: HashMap<String, f64>,
    running: BTreeSet<u32>,
    pub now: u64,
}

impl RecordingContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timer_running(&self, timer_id: u32) -> bool {
        self.running.contains(&timer_id)
    }

    /// The environment fired `timer_id`; it no longer runs.
    pub fn fire(&mut self, timer_id: u32) {
        assert!(
            self.running.remove(&timer_id),
            "timer {timer_id} fired without running"
        );
    }

    pub fn take_sent(&mut self) -> Vec<Packet> {
        std::mem::take(&mut self.sent)
    }

    pub fn metric(&self, name: &str) -> f64 {
        self.metrics.get(name).copied().unwrap_or(0.0)
    }
}

impl SystemContext for RecordingContext {
    fn send_packet(&mut self, packet: Packet) {
        self.sent.push(packet);
    }

    fn start_timer(&mut self, delay_ms: u64, timer_id: u32) {
        self.timers_started.push((delay_ms, timer_id));
        self.running.insert(timer_id);
    }

    fn cancel_timer(&mut self, timer_id: u32) {
        self.timers_cancelled.push(timer_id);
        self.running.remove(&timer_id);
    }

    fn deliver_data(&mut self, data: &[u8]) {
        self.delivered.push(data.to_vec());
    }

    fn log(&mut self, message: &str) {
        self.logs.push(message.to_string());
    }

    fn now(&self) -> u64 {
        self.now
    }

    fn record_metric(&mut self, name: &str, value: f64) {
        self.metrics.insert(name.to_string(), value);
    }
}
