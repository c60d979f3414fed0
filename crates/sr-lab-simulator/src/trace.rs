use serde::Serialize;
use std::collections::HashMap;
use sr_lab_abstract::SimConfig;

use crate::engine::{AppStats, LinkEventSummary};

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub config: SimConfig,
    pub duration_ms: u64,
    pub delivered_data: Vec<Vec<u8>>,
    pub sender_packet_count: u32,
    pub app: AppStats,
    pub backlog_remaining: usize,
    pub metrics: HashMap<String, Vec<(u64, f64)>>,
    pub link_events: Vec<LinkEventSummary>,
}

impl SimulationReport {
    /// Latest recorded value of a metric; counters that never moved read as 0.
    pub fn metric(&self, name: &str) -> f64 {
        self.metrics
            .get(name)
            .and_then(|series| series.last())
            .map_or(0.0, |&(_, value)| value)
    }

    /// Whether the application received exactly the accepted messages, in order.
    pub fn delivered_in_order(&self) -> bool {
        self.delivered_data.len() == self.app.accepted.len()
            && self
                .delivered_data
                .iter()
                .zip(&self.app.accepted)
                .all(|(delivered, sent)| delivered.as_slice() == sent.as_bytes())
    }
}
