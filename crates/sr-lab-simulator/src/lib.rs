pub mod engine;
pub mod scenario_runner;
pub mod trace;

pub use engine::{AppStats, LinkEventSummary, NodeId, Simulator};
pub use trace::SimulationReport;
