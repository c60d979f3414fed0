use thiserror::Error;

use crate::packet::{Message, Packet, SeqNum};

/// Why an application message was not taken. Neither case aborts the flow.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Rejected {
    /// Every slot of the send window is outstanding; offer the message again later.
    #[error("send window is full")]
    WindowFull,
    /// The peer only acknowledges; data flows in one direction.
    #[error("endpoint does not originate data")]
    ReceiveOnly,
}

/// The capability provided by the simulator to a protocol peer.
/// Peers call these methods to interact with the network and application layer.
pub trait SystemContext {
    /// Send a packet to the network (unreliable channel).
    fn send_packet(&mut self, packet: Packet);

    /// Start a timer.
    /// `timer_id` identifies the timer; starting an id that is already running
    /// replaces the pending expiry.
    fn start_timer(&mut self, delay_ms: u64, timer_id: u32);

    /// Cancel a running timer. Cancelling a timer that is not running is a no-op.
    fn cancel_timer(&mut self, timer_id: u32);

    /// Deliver data to the Application Layer.
    fn deliver_data(&mut self, data: &[u8]);

    /// Log a message to the simulator's debug output.
    fn log(&mut self, message: &str);

    /// Get current simulation time in ms
    fn now(&self) -> u64;

    /// Record a numeric metric for inspection (e.g. `packets_resent`).
    fn record_metric(&mut self, _name: &str, _value: f64) {}
}

/// A protocol peer, driven one event at a time.
pub trait TransportProtocol {
    /// Called when the simulation starts. Resets all protocol state.
    fn init(&mut self, _ctx: &mut dyn SystemContext) {}

    /// Called when a packet arrives from the network.
    fn on_packet(&mut self, ctx: &mut dyn SystemContext, packet: Packet);

    /// Called when a timer expires.
    fn on_timer(&mut self, ctx: &mut dyn SystemContext, timer_id: u32);

    /// Called when the Application Layer wants to send a message reliably.
    /// Returns the sequence number assigned to it.
    fn on_app_data(
        &mut self,
        ctx: &mut dyn SystemContext,
        message: &Message,
    ) -> Result<SeqNum, Rejected>;
}
