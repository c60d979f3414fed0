use sr_lab_abstract::SystemContext;

/// Diagnostic counters kept by the sender.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SenderStats {
    pub packets_sent: u64,
    pub packets_resent: u64,
    pub window_full: u64,
    pub new_acks: u64,
    pub duplicate_acks: u64,
    pub stale_acks: u64,
    pub corrupted_acks: u64,
    /// Packets given up on after exhausting their retransmissions.
    pub forced_acks: u64,
}

/// Diagnostic counters kept by the receiver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    pub packets_delivered: u64,
    pub packets_buffered: u64,
    pub corrupted_packets: u64,
    pub duplicate_packets: u64,
    pub out_of_window_packets: u64,
    pub acks_sent: u64,
}

/// Increment `counter` and publish its new value as metric `name`.
pub(crate) fn bump(ctx: &mut dyn SystemContext, name: &str, counter: &mut u64) {
    *counter += 1;
    ctx.record_metric(name, *counter as f64);
}
