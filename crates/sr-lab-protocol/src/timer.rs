use sr_lab_abstract::{SeqNum, SystemContext};

/// Timer id the sender uses with [`SystemContext::start_timer`].
pub const RETRANSMIT_TIMER: u32 = 0;

/// The sender's single logical retransmission timer.
///
/// It is armed iff some packet in the window is still `Sent`, and always
/// covers the oldest such packet.
#[derive(Debug, Clone)]
pub struct RetransmitTimer {
    rtt_ms: u64,
    covering: Option<SeqNum>,
}

impl RetransmitTimer {
    pub fn new(rtt_ms: u64) -> Self {
        Self {
            rtt_ms,
            covering: None,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.covering.is_some()
    }

    pub fn covering(&self) -> Option<SeqNum> {
        self.covering
    }

    /// Start (or restart) the timer for `seq`.
    pub fn arm(&mut self, ctx: &mut dyn SystemContext, seq: SeqNum) {
        if self.covering.is_some() {
            ctx.cancel_timer(RETRANSMIT_TIMER);
        }
        ctx.start_timer(self.rtt_ms, RETRANSMIT_TIMER);
        self.covering = Some(seq);
    }

    /// Arm for `seq` unless a timer is already running. Returns whether it armed.
    pub fn arm_if_idle(&mut self, ctx: &mut dyn SystemContext, seq: SeqNum) -> bool {
        if self.is_armed() {
            return false;
        }
        self.arm(ctx, seq);
        true
    }

    /// Stop the timer. Stopping a stopped timer does nothing.
    pub fn stop(&mut self, ctx: &mut dyn SystemContext) {
        if self.covering.take().is_some() {
            ctx.cancel_timer(RETRANSMIT_TIMER);
        }
    }

    /// Account for a fire of `timer_id`. Returns the covered sequence number if
    /// the fire belongs to this timer while it is armed; the timer is disarmed
    /// either way.
    pub fn expire(&mut self, timer_id: u32) -> Option<SeqNum> {
        if timer_id != RETRANSMIT_TIMER {
            return None;
        }
        self.covering.take()
    }

    pub fn reset(&mut self, ctx: &mut dyn SystemContext) {
        self.covering = None;
        ctx.cancel_timer(RETRANSMIT_TIMER);
    }
}
