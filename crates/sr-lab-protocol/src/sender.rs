use sr_lab_abstract::{
    ConfigError, Message, Packet, ProtocolConfig, Rejected, RetransmitPolicy, SeqNum,
    SystemContext, TransportProtocol,
};

use crate::send_window::{AckKind, SendWindow, SlotStatus};
use crate::seq_space::SeqSpace;
use crate::stats::{SenderStats, bump};
use crate::timer::RetransmitTimer;

/// Selective Repeat sender.
///
/// When a packet exhausts `max_retransmissions` the sender stops waiting for
/// its ACK and treats it as acknowledged so the window keeps moving. That
/// packet may never have reached the receiver: delivery is best effort from
/// that point on, and the event is counted in `forced_acks`.
pub struct SrSender {
    config: ProtocolConfig,
    window: SendWindow,
    timer: RetransmitTimer,
    stats: SenderStats,
}

impl SrSender {
    pub fn new(config: ProtocolConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let space = SeqSpace::new(config.seq_space);
        Ok(Self {
            window: SendWindow::new(space, config.window_size),
            timer: RetransmitTimer::new(config.rtt_ms),
            stats: SenderStats::default(),
            config,
        })
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn window(&self) -> &SendWindow {
        &self.window
    }

    pub fn stats(&self) -> &SenderStats {
        &self.stats
    }

    /// Sequence number the retransmission timer currently covers.
    pub fn timer_covering(&self) -> Option<SeqNum> {
        self.timer.covering()
    }

    fn handle_ack(&mut self, ctx: &mut dyn SystemContext, acknum: SeqNum) {
        let base = self.window.base();
        match self.window.mark_acked(acknum) {
            AckKind::Stale => {
                ctx.log(&format!(
                    "ACK {acknum} outside window [{base}, +{}), ignored",
                    self.config.window_size
                ));
                bump(ctx, "stale_acks", &mut self.stats.stale_acks);
            }
            AckKind::Duplicate => {
                ctx.log(&format!("ACK {acknum} is a duplicate"));
                bump(ctx, "duplicate_acks", &mut self.stats.duplicate_acks);
            }
            AckKind::New => {
                ctx.log(&format!("ACK {acknum} is new"));
                bump(ctx, "new_acks", &mut self.stats.new_acks);
                if acknum == base || self.timer.covering() == Some(acknum) {
                    self.timer.stop(ctx);
                }
                self.slide(ctx);
            }
        }
    }

    /// Advance `base` over acknowledged slots and keep the timer on the
    /// oldest packet still waiting.
    fn slide(&mut self, ctx: &mut dyn SystemContext) {
        let moved = self.window.slide();
        if moved > 0 {
            ctx.log(&format!(
                "Window slid by {moved}, base now {}",
                self.window.base()
            ));
        }
        match self.window.oldest_sent() {
            Some(oldest) => {
                self.timer.arm_if_idle(ctx, oldest);
            }
            None => self.timer.stop(ctx),
        }
    }

    /// Resend `seq`, or give up on it once its retransmission budget is spent.
    fn retransmit_or_give_up(&mut self, ctx: &mut dyn SystemContext, seq: SeqNum) {
        if self.window.retransmits(seq) >= self.config.max_retransmissions {
            ctx.log(&format!(
                "Packet {seq} reached {} retransmissions, no longer waiting for its ACK",
                self.config.max_retransmissions
            ));
            self.window.force_ack(seq);
            bump(ctx, "forced_acks", &mut self.stats.forced_acks);
            return;
        }
        let Some(packet) = self.window.packet(seq).cloned() else {
            return;
        };
        let count = self.window.record_retransmit(seq);
        ctx.log(&format!("Resending packet {seq} (attempt {count})"));
        ctx.send_packet(packet);
        bump(ctx, "packets_resent", &mut self.stats.packets_resent);
    }
}

impl TransportProtocol for SrSender {
    fn init(&mut self, ctx: &mut dyn SystemContext) {
        self.window.reset();
        self.timer.reset(ctx);
        self.stats = SenderStats::default();
        ctx.log(&format!(
            "SR sender ready (window {}, seq space {}, rtt {} ms, policy {})",
            self.config.window_size,
            self.config.seq_space,
            self.config.rtt_ms,
            self.config.retransmit_policy
        ));
    }

    fn on_packet(&mut self, ctx: &mut dyn SystemContext, packet: Packet) {
        if packet.is_corrupted() {
            ctx.log("Corrupted ACK received, ignored");
            bump(ctx, "corrupted_acks", &mut self.stats.corrupted_acks);
            return;
        }
        match packet.acknum() {
            Some(acknum) => self.handle_ack(ctx, acknum),
            None => {
                ctx.log(&format!(
                    "Packet {} carries no acknowledgment, ignored",
                    packet.seqnum()
                ));
                bump(ctx, "stale_acks", &mut self.stats.stale_acks);
            }
        }
    }

    fn on_timer(&mut self, ctx: &mut dyn SystemContext, timer_id: u32) {
        let Some(covered) = self.timer.expire(timer_id) else {
            ctx.log(&format!("Ignoring fire of idle timer {timer_id}"));
            return;
        };
        ctx.log(&format!("Timeout for packet {covered}"));

        match self.config.retransmit_policy {
            RetransmitPolicy::Oldest => {
                let target = if self.window.status(covered) == SlotStatus::Sent {
                    Some(covered)
                } else {
                    self.window.oldest_sent()
                };
                if let Some(seq) = target {
                    self.retransmit_or_give_up(ctx, seq);
                }
            }
            RetransmitPolicy::AllOutstanding => {
                for seq in self.window.sent_seqs() {
                    self.retransmit_or_give_up(ctx, seq);
                }
            }
        }

        self.slide(ctx);
    }

    fn on_app_data(
        &mut self,
        ctx: &mut dyn SystemContext,
        message: &Message,
    ) -> Result<SeqNum, Rejected> {
        let Some(packet) = self.window.admit(message.data) else {
            ctx.log("Send window is full, message refused");
            bump(ctx, "window_full", &mut self.stats.window_full);
            return Err(Rejected::WindowFull);
        };
        let seq = packet.seqnum();
        ctx.log(&format!("Sending packet {seq}"));
        ctx.send_packet(packet);
        bump(ctx, "packets_sent", &mut self.stats.packets_sent);
        self.timer.arm_if_idle(ctx, seq);
        Ok(seq)
    }
}
