use sr_lab_abstract::{
    ConfigError, Message, Packet, ProtocolConfig, Rejected, SeqNum, SystemContext,
    TransportProtocol,
};

use crate::ack::AckBuilder;
use crate::receive_window::{Placement, ReceiveWindow};
use crate::seq_space::SeqSpace;
use crate::stats::{ReceiverStats, bump};

/// Selective Repeat receiver. Buffers out-of-order packets, delivers in
/// order, and answers every arrival with exactly one ACK.
pub struct SrReceiver {
    space: SeqSpace,
    window: ReceiveWindow,
    acks: AckBuilder,
    stats: ReceiverStats,
}

impl SrReceiver {
    pub fn new(config: ProtocolConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let space = SeqSpace::new(config.seq_space);
        Ok(Self {
            space,
            window: ReceiveWindow::new(space, config.window_size),
            acks: AckBuilder::default(),
            stats: ReceiverStats::default(),
        })
    }

    pub fn base(&self) -> SeqNum {
        self.window.base()
    }

    pub fn window(&self) -> &ReceiveWindow {
        &self.window
    }

    pub fn stats(&self) -> &ReceiverStats {
        &self.stats
    }

    pub fn last_acked(&self) -> Option<SeqNum> {
        self.acks.last_acked()
    }

    fn accept(&mut self, ctx: &mut dyn SystemContext, packet: Packet) -> Packet {
        let seq = packet.seqnum();
        match self.window.placement(seq) {
            Placement::AlreadyDelivered => {
                ctx.log(&format!("Packet {seq} already delivered, re-ACK"));
                bump(ctx, "duplicate_packets", &mut self.stats.duplicate_packets);
                self.acks.acknowledge(seq)
            }
            Placement::Outside => {
                ctx.log(&format!(
                    "Packet {seq} outside receive window, repeating last ACK"
                ));
                bump(
                    ctx,
                    "out_of_window_packets",
                    &mut self.stats.out_of_window_packets,
                );
                self.acks.repeat_last(self.space, self.window.base())
            }
            Placement::InWindow => {
                if self.window.store(packet) {
                    ctx.log(&format!("Packet {seq} received"));
                    bump(ctx, "packets_buffered", &mut self.stats.packets_buffered);
                } else {
                    ctx.log(&format!("Packet {seq} already buffered"));
                    bump(ctx, "duplicate_packets", &mut self.stats.duplicate_packets);
                }
                if seq == self.window.base() {
                    for ready in self.window.drain_in_order() {
                        ctx.deliver_data(ready.payload());
                        bump(ctx, "packets_delivered", &mut self.stats.packets_delivered);
                    }
                    ctx.log(&format!("Receive base now {}", self.window.base()));
                }
                self.acks.acknowledge(seq)
            }
        }
    }
}

impl TransportProtocol for SrReceiver {
    fn init(&mut self, ctx: &mut dyn SystemContext) {
        self.window.reset();
        self.acks.reset();
        self.stats = ReceiverStats::default();
        ctx.log("SR receiver ready");
    }

    fn on_packet(&mut self, ctx: &mut dyn SystemContext, packet: Packet) {
        let ack = if packet.is_corrupted() {
            ctx.log("Corrupted packet received, repeating last ACK");
            bump(ctx, "corrupted_packets", &mut self.stats.corrupted_packets);
            self.acks.repeat_last(self.space, self.window.base())
        } else {
            self.accept(ctx, packet)
        };
        if let Some(acknum) = ack.acknum() {
            ctx.log(&format!("Sending ACK {acknum}"));
        }
        ctx.send_packet(ack);
        bump(ctx, "acks_sent", &mut self.stats.acks_sent);
    }

    fn on_timer(&mut self, _ctx: &mut dyn SystemContext, _timer_id: u32) {}

    fn on_app_data(
        &mut self,
        _ctx: &mut dyn SystemContext,
        _message: &Message,
    ) -> Result<SeqNum, Rejected> {
        Err(Rejected::ReceiveOnly)
    }
}
