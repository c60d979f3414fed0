use sr_lab_abstract::{Packet, SeqNum};

use crate::seq_space::SeqSpace;

/// Builds the receiver's ACK packets.
///
/// ACKs travel in their own stream whose sequence field alternates 0/1 and
/// means nothing to the sender; only `acknum` matters. Every ACK is
/// checksummed like a data packet.
#[derive(Debug, Clone)]
pub struct AckBuilder {
    next_seq: SeqNum,
    last_acked: Option<SeqNum>,
}

impl Default for AckBuilder {
    fn default() -> Self {
        Self {
            next_seq: 1,
            last_acked: None,
        }
    }
}

impl AckBuilder {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn last_acked(&self) -> Option<SeqNum> {
        self.last_acked
    }

    fn frame(&mut self, acknum: SeqNum) -> Packet {
        let packet = Packet::ack(self.next_seq, acknum);
        self.next_seq ^= 1;
        packet
    }

    /// Acknowledge `seq` and remember it as the latest acknowledgment.
    pub fn acknowledge(&mut self, seq: SeqNum) -> Packet {
        self.last_acked = Some(seq);
        self.frame(seq)
    }

    /// Repeat the latest acknowledgment, or `base - 1` if nothing has been
    /// acknowledged yet.
    pub fn repeat_last(&mut self, space: SeqSpace, base: SeqNum) -> Packet {
        let acknum = self.last_acked.unwrap_or_else(|| space.retreat(base));
        self.frame(acknum)
    }
}
