//! Sender-side slot bookkeeping.
//!
//! The window owns one slot per position, indexed by `seq % window_size`.
//! Outstanding sequence numbers are exactly `[base, next)` and every one of
//! them occupies a slot that is either `Sent` or `Acked`; all other slots are
//! `Unused`.

use sr_lab_abstract::{Packet, Payload, SeqNum};

use crate::seq_space::SeqSpace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    Unused,
    Sent,
    Acked,
}

#[derive(Debug, Clone)]
struct SendSlot {
    packet: Option<Packet>,
    status: SlotStatus,
    retransmits: u32,
}

impl SendSlot {
    fn empty() -> Self {
        Self {
            packet: None,
            status: SlotStatus::Unused,
            retransmits: 0,
        }
    }

    fn holds(&self, seq: SeqNum) -> bool {
        self.packet.as_ref().is_some_and(|p| p.seqnum() == seq)
    }
}

/// How an uncorrupted acknowledgment relates to the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckKind {
    /// First ACK for an outstanding packet.
    New,
    /// ACK for `base - 1` or for a packet already marked acknowledged.
    Duplicate,
    /// Anything else; carries no information for the current window.
    Stale,
}

#[derive(Debug, Clone)]
pub struct SendWindow {
    space: SeqSpace,
    size: u32,
    base: SeqNum,
    next: SeqNum,
    slots: Vec<SendSlot>,
}

impl SendWindow {
    pub fn new(space: SeqSpace, size: u32) -> Self {
        Self {
            space,
            size,
            base: 0,
            next: 0,
            slots: vec![SendSlot::empty(); size as usize],
        }
    }

    pub fn reset(&mut self) {
        self.base = 0;
        self.next = 0;
        self.slots.fill(SendSlot::empty());
    }

    pub fn base(&self) -> SeqNum {
        self.base
    }

    pub fn next(&self) -> SeqNum {
        self.next
    }

    pub fn outstanding(&self) -> u32 {
        self.space.distance(self.base, self.next)
    }

    pub fn is_empty(&self) -> bool {
        self.base == self.next
    }

    /// `next` still lies among the `size` numbers starting at `base`.
    pub fn can_admit(&self) -> bool {
        self.space.in_range(self.next, self.base, self.size)
    }

    fn slot(&self, seq: SeqNum) -> &SendSlot {
        &self.slots[self.space.slot(seq, self.size)]
    }

    fn slot_mut(&mut self, seq: SeqNum) -> &mut SendSlot {
        let idx = self.space.slot(seq, self.size);
        &mut self.slots[idx]
    }

    /// Assign `next` to `payload`, store the packet as `Sent` and return it.
    /// Returns `None` when the window is full.
    pub fn admit(&mut self, payload: Payload) -> Option<Packet> {
        if !self.can_admit() {
            return None;
        }
        let seq = self.next;
        let packet = Packet::data(seq, payload);
        let slot = self.slot_mut(seq);
        assert_eq!(
            slot.status,
            SlotStatus::Unused,
            "slot for seq {seq} is still owned by {:?}",
            slot.packet.as_ref().map(Packet::seqnum)
        );
        *slot = SendSlot {
            packet: Some(packet.clone()),
            status: SlotStatus::Sent,
            retransmits: 0,
        };
        self.next = self.space.advance(seq);
        Some(packet)
    }

    pub fn classify_ack(&self, acknum: SeqNum) -> AckKind {
        if acknum == self.space.retreat(self.base) {
            return AckKind::Duplicate;
        }
        if !self.space.in_range(acknum, self.base, self.size) {
            return AckKind::Stale;
        }
        let slot = self.slot(acknum);
        match slot.status {
            SlotStatus::Sent if slot.holds(acknum) => AckKind::New,
            SlotStatus::Acked if slot.holds(acknum) => AckKind::Duplicate,
            _ => AckKind::Stale,
        }
    }

    /// Classify `acknum` and, if it is new, mark its slot acknowledged.
    pub fn mark_acked(&mut self, acknum: SeqNum) -> AckKind {
        let kind = self.classify_ack(acknum);
        if kind == AckKind::New {
            let slot = self.slot_mut(acknum);
            slot.status = SlotStatus::Acked;
            slot.retransmits = 0;
        }
        kind
    }

    /// Mark an outstanding packet acknowledged without having seen its ACK.
    pub fn force_ack(&mut self, seq: SeqNum) {
        let slot = self.slot_mut(seq);
        if slot.status == SlotStatus::Sent && slot.holds(seq) {
            slot.status = SlotStatus::Acked;
        }
    }

    /// Free every contiguous `Acked` slot starting at `base`. Returns how far
    /// `base` moved.
    pub fn slide(&mut self) -> u32 {
        let mut moved = 0;
        while self.base != self.next && self.slot(self.base).status == SlotStatus::Acked {
            let base = self.base;
            *self.slot_mut(base) = SendSlot::empty();
            self.base = self.space.advance(base);
            moved += 1;
        }
        moved
    }

    /// Outstanding sequence numbers, oldest first.
    fn outstanding_seqs(&self) -> impl Iterator<Item = SeqNum> + '_ {
        (0..self.outstanding()).map(move |i| self.space.add(self.base, i))
    }

    /// Outstanding packets still waiting for their ACK, oldest first.
    pub fn sent_seqs(&self) -> Vec<SeqNum> {
        self.outstanding_seqs()
            .filter(|&seq| self.status(seq) == SlotStatus::Sent)
            .collect()
    }

    pub fn oldest_sent(&self) -> Option<SeqNum> {
        self.outstanding_seqs()
            .find(|&seq| self.status(seq) == SlotStatus::Sent)
    }

    /// Status of the slot holding `seq`; `Unused` if `seq` is not outstanding.
    pub fn status(&self, seq: SeqNum) -> SlotStatus {
        let slot = self.slot(seq);
        if slot.holds(seq) {
            slot.status
        } else {
            SlotStatus::Unused
        }
    }

    pub fn packet(&self, seq: SeqNum) -> Option<&Packet> {
        self.slot(seq).packet.as_ref().filter(|p| p.seqnum() == seq)
    }

    pub fn retransmits(&self, seq: SeqNum) -> u32 {
        let slot = self.slot(seq);
        if slot.holds(seq) { slot.retransmits } else { 0 }
    }

    /// Count one more resend of `seq` and return the new total.
    pub fn record_retransmit(&mut self, seq: SeqNum) -> u32 {
        let slot = self.slot_mut(seq);
        slot.retransmits += 1;
        slot.retransmits
    }

    /// Number of slots in each non-`Unused` status: `(sent, acked)`.
    pub fn occupancy(&self) -> (usize, usize) {
        let sent = self
            .slots
            .iter()
            .filter(|s| s.status == SlotStatus::Sent)
            .count();
        let acked = self
            .slots
            .iter()
            .filter(|s| s.status == SlotStatus::Acked)
            .count();
        (sent, acked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sr_lab_abstract::PAYLOAD_SIZE;

    fn window() -> SendWindow {
        SendWindow::new(SeqSpace::new(12), 6)
    }

    fn fill(w: &mut SendWindow, n: usize) -> Vec<SeqNum> {
        (0..n)
            .map(|i| w.admit([i as u8; PAYLOAD_SIZE]).unwrap().seqnum())
            .collect()
    }

    #[test]
    fn admits_until_full() {
        let mut w = window();
        assert_eq!(fill(&mut w, 6), vec![0, 1, 2, 3, 4, 5]);
        assert!(!w.can_admit());
        assert!(w.admit([0; PAYLOAD_SIZE]).is_none());
        assert_eq!(w.outstanding(), 6);
        assert_eq!(w.occupancy(), (6, 0));
    }

    #[test]
    fn ack_classification() {
        let mut w = window();
        fill(&mut w, 3);
        assert_eq!(w.classify_ack(11), AckKind::Duplicate); // base - 1
        assert_eq!(w.classify_ack(4), AckKind::Stale); // in window, never sent
        assert_eq!(w.classify_ack(8), AckKind::Stale); // outside window
        assert_eq!(w.mark_acked(1), AckKind::New);
        assert_eq!(w.mark_acked(1), AckKind::Duplicate);
        assert_eq!(w.status(1), SlotStatus::Acked);
    }

    #[test]
    fn slide_stops_at_first_gap() {
        let mut w = window();
        fill(&mut w, 4);
        w.mark_acked(1);
        w.mark_acked(2);
        assert_eq!(w.slide(), 0);
        w.mark_acked(0);
        assert_eq!(w.slide(), 3);
        assert_eq!(w.base(), 3);
        assert_eq!(w.oldest_sent(), Some(3));
        assert_eq!(w.occupancy(), (1, 0));
        assert_eq!(w.status(0), SlotStatus::Unused);
    }

    #[test]
    fn window_wraps_around_sequence_space() {
        let mut w = window();
        for round in 0..4 {
            let seqs = fill(&mut w, 6);
            for &seq in &seqs {
                assert_eq!(w.mark_acked(seq), AckKind::New, "round {round}");
            }
            assert_eq!(w.slide(), 6);
            assert!(w.is_empty());
        }
        assert_eq!(w.base(), 0);

        // Window straddling the wrap: 9, 10, 11, 0, 1, 2.
        for seq in fill(&mut w, 6) {
            w.mark_acked(seq);
        }
        w.slide();
        for seq in fill(&mut w, 3) {
            w.mark_acked(seq);
        }
        w.slide();
        assert_eq!(w.base(), 9);
        assert_eq!(fill(&mut w, 6), vec![9, 10, 11, 0, 1, 2]);
        assert_eq!(w.classify_ack(8), AckKind::Duplicate);
        assert_eq!(w.mark_acked(0), AckKind::New);
        assert_eq!(w.sent_seqs(), vec![9, 10, 11, 1, 2]);
    }

    #[test]
    fn force_ack_lets_the_window_slide() {
        let mut w = window();
        fill(&mut w, 2);
        assert_eq!(w.record_retransmit(0), 1);
        assert_eq!(w.retransmits(0), 1);
        w.force_ack(0);
        assert_eq!(w.slide(), 1);
        assert_eq!(w.base(), 1);
        assert_eq!(w.retransmits(0), 0);
    }
}
