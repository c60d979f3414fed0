use sr_lab_abstract::{Packet, SeqNum};

use crate::seq_space::SeqSpace;

/// Where an arriving sequence number falls relative to the receive window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Inside `[base, base + size)`.
    InWindow,
    /// One of the `size` numbers just before `base`; already delivered.
    AlreadyDelivered,
    /// Neither; the number means nothing to this window.
    Outside,
}

/// Receiver-side buffer for out-of-order arrivals.
#[derive(Debug, Clone)]
pub struct ReceiveWindow {
    space: SeqSpace,
    size: u32,
    base: SeqNum,
    slots: Vec<Option<Packet>>,
}

impl ReceiveWindow {
    pub fn new(space: SeqSpace, size: u32) -> Self {
        Self {
            space,
            size,
            base: 0,
            slots: vec![None; size as usize],
        }
    }

    pub fn reset(&mut self) {
        self.base = 0;
        self.slots.fill(None);
    }

    pub fn base(&self) -> SeqNum {
        self.base
    }

    pub fn placement(&self, seq: SeqNum) -> Placement {
        if self.space.in_range(seq, self.base, self.size) {
            Placement::InWindow
        } else if self
            .space
            .in_range(seq, self.space.add(self.base, self.space.size() - self.size), self.size)
        {
            Placement::AlreadyDelivered
        } else {
            Placement::Outside
        }
    }

    /// Buffer an in-window packet. Returns `false` if its slot is already occupied.
    pub fn store(&mut self, packet: Packet) -> bool {
        debug_assert_eq!(self.placement(packet.seqnum()), Placement::InWindow);
        let slot = &mut self.slots[self.space.slot(packet.seqnum(), self.size)];
        if slot.is_some() {
            return false;
        }
        *slot = Some(packet);
        true
    }

    /// Pop the contiguous run of buffered packets starting at `base`,
    /// advancing `base` past each one.
    pub fn drain_in_order(&mut self) -> Vec<Packet> {
        let mut run = Vec::new();
        loop {
            let idx = self.space.slot(self.base, self.size);
            match self.slots[idx].take() {
                Some(packet) => {
                    run.push(packet);
                    self.base = self.space.advance(self.base);
                }
                None => break,
            }
        }
        run
    }

    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}
