use sr_lab_abstract::SeqNum;

/// Modular arithmetic over the finite sequence-number space `[0, size)`.
///
/// Window membership must go through [`SeqSpace::in_range`]; comparing
/// sequence numbers with `<` breaks as soon as a window straddles the wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeqSpace {
    size: u32,
}

impl SeqSpace {
    pub fn new(size: u32) -> Self {
        assert!(size > 0, "sequence space cannot be empty");
        Self { size }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn advance(&self, s: SeqNum) -> SeqNum {
        self.add(s, 1)
    }

    pub fn retreat(&self, s: SeqNum) -> SeqNum {
        let size = self.size as u64;
        ((s as u64 % size + size - 1) % size) as SeqNum
    }

    pub fn add(&self, s: SeqNum, n: u32) -> SeqNum {
        ((s as u64 + n as u64) % self.size as u64) as SeqNum
    }

    /// Number of steps from `from` forward to `to`.
    pub fn distance(&self, from: SeqNum, to: SeqNum) -> u32 {
        let size = self.size as u64;
        ((to as u64 % size + size - from as u64 % size) % size) as u32
    }

    /// Whether `s` lies in the `length` consecutive numbers starting at `base`.
    pub fn in_range(&self, s: SeqNum, base: SeqNum, length: u32) -> bool {
        if length == 0 || s >= self.size {
            return false;
        }
        if length >= self.size {
            return true;
        }
        let end = self.add(base, length - 1);
        if base <= end {
            base <= s && s <= end
        } else {
            s >= base || s <= end
        }
    }

    /// Slot index of `s` in a window of `window` slots.
    pub fn slot(&self, s: SeqNum, window: u32) -> usize {
        (s % window) as usize
    }
}
