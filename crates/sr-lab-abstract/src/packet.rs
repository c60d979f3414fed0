use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::checksum;

/// Sequence number in `[0, seq_space)`.
pub type SeqNum = u32;

/// Every packet and message carries exactly this many payload bytes.
pub const PAYLOAD_SIZE: usize = 20;

pub type Payload = [u8; PAYLOAD_SIZE];

/// Filler byte for the payload of pure ACK packets.
pub const ACK_FILLER: u8 = b'0';

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MessageError {
    #[error("message of {len} bytes does not fit a {PAYLOAD_SIZE}-byte payload")]
    TooLong { len: usize },
}

/// One unit of application data. Opaque to the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub data: Payload,
}

impl Message {
    /// Build a message from at most [`PAYLOAD_SIZE`] bytes, zero-padding the rest.
    pub fn new(bytes: &[u8]) -> Result<Self, MessageError> {
        if bytes.len() > PAYLOAD_SIZE {
            return Err(MessageError::TooLong { len: bytes.len() });
        }
        let mut data = [0u8; PAYLOAD_SIZE];
        data[..bytes.len()].copy_from_slice(bytes);
        Ok(Self { data })
    }

    /// The message the classic emulator generates as its `index`-th output:
    /// twenty copies of one letter, cycling through the alphabet.
    pub fn lettered(index: usize) -> Self {
        Self {
            data: [b'a' + (index % 26) as u8; PAYLOAD_SIZE],
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// A protocol packet. Fields are fixed at construction and the checksum is
/// always derived from them, except for [`Packet::from_raw_parts`], which
/// models whatever bits the medium actually delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    seqnum: SeqNum,
    acknum: Option<SeqNum>,
    payload: Payload,
    checksum: u32,
}

impl Packet {
    pub fn new(seqnum: SeqNum, acknum: Option<SeqNum>, payload: Payload) -> Self {
        Self {
            seqnum,
            acknum,
            checksum: checksum::compute(seqnum, acknum, &payload),
            payload,
        }
    }

    /// Data packet; the acknowledgment field is not in use.
    pub fn data(seqnum: SeqNum, payload: Payload) -> Self {
        Self::new(seqnum, None, payload)
    }

    /// Pure ACK packet carrying `acknum`. `seqnum` is the ACK stream's own
    /// alternating field and carries no meaning for the data stream.
    pub fn ack(seqnum: SeqNum, acknum: SeqNum) -> Self {
        Self::new(seqnum, Some(acknum), [ACK_FILLER; PAYLOAD_SIZE])
    }

    /// Reassemble a packet from raw fields without recomputing the checksum.
    pub fn from_raw_parts(
        seqnum: SeqNum,
        acknum: Option<SeqNum>,
        payload: Payload,
        checksum: u32,
    ) -> Self {
        Self {
            seqnum,
            acknum,
            payload,
            checksum,
        }
    }

    pub fn seqnum(&self) -> SeqNum {
        self.seqnum
    }

    pub fn acknum(&self) -> Option<SeqNum> {
        self.acknum
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    pub fn is_corrupted(&self) -> bool {
        checksum::is_corrupted(self)
    }

    pub fn is_ack(&self) -> bool {
        self.acknum.is_some()
    }
}
