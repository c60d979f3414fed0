//! Selective Repeat ARQ peers.
//!
//! [`SrSender`] and [`SrReceiver`] are pure state machines driven through
//! [`TransportProtocol`]: one application message, inbound packet or timer
//! fire at a time, each run to completion.

pub mod ack;
pub mod receive_window;
pub mod receiver;
pub mod send_window;
pub mod sender;
pub mod seq_space;
pub mod stats;
pub mod timer;

#[cfg(test)]
mod test_util;

pub use receiver::SrReceiver;
pub use sender::SrSender;
pub use seq_space::SeqSpace;
pub use stats::{ReceiverStats, SenderStats};

use sr_lab_abstract::{ConfigError, ProtocolConfig, TransportProtocol};

/// Both peers for `config`, boxed for the simulator.
pub fn peers(
    config: &ProtocolConfig,
) -> Result<(Box<dyn TransportProtocol>, Box<dyn TransportProtocol>), ConfigError> {
    let sender = SrSender::new(config.clone())?;
    let receiver = SrReceiver::new(config.clone())?;
    Ok((Box::new(sender), Box::new(receiver)))
}
