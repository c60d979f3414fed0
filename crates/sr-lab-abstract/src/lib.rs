pub mod checksum;
pub mod config;
pub mod interface;
pub mod packet;
pub mod scenario;

pub use interface::{Rejected, SystemContext, TransportProtocol};
pub use packet::{Message, MessageError, PAYLOAD_SIZE, Packet, Payload, SeqNum};

pub use config::{ConfigError, ParsePolicyError, ProtocolConfig, RetransmitPolicy, SimConfig};
pub use scenario::{
    ProtocolConfigOverride, SimConfigOverride, TestAction, TestAssertion, TestScenario,
};
