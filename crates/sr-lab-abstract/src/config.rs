use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    pub loss_rate: f64,
    pub corrupt_rate: f64,
    pub min_latency: u64,
    pub max_latency: u64,
    pub seed: u64,
    /// Keep window-rejected application messages queued (in order) and offer
    /// them again after each sender event instead of discarding them.
    pub retry_rejected: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            loss_rate: 0.0,
            corrupt_rate: 0.0,
            min_latency: 10,
            max_latency: 100,
            seed: 0,
            retry_rejected: true,
        }
    }
}

impl SimConfig {
    /// Check that the link can actually be simulated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_latency > self.max_latency {
            return Err(ConfigError::InvertedLatency {
                min: self.min_latency,
                max: self.max_latency,
            });
        }
        for (name, value) in [
            ("loss_rate", self.loss_rate),
            ("corrupt_rate", self.corrupt_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::RateOutOfRange { name, value });
            }
        }
        Ok(())
    }
}

/// What the sender retransmits when its timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetransmitPolicy {
    /// Resend only the packet the timer covers (the oldest outstanding one).
    #[default]
    Oldest,
    /// Resend every packet in the window that is still awaiting its ACK.
    AllOutstanding,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown retransmit policy '{0}', expected 'oldest' or 'all'")]
pub struct ParsePolicyError(String);

impl FromStr for RetransmitPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "oldest" => Ok(Self::Oldest),
            "all" | "all_outstanding" => Ok(Self::AllOutstanding),
            other => Err(ParsePolicyError(other.to_string())),
        }
    }
}

impl fmt::Display for RetransmitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Oldest => f.write_str("oldest"),
            Self::AllOutstanding => f.write_str("all"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("window size must be at least 1")]
    EmptyWindow,
    #[error("sequence space {seq_space} must be at least twice the window size {window_size}")]
    SeqSpaceTooSmall { seq_space: u32, window_size: u32 },
    #[error("sequence space {seq_space} must be a multiple of the window size {window_size}")]
    SeqSpaceNotMultiple { seq_space: u32, window_size: u32 },
    #[error("retransmission timeout must be non-zero")]
    ZeroRtt,
    #[error("min_latency {min} ms exceeds max_latency {max} ms")]
    InvertedLatency { min: u64, max: u64 },
    #[error("{name} must lie in [0, 1], got {value}")]
    RateOutOfRange { name: &'static str, value: f64 },
}

/// Selective Repeat parameters shared by both peers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProtocolConfig {
    /// Maximum number of unacknowledged packets in flight.
    pub window_size: u32,
    /// Number of distinct sequence numbers before wrapping to 0.
    pub seq_space: u32,
    /// Fixed retransmission timeout in ms.
    pub rtt_ms: u64,
    /// Resends of one packet before the sender stops waiting for its ACK.
    pub max_retransmissions: u32,
    pub retransmit_policy: RetransmitPolicy,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            window_size: 6,
            seq_space: 12,
            rtt_ms: 250,
            max_retransmissions: 10,
            retransmit_policy: RetransmitPolicy::Oldest,
        }
    }
}

impl ProtocolConfig {
    /// Check the parameters a peer relies on.
    ///
    /// `seq_space >= 2 * window_size` keeps a retransmitted old packet from
    /// being mistaken for a new one, and slots are indexed by
    /// `seq % window_size`, which only stays collision-free across the wrap
    /// when the window divides the sequence space.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 {
            return Err(ConfigError::EmptyWindow);
        }
        if self.seq_space / 2 < self.window_size {
            return Err(ConfigError::SeqSpaceTooSmall {
                seq_space: self.seq_space,
                window_size: self.window_size,
            });
        }
        if self.seq_space % self.window_size != 0 {
            return Err(ConfigError::SeqSpaceNotMultiple {
                seq_space: self.seq_space,
                window_size: self.window_size,
            });
        }
        if self.rtt_ms == 0 {
            return Err(ConfigError::ZeroRtt);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(ProtocolConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_small_sequence_space() {
        let config = ProtocolConfig {
            window_size: 6,
            seq_space: 7,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::SeqSpaceTooSmall {
                seq_space: 7,
                window_size: 6
            })
        );
    }

    #[test]
    fn rejects_sequence_space_not_divisible_by_window() {
        let config = ProtocolConfig {
            window_size: 4,
            seq_space: 10,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::SeqSpaceNotMultiple { .. })
        ));
    }

    #[test]
    fn rejects_empty_window_and_zero_rtt() {
        let empty = ProtocolConfig {
            window_size: 0,
            ..Default::default()
        };
        assert_eq!(empty.validate(), Err(ConfigError::EmptyWindow));

        let instant = ProtocolConfig {
            rtt_ms: 0,
            ..Default::default()
        };
        assert_eq!(instant.validate(), Err(ConfigError::ZeroRtt));
    }

    #[test]
    fn default_link_is_valid() {
        assert_eq!(SimConfig::default().validate(), Ok(()));
        let fixed = SimConfig {
            min_latency: 10,
            max_latency: 10,
            loss_rate: 1.0,
            ..Default::default()
        };
        assert_eq!(fixed.validate(), Ok(()));
    }

    #[test]
    fn rejects_inverted_latency_range() {
        let config = SimConfig {
            min_latency: 100,
            max_latency: 10,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvertedLatency { min: 100, max: 10 })
        );
    }

    #[test]
    fn rejects_rates_outside_unit_interval() {
        let lossy = SimConfig {
            loss_rate: 7.5,
            ..Default::default()
        };
        assert_eq!(
            lossy.validate(),
            Err(ConfigError::RateOutOfRange {
                name: "loss_rate",
                value: 7.5
            })
        );

        let negative = SimConfig {
            corrupt_rate: -0.1,
            ..Default::default()
        };
        assert!(matches!(
            negative.validate(),
            Err(ConfigError::RateOutOfRange { name: "corrupt_rate", .. })
        ));

        let nan = SimConfig {
            loss_rate: f64::NAN,
            ..Default::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn parses_policy_names() {
        assert_eq!("oldest".parse::<RetransmitPolicy>(), Ok(RetransmitPolicy::Oldest));
        assert_eq!("all".parse::<RetransmitPolicy>(), Ok(RetransmitPolicy::AllOutstanding));
        assert!("everything".parse::<RetransmitPolicy>().is_err());
    }
}
