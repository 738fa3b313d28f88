//! # ihc-radio-lib
//!
//! Device side of a lightweight point-to-point radio protocol for small
//! battery powered nodes talking to a coordinator over a transceiver that
//! moves fixed-size frames and nothing more.
//!
//! A node:
//! 1. claims a logical address by broadcasting its serial identifier
//! 2. announces its description once the coordinator assigned an address
//! 3. keeps publishing its latest state, with acknowledgments and heartbeats
//!
//! ## Architecture
//!
//! - `messages`: the fixed-size [`RadioFrame`] and its flag byte
//! - `radio_devices`: the [`RadioDevice`] transceiver trait and a simulated device
//! - `ack_waiter`: the single outstanding acknowledgment and the bounded waits
//! - `node_manager`: the [`NodeManager`] protocol state machine
//! - `clock`: injected time source for retry scheduling
//!
//! The outer loop calls [`NodeManager::poll`] repeatedly; every call either
//! dispatches one inbound frame or runs the outbound step that is due.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod ack_waiter;
pub mod clock;
pub mod identity;
pub mod messages;
pub mod node_manager;
pub mod radio_devices;

use embassy_time::Duration;

pub use ack_waiter::{publish_state_and_wait, wait_for_acknowledgment, wait_for_acknowledgment_blocking, AckKind, PublishResult};
pub use clock::{Clock, ManualClock, SystemClock};
pub use identity::{DeviceIdentity, IdentityError};
pub use messages::{flags, FrameKind, RadioFrame};
pub use node_manager::{InboundMessage, NodeEvent, NodeManager, NodePhase, PublishOutcome};
pub use radio_devices::{RadioDevice, RadioDeviceConfiguration, RadioDeviceError};

#[cfg(any(test, feature = "radio-device-simulator"))]
pub use radio_devices::{RadioInputQueue, RadioOutputQueue, SimulatedRadioDevice};

//Wire constants, changing any of them breaks compatibility with deployed coordinators
pub const FRAME_HEADER_SIZE: usize = 3;
pub const FRAME_PAYLOAD_SIZE: usize = 5;
pub const FRAME_SIZE: usize = FRAME_HEADER_SIZE + FRAME_PAYLOAD_SIZE;
/// Broadcast destination, also the "no address" value on the wire
pub const BROADCAST_ADDRESS: u8 = 0xFF;

/// Timing of the protocol steps
///
/// Each phase repeats its step at a fixed interval with no backoff:
/// claims while unassigned, descriptions until one is acknowledged and state
/// heartbeats once operational. The defaults keep claims four times slower
/// than descriptions and heartbeats five times slower than claims.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeConfiguration {
    /// Interval between address claims while unassigned
    pub claim_interval: Duration,
    /// Interval between description attempts while assigned but undescribed
    pub describe_interval: Duration,
    /// Interval between state heartbeats while operational
    pub heartbeat_interval: Duration,
    /// How long a description or state send waits for its acknowledgment
    pub ack_timeout: Duration,
}

impl NodeConfiguration {
    pub const fn new() -> Self {
        NodeConfiguration {
            claim_interval: Duration::from_millis(2000),
            describe_interval: Duration::from_millis(500),
            heartbeat_interval: Duration::from_millis(10_000),
            ack_timeout: Duration::from_millis(2000),
        }
    }
}

impl Default for NodeConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

/// Gets the command identifier from an application payload
///
/// The first two payload bytes hold the command code in big-endian order.
/// Everything beyond that belongs to the command dispatcher.
pub fn get_command_id(payload: &[u8; FRAME_PAYLOAD_SIZE]) -> u16 {
    u16::from_be_bytes([payload[0], payload[1]])
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn frame_size_matches_radio_payload() {
        assert_eq!(FRAME_SIZE, 8);
        assert_eq!(RadioDeviceConfiguration::default().payload_length as usize, FRAME_SIZE);
    }

    #[test]
    fn command_id_is_big_endian() {
        assert_eq!(get_command_id(&[0x01, 0x02, 0xAA, 0xBB, 0xCC]), 0x0102);
        assert_eq!(get_command_id(&[0xFF, 0x00, 0, 0, 0]), 0xFF00);
    }

    #[test]
    fn default_intervals_keep_reference_ratios() {
        let configuration = NodeConfiguration::default();
        assert_eq!(configuration.claim_interval.as_millis(), configuration.describe_interval.as_millis() * 4);
        assert_eq!(configuration.heartbeat_interval.as_millis(), configuration.claim_interval.as_millis() * 5);
        assert!(configuration.heartbeat_interval > configuration.describe_interval);
    }
}
