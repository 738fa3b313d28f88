//! # Radio Frame Module
//!
//! Fixed-size wire frame used by every message of the protocol.
//!
//! ## Frame Structure
//!
//! | Offset | Field        | Meaning                                            |
//! |--------|--------------|----------------------------------------------------|
//! | 0      | address      | destination or claimed address, 0xFF = broadcast   |
//! | 1      | message id   | sender-assigned sequence number, wraps at 256      |
//! | 2      | flags        | message type bitmask (see [`flags`])               |
//! | 3..8   | payload      | message specific data, zero padded                 |
//!
//! There are no partial frames. A buffer either holds a complete frame of
//! [`FRAME_SIZE`] bytes or it is discarded without reading any field.

use crate::{BROADCAST_ADDRESS, FRAME_HEADER_SIZE, FRAME_PAYLOAD_SIZE, FRAME_SIZE};

/// Flag bits carried in byte 2 of every frame
///
/// `RESET` and `DESCRIBE` are composed from `ASSIGN`, so a frame is never
/// classified by a single bit. Use [`flags::matches`] for the masked comparison.
pub mod flags {
    /// State report (device to coordinator) or state change (coordinator to device)
    pub const STATE: u8 = 0x10;
    /// Application command
    pub const COMMAND: u8 = 0x20;
    /// Address claim / assignment
    pub const ASSIGN: u8 = 0x40;
    /// Acknowledgment of the message id carried in the header
    pub const ACK: u8 = 0x80;
    /// Reset directive, returns the device to the unassigned phase
    pub const RESET: u8 = ASSIGN | 0x01;
    /// Device description
    pub const DESCRIBE: u8 = ASSIGN | 0x02;

    /// Returns true if every bit of `pattern` is set in `flags`
    ///
    /// This is the masked exact comparison `(flags & pattern) == pattern`.
    /// A frame carrying only `ASSIGN` does not match `RESET`.
    #[inline]
    pub const fn matches(flags: u8, pattern: u8) -> bool {
        (flags & pattern) == pattern
    }
}

/// Classification of a frame by its flag byte
///
/// Checked in priority order: reset, describe, claim, acknowledgment,
/// command, state. Anything else is plain data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameKind {
    Reset,
    Describe,
    Claim,
    Acknowledgment,
    Command,
    State,
    Data,
}

/// A complete protocol frame
///
/// # Example
/// ```rust
/// use ihc_radio_lib::RadioFrame;
///
/// let frame = RadioFrame::new_state(0x07, 3, &[1, 2, 3, 4, 5]);
/// let bytes = frame.encode();
/// assert_eq!(bytes, [0x07, 3, 0x10, 1, 2, 3, 4, 5]);
/// assert_eq!(RadioFrame::decode(&bytes), Some(frame));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RadioFrame {
    /// Destination address, or the claimed address for claim frames
    pub address: u8,
    /// Sequence number assigned by the sender
    pub message_id: u8,
    /// Message type bitmask
    pub flags: u8,
    /// Zero padded payload
    pub payload: [u8; FRAME_PAYLOAD_SIZE],
}

impl RadioFrame {
    pub const fn new(address: u8, message_id: u8, flags: u8, payload: [u8; FRAME_PAYLOAD_SIZE]) -> Self {
        RadioFrame {
            address,
            message_id,
            flags,
            payload,
        }
    }

    /// Builds a frame from a payload slice
    ///
    /// Shorter data is zero padded. Bytes beyond the payload capacity are not
    /// part of the frame.
    pub fn with_payload(address: u8, message_id: u8, flags: u8, data: &[u8]) -> Self {
        let mut payload = [0u8; FRAME_PAYLOAD_SIZE];
        let length = data.len().min(FRAME_PAYLOAD_SIZE);
        payload[..length].copy_from_slice(&data[..length]);
        Self::new(address, message_id, flags, payload)
    }

    /// Broadcast address claim carrying the serial identifier
    pub fn new_claim(message_id: u8, serial_identifier: &[u8]) -> Self {
        Self::with_payload(BROADCAST_ADDRESS, message_id, flags::ASSIGN, serial_identifier)
    }

    /// Address assignment sent by a coordinator to the device with `serial_identifier`
    pub fn new_assignment(address: u8, message_id: u8, serial_identifier: &[u8]) -> Self {
        Self::with_payload(address, message_id, flags::ASSIGN, serial_identifier)
    }

    pub fn new_description(address: u8, message_id: u8, description: &[u8]) -> Self {
        Self::with_payload(address, message_id, flags::DESCRIBE, description)
    }

    pub const fn new_state(address: u8, message_id: u8, state: &[u8; FRAME_PAYLOAD_SIZE]) -> Self {
        Self::new(address, message_id, flags::STATE, *state)
    }

    pub const fn new_acknowledgment(address: u8, message_id: u8) -> Self {
        Self::new(address, message_id, flags::ACK, [0u8; FRAME_PAYLOAD_SIZE])
    }

    pub const fn new_reset(address: u8, message_id: u8) -> Self {
        Self::new(address, message_id, flags::RESET, [0u8; FRAME_PAYLOAD_SIZE])
    }

    /// Command frame: big-endian command id followed by up to three parameter bytes
    pub fn new_command(address: u8, message_id: u8, command_id: u16, parameters: &[u8]) -> Self {
        let mut payload = [0u8; FRAME_PAYLOAD_SIZE];
        payload[..2].copy_from_slice(&command_id.to_be_bytes());
        let length = parameters.len().min(FRAME_PAYLOAD_SIZE - 2);
        payload[2..2 + length].copy_from_slice(&parameters[..length]);
        Self::new(address, message_id, flags::COMMAND, payload)
    }

    /// Serializes the frame into its wire form
    pub fn encode(&self) -> [u8; FRAME_SIZE] {
        let mut bytes = [0u8; FRAME_SIZE];
        bytes[0] = self.address;
        bytes[1] = self.message_id;
        bytes[2] = self.flags;
        bytes[FRAME_HEADER_SIZE..].copy_from_slice(&self.payload);
        bytes
    }

    /// Parses a frame from received bytes
    ///
    /// # Returns
    /// * `Some(frame)` if `bytes` holds at least a complete frame
    /// * `None` for truncated input, which is treated the same as no frame at all
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < FRAME_SIZE {
            return None;
        }
        let mut payload = [0u8; FRAME_PAYLOAD_SIZE];
        payload.copy_from_slice(&bytes[FRAME_HEADER_SIZE..FRAME_SIZE]);
        Some(Self::new(bytes[0], bytes[1], bytes[2], payload))
    }

    pub fn kind(&self) -> FrameKind {
        if flags::matches(self.flags, flags::RESET) {
            FrameKind::Reset
        } else if flags::matches(self.flags, flags::DESCRIBE) {
            FrameKind::Describe
        } else if flags::matches(self.flags, flags::ASSIGN) {
            FrameKind::Claim
        } else if flags::matches(self.flags, flags::ACK) {
            FrameKind::Acknowledgment
        } else if flags::matches(self.flags, flags::COMMAND) {
            FrameKind::Command
        } else if flags::matches(self.flags, flags::STATE) {
            FrameKind::State
        } else {
            FrameKind::Data
        }
    }

    #[inline]
    pub fn is_acknowledgment(&self) -> bool {
        flags::matches(self.flags, flags::ACK)
    }

    #[inline]
    pub fn is_broadcast(&self) -> bool {
        self.address == BROADCAST_ADDRESS
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn claim_frame_matches_wire_layout() {
        let frame = RadioFrame::new_claim(1, b"AB");
        assert_eq!(frame.encode(), [0xFF, 1, 0x40, b'A', b'B', 0, 0, 0]);
        assert!(frame.is_broadcast());
        assert_eq!(frame.kind(), FrameKind::Claim);
    }

    #[test]
    fn description_fills_whole_payload() {
        let frame = RadioFrame::new_description(0x07, 2, b"Lamp1");
        assert_eq!(frame.encode(), [0x07, 2, 0x42, b'L', b'a', b'm', b'p', b'1']);
        assert_eq!(frame.kind(), FrameKind::Describe);
    }

    #[test]
    fn acknowledgment_has_empty_payload() {
        let frame = RadioFrame::new_acknowledgment(0x07, 1);
        assert_eq!(frame.encode(), [0x07, 1, 0x80, 0, 0, 0, 0, 0]);
        assert!(frame.is_acknowledgment());
        assert_eq!(frame.kind(), FrameKind::Acknowledgment);
    }

    #[test]
    fn decode_reverses_encode() {
        let flag_patterns = [
            0x00,
            flags::STATE,
            flags::COMMAND,
            flags::ASSIGN,
            flags::ACK,
            flags::RESET,
            flags::DESCRIBE,
            flags::STATE | flags::ACK,
            0xFF,
        ];
        let payloads = [[0x00; FRAME_PAYLOAD_SIZE], [0xFF; FRAME_PAYLOAD_SIZE], [9, 8, 7, 6, 5], [b'A', b'B', 0, 0, 0]];
        for address in [0x00, 0x01, 0x07, 0x7F, 0xFE, BROADCAST_ADDRESS] {
            for message_id in [0, 1, 128, 255] {
                for flags in flag_patterns {
                    for payload in payloads {
                        let frame = RadioFrame::new(address, message_id, flags, payload);
                        assert_eq!(RadioFrame::decode(&frame.encode()), Some(frame));
                    }
                }
            }
        }
    }

    #[test]
    fn decode_rejects_truncated_input() {
        let bytes = RadioFrame::new_state(1, 1, &[1, 2, 3, 4, 5]).encode();
        for length in 0..FRAME_SIZE {
            assert_eq!(RadioFrame::decode(&bytes[..length]), None, "length {}", length);
        }
    }

    #[test]
    fn decode_ignores_trailing_bytes() {
        let mut bytes = [0u8; FRAME_SIZE + 2];
        bytes[..FRAME_SIZE].copy_from_slice(&RadioFrame::new_acknowledgment(3, 4).encode());
        bytes[FRAME_SIZE] = 0xEE;
        assert_eq!(RadioFrame::decode(&bytes), Some(RadioFrame::new_acknowledgment(3, 4)));
    }

    #[test]
    fn with_payload_truncates_long_data() {
        let frame = RadioFrame::with_payload(1, 1, flags::STATE, b"abcdefgh");
        assert_eq!(&frame.payload, b"abcde");
    }

    #[test]
    fn reset_requires_both_bits() {
        assert!(flags::matches(flags::RESET, flags::RESET));
        assert!(!flags::matches(flags::ASSIGN, flags::RESET));
        assert!(!flags::matches(flags::ACK | 0x01, flags::RESET));
        assert!(!flags::matches(flags::DESCRIBE, flags::RESET));
        assert_eq!(RadioFrame::new_reset(0xFF, 0).kind(), FrameKind::Reset);
        // 0x43 carries both composed patterns; reset wins
        assert_eq!(RadioFrame::new(0, 0, 0x43, [0; FRAME_PAYLOAD_SIZE]).kind(), FrameKind::Reset);
    }

    #[test]
    fn plain_assign_is_a_claim_not_a_reset() {
        let frame = RadioFrame::new(0x10, 0, flags::ASSIGN, [0; FRAME_PAYLOAD_SIZE]);
        assert_eq!(frame.kind(), FrameKind::Claim);
    }

    #[test]
    fn command_frame_layout() {
        let frame = RadioFrame::new_command(5, 9, 0x0102, &[7, 8, 9]);
        assert_eq!(frame.encode(), [5, 9, 0x20, 0x01, 0x02, 7, 8, 9]);
        assert_eq!(frame.kind(), FrameKind::Command);
    }

    #[test]
    fn unflagged_frame_is_data() {
        let frame = RadioFrame::new(5, 9, 0, [0; FRAME_PAYLOAD_SIZE]);
        assert_eq!(frame.kind(), FrameKind::Data);
        assert_eq!(RadioFrame::new_state(5, 9, &[0; 5]).kind(), FrameKind::State);
    }
}
