//! # Messages Module
//!
//! Wire representation of the protocol.
//!
//! Every message, whether it is an address claim, a description, a state
//! report, a command or an acknowledgment, travels in a single fixed-size
//! [`RadioFrame`]. The frame's flag byte decides how the payload is read.
//!
//! ## Key Types
//!
//! - `RadioFrame`: header fields plus the zero padded payload, with encode/decode
//! - `FrameKind`: classification of a frame by its flag byte
//! - `flags`: flag constants and the masked comparison helper

pub mod radio_frame;

pub use radio_frame::{flags, FrameKind, RadioFrame};
