//! Device identity
//!
//! The serial identifier proves who the device is while it claims an address,
//! the description is announced once the coordinator assigned one. Both must
//! fit into a single frame payload.

use crate::FRAME_PAYLOAD_SIZE;

/// Errors returned when building a [`DeviceIdentity`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentityError {
    /// An empty serial identifier would match every claim frame
    EmptySerialIdentifier,
    /// The serial identifier does not fit into a frame payload (actual length)
    SerialIdentifierTooLong(usize),
    /// The description does not fit into a frame payload (actual length)
    DescriptionTooLong(usize),
}

/// Immutable identity of a device
///
/// Holds the serial identifier used to prove identity during the address
/// claim handshake and the description announced once an address is assigned.
/// Both are stored inline so the identity can live in a `static` on targets
/// without an allocator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceIdentity {
    serial_identifier: [u8; FRAME_PAYLOAD_SIZE],
    serial_identifier_length: usize,
    description: [u8; FRAME_PAYLOAD_SIZE],
    description_length: usize,
}

impl DeviceIdentity {
    /// Creates a new identity
    ///
    /// # Arguments
    /// * `serial_identifier` - opaque identifier, 1 to `FRAME_PAYLOAD_SIZE` bytes
    /// * `description` - capability string, at most `FRAME_PAYLOAD_SIZE` bytes
    ///
    /// # Example
    /// ```rust
    /// use ihc_radio_lib::DeviceIdentity;
    ///
    /// let identity = DeviceIdentity::new(b"AB", b"Lamp1").unwrap();
    /// assert_eq!(identity.serial_identifier(), b"AB");
    /// assert_eq!(identity.description(), b"Lamp1");
    /// ```
    pub fn new(serial_identifier: &[u8], description: &[u8]) -> Result<Self, IdentityError> {
        if serial_identifier.is_empty() {
            return Err(IdentityError::EmptySerialIdentifier);
        }
        if serial_identifier.len() > FRAME_PAYLOAD_SIZE {
            return Err(IdentityError::SerialIdentifierTooLong(serial_identifier.len()));
        }
        if description.len() > FRAME_PAYLOAD_SIZE {
            return Err(IdentityError::DescriptionTooLong(description.len()));
        }

        let mut identity = DeviceIdentity {
            serial_identifier: [0u8; FRAME_PAYLOAD_SIZE],
            serial_identifier_length: serial_identifier.len(),
            description: [0u8; FRAME_PAYLOAD_SIZE],
            description_length: description.len(),
        };
        identity.serial_identifier[..serial_identifier.len()].copy_from_slice(serial_identifier);
        identity.description[..description.len()].copy_from_slice(description);
        Ok(identity)
    }

    pub fn serial_identifier(&self) -> &[u8] {
        &self.serial_identifier[..self.serial_identifier_length]
    }

    pub fn description(&self) -> &[u8] {
        &self.description[..self.description_length]
    }

    /// Checks whether a claim payload carries this device's serial identifier
    ///
    /// Only the first `serial_identifier().len()` bytes of the payload are
    /// compared; the rest is padding and ignored.
    pub fn matches_serial_identifier(&self, payload: &[u8; FRAME_PAYLOAD_SIZE]) -> bool {
        payload[..self.serial_identifier_length] == *self.serial_identifier()
    }
}
