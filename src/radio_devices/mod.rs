//! Radio device abstraction and implementations
//!
//! The protocol only needs a transceiver that moves whole fixed-size frames:
//! buffer bytes, transmit the buffered frame, check for a pending frame and
//! read it. Modulation, channel selection and register setup stay inside the
//! concrete driver.
//!
//! - `simulator`: queue-backed transceiver for host testing and simulations

#[cfg(any(test, feature = "radio-device-simulator"))]
pub mod simulator;

#[cfg(any(test, feature = "radio-device-simulator"))]
pub use simulator::{RadioInputQueue, RadioOutputQueue, SimulatedRadioDevice};

use crate::FRAME_SIZE;

/// Errors reported by radio device implementations
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RadioDeviceError {
    /// The device was used before `configure` succeeded
    NotConfigured,
    /// The requested configuration is not supported by the device
    InvalidConfiguration,
    /// More bytes were written than fit into one frame
    BufferOverflow,
    /// The buffered frame could not be handed to the air interface
    TransmissionFailed,
}

/// Physical layer parameters applied by [`RadioDevice::configure`]
///
/// The defaults are the reference setup of the nRF24L01 family the protocol
/// was designed for: fixed payload length equal to the frame size, hardware
/// auto-acknowledge with 15 retransmissions, and fixed pipe addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RadioDeviceConfiguration {
    /// RF channel number
    pub channel: u8,
    /// Air data rate in bits per second
    pub data_rate: u32,
    /// Transmit power in dBm
    pub tx_power: i8,
    /// Hardware address width in bytes
    pub address_length: u8,
    /// Hardware level auto-acknowledge
    pub auto_ack: bool,
    /// Hardware retransmission count
    pub auto_ack_retransmit_count: u8,
    /// Delay between hardware retransmissions in microseconds
    pub auto_ack_retransmit_interval_us: u16,
    /// Fixed payload length of the transceiver, always one protocol frame
    pub payload_length: u8,
    /// Hardware receive pipe address
    pub rx_address: [u8; 5],
    /// Hardware transmit pipe address
    pub tx_address: [u8; 5],
}

impl RadioDeviceConfiguration {
    pub const fn new() -> Self {
        RadioDeviceConfiguration {
            channel: 40,
            data_rate: 1_000_000,
            tx_power: 0,
            address_length: 5,
            auto_ack: true,
            auto_ack_retransmit_count: 15,
            auto_ack_retransmit_interval_us: 1000,
            payload_length: FRAME_SIZE as u8,
            rx_address: [0x05; 5],
            tx_address: [0x12; 5],
        }
    }

    /// Checks the parameters every implementation relies on
    pub fn validate(&self) -> Result<(), RadioDeviceError> {
        if self.payload_length as usize != FRAME_SIZE {
            return Err(RadioDeviceError::InvalidConfiguration);
        }
        if !(3..=5).contains(&self.address_length) {
            return Err(RadioDeviceError::InvalidConfiguration);
        }
        Ok(())
    }
}

impl Default for RadioDeviceConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait defining the interface for radio device implementations
///
/// Reads are frame oriented: `read` copies one received frame and returns
/// its length, 0 if nothing was pending. Callers discard short reads.
/// Writes are buffered until `flush`, which transmits exactly one frame.
///
/// # Examples
/// ```rust
/// use ihc_radio_lib::{RadioDevice, RadioDeviceError, RadioFrame};
///
/// fn send<R: RadioDevice>(radio: &mut R, frame: &RadioFrame) -> Result<(), RadioDeviceError> {
///     radio.write(&frame.encode())?;
///     radio.flush()
/// }
/// ```
pub trait RadioDevice {
    /// Applies the physical layer configuration
    fn configure(&mut self, configuration: &RadioDeviceConfiguration) -> Result<(), RadioDeviceError>;

    /// Appends bytes to the frame being assembled for the next `flush`
    fn write(&mut self, bytes: &[u8]) -> Result<(), RadioDeviceError>;

    /// Transmits the assembled frame and clears the buffer
    fn flush(&mut self) -> Result<(), RadioDeviceError>;

    /// Returns true if a received frame is waiting to be read
    fn available(&mut self, non_blocking: bool) -> bool;

    /// Copies one received frame into `buffer`
    ///
    /// # Returns
    /// The number of bytes copied, or 0 if no frame is pending
    fn read(&mut self, buffer: &mut [u8]) -> usize;
}
