//! # Radio Device Simulator - Testing and Development Mock
//!
//! Simulated transceiver for running the protocol without hardware. It
//! mimics the frame oriented behavior of a fixed-payload radio:
//! - **Output Queue**: every flushed frame is pushed here for the simulated peer
//! - **Input Queue**: frames the peer wants this node to hear
//!
//! The queues are plain `embassy-sync` channels, so a test (or a scripted
//! coordinator) can push frames and inspect transmissions while the node holds
//! the device.
//!
//! ## Design Considerations
//!
//! - Writes are assembled into a single frame buffer, overflow is rejected
//! - Nothing is transmitted before `configure` succeeded
//! - A full output queue drops the frame, like a lost transmission

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender, TrySendError};
use log::{Level, log};

use super::{RadioDevice, RadioDeviceConfiguration, RadioDeviceError};
use crate::FRAME_SIZE;

/// Size of the simulated radio queues in frames
pub const RADIO_QUEUE_SIZE: usize = 16;

/// Raw bytes of one frame on the simulated air interface
pub type AirFrame = [u8; FRAME_SIZE];

/// Frames transmitted by the node
pub type RadioOutputQueue = Channel<CriticalSectionRawMutex, AirFrame, RADIO_QUEUE_SIZE>;
pub type RadioOutputQueueSender<'a> = Sender<'a, CriticalSectionRawMutex, AirFrame, RADIO_QUEUE_SIZE>;

/// Frames to be received by the node
pub type RadioInputQueue = Channel<CriticalSectionRawMutex, AirFrame, RADIO_QUEUE_SIZE>;
pub type RadioInputQueueReceiver<'a> = Receiver<'a, CriticalSectionRawMutex, AirFrame, RADIO_QUEUE_SIZE>;

/// Simulated radio device
///
/// # Example
/// ```rust
/// use ihc_radio_lib::{RadioDevice, RadioDeviceConfiguration, RadioInputQueue, RadioOutputQueue, SimulatedRadioDevice};
///
/// let input = RadioInputQueue::new();
/// let output = RadioOutputQueue::new();
/// let mut radio = SimulatedRadioDevice::with(output.sender(), input.receiver());
/// radio.configure(&RadioDeviceConfiguration::default()).unwrap();
///
/// radio.write(&[0xFF, 1, 0x40, b'A', b'B', 0, 0, 0]).unwrap();
/// radio.flush().unwrap();
/// assert_eq!(output.try_receive().unwrap(), [0xFF, 1, 0x40, b'A', b'B', 0, 0, 0]);
/// ```
pub struct SimulatedRadioDevice<'a> {
    output_queue_sender: RadioOutputQueueSender<'a>,
    input_queue_receiver: RadioInputQueueReceiver<'a>,
    configuration: Option<RadioDeviceConfiguration>,
    tx_buffer: AirFrame,
    tx_length: usize,
    rx_pending: Option<AirFrame>,
}

impl<'a> SimulatedRadioDevice<'a> {
    pub const fn with(output_queue_sender: RadioOutputQueueSender<'a>, input_queue_receiver: RadioInputQueueReceiver<'a>) -> Self {
        SimulatedRadioDevice {
            output_queue_sender,
            input_queue_receiver,
            configuration: None,
            tx_buffer: [0u8; FRAME_SIZE],
            tx_length: 0,
            rx_pending: None,
        }
    }

    pub fn configuration(&self) -> Option<&RadioDeviceConfiguration> {
        self.configuration.as_ref()
    }
}

impl RadioDevice for SimulatedRadioDevice<'_> {
    fn configure(&mut self, configuration: &RadioDeviceConfiguration) -> Result<(), RadioDeviceError> {
        configuration.validate()?;
        log!(
            Level::Debug,
            "Simulated radio configured: channel {}, {} bps, {} dBm",
            configuration.channel,
            configuration.data_rate,
            configuration.tx_power
        );
        self.configuration = Some(*configuration);
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), RadioDeviceError> {
        let end = self.tx_length + bytes.len();
        if end > FRAME_SIZE {
            self.tx_length = 0;
            return Err(RadioDeviceError::BufferOverflow);
        }
        self.tx_buffer[self.tx_length..end].copy_from_slice(bytes);
        self.tx_length = end;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), RadioDeviceError> {
        if self.configuration.is_none() {
            self.tx_length = 0;
            return Err(RadioDeviceError::NotConfigured);
        }

        // fixed payload radios pad short frames
        self.tx_buffer[self.tx_length..].fill(0);
        self.tx_length = 0;

        match self.output_queue_sender.try_send(self.tx_buffer) {
            Ok(_) => Ok(()),
            Err(TrySendError::Full(frame)) => {
                log!(Level::Warn, "Simulated air full, dropping frame: {:?}", frame);
                Err(RadioDeviceError::TransmissionFailed)
            }
        }
    }

    fn available(&mut self, _non_blocking: bool) -> bool {
        if self.rx_pending.is_none() {
            self.rx_pending = self.input_queue_receiver.try_receive().ok();
        }
        self.rx_pending.is_some()
    }

    fn read(&mut self, buffer: &mut [u8]) -> usize {
        let frame = match self.rx_pending.take() {
            Some(frame) => frame,
            None => match self.input_queue_receiver.try_receive() {
                Ok(frame) => frame,
                Err(_) => return 0,
            },
        };
        let length = buffer.len().min(FRAME_SIZE);
        buffer[..length].copy_from_slice(&frame[..length]);
        length
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn flush_requires_configuration() {
        let input = RadioInputQueue::new();
        let output = RadioOutputQueue::new();
        let mut radio = SimulatedRadioDevice::with(output.sender(), input.receiver());

        radio.write(&[1, 2, 3]).unwrap();
        assert_eq!(radio.flush(), Err(RadioDeviceError::NotConfigured));
        assert!(output.try_receive().is_err());
    }

    #[test]
    fn short_frames_are_zero_padded() {
        let input = RadioInputQueue::new();
        let output = RadioOutputQueue::new();
        let mut radio = SimulatedRadioDevice::with(output.sender(), input.receiver());
        radio.configure(&RadioDeviceConfiguration::default()).unwrap();

        radio.write(&[9, 9, 9, 9, 9, 9, 9, 9]).unwrap();
        radio.flush().unwrap();
        radio.write(&[1, 2]).unwrap();
        radio.write(&[3]).unwrap();
        radio.flush().unwrap();

        assert_eq!(output.try_receive().unwrap(), [9; FRAME_SIZE]);
        assert_eq!(output.try_receive().unwrap(), [1, 2, 3, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn oversized_write_is_rejected() {
        let input = RadioInputQueue::new();
        let output = RadioOutputQueue::new();
        let mut radio = SimulatedRadioDevice::with(output.sender(), input.receiver());
        assert_eq!(radio.write(&[0; FRAME_SIZE + 1]), Err(RadioDeviceError::BufferOverflow));
    }

    #[test]
    fn reads_one_frame_at_a_time() {
        let input = RadioInputQueue::new();
        let output = RadioOutputQueue::new();
        let mut radio = SimulatedRadioDevice::with(output.sender(), input.receiver());

        let mut buffer = [0u8; FRAME_SIZE];
        assert!(!radio.available(true));
        assert_eq!(radio.read(&mut buffer), 0);

        input.try_send([1; FRAME_SIZE]).unwrap();
        input.try_send([2; FRAME_SIZE]).unwrap();
        assert!(radio.available(true));
        assert!(radio.available(true));
        assert_eq!(radio.read(&mut buffer), FRAME_SIZE);
        assert_eq!(buffer, [1; FRAME_SIZE]);
        assert_eq!(radio.read(&mut buffer), FRAME_SIZE);
        assert_eq!(buffer, [2; FRAME_SIZE]);
        assert!(!radio.available(true));
    }

    #[test]
    fn invalid_configuration_is_not_applied() {
        let input = RadioInputQueue::new();
        let output = RadioOutputQueue::new();
        let mut radio = SimulatedRadioDevice::with(output.sender(), input.receiver());
        let configuration = RadioDeviceConfiguration {
            payload_length: 16,
            ..RadioDeviceConfiguration::new()
        };
        assert_eq!(radio.configure(&configuration), Err(RadioDeviceError::InvalidConfiguration));
        assert!(radio.configuration().is_none());
    }
}
