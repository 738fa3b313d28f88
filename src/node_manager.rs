//! # Node Manager - Protocol State Machine
//!
//! Owns the device identity, the current logical address, the handshake
//! progress and the last known state, and decides on every poll which
//! protocol step runs next.
//!
//! ## Phases
//!
//! ```text
//!  Unassigned ──claim matched──► AssignedUndescribed ──description acked──► Operational
//!      ▲                                                                        │
//!      └────────────────────────── reset directive (any phase) ◄────────────────┘
//! ```
//!
//! - **Unassigned**: broadcasts an address claim every `claim_interval`
//! - **AssignedUndescribed**: sends its description every `describe_interval`
//!   until the coordinator acknowledges it
//! - **Operational**: re-sends the last known state every `heartbeat_interval`
//!
//! ## Polling
//!
//! `poll()` never blocks. An expired acknowledgment deadline is reported
//! first, then a waiting frame is dispatched; otherwise a deferred state
//! publish or the phase step runs. An acknowledgment read after its deadline
//! never completes the send. Sends that need an acknowledgment arm the
//! [`AckTracker`](crate::ack_waiter) and the phase steps pause until it resolves,
//! so at most one message id is in flight.

use embassy_time::Instant;
use log::{Level, log};

use crate::ack_waiter::{AckKind, AckTracker};
use crate::clock::Clock;
use crate::identity::DeviceIdentity;
use crate::messages::{flags, FrameKind, RadioFrame};
use crate::radio_devices::{RadioDevice, RadioDeviceConfiguration, RadioDeviceError};
use crate::{get_command_id, NodeConfiguration, FRAME_PAYLOAD_SIZE, FRAME_SIZE};

/// Position of the device in the handshake
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodePhase {
    Unassigned,
    AssignedUndescribed { address: u8 },
    Operational { address: u8 },
}

impl NodePhase {
    pub fn address(&self) -> Option<u8> {
        match self {
            NodePhase::Unassigned => None,
            NodePhase::AssignedUndescribed { address } | NodePhase::Operational { address } => Some(*address),
        }
    }
}

/// Application message addressed to this device
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    pub message_id: u8,
    pub flags: u8,
    pub payload: [u8; FRAME_PAYLOAD_SIZE],
}

impl InboundMessage {
    /// Big-endian command code from the first two payload bytes
    pub fn command_id(&self) -> u16 {
        get_command_id(&self.payload)
    }

    /// Parameter bytes following the command code
    pub fn command_parameters(&self) -> &[u8] {
        &self.payload[2..]
    }

    pub fn is_command(&self) -> bool {
        flags::matches(self.flags, flags::COMMAND)
    }

    pub fn is_state(&self) -> bool {
        flags::matches(self.flags, flags::STATE)
    }
}

/// What a call to [`NodeManager::poll`] did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeEvent {
    /// Nothing to do this time
    Idle,
    ClaimSent { message_id: u8 },
    AddressAssigned { address: u8 },
    DescriptionSent { message_id: u8 },
    DescriptionAcknowledged { message_id: u8 },
    StateSent { message_id: u8 },
    StateAcknowledged { message_id: u8 },
    AcknowledgmentTimedOut { message_id: u8, kind: AckKind },
    MessageReceived(InboundMessage),
    Reset,
}

/// Immediate result of [`NodeManager::publish_state`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Recorded only, the device has no address yet
    Buffered,
    /// Recorded and transmitted, the acknowledgment is pending
    Sent { message_id: u8 },
    /// Recorded, it will be transmitted once the pending acknowledgment resolves
    Deferred,
}

/// Device side protocol state machine
///
/// # Example
/// ```rust
/// use ihc_radio_lib::{DeviceIdentity, ManualClock, NodeConfiguration, NodeEvent, NodeManager, RadioDeviceConfiguration};
/// use ihc_radio_lib::{RadioInputQueue, RadioOutputQueue, SimulatedRadioDevice};
///
/// let input = RadioInputQueue::new();
/// let output = RadioOutputQueue::new();
/// let clock = ManualClock::new();
/// let radio = SimulatedRadioDevice::with(output.sender(), input.receiver());
/// let identity = DeviceIdentity::new(b"AB", b"Lamp1").unwrap();
///
/// let mut node = NodeManager::new(radio, &clock, identity, NodeConfiguration::default());
/// node.setup(&RadioDeviceConfiguration::default()).unwrap();
///
/// assert_eq!(node.poll(), NodeEvent::ClaimSent { message_id: 1 });
/// assert_eq!(output.try_receive().unwrap(), [0xFF, 1, 0x40, b'A', b'B', 0, 0, 0]);
/// ```
pub struct NodeManager<R: RadioDevice, C: Clock> {
    radio: R,
    clock: C,
    identity: DeviceIdentity,
    configuration: NodeConfiguration,
    phase: NodePhase,
    last_sent_message_id: u8,
    last_known_state: [u8; FRAME_PAYLOAD_SIZE],
    publish_requested: bool,
    next_step_at: Instant,
    acks: AckTracker,
}

impl<R: RadioDevice, C: Clock> NodeManager<R, C> {
    /// Creates a node in the unassigned phase with an all-zero last known state
    pub fn new(radio: R, clock: C, identity: DeviceIdentity, configuration: NodeConfiguration) -> Self {
        let next_step_at = clock.now();
        NodeManager {
            radio,
            clock,
            identity,
            configuration,
            phase: NodePhase::Unassigned,
            last_sent_message_id: 0,
            last_known_state: [0u8; FRAME_PAYLOAD_SIZE],
            publish_requested: false,
            next_step_at,
            acks: AckTracker::new(),
        }
    }

    /// Configures the radio device
    pub fn setup(&mut self, radio_configuration: &RadioDeviceConfiguration) -> Result<(), RadioDeviceError> {
        self.radio.configure(radio_configuration)?;
        log!(Level::Debug, "Radio configuration: {:?}", radio_configuration);
        log!(Level::Info, "Node {:?} ready, claiming an address", self.identity.serial_identifier());
        Ok(())
    }

    pub fn phase(&self) -> NodePhase {
        self.phase
    }

    pub fn address(&self) -> Option<u8> {
        self.phase.address()
    }

    /// Returns true if the device has an assigned address
    pub fn is_ready(&self) -> bool {
        self.address().is_some()
    }

    /// Returns true once the description has been acknowledged
    pub fn is_described(&self) -> bool {
        matches!(self.phase, NodePhase::Operational { .. })
    }

    pub fn last_sent_message_id(&self) -> u8 {
        self.last_sent_message_id
    }

    pub fn last_known_state(&self) -> &[u8; FRAME_PAYLOAD_SIZE] {
        &self.last_known_state
    }

    /// Message id of the send currently waiting for an acknowledgment
    pub fn awaiting_acknowledgment(&self) -> Option<u8> {
        self.acks.pending_message_id()
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn configuration(&self) -> &NodeConfiguration {
        &self.configuration
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    /// Runs one step of the protocol
    ///
    /// Reports an expired acknowledgment first, then dispatches an available
    /// inbound frame if there is one, otherwise runs whatever outbound step is due.
    pub fn poll(&mut self) -> NodeEvent {
        if let Some((message_id, kind)) = self.acks.take_if_expired(self.clock.now()) {
            log!(Level::Debug, "Acknowledgment of {:?} message id {} timed out", kind, message_id);
            return NodeEvent::AcknowledgmentTimedOut { message_id, kind };
        }

        if self.radio.available(true) {
            if let Some(frame) = self.read_frame() {
                return self.dispatch(frame);
            }
        }

        let now = self.clock.now();
        if self.acks.is_pending() {
            return NodeEvent::Idle;
        }

        if self.publish_requested {
            if let Some(address) = self.address() {
                let message_id = self.send_state(address, now);
                return NodeEvent::StateSent { message_id };
            }
        }

        if now < self.next_step_at {
            return NodeEvent::Idle;
        }

        match self.phase {
            NodePhase::Unassigned => {
                self.next_step_at = now + self.configuration.claim_interval;
                let message_id = self.send_claim();
                NodeEvent::ClaimSent { message_id }
            }
            NodePhase::AssignedUndescribed { address } => {
                self.next_step_at = now + self.configuration.describe_interval;
                let message_id = self.send_description(address, now);
                NodeEvent::DescriptionSent { message_id }
            }
            NodePhase::Operational { address } => {
                self.next_step_at = now + self.configuration.heartbeat_interval;
                log!(Level::Debug, "Sending last state: {:?}", self.last_known_state);
                let message_id = self.send_state(address, now);
                NodeEvent::StateSent { message_id }
            }
        }
    }

    /// Reads and dispatches one available frame
    ///
    /// # Returns
    /// The application message if the frame was one addressed to this device,
    /// `None` for everything else (including no frame at all)
    pub fn receive(&mut self) -> Option<InboundMessage> {
        if !self.radio.available(true) {
            return None;
        }
        let frame = self.read_frame()?;
        match self.dispatch(frame) {
            NodeEvent::MessageReceived(message) => Some(message),
            _ => None,
        }
    }

    /// Records a new state and sends it if possible
    ///
    /// The state is always stored as the last known state first, so a later
    /// heartbeat or the first state after a (re)assignment carries it.
    pub fn publish_state(&mut self, state: &[u8; FRAME_PAYLOAD_SIZE]) -> PublishOutcome {
        self.last_known_state = *state;

        let Some(address) = self.address() else {
            log!(Level::Debug, "State buffered, no address assigned yet");
            return PublishOutcome::Buffered;
        };

        if self.acks.is_pending() {
            self.publish_requested = true;
            return PublishOutcome::Deferred;
        }

        let now = self.clock.now();
        let message_id = self.send_state(address, now);
        PublishOutcome::Sent { message_id }
    }

    /// Returns the device to the unassigned phase
    ///
    /// Identity, last known state and the message id counter are kept.
    pub fn reset(&mut self) {
        log!(Level::Info, "Reset, releasing address {:?}", self.address());
        self.phase = NodePhase::Unassigned;
        self.acks.clear();
        self.publish_requested = false;
        self.next_step_at = self.clock.now();
    }

    fn read_frame(&mut self) -> Option<RadioFrame> {
        let mut buffer = [0u8; FRAME_SIZE];
        // drivers may report their full payload width
        let length = self.radio.read(&mut buffer).min(FRAME_SIZE);
        let frame = RadioFrame::decode(&buffer[..length]);
        if frame.is_none() && length > 0 {
            log!(Level::Debug, "Discarding truncated frame of {} bytes", length);
        }
        frame
    }

    fn dispatch(&mut self, frame: RadioFrame) -> NodeEvent {
        log::trace!(
            "Received (from {}): MsgID({}) Flags({:#04X}) LastSent({}) {:?}",
            frame.address,
            frame.message_id,
            frame.flags,
            self.last_sent_message_id,
            frame.payload
        );

        match frame.kind() {
            FrameKind::Reset => {
                self.reset();
                NodeEvent::Reset
            }
            // descriptions are coordinator bound
            FrameKind::Describe => NodeEvent::Idle,
            FrameKind::Claim => self.handle_claim(&frame),
            _ => match self.address() {
                Some(address) if address == frame.address => self.handle_addressed(&frame, address),
                _ => NodeEvent::Idle,
            },
        }
    }

    fn handle_claim(&mut self, frame: &RadioFrame) -> NodeEvent {
        if !self.identity.matches_serial_identifier(&frame.payload) {
            return NodeEvent::Idle;
        }
        if frame.is_broadcast() {
            log!(Level::Warn, "Ignoring assignment of the broadcast address");
            return NodeEvent::Idle;
        }

        let address = frame.address;
        if self.address() != Some(address) {
            log!(Level::Info, "Address set to {}", address);
            self.phase = NodePhase::AssignedUndescribed { address };
            self.acks.clear();
            self.next_step_at = self.clock.now();
        }
        self.send_acknowledgment(address, frame.message_id);
        NodeEvent::AddressAssigned { address }
    }

    fn handle_addressed(&mut self, frame: &RadioFrame, address: u8) -> NodeEvent {
        if frame.is_acknowledgment() {
            let now = self.clock.now();
            return match self.acks.take_if_matches(frame, address, now) {
                Some(AckKind::Description) => self.complete_description(address, frame.message_id),
                Some(AckKind::State) => {
                    log!(Level::Debug, "State message id {} acknowledged", frame.message_id);
                    NodeEvent::StateAcknowledged {
                        message_id: frame.message_id,
                    }
                }
                None => {
                    log!(Level::Debug, "Discarding ACK MsgID: {} / {}", frame.message_id, self.last_sent_message_id);
                    NodeEvent::Idle
                }
            };
        }

        self.send_acknowledgment(address, frame.message_id);
        NodeEvent::MessageReceived(InboundMessage {
            message_id: frame.message_id,
            flags: frame.flags,
            payload: frame.payload,
        })
    }

    fn complete_description(&mut self, address: u8, message_id: u8) -> NodeEvent {
        log!(Level::Info, "Description acknowledged, node {} operational", address);
        self.phase = NodePhase::Operational { address };
        let now = self.clock.now();
        self.send_state(address, now);
        self.next_step_at = now + self.configuration.heartbeat_interval;
        NodeEvent::DescriptionAcknowledged { message_id }
    }

    fn next_message_id(&mut self) -> u8 {
        self.last_sent_message_id = self.last_sent_message_id.wrapping_add(1);
        self.last_sent_message_id
    }

    fn send_claim(&mut self) -> u8 {
        let message_id = self.next_message_id();
        log!(Level::Debug, "Sending INIT, message id {}", message_id);
        self.transmit(&RadioFrame::new_claim(message_id, self.identity.serial_identifier()));
        message_id
    }

    fn send_description(&mut self, address: u8, now: Instant) -> u8 {
        let message_id = self.next_message_id();
        log!(Level::Debug, "Sending DESCRIBE, message id {}", message_id);
        self.transmit(&RadioFrame::new_description(address, message_id, self.identity.description()));
        self.acks.arm(message_id, AckKind::Description, now + self.configuration.ack_timeout);
        message_id
    }

    fn send_state(&mut self, address: u8, now: Instant) -> u8 {
        let message_id = self.next_message_id();
        self.publish_requested = false;
        log!(Level::Debug, "Sending state {:?}, message id {}", self.last_known_state, message_id);
        self.transmit(&RadioFrame::new_state(address, message_id, &self.last_known_state));
        self.acks.arm(message_id, AckKind::State, now + self.configuration.ack_timeout);
        message_id
    }

    fn send_acknowledgment(&mut self, address: u8, message_id: u8) {
        self.transmit(&RadioFrame::new_acknowledgment(address, message_id));
        log::trace!("Acknowledge sent for message id {}", message_id);
    }

    // A failed transmission is handled like a lost frame: the pending
    // acknowledgment times out and the phase schedule retries.
    fn transmit(&mut self, frame: &RadioFrame) {
        let result = self.radio.write(&frame.encode()).and_then(|_| self.radio.flush());
        if let Err(error) = result {
            log!(Level::Warn, "Transmission of message id {} failed: {:?}", frame.message_id, error);
        }
    }
}
