//! One node and a scripted coordinator talking over the simulated radio.
//!
//! Run with `cargo run --example simulated_node`.

use core::convert::Infallible;

use embassy_futures::select::{Either, select};
use embassy_futures::yield_now;
use embassy_time::Duration;
use env_logger::Builder;
use ihc_radio_lib::{
    DeviceIdentity, FrameKind, ManualClock, NodeConfiguration, NodeEvent, NodeManager, PublishResult, RadioDeviceConfiguration, RadioFrame,
    RadioInputQueue, RadioOutputQueue, SimulatedRadioDevice, publish_state_and_wait,
};
use log::{LevelFilter, log};

const ASSIGNED_ADDRESS: u8 = 0x07;
const LOOP_ITERATIONS: usize = 20_000;

/// Minimal coordinator: assigns one address, acknowledges descriptions and
/// every second state report, then sends a command and finally a reset.
struct Coordinator<'a> {
    to_node: &'a RadioInputQueue,
    from_node: &'a RadioOutputQueue,
    message_id: u8,
    states_seen: usize,
}

impl Coordinator<'_> {
    fn send(&mut self, frame: RadioFrame) {
        if self.to_node.try_send(frame.encode()).is_err() {
            log!(log::Level::Warn, "coordinator: air full, frame lost");
        }
    }

    fn next_message_id(&mut self) -> u8 {
        self.message_id = self.message_id.wrapping_add(1);
        self.message_id
    }

    /// Keeps the coordinator answering while the node waits on an acknowledgment
    async fn run(&mut self) -> Infallible {
        loop {
            self.service();
            yield_now().await;
        }
    }

    fn service(&mut self) {
        while let Ok(bytes) = self.from_node.try_receive() {
            let Some(frame) = RadioFrame::decode(&bytes) else {
                continue;
            };
            match frame.kind() {
                FrameKind::Claim if frame.is_broadcast() => {
                    log!(log::Level::Info, "coordinator: claim from {:?}, assigning {}", &frame.payload, ASSIGNED_ADDRESS);
                    self.send(RadioFrame::new(ASSIGNED_ADDRESS, frame.message_id, frame.flags, frame.payload));
                }
                FrameKind::Describe => {
                    log!(log::Level::Info, "coordinator: node {} is {:?}", frame.address, core::str::from_utf8(&frame.payload));
                    self.send(RadioFrame::new_acknowledgment(frame.address, frame.message_id));
                }
                FrameKind::State => {
                    self.states_seen += 1;
                    log!(log::Level::Info, "coordinator: state {:?} (report {})", frame.payload, self.states_seen);
                    if self.states_seen % 2 == 1 {
                        self.send(RadioFrame::new_acknowledgment(frame.address, frame.message_id));
                    }
                    if self.states_seen == 3 {
                        let message_id = self.next_message_id();
                        self.send(RadioFrame::new_command(frame.address, message_id, 0x0010, &[1]));
                    }
                    if self.states_seen == 6 {
                        let message_id = self.next_message_id();
                        self.send(RadioFrame::new_reset(frame.address, message_id));
                    }
                }
                FrameKind::Acknowledgment => {
                    log!(log::Level::Debug, "coordinator: node acknowledged message id {}", frame.message_id);
                }
                _ => {}
            }
        }
    }
}

fn main() {
    Builder::new().filter_level(LevelFilter::Debug).init();

    let to_node = RadioInputQueue::new();
    let from_node = RadioOutputQueue::new();
    // every clock reading is one loop iteration of 10 ms
    let clock = ManualClock::with_auto_advance(Duration::from_millis(10));

    let radio = SimulatedRadioDevice::with(from_node.sender(), to_node.receiver());
    let identity = match DeviceIdentity::new(b"AB", b"Lamp1") {
        Ok(identity) => identity,
        Err(error) => {
            log!(log::Level::Error, "Invalid identity: {:?}", error);
            return;
        }
    };
    let mut node = NodeManager::new(radio, &clock, identity, NodeConfiguration::default());
    if let Err(error) = node.setup(&RadioDeviceConfiguration::default()) {
        log!(log::Level::Error, "Radio setup failed: {:?}", error);
        return;
    }

    let mut coordinator = Coordinator {
        to_node: &to_node,
        from_node: &from_node,
        message_id: 0,
        states_seen: 0,
    };
    let mut lamp_on = false;

    for _ in 0..LOOP_ITERATIONS {
        coordinator.service();
        match node.poll() {
            NodeEvent::Idle => {}
            NodeEvent::MessageReceived(message) if message.is_command() => {
                log!(log::Level::Info, "node: command {:#06X} {:?}", message.command_id(), message.command_parameters());
                lamp_on = !lamp_on;
                let state = [lamp_on as u8, 0, 0, 0, 0];
                let wait = publish_state_and_wait(&mut node, &state, |event| {
                    log!(log::Level::Debug, "node: while waiting: {:?}", event);
                });
                let result = futures::executor::block_on(async {
                    match select(wait, coordinator.run()).await {
                        Either::First(result) => result,
                        Either::Second(never) => match never {},
                    }
                });
                match result {
                    PublishResult::Acknowledged => log!(log::Level::Info, "node: state change confirmed"),
                    PublishResult::Deferred => log!(log::Level::Info, "node: state change queued behind a pending send"),
                    other => log!(log::Level::Warn, "node: state change not confirmed: {:?}", other),
                }
            }
            event => log!(log::Level::Debug, "node: {:?} in {:?}", event, node.phase()),
        }
    }

    log!(log::Level::Info, "Finished in phase {:?}, last state {:?}", node.phase(), node.last_known_state());
}
