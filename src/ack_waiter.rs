//! # Acknowledgment Waiter
//!
//! Tracks the single outbound frame that is waiting for an acknowledgment
//! and provides the bounded waits built on top of it.
//!
//! ## Architecture
//!
//! Sending a description or a state frame arms one [`AckTracker`] slot with
//! the message id and a deadline. The node keeps servicing inbound traffic on
//! every `poll()`: an acknowledgment frame resolves the slot, the deadline
//! expires it. Nothing spins inside the node itself.
//!
//! For callers that want the send-then-wait contract there are
//! [`wait_for_acknowledgment`] and [`publish_state_and_wait`]. Both are
//! futures that poll the node, yield between polls and finish at the
//! deadline at the latest.
//!
//! ## Matching Rules
//!
//! A frame acknowledges the pending send iff:
//! - its address equals the node's current logical address
//! - its ACK flag is set
//! - its message id equals the awaited id
//!
//! Any other frame leaves the slot untouched.

use embassy_futures::yield_now;
use embassy_time::Instant;
use log::{Level, log};

use crate::clock::Clock;
use crate::messages::RadioFrame;
use crate::node_manager::{NodeEvent, NodeManager, PublishOutcome};
use crate::radio_devices::RadioDevice;
use crate::FRAME_PAYLOAD_SIZE;

/// The kind of send an acknowledgment is awaited for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AckKind {
    Description,
    State,
}

#[derive(Clone, Copy, Debug)]
struct PendingAck {
    message_id: u8,
    kind: AckKind,
    deadline: Instant,
}

/// Single outstanding acknowledgment slot
///
/// Arming a new wait replaces the previous one, so no two sends are ever
/// awaited at the same time.
pub(crate) struct AckTracker {
    pending: Option<PendingAck>,
}

impl AckTracker {
    pub(crate) const fn new() -> Self {
        AckTracker { pending: None }
    }

    pub(crate) fn arm(&mut self, message_id: u8, kind: AckKind, deadline: Instant) {
        if let Some(previous) = self.pending {
            log!(
                Level::Warn,
                "Replacing pending acknowledgment for message id {} with {}",
                previous.message_id,
                message_id
            );
        }
        self.pending = Some(PendingAck { message_id, kind, deadline });
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub(crate) fn pending_message_id(&self) -> Option<u8> {
        self.pending.map(|pending| pending.message_id)
    }

    /// Resolves the pending wait if `frame` acknowledges it before the deadline
    ///
    /// A late acknowledgment leaves the slot armed so the next expiry check
    /// reports the timeout.
    pub(crate) fn take_if_matches(&mut self, frame: &RadioFrame, own_address: u8, now: Instant) -> Option<AckKind> {
        let pending = self.pending?;
        if now >= pending.deadline {
            return None;
        }
        if frame.address == own_address && frame.is_acknowledgment() && frame.message_id == pending.message_id {
            self.pending = None;
            return Some(pending.kind);
        }
        None
    }

    /// Drops the pending wait once its deadline has passed
    pub(crate) fn take_if_expired(&mut self, now: Instant) -> Option<(u8, AckKind)> {
        let pending = self.pending?;
        if now >= pending.deadline {
            self.pending = None;
            return Some((pending.message_id, pending.kind));
        }
        None
    }

    pub(crate) fn clear(&mut self) {
        self.pending = None;
    }
}

/// Result of [`publish_state_and_wait`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PublishResult {
    /// The state was buffered, the node has no address to send it to
    NotAssigned,
    /// The state was sent and acknowledged
    Acknowledged,
    /// The state was sent but no acknowledgment arrived in time
    NotAcknowledged,
    /// Another send is in flight, the state goes out after it resolves
    Deferred,
}

/// Waits until the send with `message_id` is acknowledged or times out
///
/// Polls the node until the acknowledgment arrives (`true`), the deadline
/// passes (`false`) or the node stops waiting for this id, for example
/// because a reset directive arrived (`false`). Every other event produced
/// while waiting, including application messages, is handed to `on_event`,
/// so inbound traffic is not lost during the wait.
///
/// The wait is bounded by the node's acknowledgment timeout as measured by
/// its clock.
pub async fn wait_for_acknowledgment<R, C, F>(node: &mut NodeManager<R, C>, message_id: u8, mut on_event: F) -> bool
where
    R: RadioDevice,
    C: Clock,
    F: FnMut(NodeEvent),
{
    loop {
        if node.awaiting_acknowledgment() != Some(message_id) {
            log!(Level::Debug, "No longer waiting for acknowledgment of message id {}", message_id);
            return false;
        }

        match node.poll() {
            NodeEvent::DescriptionAcknowledged { message_id: id } | NodeEvent::StateAcknowledged { message_id: id } if id == message_id => {
                return true;
            }
            NodeEvent::AcknowledgmentTimedOut { message_id: id, .. } if id == message_id => {
                return false;
            }
            NodeEvent::Idle => {}
            event => on_event(event),
        }

        yield_now().await;
    }
}

/// Blocking form of [`wait_for_acknowledgment`] for plain poll loops
pub fn wait_for_acknowledgment_blocking<R, C, F>(node: &mut NodeManager<R, C>, message_id: u8, on_event: F) -> bool
where
    R: RadioDevice,
    C: Clock,
    F: FnMut(NodeEvent),
{
    embassy_futures::block_on(wait_for_acknowledgment(node, message_id, on_event))
}

/// Records and sends a state, then waits for its acknowledgment
///
/// The buffered last-known-state is always updated, whatever the result.
pub async fn publish_state_and_wait<R, C, F>(node: &mut NodeManager<R, C>, state: &[u8; FRAME_PAYLOAD_SIZE], on_event: F) -> PublishResult
where
    R: RadioDevice,
    C: Clock,
    F: FnMut(NodeEvent),
{
    match node.publish_state(state) {
        PublishOutcome::Buffered => PublishResult::NotAssigned,
        PublishOutcome::Deferred => PublishResult::Deferred,
        PublishOutcome::Sent { message_id } => {
            if wait_for_acknowledgment(node, message_id, on_event).await {
                PublishResult::Acknowledged
            } else {
                PublishResult::NotAcknowledged
            }
        }
    }
}
