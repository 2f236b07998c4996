//! Mailbox abstraction for addressed, subject-filtered delivery.
//!
//! The arbiter owns no transport; it talks through the `Mailbox` trait:
//! - `send` is a fire-and-forget broadcast
//! - `recv` / `recv_blocking` are selective receives filtered by subject,
//!   leaving non-matching messages queued
//! - `deliver_front` pushes a message back to the head of the queue
//!
//! `MemoryHub` wires mailboxes together in-process: the test vehicle and the
//! single-process deployment path.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::messages::{ArbiterMessage, Hsid, Subject};

/// Addressed message delivery between mesh sites.
///
/// Per-sender ordering is preserved; messages from different senders may
/// interleave arbitrarily.
pub trait Mailbox: Send + Sync {
    /// Fire-and-forget broadcast to `dests`. Delivery to unreachable sites
    /// is dropped; the fault detector re-observes disappearing peers.
    fn send(&self, dests: &[Hsid], msg: ArbiterMessage);

    /// Non-blocking receive of the oldest queued message whose subject is in
    /// `subjects`.
    fn recv(&self, subjects: &[Subject]) -> Option<ArbiterMessage>;

    /// Blocking receive with a timeout; `None` on expiry.
    fn recv_blocking(&self, subjects: &[Subject], timeout: Duration) -> Option<ArbiterMessage>;

    /// Push a message back to the head of the queue, ahead of everything
    /// already delivered.
    fn deliver_front(&self, msg: ArbiterMessage);
}

#[derive(Default)]
struct Queue {
    messages: Mutex<VecDeque<ArbiterMessage>>,
    available: Condvar,
}

impl Queue {
    fn take_matching(&self, subjects: &[Subject]) -> Option<ArbiterMessage> {
        let mut messages = self.messages.lock();
        let pos = messages
            .iter()
            .position(|m| subjects.contains(&m.subject()))?;
        messages.remove(pos)
    }

    fn push_back(&self, msg: ArbiterMessage) {
        self.messages.lock().push_back(msg);
        self.available.notify_all();
    }

    fn push_front(&self, msg: ArbiterMessage) {
        self.messages.lock().push_front(msg);
        self.available.notify_all();
    }
}

/// Routes messages between in-process mailboxes by hsid.
#[derive(Default)]
pub struct MemoryHub {
    queues: Mutex<HashMap<Hsid, Arc<Queue>>>,
}

impl MemoryHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Create (or re-attach to) the mailbox for `hsid`.
    pub fn mailbox(self: &Arc<Self>, hsid: Hsid) -> Arc<MemoryMailbox> {
        let queue = self.queues.lock().entry(hsid).or_default().clone();
        Arc::new(MemoryMailbox {
            hsid,
            hub: Arc::clone(self),
            queue,
        })
    }

    /// Detach a site; subsequent sends to it are dropped.
    pub fn disconnect(&self, hsid: Hsid) {
        self.queues.lock().remove(&hsid);
    }

    fn route(&self, dest: Hsid, msg: ArbiterMessage) {
        let queue = self.queues.lock().get(&dest).cloned();
        match queue {
            Some(queue) => queue.push_back(msg),
            None => tracing::debug!(dest, "dropping message to unregistered site"),
        }
    }
}

/// In-process mailbox attached to a `MemoryHub`.
pub struct MemoryMailbox {
    hsid: Hsid,
    hub: Arc<MemoryHub>,
    queue: Arc<Queue>,
}

impl MemoryMailbox {
    pub fn hsid(&self) -> Hsid {
        self.hsid
    }

    /// Inject a message directly, as the fault detector does.
    pub fn deliver(&self, msg: ArbiterMessage) {
        self.queue.push_back(msg);
    }

    /// Number of queued messages.
    pub fn len(&self) -> usize {
        self.queue.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Mailbox for MemoryMailbox {
    fn send(&self, dests: &[Hsid], msg: ArbiterMessage) {
        for &dest in dests {
            self.hub.route(dest, msg.clone());
        }
    }

    fn recv(&self, subjects: &[Subject]) -> Option<ArbiterMessage> {
        self.queue.take_matching(subjects)
    }

    fn recv_blocking(&self, subjects: &[Subject], timeout: Duration) -> Option<ArbiterMessage> {
        let deadline = Instant::now() + timeout;
        let mut messages = self.queue.messages.lock();
        loop {
            if let Some(pos) = messages
                .iter()
                .position(|m| subjects.contains(&m.subject()))
            {
                return messages.remove(pos);
            }
            if self
                .queue
                .available
                .wait_until(&mut messages, deadline)
                .timed_out()
            {
                let pos = messages
                    .iter()
                    .position(|m| subjects.contains(&m.subject()))?;
                return messages.remove(pos);
            }
        }
    }

    fn deliver_front(&self, msg: ArbiterMessage) {
        self.queue.push_front(msg);
    }
}
