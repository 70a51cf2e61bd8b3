//! Bounded outbound packet queue
//!
//! Sits between `send_packet` and the sender loop. Enqueue never
//! blocks: when the queue is full the packet is dropped, so a
//! congested tunnel cannot stall the host's packet path.

use std::collections::VecDeque;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::trace;

/// Default capacity for the outbound queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

struct Inner {
    items: VecDeque<Bytes>,
    closed: bool,
}

/// Bounded FIFO of pending outbound packets.
pub struct OutboundQueue {
    inner: Mutex<Inner>,
    notify: Notify,
    capacity: usize,
}

impl OutboundQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                closed: false,
            }),
            notify: Notify::new(),
            capacity,
        }
    }

    /// Append a packet without blocking.
    ///
    /// Returns whether the packet was accepted. A full or closed
    /// queue drops the packet; congestion drops are policy, not
    /// errors, and nothing is surfaced to the host.
    pub fn enqueue(&self, packet: Bytes) -> bool {
        {
            let mut inner = self.inner.lock();
            if inner.closed {
                return false;
            }
            if inner.items.len() >= self.capacity {
                trace!("outbound queue full, dropping {} byte packet", packet.len());
                return false;
            }
            inner.items.push_back(packet);
        }
        self.notify.notify_one();
        true
    }

    /// Wait for the next packet in FIFO order.
    ///
    /// Returns `None` once the queue has been closed.
    pub async fn dequeue(&self) -> Option<Bytes> {
        loop {
            // Register before checking so an enqueue racing the check
            // cannot be missed.
            let notified = self.notify.notified();
            {
                let mut inner = self.inner.lock();
                if let Some(packet) = inner.items.pop_front() {
                    return Some(packet);
                }
                if inner.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Close the queue and discard everything still pending.
    ///
    /// Shutdown-only: releases buffered packets promptly and wakes
    /// the consumer so it can observe the close.
    pub fn close(&self) {
        {
            let mut inner = self.inner.lock();
            inner.closed = true;
            inner.items.clear();
        }
        self.notify.notify_waiters();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}
