//! Relay lifecycle and state machine
//!
//! `Stopped → Starting → Running → Stopping → Stopped`, with `start`
//! and `stop` idempotent. All shared state lives behind one
//! reader/writer lock: `start` and `stop` take it exclusively,
//! `send_packet` and callback dispatch only ever take read snapshots
//! and act outside the lock, so a callback re-entering the relay
//! cannot deadlock.

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use qdynn_core::parse_upstream;

use crate::queue::{OutboundQueue, DEFAULT_QUEUE_CAPACITY};
use crate::transport::{TransportClient, TransportFactory};
use crate::worker;

/// Receives inbound packets, invoked on the reader task's own thread
/// of execution. Must not block indefinitely or inbound delivery
/// stalls.
pub trait PacketHandler: Send + Sync {
    fn on_packet(&self, packet: &[u8]);
}

/// Best-effort diagnostic sink; never required for correctness.
pub trait LogSink: Send + Sync {
    fn on_log(&self, line: &str);
}

/// Runtime state for one start/stop cycle. Created atomically at the
/// end of a successful `start`, destroyed at the beginning of `stop`.
struct Session {
    cancel: watch::Sender<bool>,
    queue: Arc<OutboundQueue>,
    transport: Arc<dyn TransportClient>,
}

#[derive(Default)]
struct RelayState {
    running: bool,
    /// Bumped each time a `start` takes ownership. A `start` parked in
    /// transport construction compares this at commit time to detect
    /// that an interleaved stop/start cycle has taken over.
    generation: u64,
    on_packet: Option<Arc<dyn PacketHandler>>,
    on_log: Option<Arc<dyn LogSink>>,
    session: Option<Session>,
}

/// The orchestrator: exclusively owns the transport client, the
/// outbound queue and both background tasks for the lifetime of one
/// session.
pub struct Relay {
    factory: Arc<dyn TransportFactory>,
    state: RwLock<RelayState>,
    queue_capacity: usize,
}

impl Relay {
    pub fn new(factory: Arc<dyn TransportFactory>) -> Self {
        Self::with_queue_capacity(factory, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_queue_capacity(factory: Arc<dyn TransportFactory>, capacity: usize) -> Self {
        Self {
            factory,
            state: RwLock::new(RelayState::default()),
            queue_capacity: capacity,
        }
    }

    /// Undo a `start` that failed before its session was installed.
    /// Skipped when a newer cycle has taken over in the meantime.
    fn rollback(&self, generation: u64) {
        let mut state = self.state.write();
        if state.generation != generation {
            return;
        }
        state.running = false;
        state.on_packet = None;
        state.on_log = None;
        state.session = None;
    }

    /// Start a session. A no-op when already running.
    ///
    /// Parse and connect failures are reported through the log sink
    /// only; the relay rolls back to the stopped state instead of
    /// reporting itself running with no functioning loops. Returns
    /// without waiting for the loops to reach steady state.
    pub async fn start(
        &self,
        domain: &str,
        credential: &str,
        upstream_spec: &str,
        on_packet: Option<Arc<dyn PacketHandler>>,
        on_log: Option<Arc<dyn LogSink>>,
    ) {
        let (generation, sink) = {
            let mut state = self.state.write();
            if state.running {
                debug!("start ignored, relay already running");
                return;
            }
            state.running = true;
            state.generation += 1;
            state.on_packet = on_packet;
            state.on_log = on_log;
            (state.generation, state.on_log.clone())
        };

        let upstream = match parse_upstream(upstream_spec) {
            Ok(upstream) => upstream,
            Err(e) => {
                warn!("start aborted: {}", e);
                if let Some(sink) = &sink {
                    sink.on_log(&format!("dnstt Start error: {}", e));
                }
                self.rollback(generation);
                return;
            }
        };

        if let Some(sink) = &sink {
            sink.on_log(&format!("dnstt Start: domain={} dns={}", domain, upstream_spec));
        }
        info!("starting relay: domain={} upstream={}", domain, upstream);

        let transport: Arc<dyn TransportClient> =
            match self.factory.connect(domain, credential, &upstream).await {
                Ok(client) => client.into(),
                Err(e) => {
                    warn!("transport setup failed: {}", e);
                    if let Some(sink) = &sink {
                        sink.on_log(&format!("dnstt Start error: {}", e));
                    }
                    self.rollback(generation);
                    return;
                }
            };

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let queue = Arc::new(OutboundQueue::new(self.queue_capacity));

        let snapshot = {
            let mut state = self.state.write();
            if !state.running || state.generation != generation {
                // A concurrent stop() (and possibly a fresh start)
                // ran while the transport was being constructed; this
                // cycle no longer owns the relay. Abandon the session.
                None
            } else {
                state.session = Some(Session {
                    cancel: cancel_tx,
                    queue: queue.clone(),
                    transport: transport.clone(),
                });
                Some((state.on_packet.clone(), state.on_log.clone()))
            }
        };

        let Some((handler, sink)) = snapshot else {
            if let Err(e) = transport.close().await {
                warn!("transport close failed: {}", e);
            }
            return;
        };

        tokio::spawn(worker::sender_loop(
            queue,
            transport.clone(),
            cancel_rx.clone(),
            sink.clone(),
        ));
        tokio::spawn(worker::reader_loop(transport, cancel_rx, handler, sink));
    }

    /// Hand one outbound packet to the relay. Never blocks and never
    /// errors toward the caller.
    ///
    /// Silently discarded when the relay is not running or the queue
    /// is full. The caller's buffer is copied; it can be reused or
    /// mutated as soon as this returns.
    pub fn send_packet(&self, packet: &[u8]) {
        let queue = {
            let state = self.state.read();
            if !state.running {
                return;
            }
            match &state.session {
                Some(session) => session.queue.clone(),
                // Mid-start: the transport is still being built.
                None => return,
            }
        };
        queue.enqueue(Bytes::copy_from_slice(packet));
    }

    /// Stop the session. A no-op when already stopped.
    ///
    /// Fires cancellation, drains the queue and closes the transport,
    /// then returns without joining the loops; they observe
    /// cancellation on their own schedule. Each loop holds its own
    /// clone of the transport handle, so a racing read or write
    /// resolves against a closed client rather than freed state.
    pub async fn stop(&self) {
        let (session, sink) = {
            let mut state = self.state.write();
            if !state.running {
                debug!("stop ignored, relay already stopped");
                return;
            }
            state.running = false;
            state.on_packet = None;
            (state.session.take(), state.on_log.take())
        };

        if let Some(sink) = &sink {
            sink.on_log("dnstt Stop");
        }
        info!("stopping relay");

        if let Some(session) = session {
            // Monotonic broadcast: both loops observe this exactly
            // once and exit.
            let _ = session.cancel.send(true);
            session.queue.close();
            if let Err(e) = session.transport.close().await {
                warn!("transport close failed: {}", e);
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.read().running
    }
}
