//! Shared helpers for the integration suite
//!
//! `StubFactory`/`StubTransport` form an in-memory transport the
//! relay drives exactly like a real tunnel client: tests observe
//! writes, inject inbound packets or read failures, and can gate the
//! write path to build up queue pressure.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, Semaphore};

use qdynn_core::UpstreamDescriptor;
use qdynn_relay::{LogSink, PacketHandler, TransportClient, TransportError, TransportFactory};

pub type Inbound = Result<Vec<u8>, TransportError>;

/// Observable state shared between a test and the stub transport its
/// factory hands to the relay.
#[derive(Default)]
pub struct StubState {
    pub written: Mutex<Vec<Vec<u8>>>,
    pub write_calls: AtomicUsize,
    pub fail_writes: AtomicUsize,
    pub closed: AtomicBool,
    pub connects: AtomicUsize,
    inbound_tx: Mutex<Option<mpsc::Sender<Inbound>>>,
    write_gate: Mutex<Option<Arc<Semaphore>>>,
}

impl StubState {
    /// Queue an inbound packet (or read failure) for the current
    /// session's reader.
    pub async fn push_inbound(&self, item: Inbound) {
        let tx = self
            .inbound_tx
            .lock()
            .clone()
            .expect("no session connected");
        tx.send(item).await.expect("reader receiver dropped");
    }

    /// Blocking variant for tests driving the synchronous bridge.
    pub fn push_inbound_blocking(&self, item: Inbound) {
        let tx = self
            .inbound_tx
            .lock()
            .clone()
            .expect("no session connected");
        tx.blocking_send(item).expect("reader receiver dropped");
    }

    /// Best-effort injection that tolerates an already-gone reader,
    /// for asserting post-stop silence.
    pub fn try_push_inbound(&self, item: Inbound) {
        if let Some(tx) = self.inbound_tx.lock().clone() {
            let _ = tx.try_send(item);
        }
    }

    /// Make subsequent writes park until permits are added to the
    /// returned semaphore.
    pub fn gate_writes(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.write_gate.lock() = Some(gate.clone());
        gate
    }
}

pub struct StubTransport {
    state: Arc<StubState>,
    inbound: tokio::sync::Mutex<mpsc::Receiver<Inbound>>,
}

#[async_trait]
impl TransportClient for StubTransport {
    async fn write(&self, packet: &[u8]) -> Result<(), TransportError> {
        self.state.write_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.state.write_gate.lock().clone();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await.expect("write gate dropped");
        }
        if self.state.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        if self
            .state
            .fail_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(TransportError::Write("synthetic".to_string()));
        }
        self.state.written.lock().push(packet.to_vec());
        Ok(())
    }

    async fn read(&self) -> Result<Vec<u8>, TransportError> {
        let mut rx = self.inbound.lock().await;
        match rx.recv().await {
            Some(item) => item,
            None => Err(TransportError::Closed),
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.state.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub struct StubFactory {
    pub state: Arc<StubState>,
    pub fail_connect: AtomicBool,
}

impl StubFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Arc::new(StubState::default()),
            fail_connect: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl TransportFactory for StubFactory {
    async fn connect(
        &self,
        _domain: &str,
        _credential: &str,
        _upstream: &UpstreamDescriptor,
    ) -> Result<Box<dyn TransportClient>, TransportError> {
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(TransportError::Setup("refused".to_string()));
        }
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        self.state.closed.store(false, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(64);
        *self.state.inbound_tx.lock() = Some(tx);
        Ok(Box::new(StubTransport {
            state: self.state.clone(),
            inbound: tokio::sync::Mutex::new(rx),
        }))
    }
}

/// Records packets delivered to the host callback.
#[derive(Default)]
pub struct RecordingHandler {
    pub packets: Mutex<Vec<Vec<u8>>>,
}

impl PacketHandler for RecordingHandler {
    fn on_packet(&self, packet: &[u8]) {
        self.packets.lock().push(packet.to_vec());
    }
}

/// Records log lines delivered to the host sink.
#[derive(Default)]
pub struct RecordingSink {
    pub lines: Mutex<Vec<String>>,
}

impl LogSink for RecordingSink {
    fn on_log(&self, line: &str) {
        self.lines.lock().push(line.to_string());
    }
}

/// Poll until `condition` holds, failing the test after 5 seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Synchronous variant for bridge tests.
pub fn wait_until_blocking(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        std::thread::sleep(Duration::from_millis(5));
    }
}
