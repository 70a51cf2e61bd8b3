//! qdynn Mobile Bridge
//!
//! Synchronous entry points for the Android/iOS host. The platform
//! VpnService glue calls these from its own threads; this module owns
//! a small global tokio runtime and wraps the async relay behind
//! blocking calls shaped like the bridge ABI:
//! `start(domain, password, dns, handler, logger)`, `send_packet`,
//! `stop`.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use tokio::runtime::Runtime;
use tracing::info;

use qdynn_relay::{LogSink, PacketHandler, Relay, TransportFactory};

// Global tokio runtime for async operations
static RUNTIME: OnceCell<Runtime> = OnceCell::new();

/// Initialize the library (call once at app startup)
pub fn init_library() {
    let _ = RUNTIME.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            // Tokio runtime is required for all operations
            .expect("Failed to create tokio runtime")
    });

    // Initialize tracing (simplified for mobile)
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    info!("qdynn library initialized");
}

/// Error types for bridge operations
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Library not initialized")]
    NotInitialized,
}

fn runtime() -> Result<&'static Runtime, BridgeError> {
    RUNTIME.get().ok_or(BridgeError::NotInitialized)
}

/// Host-facing handle over one relay session.
pub struct Bridge {
    relay: Arc<Relay>,
}

impl Bridge {
    /// Create a bridge backed by the given transport factory.
    pub fn new(factory: Arc<dyn TransportFactory>) -> Result<Self, BridgeError> {
        if RUNTIME.get().is_none() {
            return Err(BridgeError::NotInitialized);
        }
        Ok(Self {
            relay: Arc::new(Relay::new(factory)),
        })
    }

    /// Start the tunnel. Blocks until the transport is constructed
    /// and both loops are launched; failures are reported through
    /// `logger` only. Calling `start` on a running bridge is a no-op.
    pub fn start(
        &self,
        domain: &str,
        password: &str,
        dns: &str,
        handler: Option<Arc<dyn PacketHandler>>,
        logger: Option<Arc<dyn LogSink>>,
    ) {
        if let Ok(rt) = runtime() {
            rt.block_on(self.relay.start(domain, password, dns, handler, logger));
        }
    }

    /// Push one outbound IP packet into the tunnel. Never blocks.
    pub fn send_packet(&self, packet: &[u8]) {
        self.relay.send_packet(packet);
    }

    /// Stop the tunnel. Safe to call repeatedly.
    pub fn stop(&self) {
        if let Ok(rt) = runtime() {
            rt.block_on(self.relay.stop());
        }
    }

    pub fn is_running(&self) -> bool {
        self.relay.is_running()
    }
}
