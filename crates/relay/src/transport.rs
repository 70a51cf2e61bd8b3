//! Transport collaborator traits
//!
//! The relay treats the DNS-tunnel client as an opaque bidirectional
//! byte stream. Real implementations encapsulate packets in the
//! tunnel wire protocol and carry them to the upstream resolver;
//! tests plug in channel-backed stubs.

use async_trait::async_trait;
use thiserror::Error;

use qdynn_core::UpstreamDescriptor;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Transport setup failed: {0}")]
    Setup(String),

    #[error("Transport write failed: {0}")]
    Write(String),

    #[error("Transport read failed: {0}")]
    Read(String),

    #[error("Transport close failed: {0}")]
    Close(String),

    #[error("Transport closed")]
    Closed,
}

/// Bidirectional byte-stream endpoint carrying encapsulated packets.
///
/// Both directions may be driven concurrently: the sender task calls
/// `write` while the reader task is parked in `read`.
#[async_trait]
pub trait TransportClient: Send + Sync {
    /// Write one opaque packet into the tunnel.
    async fn write(&self, packet: &[u8]) -> Result<(), TransportError>;

    /// Read the next inbound packet, waiting until one arrives.
    async fn read(&self) -> Result<Vec<u8>, TransportError>;

    /// Tear down the tunnel. Pending reads and writes fail afterwards.
    async fn close(&self) -> Result<(), TransportError>;
}

/// Builds one `TransportClient` per relay session.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn connect(
        &self,
        domain: &str,
        credential: &str,
        upstream: &UpstreamDescriptor,
    ) -> Result<Box<dyn TransportClient>, TransportError>;
}
