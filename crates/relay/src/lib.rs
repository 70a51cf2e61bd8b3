//! qdynn Packet Relay
//!
//! Lifecycle-managed relay between the host's packet callbacks and a
//! DNS-tunnel transport client. The relay owns a bounded outbound
//! queue plus one sender and one reader task per session, and
//! guarantees that no task or transport handle outlives `stop`.

mod queue;
mod relay;
mod transport;
mod worker;

pub use queue::{OutboundQueue, DEFAULT_QUEUE_CAPACITY};
pub use relay::{LogSink, PacketHandler, Relay};
pub use transport::{TransportClient, TransportError, TransportFactory};
