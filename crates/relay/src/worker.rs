//! Sender and reader tasks
//!
//! One of each is spawned per session. Both select against the
//! session's cancellation signal, biased so that cancellation wins
//! over ready data; `stop` never joins them.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::queue::OutboundQueue;
use crate::relay::{LogSink, PacketHandler};
use crate::transport::TransportClient;

/// Drain the outbound queue into the transport until cancelled.
///
/// A failed write is logged and skipped; retry and reconnect policy
/// belongs to the transport itself.
pub(crate) async fn sender_loop(
    queue: Arc<OutboundQueue>,
    transport: Arc<dyn TransportClient>,
    mut cancel: watch::Receiver<bool>,
    log: Option<Arc<dyn LogSink>>,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.changed() => break,
            packet = queue.dequeue() => {
                let Some(packet) = packet else { break };
                if let Err(e) = transport.write(&packet).await {
                    // Writes racing a concurrent stop() fail against
                    // the closed transport; stay quiet toward the
                    // host once cancellation has fired.
                    if *cancel.borrow() {
                        break;
                    }
                    warn!("outbound write failed: {}", e);
                    if let Some(sink) = &log {
                        sink.on_log(&format!("dnstt write error: {}", e));
                    }
                }
            }
        }
    }
    debug!("sender loop exited");
}

/// Forward inbound packets from the transport to the host until
/// cancelled or the read path fails.
///
/// A read error is fatal for the inbound direction: the read channel
/// is the only place remote teardown becomes visible. The packet
/// handler runs synchronously on this task.
pub(crate) async fn reader_loop(
    transport: Arc<dyn TransportClient>,
    mut cancel: watch::Receiver<bool>,
    handler: Option<Arc<dyn PacketHandler>>,
    log: Option<Arc<dyn LogSink>>,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.changed() => break,
            result = transport.read() => match result {
                Ok(packet) => {
                    // A read can complete in the same wake-up as
                    // cancellation; no packets reach the host once
                    // the session is torn down.
                    if *cancel.borrow() {
                        break;
                    }
                    if packet.is_empty() {
                        continue;
                    }
                    if let Some(handler) = &handler {
                        handler.on_packet(&packet);
                    }
                }
                Err(e) => {
                    if *cancel.borrow() {
                        break;
                    }
                    warn!("inbound read failed: {}", e);
                    if let Some(sink) = &log {
                        sink.on_log(&format!("dnstt read error: {}", e));
                    }
                    break;
                }
            }
        }
    }
    debug!("reader loop exited");
}
