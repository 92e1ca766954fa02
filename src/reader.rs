// Reader Demultiplexer (spec.md §4.5): a single background task that owns
// the read half for the life of the connection, reads frames, deserializes
// each into a Response, and routes it to the pending slot keyed by its
// token.
//
// Grounded on `other_examples/a15836e1_Masorubka1-iscsi-client-rs__src-client-client.rs.rs`'s
// `read_loop`, which loops reading headers/payloads and does
// `self.sending.remove(&itt)` to hand the frame to its waiter — the same
// take-from-registry-on-delivery shape this module implements over
// `PendingRegistry`. Design Note §9 flags that the teacher's own analogue
// (a fire-and-forget spawn, never joined) is a misimplementation to avoid:
// this version takes an explicit `CancellationToken` (the same shutdown
// primitive `ClientConnection` in that iscsi-client file uses for its
// "kill now" signal) and can be joined from `Dispose`.

use crate::error::Error;
use crate::pending::PendingRegistry;
use crate::proto;
use crate::transport;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Runs the demultiplexer loop until the stream closes, a decode error
/// occurs, or `shutdown` is cancelled. On any exit path every still-armed
/// slot in `registry` is completed with `ConnectionClosed` before
/// returning — "this is the only sanctioned way the connection transitions
/// to terminal failure at runtime" (spec.md §4.5).
pub async fn run<R: AsyncRead + Unpin>(
    mut read_half: R,
    registry: Arc<PendingRegistry>,
    shutdown: CancellationToken,
) {
    loop {
        let frame = tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                debug!("reader demultiplexer: shutdown requested");
                break;
            }
            frame = transport::read_frame(&mut read_half) => frame,
        };

        match frame {
            Ok(Some(payload)) => match proto::deserialize(&payload) {
                Ok(response) => route(&registry, response),
                Err(err) => {
                    warn!(error = %err, "reader demultiplexer: malformed frame, closing connection");
                    break;
                }
            },
            Ok(None) => {
                debug!("reader demultiplexer: peer closed the connection");
                break;
            }
            Err(Error::ConnectionClosed) => {
                debug!("reader demultiplexer: connection closed mid-frame");
                break;
            }
            Err(err) => {
                warn!(error = %err, "reader demultiplexer: I/O error, closing connection");
                break;
            }
        }
    }

    drain_with_connection_closed(&registry);
}

fn route(registry: &PendingRegistry, response: proto::Response) {
    match registry.take(response.token) {
        Some(slot) => slot.deliver(response),
        // Orphan response: the slot was already taken (cancelled, or a
        // protocol violation by the server). Per the "orphan responses"
        // design note (spec.md §9), this is logged and dropped, not treated
        // as fatal.
        None => debug!(token = response.token, "reader demultiplexer: orphan response dropped"),
    }
}

fn drain_with_connection_closed(registry: &PendingRegistry) {
    let armed = registry.drain();
    if !armed.is_empty() {
        debug!(count = armed.len(), "reader demultiplexer: draining armed slots on shutdown");
    }
    for slot in armed {
        slot.deliver_closed();
    }
}
