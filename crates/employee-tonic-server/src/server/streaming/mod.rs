//! Per-call coordination for the three streaming RPC shapes.
//!
//! - [`paced`] - server streaming: one message per record, with a fixed pause
//!   between messages.
//! - [`lookup`] - bidirectional streaming: one lookup answered per inbound id,
//!   strictly in order.
//! - [`upload`] - client streaming: gathers the inbound stream into one batch.

pub mod lookup;
pub mod paced;
pub mod upload;

use employee_tonic_core::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tonic::Status;

pub(crate) fn shutting_down() -> Error {
    Error::StreamInterrupted {
        reason: "service is shutting down".to_string(),
    }
}

/// Hands `err` to the response stream as its last item.
///
/// Before shutdown this waits for buffer space like any other send. Once
/// `shutdown` has fired the item is only delivered if the buffer has room, so
/// a client that stopped reading cannot hold the task open.
pub(crate) async fn send_final_error<T>(
    resp_tx: &mpsc::Sender<Result<T, Status>>,
    err: &Error,
    shutdown: &CancellationToken,
) {
    let delivered = tokio::select! {
        biased;
        () = shutdown.cancelled() => resp_tx
            .try_send(Err(err.clone().into()))
            .map_err(|e| e.to_string()),
        res = resp_tx.send(Err(err.clone().into())) => res.map_err(|e| e.to_string()),
    };

    if let Err(e) = delivered {
        tracing::debug!("Failed to forward error: {e}");
    }
}
