use super::{send_final_error, shutting_down};
use crate::server::store::RecordStore;
use employee_tonic_core::{
    Error, Result,
    proto::{EmployeeIdRequest, EmployeeResponse},
    types::Lookup,
};
use futures::{Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tonic::Status;

/// Answers every inbound id with exactly one outbound employee.
///
/// The loop is strictly read-one, write-one: the next inbound message is not
/// read until the answer to the current one has been handed to the response
/// channel, so answers are never reordered or batched. Back-pressure from a
/// slow client therefore pauses reading as well.
///
/// # Behavior
///
/// - Known id: the stored record.
/// - Unknown id: the `"Not Found"` placeholder. This is a normal message,
///   never an error.
/// - Inbound completes: returns, and dropping `resp_tx` completes the call.
/// - Inbound error: logged, then treated like completion. Nothing already
///   answered is retracted and no error is sent back.
/// - Store failure: an internal status is sent as the final item.
/// - Shutdown while waiting for input or for buffer space: an interruption
///   status is sent as the final item if the buffer has room.
///
/// Returns the number of ids answered.
pub async fn serve_lookups<S>(
    inbound: S,
    store: Arc<dyn RecordStore>,
    resp_tx: mpsc::Sender<core::result::Result<EmployeeResponse, Status>>,
    shutdown: CancellationToken,
) -> Result<usize>
where
    S: Stream<Item = core::result::Result<EmployeeIdRequest, Status>> + Send,
{
    let mut inbound = core::pin::pin!(inbound);
    let mut answered = 0;

    loop {
        let next = tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                return Err(forward_error(&resp_tx, shutting_down(), &shutdown).await);
            }
            () = resp_tx.closed() => return Err(Error::RequestCancelled),
            next = inbound.next() => next,
        };

        let req = match next {
            None => {
                tracing::debug!(answered, "Client finished sending ids");
                return Ok(answered);
            }
            Some(Err(status)) => {
                tracing::warn!(code = ?status.code(), "Client error: {}", status.message());
                return Ok(answered);
            }
            Some(Ok(req)) => req,
        };

        let lookup = match store.find_by_id(req.id).await {
            Ok(found) => Lookup::from_option(req.id, found),
            Err(e) => {
                let err = Error::internal("Failed to look up employee", e);
                return Err(forward_error(&resp_tx, err, &shutdown).await);
            }
        };

        tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                return Err(forward_error(&resp_tx, shutting_down(), &shutdown).await);
            }
            res = resp_tx.send(Ok(lookup.into())) => {
                if let Err(e) = res {
                    return Err(Error::ChannelError {
                        context: format!("Failed to forward lookup: {e}"),
                    });
                }
            }
        }
        answered += 1;
    }
}

/// Sends `err` as the final stream item and hands it back for logging.
async fn forward_error(
    resp_tx: &mpsc::Sender<core::result::Result<EmployeeResponse, Status>>,
    err: Error,
    shutdown: &CancellationToken,
) -> Error {
    send_final_error(resp_tx, &err, shutdown).await;
    err
}
