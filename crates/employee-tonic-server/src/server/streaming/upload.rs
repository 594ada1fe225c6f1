use employee_tonic_core::{Error, proto::EmployeeRequest, types::NewEmployee};
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tonic::Status;

/// Reads a client-streamed upload to the end and returns it as one batch.
///
/// Nothing is stored here; the caller submits the batch in a single store
/// operation once the client has finished sending. Any failure discards the
/// whole batch.
///
/// # Errors
///
/// - The inbound stream's own status if the client side fails mid-upload.
/// - `INVALID_ARGUMENT` once more than `max_batch_size` messages arrive.
/// - `ABORTED` if the service shuts down before the upload finishes.
pub async fn collect_batch<S>(
    inbound: S,
    max_batch_size: usize,
    shutdown: CancellationToken,
) -> Result<Vec<NewEmployee>, Status>
where
    S: Stream<Item = Result<EmployeeRequest, Status>> + Send,
{
    let mut inbound = core::pin::pin!(inbound);
    let mut batch = Vec::new();

    loop {
        let next = tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                return Err(Error::StreamInterrupted {
                    reason: "service is shutting down".to_string(),
                }
                .into());
            }
            next = inbound.next() => next,
        };

        match next {
            None => return Ok(batch),
            Some(Err(status)) => {
                tracing::warn!(
                    received = batch.len(),
                    "Upload aborted by client error: {}",
                    status.message()
                );
                return Err(status);
            }
            Some(Ok(req)) => {
                if batch.len() == max_batch_size {
                    return Err(Error::InvalidRequest {
                        reason: format!("batch exceeds maximum of {max_batch_size} employees"),
                    }
                    .into());
                }
                batch.push(NewEmployee::from(req));
            }
        }
    }
}
