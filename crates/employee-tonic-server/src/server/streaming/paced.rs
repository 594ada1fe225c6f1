use super::{send_final_error, shutting_down};
use crate::server::telemetry::increment_employees_streamed;
use core::time::Duration;
use employee_tonic_core::{Error, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tonic::Status;

/// Forwards `items` to a response stream one at a time, pausing `interval`
/// between consecutive sends.
///
/// The pause runs on the runtime timer, so a paced stream never holds a
/// worker thread. No pause follows the last item and an empty input
/// completes immediately.
///
/// # Arguments
///
/// - `items`: Records to send, already in emission order.
/// - `interval`: Pause between two sends.
/// - `resp_tx`: Channel feeding the gRPC response stream.
/// - `shutdown`: Cancelled when the service is shutting down.
///
/// # Behavior
///
/// - If `shutdown` fires during a pause or while waiting for buffer space,
///   an [`Error::StreamInterrupted`] status is sent as the final stream item
///   when the buffer has room, and nothing else follows.
/// - If the client disconnects, production stops at the next send or pause.
///
/// Returns the number of items delivered.
pub async fn feed_paced<I, T>(
    items: I,
    interval: Duration,
    resp_tx: mpsc::Sender<core::result::Result<T, Status>>,
    shutdown: CancellationToken,
) -> Result<usize>
where
    I: IntoIterator,
    I::Item: Into<T>,
{
    let mut items = items.into_iter().peekable();
    let mut sent = 0;

    while let Some(item) = items.next() {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => return Err(interrupt(&resp_tx, &shutdown).await),
            res = resp_tx.send(Ok(item.into())) => {
                if let Err(e) = res {
                    return Err(Error::ChannelError {
                        context: format!("Failed to forward employee: {e}"),
                    });
                }
            }
        }
        sent += 1;
        increment_employees_streamed(1);

        if items.peek().is_none() {
            break;
        }

        tokio::select! {
            biased;
            () = shutdown.cancelled() => return Err(interrupt(&resp_tx, &shutdown).await),
            () = resp_tx.closed() => return Err(Error::RequestCancelled),
            () = tokio::time::sleep(interval) => {}
        }
    }

    Ok(sent)
}

async fn interrupt<T>(
    resp_tx: &mpsc::Sender<core::result::Result<T, Status>>,
    shutdown: &CancellationToken,
) -> Error {
    let err = shutting_down();
    send_final_error(resp_tx, &err, shutdown).await;
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;
    use tonic::Code;

    const INTERVAL: Duration = Duration::from_millis(1500);

    #[tokio::test(start_paused = true)]
    async fn paces_between_items_only() {
        let (tx, mut rx) = mpsc::channel::<core::result::Result<u64, Status>>(8);
        let started = Instant::now();

        let sent = feed_paced([1_u64, 2, 3], INTERVAL, tx, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(sent, 3);
        let elapsed = started.elapsed();
        assert!(elapsed >= INTERVAL * 2 && elapsed < INTERVAL * 3, "{elapsed:?}");

        let mut received = Vec::new();
        while let Some(item) = rx.recv().await {
            received.push(item.unwrap());
        }
        assert_eq!(received, [1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_input_completes_without_messages() {
        let (tx, mut rx) = mpsc::channel::<core::result::Result<u64, Status>>(8);

        let sent = feed_paced(Vec::<u64>::new(), INTERVAL, tx, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(sent, 0);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_interrupts_with_error_item() {
        let (tx, mut rx) = mpsc::channel::<core::result::Result<u64, Status>>(8);
        let token = CancellationToken::new();

        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let err = feed_paced([1_u64, 2, 3], INTERVAL, tx, token)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::StreamInterrupted { .. }));

        assert_eq!(rx.recv().await.unwrap().unwrap(), 1);
        let status = rx.recv().await.unwrap().unwrap_err();
        assert_eq!(status.code(), Code::Aborted);
        assert!(rx.recv().await.is_none());
    }

    /// Cancels `token` after 100ms of (paused) runtime time.
    fn cancel_soon(token: &CancellationToken) {
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_unblocks_send_to_stalled_client() {
        let (tx, _rx) = mpsc::channel::<core::result::Result<u64, Status>>(1);
        let token = CancellationToken::new();
        cancel_soon(&token);

        // No pause: the second send waits on a buffer nobody drains.
        let result = tokio::time::timeout(
            Duration::from_secs(60),
            feed_paced([1_u64, 2, 3], Duration::ZERO, tx, token),
        )
        .await
        .expect("paced stream must return once shut down");

        assert!(matches!(result, Err(Error::StreamInterrupted { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn interruption_does_not_wait_on_full_buffer() {
        let (tx, mut rx) = mpsc::channel::<core::result::Result<u64, Status>>(1);
        let token = CancellationToken::new();
        cancel_soon(&token);

        let result = tokio::time::timeout(
            Duration::from_secs(60),
            feed_paced([1_u64, 2, 3], INTERVAL, tx, token),
        )
        .await
        .expect("paced stream must return once shut down");
        assert!(matches!(result, Err(Error::StreamInterrupted { .. })));

        // The buffer was full, so only the first item made it.
        assert_eq!(rx.recv().await.unwrap().unwrap(), 1);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_client_goes_away() {
        let (tx, mut rx) = mpsc::channel::<core::result::Result<u64, Status>>(8);

        let consumer = tokio::spawn(async move {
            let first = rx.recv().await;
            drop(rx);
            first
        });

        let err = feed_paced([1_u64, 2, 3], INTERVAL, tx, CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err, Error::RequestCancelled);
        assert_eq!(consumer.await.unwrap().unwrap().unwrap(), 1);
    }
}
