use std::time::Duration;

use futures::future::{self, Either};

use crate::ClientError;

#[cfg(not(target_arch = "wasm32"))]
pub async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await;
}

#[cfg(target_arch = "wasm32")]
pub async fn sleep(duration: Duration) {
    gloo_timers::future::sleep(duration).await;
}

/// Run `future`, failing with [`ClientError::Timeout`] if it takes longer
/// than `limit`. `None` waits indefinitely.
pub async fn with_timeout<T>(
    future: impl Future<Output = Result<T, ClientError>>,
    limit: Option<Duration>,
) -> Result<T, ClientError> {
    let Some(limit) = limit else {
        return future.await;
    };
    let future = std::pin::pin!(future);
    let timer = std::pin::pin!(sleep(limit));
    match future::select(future, timer).await {
        Either::Left((result, _)) => result,
        Either::Right(((), _)) => Err(ClientError::Timeout(limit)),
    }
}
