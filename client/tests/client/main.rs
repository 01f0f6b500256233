mod chat;
mod comments;
mod communities;
mod mentorship;
mod mutation;
mod profile;
mod query;

/// Yield to the executor until `condition` holds.
pub async fn until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition was never reached");
}
