use crate::config::RetryPolicy;
use crate::error::ServerError;

use super::FetchFn;

/// Runs one page fetch, repeating transient server failures as the policy
/// allows. The last error is returned once retries are spent.
pub(crate) async fn fetch_page<M>(
    fetch: &FetchFn<M>,
    offset: usize,
    limit: usize,
    policy: &RetryPolicy,
) -> anyhow::Result<Vec<M>> {
    let mut attempt = 0;
    loop {
        match fetch(offset, limit).await {
            Ok(items) => return Ok(items),
            Err(e) if attempt < policy.max_retries && is_transient(&e) => {
                let delay = policy.backoff(attempt);
                attempt += 1;
                tracing::warn!(
                    offset,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Page fetch failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

fn is_transient(error: &anyhow::Error) -> bool {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<ServerError>())
        .is_some_and(ServerError::is_transient)
}
