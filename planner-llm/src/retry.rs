//! Retry-with-backoff around a single [`Provider::complete`] call (§4.2).

use crate::provider::{Provider, ProviderError};
use crate::types::{ProviderRequest, ProviderResponse};
use std::time::Duration;

/// Backoff delay before each of the three retries after an initial attempt.
const BACKOFF: [Duration; 3] =
    [Duration::from_millis(100), Duration::from_millis(400), Duration::from_millis(1600)];

/// Call `provider.complete(request)`, retrying retryable errors up to three
/// times with fixed exponential backoff (100ms, 400ms, 1600ms) before
/// giving up and returning the last error.
pub async fn complete_with_retry<P: Provider>(
    provider: &P,
    request: ProviderRequest,
) -> Result<ProviderResponse, ProviderError> {
    let mut attempt = 0;
    loop {
        match provider.complete(request.clone()).await {
            Ok(response) => return Ok(response),
            Err(err) if attempt < BACKOFF.len() && err.is_retryable() => {
                tokio::time::sleep(BACKOFF[attempt]).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
