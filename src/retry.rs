//! Single retry sweep over pages that failed the initial pass
//!
//! The sweep runs only after the initial pass has finished and re-requests each failed
//! page exactly once, so no page is ever attempted more than twice per fetch. Pages
//! that fail again stay in the failed set and are reported to the caller.

use rand::Rng;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::{Error, Result};
use crate::fetcher::PageSource;
use crate::result_set::PagedResultSet;
use crate::scheduler::{FetchContext, run_window};
use crate::types::PageIndex;

/// Attempt number of the retry sweep
pub const RETRY_ATTEMPT: u8 = 2;

/// Re-request every page currently in `results.failed_pages()` once.
///
/// Successful pages move into the fetched set; failures stay failed. The sweep uses the
/// same concurrency bound as the initial pass. Only a fatal error (credential gone,
/// cancellation) is returned.
pub async fn retry_failed_pages<S>(
    ctx: &FetchContext<'_, S>,
    results: &mut PagedResultSet<S::Record>,
    config: &RetryConfig,
) -> Result<()>
where
    S: PageSource + ?Sized,
{
    let failed: Vec<PageIndex> = results.failed_pages().iter().copied().collect();
    if failed.is_empty() {
        return Ok(());
    }

    let delay = if config.jitter {
        add_jitter(config.delay)
    } else {
        config.delay
    };

    tracing::info!(
        pages = failed.len(),
        delay_ms = delay.as_millis(),
        "Retrying failed collection pages"
    );

    if !delay.is_zero() {
        tokio::select! {
            _ = ctx.cancel_token.cancelled() => return Err(Error::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
    }

    let attempted = failed.len();
    run_window(ctx, failed, RETRY_ATTEMPT, results).await?;

    let still_failed = results.failed_pages().len();
    if still_failed == 0 {
        tracing::info!(recovered = attempted, "All failed pages recovered on retry");
    } else {
        tracing::warn!(
            recovered = attempted - still_failed,
            still_failed = still_failed,
            "Some collection pages failed twice and will be reported as missing"
        );
    }
    Ok(())
}

/// Add random jitter to a delay to prevent thundering herd
///
/// Jitter is uniformly distributed between 0% and 100% of the delay.
/// This means the actual delay will be between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    let jittered_secs = delay.as_secs_f64() * (1.0 + jitter_factor);
    Duration::from_secs_f64(jittered_secs)
}
