//! Bounded-concurrency fan-out over the pages of a collection.
//!
//! Pages are fetched through a sliding window: up to `effective_concurrency` requests
//! are outstanding, and each completion immediately makes room for the next page. A
//! slow page therefore never idles the other slots the way wave-by-wave batching would.
//!
//! All bookkeeping happens in the single coordinating loop that drains completions,
//! so the [`PagedResultSet`] needs no locking.

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, FetchError, Result};
use crate::fetcher::PageSource;
use crate::plan::FetchPlan;
use crate::result_set::PagedResultSet;
use crate::types::{Event, PageIndex};

/// Attempt number of the initial pass
pub const FIRST_ATTEMPT: u8 = 1;

/// Everything one collection fetch shares between its phases
pub struct FetchContext<'a, S: ?Sized> {
    /// Where pages come from
    pub source: &'a S,
    /// Page plan for this fetch
    pub plan: FetchPlan,
    /// Progress events; sending without subscribers is fine
    pub events: broadcast::Sender<Event>,
    /// Cooperative cancellation, checked while waiting on page fetches
    pub cancel_token: CancellationToken,
}

impl<'a, S: PageSource + ?Sized> FetchContext<'a, S> {
    /// Context with a private event channel and a token that is never cancelled
    pub fn new(source: &'a S, plan: FetchPlan) -> Self {
        let (events, _rx) = broadcast::channel(64);
        Self {
            source,
            plan,
            events,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Publish progress on `events`
    pub fn with_events(mut self, events: broadcast::Sender<Event>) -> Self {
        self.events = events;
        self
    }

    /// Stop early when `cancel_token` fires
    pub fn with_cancellation(mut self, cancel_token: CancellationToken) -> Self {
        self.cancel_token = cancel_token;
        self
    }

    pub(crate) fn emit(&self, event: Event) {
        self.events.send(event).ok();
    }

    /// Fold one page outcome into `results`.
    ///
    /// Per-page failures become failed-page membership; a fatal failure is returned.
    fn record(
        &self,
        results: &mut PagedResultSet<S::Record>,
        page: PageIndex,
        outcome: std::result::Result<Vec<S::Record>, FetchError>,
        attempt: u8,
    ) -> Result<()> {
        match outcome {
            Ok(records) => {
                tracing::debug!(
                    page = page.get(),
                    attempt = attempt,
                    items = records.len(),
                    "Fetched collection page"
                );
                self.emit(Event::PageFetched {
                    page,
                    items: records.len(),
                });
                results.record_success(page, records);
                Ok(())
            }
            Err(e) if e.is_fatal() => {
                tracing::error!(
                    page = page.get(),
                    attempt = attempt,
                    error = %e,
                    "Fatal error fetching collection page, aborting"
                );
                Err(e.into())
            }
            Err(e) => {
                tracing::warn!(
                    page = page.get(),
                    attempt = attempt,
                    kind = e.kind(),
                    error = %e,
                    "Failed to fetch collection page"
                );
                self.emit(Event::PageFailed {
                    page,
                    attempt,
                    error: e.to_string(),
                });
                results.record_failure(page);
                Ok(())
            }
        }
    }
}

async fn fetch_indexed<S: PageSource + ?Sized>(
    source: &S,
    page: PageIndex,
    page_size: u32,
) -> (PageIndex, std::result::Result<Vec<S::Record>, FetchError>) {
    let outcome = source.fetch_page(page, page_size).await;
    (page, outcome)
}

/// Fetch every page in `pages` exactly once, never exceeding the plan's concurrency.
///
/// Shared by the initial fan-out and the retry sweep.
pub(crate) async fn run_window<S, I>(
    ctx: &FetchContext<'_, S>,
    pages: I,
    attempt: u8,
    results: &mut PagedResultSet<S::Record>,
) -> Result<()>
where
    S: PageSource + ?Sized,
    I: IntoIterator<Item = PageIndex>,
{
    let page_size = ctx.plan.page_size;
    let concurrency = ctx.plan.effective_concurrency;
    let mut pending = pages.into_iter();

    if concurrency <= 1 {
        for page in pending {
            let outcome = tokio::select! {
                biased;
                _ = ctx.cancel_token.cancelled() => return Err(Error::Cancelled),
                outcome = ctx.source.fetch_page(page, page_size) => outcome,
            };
            ctx.record(results, page, outcome, attempt)?;
        }
        return Ok(());
    }

    let mut in_flight = FuturesUnordered::new();
    for page in pending.by_ref().take(concurrency) {
        in_flight.push(fetch_indexed(ctx.source, page, page_size));
    }

    loop {
        let completed = tokio::select! {
            biased;
            _ = ctx.cancel_token.cancelled() => return Err(Error::Cancelled),
            completed = in_flight.next() => completed,
        };
        let Some((page, outcome)) = completed else {
            break;
        };

        ctx.record(results, page, outcome, attempt)?;

        if let Some(next) = pending.next() {
            in_flight.push(fetch_indexed(ctx.source, next, page_size));
        }
    }

    Ok(())
}

/// Initial pass: attempt every page of the plan once.
///
/// Returns the accumulated results with each page either fetched or failed. An
/// [`Error::Unauthenticated`] from any page aborts the pass immediately; outstanding
/// requests are dropped.
pub async fn fan_out<S>(ctx: &FetchContext<'_, S>) -> Result<PagedResultSet<S::Record>>
where
    S: PageSource + ?Sized,
{
    let mut results = PagedResultSet::new();
    if ctx.plan.is_empty() {
        return Ok(results);
    }

    tracing::info!(
        total_pages = ctx.plan.total_pages,
        page_size = ctx.plan.page_size,
        concurrency = ctx.plan.effective_concurrency,
        "Fetching collection pages"
    );

    run_window(ctx, ctx.plan.pages(), FIRST_ATTEMPT, &mut results).await?;

    tracing::info!(
        fetched = results.fetched_pages(),
        failed = results.failed_pages().len(),
        "Initial pass complete"
    );
    Ok(results)
}
