//! Collection client — the public entry point tying credentials, transport, paging,
//! retry and assembly together.
//!
//! A fetch moves through `Planned → FanningOut → Retrying → Assembled`, or ends in
//! `Failed` when the credential is missing or rejected. Each transition is published as
//! an [`Event::PhaseChanged`].

use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::{RwLock, broadcast};
use tokio_util::sync::CancellationToken;

use crate::assembler::assemble_owned;
use crate::config::{Config, RetryConfig};
use crate::credentials::CredentialProvider;
use crate::decoder::{JsonReleaseDecoder, ReleaseDecoder};
use crate::error::{Error, FetchError, Result};
use crate::fetcher::{PageFetcher, PageSource, folder_url, identity_url};
use crate::plan::FetchPlan;
use crate::retry::retry_failed_pages;
use crate::scheduler::{FetchContext, fan_out};
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::types::{CollectionFolder, CollectionResult, Event, FetchPhase};

/// Capacity of the progress event channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Run the full fetch state machine against any [`PageSource`].
///
/// Fetches every page of `ctx.plan`, sweeps failed pages once, and assembles the
/// records in page order. Per-page failures end up in
/// [`CollectionResult::failed_pages`]; only a fatal error is returned.
pub async fn fetch_all_pages<S>(
    ctx: &FetchContext<'_, S>,
    retry: &RetryConfig,
    username: &str,
) -> Result<CollectionResult<S::Record>>
where
    S: PageSource + ?Sized,
{
    let plan = ctx.plan;
    ctx.emit(Event::PhaseChanged {
        phase: FetchPhase::Planned,
    });

    ctx.emit(Event::PhaseChanged {
        phase: FetchPhase::FanningOut,
    });
    let mut results = match fan_out(ctx).await {
        Ok(results) => results,
        Err(e) => return Err(fail(ctx, e)),
    };

    ctx.emit(Event::PhaseChanged {
        phase: FetchPhase::Retrying,
    });
    if let Err(e) = retry_failed_pages(ctx, &mut results, retry).await {
        return Err(fail(ctx, e));
    }

    let (releases, failed_pages) = assemble_owned(results, plan.total_pages);
    ctx.emit(Event::PhaseChanged {
        phase: FetchPhase::Assembled,
    });

    if failed_pages.is_empty() {
        tracing::info!(
            username = username,
            releases = releases.len(),
            pages = plan.total_pages,
            "Collection fetched"
        );
    } else {
        tracing::warn!(
            username = username,
            releases = releases.len(),
            pages = plan.total_pages,
            missing_pages = ?failed_pages,
            "Collection fetched with missing pages"
        );
    }

    ctx.emit(Event::Completed {
        releases: releases.len(),
        failed_pages: failed_pages.iter().copied().collect(),
    });

    Ok(CollectionResult {
        username: username.to_string(),
        releases,
        failed_pages,
        total_pages: plan.total_pages,
        page_size: plan.page_size,
    })
}

fn fail<S: PageSource + ?Sized>(ctx: &FetchContext<'_, S>, error: Error) -> Error {
    ctx.emit(Event::PhaseChanged {
        phase: FetchPhase::Failed,
    });
    error
}

#[derive(Deserialize)]
struct Identity {
    username: Option<String>,
}

/// Username resolved for one `Authorization` header value
#[derive(Clone)]
struct CachedIdentity {
    authorization: String,
    username: String,
}

/// Client for one user's catalog collection
///
/// Cheap to clone; clones share the transport, credentials, cached username and event
/// channel.
pub struct CollectionClient<D = JsonReleaseDecoder> {
    config: Arc<Config>,
    transport: Arc<dyn HttpTransport>,
    decoder: Arc<D>,
    credentials: Arc<dyn CredentialProvider>,
    identity: Arc<RwLock<Option<CachedIdentity>>>,
    event_tx: broadcast::Sender<Event>,
}

impl<D> Clone for CollectionClient<D> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            transport: Arc::clone(&self.transport),
            decoder: Arc::clone(&self.decoder),
            credentials: Arc::clone(&self.credentials),
            identity: Arc::clone(&self.identity),
            event_tx: self.event_tx.clone(),
        }
    }
}

impl CollectionClient<JsonReleaseDecoder> {
    /// Client using reqwest and the JSON release decoder
    ///
    /// # Errors
    /// Returns [`Error::Config`] for an invalid configuration, or an error if the HTTP
    /// client cannot be built.
    pub fn new(config: Config, credentials: Arc<dyn CredentialProvider>) -> Result<Self> {
        config.validate()?;
        let transport = Arc::new(ReqwestTransport::new(&config)?);
        Self::with_parts(config, transport, JsonReleaseDecoder, credentials)
    }
}

impl<D: ReleaseDecoder> CollectionClient<D> {
    /// Client from explicit collaborators
    ///
    /// # Errors
    /// Returns [`Error::Config`] for an invalid configuration.
    pub fn with_parts(
        config: Config,
        transport: Arc<dyn HttpTransport>,
        decoder: D,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self> {
        config.validate()?;
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            config: Arc::new(config),
            transport,
            decoder: Arc::new(decoder),
            credentials,
            identity: Arc::new(RwLock::new(None)),
            event_tx,
        })
    }

    /// Subscribe to progress events of every fetch made through this client
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Report a fetch that ended before any page was requested
    fn reject(&self, error: Error) -> Error {
        for phase in [FetchPhase::Planned, FetchPhase::Failed] {
            self.event_tx.send(Event::PhaseChanged { phase }).ok();
        }
        error
    }

    fn authorization(&self) -> Result<String> {
        self.credentials
            .authorization()
            .ok_or(Error::Unauthenticated)
    }

    /// Username owning the current credential
    ///
    /// The answer is cached per credential: once the provider hands out a different
    /// `Authorization` value the identity is looked up again.
    ///
    /// # Errors
    /// [`Error::Unauthenticated`] without a credential, [`Error::InvalidIdentity`] when
    /// the identity response carries no username.
    pub async fn fetch_username(&self) -> Result<String> {
        let authorization = self.authorization()?;
        if let Some(cached) = self.identity.read().await.as_ref()
            && cached.authorization == authorization
        {
            return Ok(cached.username.clone());
        }

        let url = identity_url(self.config.api_root());
        let response = self.transport.get(&url, &authorization).await?;
        if response.status == 401 {
            return Err(Error::Unauthenticated);
        }

        let identity: Option<Identity> = serde_json::from_slice(&response.body).ok();
        let Some(username) = identity.and_then(|i| i.username) else {
            tracing::warn!(status = response.status, "Identity response has no username");
            return Err(Error::InvalidIdentity {
                status: response.status,
                body: response.text(),
            });
        };

        tracing::debug!(username = %username, "Resolved catalog identity");
        *self.identity.write().await = Some(CachedIdentity {
            authorization,
            username: username.clone(),
        });
        Ok(username)
    }

    /// Forget the cached username
    pub async fn clear_cached_username(&self) {
        *self.identity.write().await = None;
    }

    /// Number of items in `username`'s "All" folder
    ///
    /// # Errors
    /// [`Error::Unauthenticated`] without a credential, [`Error::Fetch`] when the request
    /// or decoding fails.
    pub async fn fetch_item_count(&self, username: &str) -> Result<u64> {
        let authorization = self.authorization()?;
        let url = folder_url(self.config.api_root(), username);
        let response = self
            .transport
            .get(&url, &authorization)
            .await?
            .error_for_status()?;
        let folder: CollectionFolder =
            serde_json::from_slice(&response.body).map_err(FetchError::from)?;
        Ok(folder.count)
    }

    /// Username and collection size of the signed-in user
    ///
    /// # Errors
    /// Same as [`fetch_username`](Self::fetch_username) and
    /// [`fetch_item_count`](Self::fetch_item_count).
    pub async fn fetch_collection_metadata(&self) -> Result<(String, u64)> {
        let username = self.fetch_username().await?;
        let count = self.fetch_item_count(&username).await?;
        Ok((username, count))
    }

    /// Fetch `username`'s whole collection.
    ///
    /// `item_count` is the size reported by the server (see
    /// [`fetch_item_count`](Self::fetch_item_count)); `page_size` is clamped to
    /// `1..=100` and `requested_concurrency` to `1..=min(6, pages)`. Pages that fail
    /// twice are listed in [`CollectionResult::failed_pages`] rather than failing the call.
    ///
    /// # Errors
    /// [`Error::Unauthenticated`] when no credential is available (checked before any
    /// page is requested) or the server rejects it.
    /// [`Error::CollectionTooLarge`] when `item_count` needs more pages than can be
    /// addressed.
    pub async fn fetch_collection(
        &self,
        username: &str,
        item_count: u64,
        page_size: u32,
        requested_concurrency: usize,
    ) -> Result<CollectionResult<D::Record>> {
        self.fetch_collection_with_cancel(
            username,
            item_count,
            page_size,
            requested_concurrency,
            CancellationToken::new(),
        )
        .await
    }

    /// [`fetch_collection`](Self::fetch_collection) with the configured page size and
    /// concurrency
    ///
    /// # Errors
    /// Same as [`fetch_collection`](Self::fetch_collection).
    pub async fn fetch_collection_with_defaults(
        &self,
        username: &str,
        item_count: u64,
    ) -> Result<CollectionResult<D::Record>> {
        self.fetch_collection(
            username,
            item_count,
            self.config.fetch.page_size,
            self.config.fetch.max_concurrency,
        )
        .await
    }

    /// [`fetch_collection`](Self::fetch_collection) that stops when `cancel_token` fires
    ///
    /// # Errors
    /// Additionally returns [`Error::Cancelled`] on cancellation; no partial result is
    /// returned in that case.
    pub async fn fetch_collection_with_cancel(
        &self,
        username: &str,
        item_count: u64,
        page_size: u32,
        requested_concurrency: usize,
        cancel_token: CancellationToken,
    ) -> Result<CollectionResult<D::Record>> {
        if !self.credentials.is_authenticated() {
            tracing::error!(username = username, "Cannot fetch collection without credentials");
            return Err(self.reject(Error::Unauthenticated));
        }

        let plan = match FetchPlan::new(item_count, page_size, requested_concurrency) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::error!(username = username, error = %e, "Cannot plan collection fetch");
                return Err(self.reject(e));
            }
        };

        tracing::info!(
            username = username,
            item_count = item_count,
            total_pages = plan.total_pages,
            concurrency = plan.effective_concurrency,
            "Starting collection fetch"
        );

        let fetcher = PageFetcher::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.decoder),
            Arc::clone(&self.credentials),
            self.config.api_root(),
            username,
        );
        let ctx = FetchContext::new(&fetcher, plan)
            .with_events(self.event_tx.clone())
            .with_cancellation(cancel_token);

        fetch_all_pages(&ctx, &self.config.retry, username).await
    }
}
