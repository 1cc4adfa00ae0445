//! Single-page fetching — endpoint construction, credential check, request, decode.

use std::sync::Arc;

use async_trait::async_trait;

use crate::credentials::CredentialProvider;
use crate::decoder::ReleaseDecoder;
use crate::error::FetchError;
use crate::transport::HttpTransport;
use crate::types::PageIndex;

/// Folder 0 is the catalog's "All" folder
pub const ALL_FOLDER_ID: u32 = 0;

/// Anything that can produce the records on one page of a collection
///
/// The scheduler and retry sweep only talk to this trait, so tests can drive them
/// without HTTP.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Record type on each page
    type Record: Send;

    /// Fetch one page. Records come back in server order.
    async fn fetch_page(
        &self,
        page: PageIndex,
        page_size: u32,
    ) -> Result<Vec<Self::Record>, FetchError>;
}

/// URL of one collection page, sorted by artist ascending
pub fn page_url(api_root: &str, username: &str, page_size: u32, page: PageIndex) -> String {
    format!(
        "{}/users/{}/collection/folders/{}/releases?sort=artist&sort_order=asc&per_page={}&page={}",
        api_root.trim_end_matches('/'),
        urlencoding::encode(username),
        ALL_FOLDER_ID,
        page_size,
        page
    )
}

/// URL of the "All" folder metadata (carries the item count)
pub fn folder_url(api_root: &str, username: &str) -> String {
    format!(
        "{}/users/{}/collection/folders/{}",
        api_root.trim_end_matches('/'),
        urlencoding::encode(username),
        ALL_FOLDER_ID
    )
}

/// URL of the identity endpoint for the current credential
pub fn identity_url(api_root: &str) -> String {
    format!("{}/oauth/identity", api_root.trim_end_matches('/'))
}

/// [`PageSource`] that GETs collection pages for one user over an [`HttpTransport`]
pub struct PageFetcher<D> {
    transport: Arc<dyn HttpTransport>,
    decoder: Arc<D>,
    credentials: Arc<dyn CredentialProvider>,
    api_root: String,
    username: String,
}

impl<D: ReleaseDecoder> PageFetcher<D> {
    /// Create a fetcher for `username`'s collection
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        decoder: Arc<D>,
        credentials: Arc<dyn CredentialProvider>,
        api_root: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            decoder,
            credentials,
            api_root: api_root.into(),
            username: username.into(),
        }
    }

    /// The user whose collection is fetched
    pub fn username(&self) -> &str {
        &self.username
    }
}

#[async_trait]
impl<D: ReleaseDecoder> PageSource for PageFetcher<D> {
    type Record = D::Record;

    async fn fetch_page(
        &self,
        page: PageIndex,
        page_size: u32,
    ) -> Result<Vec<Self::Record>, FetchError> {
        let authorization = self
            .credentials
            .authorization()
            .ok_or(FetchError::Unauthenticated)?;

        let url = page_url(&self.api_root, &self.username, page_size, page);
        tracing::trace!(page = page.get(), url = %url, "Requesting collection page");

        let response = self
            .transport
            .get(&url, &authorization)
            .await?
            .error_for_status()?;

        self.decoder.decode(&response.body)
    }
}
