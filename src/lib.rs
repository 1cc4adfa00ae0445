//! # discogs-dl
//!
//! Async client that downloads a user's entire record collection from the Discogs
//! catalog API.
//!
//! ## How a fetch works
//!
//! The collection is paginated. Given the item count and a page size, the client plans
//! the page range, fetches pages through a bounded sliding window (at most six requests
//! in flight), retries each failed page exactly once after the first pass, and then
//! stitches the pages back together in page order. Pages that fail twice are reported in
//! [`CollectionResult::failed_pages`] instead of failing the whole fetch; only a missing
//! or rejected credential is fatal.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use discogs_dl::{CollectionClient, Config, PersonalToken};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = CollectionClient::new(
//!         Config::default(),
//!         Arc::new(PersonalToken::new("my-personal-access-token")),
//!     )?;
//!
//!     // Subscribe to progress events
//!     let mut events = client.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let (username, count) = client.fetch_collection_metadata().await?;
//!     let collection = client.fetch_collection(&username, count, 100, 6).await?;
//!
//!     println!("{} releases", collection.len());
//!     if !collection.is_complete() {
//!         println!("missing pages: {:?}", collection.missing_pages());
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Merge per-page results into the final ordered list
pub mod assembler;
/// Client entry point and fetch state machine
pub mod collection;
/// Configuration types
pub mod config;
/// Authorization credentials
pub mod credentials;
/// Page body decoding
pub mod decoder;
/// Error types
pub mod error;
/// Single-page fetching and endpoint URLs
pub mod fetcher;
/// Page range and concurrency planning
pub mod plan;
/// Per-page accumulator
pub mod result_set;
/// Single retry sweep over failed pages
pub mod retry;
/// Bounded-concurrency page fan-out
pub mod scheduler;
/// HTTP transport abstraction
pub mod transport;
/// Core types and events
pub mod types;

#[cfg(test)]
mod test_helpers;

// Re-export commonly used types
pub use collection::{CollectionClient, fetch_all_pages};
pub use config::{Config, FetchConfig, RetryConfig};
pub use credentials::{CredentialProvider, NoCredentials, PersonalToken, SharedCredentials};
pub use decoder::{JsonReleaseDecoder, ReleaseDecoder};
pub use error::{Error, FetchError, Result};
pub use fetcher::{PageFetcher, PageSource};
pub use plan::FetchPlan;
pub use scheduler::FetchContext;
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};
pub use types::{
    Artist, CollectionFolder, CollectionResult, Event, FetchPhase, Format, PageIndex, Release,
};
