//! Core types for discogs-dl

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 1-based index of one page of collection results
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageIndex(pub u32);

impl PageIndex {
    /// The first page
    pub const FIRST: PageIndex = PageIndex(1);

    /// Create a new PageIndex
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// Get the inner u32 value
    pub fn get(&self) -> u32 {
        self.0
    }

    /// The page after this one
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Iterate pages `1..=total_pages` in order
    pub fn range(total_pages: u32) -> impl Iterator<Item = PageIndex> {
        (1..=total_pages).map(PageIndex)
    }
}

impl From<u32> for PageIndex {
    fn from(index: u32) -> Self {
        Self(index)
    }
}

impl From<PageIndex> for u32 {
    fn from(index: PageIndex) -> Self {
        index.0
    }
}

impl PartialEq<u32> for PageIndex {
    fn eq(&self, other: &u32) -> bool {
        self.0 == *other
    }
}

impl std::fmt::Display for PageIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One release in the user's collection
///
/// Fields the catalog service has been seen to omit (or send as `0`/`""`) are optional.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Release {
    /// Catalog release ID
    pub id: u64,
    /// ID of this copy in the user's collection
    pub instance_id: Option<u64>,
    /// User rating, 0 (unrated) to 5
    pub rating: u8,
    /// When the user added the release to the collection
    pub date_added: Option<DateTime<FixedOffset>>,
    /// API link to the full release
    pub resource_url: Option<String>,
    /// Master release ID, `None` when the release has no master
    pub master_id: Option<u64>,
    /// Thumbnail image URL
    pub thumb: Option<String>,
    /// Cover image URL
    pub cover_image: Option<String>,
    /// Release title
    pub title: String,
    /// Release year, `None` when unknown
    pub year: Option<u32>,
    /// Physical formats (vinyl, CD, ...)
    pub formats: Vec<Format>,
    /// Credited artists, in credit order
    pub artists: Vec<Artist>,
    /// Genres
    pub genres: Vec<String>,
    /// Styles (sub-genres)
    pub styles: Vec<String>,
}

impl Release {
    /// Display name of the credited artists, joined with ", "
    pub fn artist_names(&self) -> String {
        self.artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Artist credited on a release
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    /// Artist ID; absent for releases removed from the catalog
    pub id: Option<u64>,
    /// Artist name
    pub name: String,
    /// Artist name variation used on this release
    pub anv: Option<String>,
    /// Role on the release (often the instrument)
    pub role: Option<String>,
    /// API link to the artist; absent for releases removed from the catalog
    pub resource_url: Option<String>,
}

/// Physical format of a release
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Format {
    /// Format name, e.g. "Vinyl"
    pub name: String,
    /// Number of items of this format, as reported ("1", "2", ...)
    pub quantity: String,
    /// Descriptions such as `7"`, "45 RPM", "LP"
    pub descriptions: Vec<String>,
    /// Free text, e.g. "Red Vinyl"
    pub text: Option<String>,
}

/// Collection folder metadata (folder 0 is "All")
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionFolder {
    /// Folder ID
    pub id: u64,
    /// Number of items in the folder
    pub count: u64,
    /// Folder name
    pub name: String,
    /// API link to the folder
    #[serde(default)]
    pub resource_url: Option<String>,
}

/// Lifecycle of one collection fetch
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchPhase {
    /// Page plan computed, nothing requested yet
    Planned,
    /// Initial pass over every page
    FanningOut,
    /// Single sweep over pages that failed the initial pass
    Retrying,
    /// Releases merged in page order
    Assembled,
    /// Aborted on a fatal error
    Failed,
}

/// Progress events emitted while a collection is fetched
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The fetch moved to a new phase
    PhaseChanged {
        /// The phase just entered
        phase: FetchPhase,
    },

    /// A page was fetched and decoded
    PageFetched {
        /// The page
        page: PageIndex,
        /// Number of releases on the page
        items: usize,
    },

    /// A page request failed
    PageFailed {
        /// The page
        page: PageIndex,
        /// 1 for the initial pass, 2 for the retry sweep
        attempt: u8,
        /// Error description
        error: String,
    },

    /// The fetch finished
    Completed {
        /// Number of releases assembled
        releases: usize,
        /// Pages still missing after the retry sweep
        failed_pages: Vec<PageIndex>,
    },
}

/// Final output of a collection fetch
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollectionResult<R = Release> {
    /// Owner of the collection
    pub username: String,
    /// Releases in page order, then server order within each page
    pub releases: Vec<R>,
    /// Pages that failed both attempts; their releases are absent from `releases`
    pub failed_pages: BTreeSet<PageIndex>,
    /// Number of pages the collection was split into
    pub total_pages: u32,
    /// Page size actually requested
    pub page_size: u32,
}

impl<R> CollectionResult<R> {
    /// Whether every page was fetched
    pub fn is_complete(&self) -> bool {
        self.failed_pages.is_empty()
    }

    /// Pages still missing, in ascending order
    pub fn missing_pages(&self) -> Vec<PageIndex> {
        self.failed_pages.iter().copied().collect()
    }

    /// Number of releases fetched
    pub fn len(&self) -> usize {
        self.releases.len()
    }

    /// Whether no releases were fetched
    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }
}
