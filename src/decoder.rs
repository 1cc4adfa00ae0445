//! Decoding of collection page bodies
//!
//! The catalog wraps most release fields in a `basic_information` object and uses `0`
//! or `""` where it has no value. [`JsonReleaseDecoder`] flattens that shape into
//! [`Release`] and turns the placeholders into `None`.

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

use crate::error::FetchError;
use crate::types::{Artist, Format, Release};

/// Turns one page body into an ordered list of records
pub trait ReleaseDecoder: Send + Sync {
    /// Record type produced for each release on a page
    type Record: Send;

    /// Decode a page body, preserving the order releases appear in
    fn decode(&self, body: &[u8]) -> Result<Vec<Self::Record>, FetchError>;
}

/// Decoder for the catalog's JSON collection page (`{"pagination": ..., "releases": [...]}`)
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonReleaseDecoder;

impl ReleaseDecoder for JsonReleaseDecoder {
    type Record = Release;

    fn decode(&self, body: &[u8]) -> Result<Vec<Release>, FetchError> {
        let page: WirePage = serde_json::from_slice(body)?;
        Ok(page.releases.into_iter().map(Release::from).collect())
    }
}

#[derive(Deserialize)]
struct WirePage {
    releases: Vec<WireRelease>,
}

#[derive(Deserialize)]
struct WireRelease {
    id: u64,
    #[serde(default)]
    instance_id: Option<u64>,
    #[serde(default)]
    rating: u8,
    #[serde(default)]
    date_added: Option<DateTime<FixedOffset>>,
    basic_information: WireBasicInformation,
}

#[derive(Deserialize)]
struct WireBasicInformation {
    #[serde(default)]
    resource_url: Option<String>,
    #[serde(default)]
    master_id: Option<u64>,
    #[serde(default)]
    thumb: Option<String>,
    #[serde(default)]
    cover_image: Option<String>,
    title: String,
    #[serde(default)]
    year: Option<u32>,
    #[serde(default)]
    formats: Vec<WireFormat>,
    #[serde(default)]
    artists: Vec<WireArtist>,
    #[serde(default)]
    genres: Vec<String>,
    #[serde(default)]
    styles: Vec<String>,
}

#[derive(Deserialize)]
struct WireFormat {
    name: String,
    #[serde(default)]
    qty: String,
    #[serde(default)]
    descriptions: Vec<String>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct WireArtist {
    // null or missing for releases the community voted to remove
    #[serde(default)]
    id: Option<u64>,
    name: String,
    #[serde(default)]
    anv: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    resource_url: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn non_zero<T: PartialEq + Default>(value: Option<T>) -> Option<T> {
    value.filter(|v| *v != T::default())
}

impl From<WireRelease> for Release {
    fn from(wire: WireRelease) -> Self {
        let info = wire.basic_information;
        Release {
            id: wire.id,
            instance_id: wire.instance_id,
            rating: wire.rating,
            date_added: wire.date_added,
            resource_url: non_blank(info.resource_url),
            master_id: non_zero(info.master_id),
            thumb: non_blank(info.thumb),
            cover_image: non_blank(info.cover_image),
            title: info.title,
            year: non_zero(info.year),
            formats: info.formats.into_iter().map(Format::from).collect(),
            artists: info.artists.into_iter().map(Artist::from).collect(),
            genres: info.genres,
            styles: info.styles,
        }
    }
}

impl From<WireFormat> for Format {
    fn from(wire: WireFormat) -> Self {
        Format {
            name: wire.name,
            quantity: wire.qty,
            descriptions: wire.descriptions,
            text: non_blank(wire.text),
        }
    }
}

impl From<WireArtist> for Artist {
    fn from(wire: WireArtist) -> Self {
        Artist {
            id: wire.id,
            name: wire.name,
            anv: non_blank(wire.anv),
            role: non_blank(wire.role),
            resource_url: non_blank(wire.resource_url),
        }
    }
}
