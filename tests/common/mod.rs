//! Common test utilities for discogs-dl integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use discogs_dl::{
    CollectionClient, Config, CredentialProvider, FetchError, HttpResponse, HttpTransport,
    JsonReleaseDecoder, ReqwestTransport,
};
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const USERNAME: &str = "digger";
pub const TOKEN: &str = "test-token";

pub fn releases_path(username: &str) -> String {
    format!("/users/{username}/collection/folders/0/releases")
}

/// One release as the catalog serves it inside a collection page
pub fn release_json(id: u64) -> Value {
    json!({
        "id": id,
        "instance_id": 1000 + id,
        "date_added": "2024-03-01T12:00:00-08:00",
        "rating": 0,
        "basic_information": {
            "id": id,
            "master_id": 0,
            "master_url": null,
            "resource_url": format!("https://api.discogs.com/releases/{id}"),
            "thumb": "",
            "cover_image": "",
            "title": format!("Release {id}"),
            "year": 2000 + id,
            "formats": [{"name": "Vinyl", "qty": "1", "descriptions": ["LP", "Album"]}],
            "labels": [],
            "artists": [{
                "name": format!("Artist {id}"),
                "anv": "",
                "join": "",
                "role": "",
                "tracks": "",
                "id": id,
                "resource_url": format!("https://api.discogs.com/artists/{id}")
            }],
            "genres": ["Electronic"],
            "styles": ["House"]
        }
    })
}

/// A collection page holding releases `ids`, in the given order
pub fn page_json(page: u32, pages: u32, per_page: u32, ids: &[u64]) -> Value {
    let releases: Vec<Value> = ids.iter().copied().map(release_json).collect();
    json!({
        "pagination": {
            "page": page,
            "pages": pages,
            "per_page": per_page,
            "items": ids.len(),
            "urls": {}
        },
        "releases": releases
    })
}

/// IDs on `page` of a collection numbered `1..=item_count`
pub fn ids_for(page: u32, page_size: u32, item_count: u64) -> Vec<u64> {
    let first = u64::from((page - 1) * page_size) + 1;
    let last = (u64::from(page * page_size)).min(item_count);
    (first..=last).collect()
}

/// Serve page `page` of the numbered collection, optionally after `delay`
pub async fn mount_page(
    server: &MockServer,
    page: u32,
    page_size: u32,
    item_count: u64,
    delay: Option<Duration>,
) {
    let pages = item_count.div_ceil(u64::from(page_size)) as u32;
    let body = page_json(page, pages, page_size, &ids_for(page, page_size, item_count));
    let mut response = ResponseTemplate::new(200).set_body_json(body);
    if let Some(delay) = delay {
        response = response.set_delay(delay);
    }
    Mock::given(method("GET"))
        .and(path(releases_path(USERNAME)))
        .and(query_param("page", page.to_string()))
        .and(query_param("per_page", page_size.to_string()))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Serve every page of the numbered collection
pub async fn mount_collection(server: &MockServer, page_size: u32, item_count: u64) {
    let pages = item_count.div_ceil(u64::from(page_size)) as u32;
    for page in 1..=pages {
        mount_page(server, page, page_size, item_count, None).await;
    }
}

pub fn config_for(server: &MockServer) -> Config {
    Config {
        base_url: server.uri(),
        ..Default::default()
    }
}

pub fn client_for(
    server: &MockServer,
    credentials: Arc<dyn CredentialProvider>,
) -> CollectionClient {
    CollectionClient::new(config_for(server), credentials).expect("valid test config")
}

/// Transport that forwards to reqwest while counting concurrent and total requests
pub struct CountingTransport {
    inner: ReqwestTransport,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    total: AtomicUsize,
}

impl CountingTransport {
    pub fn new(config: &Config) -> Self {
        Self {
            inner: ReqwestTransport::new(config).expect("http client"),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpTransport for CountingTransport {
    async fn get(&self, url: &str, authorization: &str) -> Result<HttpResponse, FetchError> {
        self.total.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let response = self.inner.get(url, authorization).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        response
    }
}

pub fn counting_client(
    server: &MockServer,
    credentials: Arc<dyn CredentialProvider>,
) -> (CollectionClient, Arc<CountingTransport>) {
    let config = config_for(server);
    let transport = Arc::new(CountingTransport::new(&config));
    let client =
        CollectionClient::with_parts(config, transport.clone(), JsonReleaseDecoder, credentials)
            .expect("valid test config");
    (client, transport)
}
