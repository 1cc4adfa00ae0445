//! Shared test doubles: a scripted page source and a scripted HTTP transport.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::fetcher::PageSource;
use crate::transport::{HttpResponse, HttpTransport};
use crate::types::PageIndex;

/// In-memory collection of `item_count` numbered items (1-based), paged on demand.
///
/// Tracks how many fetches are in flight, the peak of that number, and the order in
/// which pages were started and finished.
pub(crate) struct ScriptedSource {
    item_count: u32,
    delays: Mutex<HashMap<u32, Duration>>,
    default_delay: Duration,
    failures: Mutex<HashMap<u32, (usize, FetchError)>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    started: Mutex<Vec<PageIndex>>,
    finished: Mutex<Vec<PageIndex>>,
}

impl ScriptedSource {
    pub(crate) fn new(item_count: u32) -> Self {
        Self {
            item_count,
            delays: Mutex::new(HashMap::new()),
            default_delay: Duration::from_millis(5),
            failures: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            started: Mutex::new(Vec::new()),
            finished: Mutex::new(Vec::new()),
        }
    }

    /// Make `page` take `delay` to answer
    pub(crate) fn delay(&self, page: u32, delay: Duration) -> &Self {
        self.delays.lock().unwrap().insert(page, delay);
        self
    }

    /// Make the next `times` requests for `page` fail with `error`
    pub(crate) fn fail_times(&self, page: u32, times: usize, error: FetchError) -> &Self {
        self.failures.lock().unwrap().insert(page, (times, error));
        self
    }

    /// Make every request for `page` fail with `error`
    pub(crate) fn fail_always(&self, page: u32, error: FetchError) -> &Self {
        self.fail_times(page, usize::MAX, error)
    }

    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn started(&self) -> Vec<PageIndex> {
        self.started.lock().unwrap().clone()
    }

    pub(crate) fn finished(&self) -> Vec<PageIndex> {
        self.finished.lock().unwrap().clone()
    }

    pub(crate) fn attempts(&self, page: u32) -> usize {
        self.started
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.get() == page)
            .count()
    }

    /// Items the page should contain, in order
    pub(crate) fn items_for(&self, page: PageIndex, page_size: u32) -> Vec<u32> {
        let first = (page.get() - 1) * page_size + 1;
        let last = (page.get() * page_size).min(self.item_count);
        (first..=last).collect()
    }

    fn take_failure(&self, page: u32) -> Option<FetchError> {
        let mut failures = self.failures.lock().unwrap();
        let (remaining, error) = failures.get_mut(&page)?;
        if *remaining == 0 {
            return None;
        }
        if *remaining != usize::MAX {
            *remaining -= 1;
        }
        Some(error.clone())
    }
}

#[async_trait]
impl PageSource for ScriptedSource {
    type Record = u32;

    async fn fetch_page(&self, page: PageIndex, page_size: u32) -> Result<Vec<u32>, FetchError> {
        self.started.lock().unwrap().push(page);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self
            .delays
            .lock()
            .unwrap()
            .get(&page.get())
            .copied()
            .unwrap_or(self.default_delay);
        tokio::time::sleep(delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.finished.lock().unwrap().push(page);

        match self.take_failure(page.get()) {
            Some(error) => Err(error),
            None => Ok(self.items_for(page, page_size)),
        }
    }
}

/// Request seen by [`ScriptedTransport`]
#[derive(Clone, Debug)]
pub(crate) struct RecordedCall {
    pub(crate) url: String,
    pub(crate) authorization: String,
}

/// [`HttpTransport`] answering page requests from per-page scripts.
///
/// Each page holds a queue of outcomes; the last one repeats once the queue is down to it.
pub(crate) struct ScriptedTransport {
    scripts: Mutex<HashMap<u32, VecDeque<Result<HttpResponse, FetchError>>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn respond(&self, page: u32, status: u16, body: String) -> &Self {
        self.push(
            page,
            Ok(HttpResponse {
                status,
                body: body.into_bytes(),
            }),
        )
    }

    pub(crate) fn fail(&self, page: u32, error: FetchError) -> &Self {
        self.push(page, Err(error))
    }

    fn push(&self, page: u32, outcome: Result<HttpResponse, FetchError>) -> &Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(page)
            .or_default()
            .push_back(outcome);
        self
    }

    pub(crate) fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

fn page_param(url: &str) -> Option<u32> {
    url.rsplit_once("&page=")
        .and_then(|(_, page)| page.parse().ok())
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get(&self, url: &str, authorization: &str) -> Result<HttpResponse, FetchError> {
        self.calls.lock().unwrap().push(RecordedCall {
            url: url.to_string(),
            authorization: authorization.to_string(),
        });

        let page = page_param(url).unwrap_or(0);
        let mut scripts = self.scripts.lock().unwrap();
        let Some(queue) = scripts.get_mut(&page) else {
            return Ok(HttpResponse {
                status: 404,
                body: Vec::new(),
            });
        };
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue.front().cloned().unwrap()
        }
    }
}

/// Minimal collection page body holding releases with the given IDs, in order
pub(crate) fn page_body(ids: &[u64]) -> String {
    let releases: Vec<serde_json::Value> = ids
        .iter()
        .map(|id| {
            serde_json::json!({
                "id": id,
                "instance_id": id * 10,
                "rating": 0,
                "basic_information": {
                    "id": id,
                    "master_id": 0,
                    "resource_url": format!("https://api.discogs.com/releases/{id}"),
                    "thumb": "",
                    "cover_image": "",
                    "title": format!("Release {id}"),
                    "year": 1999,
                    "formats": [{"name": "Vinyl", "qty": "1", "descriptions": ["LP"]}],
                    "artists": [{"name": format!("Artist {id}"), "anv": "", "role": "", "id": id}],
                    "genres": ["Electronic"],
                    "styles": []
                }
            })
        })
        .collect();
    serde_json::json!({ "pagination": {}, "releases": releases }).to_string()
}
