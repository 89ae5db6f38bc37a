#![allow(dead_code)]

use rcollect::{Collector, FetchError, RawListing, RemoteSource, Reply, SearchPage};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::time::Duration;

pub const START: i64 = 1_731_024_000; // 2024-11-08
pub const END: i64 = 1_762_560_000; // 2025-11-08
pub const IN_RANGE: i64 = 1_735_689_600; // 2025-01-01

/// Scripted remote source. Pages for a (group, keyword) pair are served in
/// order with cursors "c1", "c2", ...; queued errors are returned before any
/// successful response for that pair / record.
#[derive(Default)]
pub struct FakeSource {
    pages: HashMap<(String, String), Vec<Vec<RawListing>>>,
    replies: HashMap<String, Vec<Reply>>,
    search_errors: HashMap<(String, String), VecDeque<FetchError>>,
    reply_errors: HashMap<String, VecDeque<FetchError>>,
    looping: HashMap<(String, String), Vec<RawListing>>,
    pub search_calls: Vec<(String, String, Option<String>)>,
    pub reply_calls: Vec<String>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pages(mut self, group: &str, keyword: &str, pages: Vec<Vec<RawListing>>) -> Self {
        self.pages.insert((group.to_string(), keyword.to_string()), pages);
        self
    }

    /// Serve `page` forever, always advertising the same cursor.
    pub fn with_looping_cursor(mut self, group: &str, keyword: &str, page: Vec<RawListing>) -> Self {
        self.looping.insert((group.to_string(), keyword.to_string()), page);
        self
    }

    pub fn with_replies(mut self, id: &str, replies: Vec<Reply>) -> Self {
        self.replies.insert(id.to_string(), replies);
        self
    }

    pub fn fail_search(mut self, group: &str, keyword: &str, errors: Vec<FetchError>) -> Self {
        self.search_errors.insert((group.to_string(), keyword.to_string()), errors.into());
        self
    }

    pub fn fail_replies(mut self, id: &str, errors: Vec<FetchError>) -> Self {
        self.reply_errors.insert(id.to_string(), errors.into());
        self
    }
}

impl RemoteSource for FakeSource {
    fn search(&mut self, group: &str, keyword: &str, after: Option<&str>) -> Result<SearchPage, FetchError> {
        self.search_calls.push((group.to_string(), keyword.to_string(), after.map(str::to_string)));
        let key = (group.to_string(), keyword.to_string());
        if let Some(err) = self.search_errors.get_mut(&key).and_then(VecDeque::pop_front) {
            return Err(err);
        }
        if let Some(page) = self.looping.get(&key) {
            return Ok(SearchPage { candidates: page.clone(), next_cursor: Some("same".to_string()) });
        }
        let pages = self.pages.get(&key).cloned().unwrap_or_default();
        let idx = after
            .and_then(|c| c.strip_prefix('c'))
            .and_then(|n| n.parse::<usize>().ok())
            .unwrap_or(0);
        let candidates = pages.get(idx).cloned().unwrap_or_default();
        let next_cursor = (idx + 1 < pages.len()).then(|| format!("c{}", idx + 1));
        Ok(SearchPage { candidates, next_cursor })
    }

    fn fetch_replies(&mut self, record_id: &str) -> Result<Vec<Reply>, FetchError> {
        self.reply_calls.push(record_id.to_string());
        if let Some(err) = self.reply_errors.get_mut(record_id).and_then(VecDeque::pop_front) {
            return Err(err);
        }
        Ok(self.replies.get(record_id).cloned().unwrap_or_default())
    }
}

/// A well-formed search hit in r/GlobalOffensive.
pub fn post(id: &str, title: &str, score: i64, created_utc: i64) -> RawListing {
    RawListing {
        id: Some(id.to_string()),
        title: Some(title.to_string()),
        selftext: Some(String::new()),
        author: Some("player_one".to_string()),
        score: Some(score),
        created_utc: Some(created_utc),
        subreddit: Some("GlobalOffensive".to_string()),
        permalink: Some(format!("/r/GlobalOffensive/comments/{id}/post/")),
        link_flair_text: None,
        num_comments: Some(0),
    }
}

pub fn reply(author: &str, body: &str, score: i64) -> Reply {
    Reply { author: Some(author.to_string()), body: body.to_string(), score, created_utc: IN_RANGE + 60 }
}

/// The collector configuration used across scenarios.
pub fn collector(out: &Path) -> Collector {
    Collector::new()
        .source_groups(["GlobalOffensive"])
        .keywords(["case opening"])
        .date_range(START, END)
        .min_upvotes(5)
        .output_file(out)
        .request_delay(Duration::from_secs(1))
        .retries(3, Duration::from_secs(5))
        .progress(false)
}
