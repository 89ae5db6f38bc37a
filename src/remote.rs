use crate::error::FetchError;
use crate::record::{RawListing, Reply};

/// One page of a search listing.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub candidates: Vec<RawListing>,
    /// Cursor for the following page; `None` once the listing is exhausted.
    pub next_cursor: Option<String>,
}

/// What the collector needs from a forum backend. Calls are made one at a
/// time; pacing and retries are the caller's job.
pub trait RemoteSource {
    fn search(&mut self, group: &str, keyword: &str, after: Option<&str>) -> Result<SearchPage, FetchError>;

    /// The discussion thread of `record_id`, flattened in thread order.
    fn fetch_replies(&mut self, record_id: &str) -> Result<Vec<Reply>, FetchError>;
}
