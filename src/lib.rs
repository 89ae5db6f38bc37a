mod config;
mod date;
mod error;
mod record;

mod csv;
mod filters;
mod progress;
mod store;
mod summarize;
mod util;

mod pacing;
mod pipeline;
mod reddit;
mod remote;
mod retry;

pub use crate::config::{CollectOptions, ConfigFile, Credentials};
pub use crate::date::{human_date, parse_day_start};
pub use crate::error::{CollectError, FetchError, MalformedCandidate};
pub use crate::record::{Candidate, OutputRow, RawListing, Reply, SummarizedReply, COLUMNS};
pub use crate::pipeline::{Collector, RunSummary};

// Relevance predicate and reply selection, usable on their own.
pub use crate::filters::{matches_keywords, normalize_keywords, RelevanceFilter};
pub use crate::summarize::{summarize, DEFAULT_MAX_REPLIES};

// Output table.
pub use crate::csv::{format_row, CsvReader};
pub use crate::store::{CsvAppender, RecordStore, RowSink};

// Remote source seam and the Reddit implementation.
pub use crate::remote::{RemoteSource, SearchPage};
pub use crate::reddit::{parse_comment_thread, parse_search_listing, RedditClient};

// Pacing and retry policies (swap in `ManualClock` for deterministic tests).
pub use crate::pacing::{Clock, IntervalPacer, ManualClock, Pacer, SystemClock};
pub use crate::retry::RetryPolicy;

pub use crate::util::init_tracing_once;
