use crate::config::CollectOptions;
use crate::date::day_of;
use crate::error::{CollectError, FetchError};
use crate::filters::RelevanceFilter;
use crate::pacing::{Clock, IntervalPacer, Pacer, SystemClock};
use crate::progress::ProgressScope;
use crate::record::{truncate_chars, Candidate, OutputRow, RawListing};
use crate::remote::RemoteSource;
use crate::retry::RetryPolicy;
use crate::store::{RecordStore, RowSink};
use crate::summarize::summarize;
use ahash::AHashSet;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Counters reported at the end of a run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub rows_written: u64,
    pub rows_skipped_duplicate: u64,
    pub rows_skipped_irrelevant: u64,
    pub rows_skipped_malformed: u64,
    pub pages_fetched: u64,
    pub pages_abandoned: u64,
    pub reply_fetch_failures: u64,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rows written: {}, skipped (duplicate: {}, irrelevant: {}, malformed: {}), \
             pages fetched: {}, pages abandoned: {}, reply fetch failures: {}",
            self.rows_written,
            self.rows_skipped_duplicate,
            self.rows_skipped_irrelevant,
            self.rows_skipped_malformed,
            self.pages_fetched,
            self.pages_abandoned,
            self.reply_fetch_failures,
        )
    }
}

/// The collection driver: groups × keywords → paginated search → filter,
/// dedup, summarize → append.
#[derive(Clone, Debug)]
pub struct Collector {
    pub(crate) opts: CollectOptions,
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector {
    pub fn new() -> Self {
        Self { opts: CollectOptions::default() }
    }
    pub fn from_options(opts: CollectOptions) -> Self {
        Self { opts }
    }
    pub fn options(&self) -> &CollectOptions {
        &self.opts
    }

    // -------- Builder methods --------
    pub fn source_groups<I, S>(mut self, groups: I) -> Self where I: IntoIterator<Item = S>, S: AsRef<str> { self.opts = self.opts.with_source_groups(groups); self }
    pub fn keywords<I, S>(mut self, kws: I) -> Self where I: IntoIterator<Item = S>, S: Into<String> { self.opts = self.opts.with_keywords(kws); self }
    pub fn date_range(mut self, start_ts: i64, end_ts: i64) -> Self { self.opts = self.opts.with_date_range(start_ts, end_ts); self }
    pub fn min_upvotes(mut self, n: i64) -> Self { self.opts = self.opts.with_min_upvotes(n); self }
    pub fn output_file(mut self, path: impl AsRef<Path>) -> Self { self.opts = self.opts.with_output_file(path); self }
    pub fn request_delay(mut self, d: Duration) -> Self { self.opts = self.opts.with_request_delay(d); self }
    pub fn retries(mut self, max_retries: u32, retry_delay: Duration) -> Self { self.opts = self.opts.with_retries(max_retries, retry_delay); self }
    pub fn page_size(mut self, n: usize) -> Self { self.opts = self.opts.with_page_size(n); self }
    pub fn max_results_per_query(mut self, cap: Option<usize>) -> Self { self.opts = self.opts.with_max_results_per_query(cap); self }
    pub fn progress(mut self, yes: bool) -> Self { self.opts = self.opts.with_progress(yes); self }

    pub fn relevance_filter(&self) -> RelevanceFilter {
        RelevanceFilter::new(self.opts.start_ts, self.opts.end_ts, self.opts.min_upvotes, &self.opts.keywords)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.opts.max_retries, self.opts.retry_delay)
    }

    /// Full run against the configured output file, paced in real time.
    ///
    /// The table is loaded (and its schema checked) before any request is made,
    /// then held open in append mode until the run ends.
    pub fn run<S: RemoteSource + ?Sized>(&self, source: &mut S) -> Result<RunSummary, CollectError> {
        let store = RecordStore::new(&self.opts.output_file);
        let known = store.load_known_identifiers()?;
        tracing::info!("{} records already in {}", known.len(), store.path().display());
        let mut sink = store.open_appender()?;
        let mut pacer = IntervalPacer::new(SystemClock, self.opts.request_delay);
        self.run_with(source, known, &mut sink, &mut pacer, &SystemClock)
    }

    /// Run with explicit collaborators: the known-identifier set, the row sink,
    /// the pacer consulted before each request and the clock used for retry backoff.
    pub fn run_with<S, K, P, C>(
        &self,
        source: &mut S,
        known: AHashSet<String>,
        sink: &mut K,
        pacer: &mut P,
        clock: &C,
    ) -> Result<RunSummary, CollectError>
    where
        S: RemoteSource + ?Sized,
        K: RowSink + ?Sized,
        P: Pacer + ?Sized,
        C: Clock + ?Sized,
    {
        let filter = self.relevance_filter();
        tracing::info!("Target subreddits: {}", self.opts.source_groups.join(", "));
        tracing::info!("Search keywords: {}", self.opts.keywords.join(", "));
        tracing::info!("Date range: {} to {}", day_of(self.opts.start_ts), day_of(self.opts.end_ts));
        tracing::info!("Minimum upvotes: {}", self.opts.min_upvotes);

        let mut ctx = RunContext {
            opts: &self.opts,
            source,
            sink,
            pacer,
            clock,
            retry: self.retry_policy(),
            filter,
            known,
            summary: RunSummary::default(),
            progress: ProgressScope::spinner("Collecting", self.opts.progress),
        };

        for group in &self.opts.source_groups {
            let before = ctx.summary.rows_written;
            tracing::info!("Searching r/{group}...");
            for keyword in &self.opts.keywords {
                ctx.collect_query(group, keyword)?;
            }
            tracing::info!("Found {} new matching posts in r/{group}", ctx.summary.rows_written - before);
        }

        ctx.progress.finish(format!("done ({} rows written)", ctx.summary.rows_written));
        tracing::info!("Run complete: {}", ctx.summary);
        Ok(ctx.summary)
    }
}

/// Everything one run owns, including the in-memory dedup set.
struct RunContext<'a, S: ?Sized, K: ?Sized, P: ?Sized, C: ?Sized> {
    opts: &'a CollectOptions,
    source: &'a mut S,
    sink: &'a mut K,
    pacer: &'a mut P,
    clock: &'a C,
    retry: RetryPolicy,
    filter: RelevanceFilter,
    known: AHashSet<String>,
    summary: RunSummary,
    progress: ProgressScope,
}

impl<S, K, P, C> RunContext<'_, S, K, P, C>
where
    S: RemoteSource + ?Sized,
    K: RowSink + ?Sized,
    P: Pacer + ?Sized,
    C: Clock + ?Sized,
{
    /// Paginate one (group, keyword) search until the listing ends, the result
    /// cap is reached, or a page is abandoned.
    fn collect_query(&mut self, group: &str, keyword: &str) -> Result<(), CollectError> {
        tracing::info!("  Searching for '{keyword}' in r/{group}...");
        let label = format!("search r/{group} '{keyword}'");
        let mut after: Option<String> = None;
        let mut cursors: AHashSet<String> = AHashSet::new();
        let mut seen = 0usize;

        loop {
            let source = &mut *self.source;
            let res = self.retry.execute(self.clock, &mut *self.pacer, &label, || {
                source.search(group, keyword, after.as_deref())
            });
            let page = match res {
                Ok(p) => p,
                Err(FetchError::Auth(m)) => return Err(CollectError::Auth(m)),
                Err(e) => {
                    tracing::warn!("Abandoning {label} after error: {e}");
                    self.summary.pages_abandoned += 1;
                    return Ok(());
                }
            };
            self.summary.pages_fetched += 1;
            self.progress.inc_pages(1);

            let n = page.candidates.len();
            for raw in page.candidates {
                self.consider(raw)?;
            }
            seen += n;

            let Some(next) = page.next_cursor else { break };
            if n == 0 {
                break;
            }
            if self.opts.max_results_per_query.is_some_and(|cap| seen >= cap) {
                tracing::debug!("{label}: reached result cap after {seen} candidates");
                break;
            }
            if !cursors.insert(next.clone()) {
                tracing::warn!("{label}: cursor {next} repeated, stopping pagination");
                break;
            }
            after = Some(next);
        }
        Ok(())
    }

    /// Malformed → duplicate → irrelevant → accepted, in that order.
    fn consider(&mut self, raw: RawListing) -> Result<(), CollectError> {
        let cand = match Candidate::try_from(raw) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("Skipping {e}");
                self.summary.rows_skipped_malformed += 1;
                return Ok(());
            }
        };
        if self.known.contains(&cand.id) {
            self.summary.rows_skipped_duplicate += 1;
            return Ok(());
        }
        if !self.filter.is_relevant(&cand) {
            self.summary.rows_skipped_irrelevant += 1;
            return Ok(());
        }

        let thread = if cand.num_comments > 0 {
            let source = &mut *self.source;
            let label = format!("comments {}", cand.id);
            let id = cand.id.as_str();
            match self.retry.execute(self.clock, &mut *self.pacer, &label, || source.fetch_replies(id)) {
                Ok(t) => t,
                Err(FetchError::Auth(m)) => return Err(CollectError::Auth(m)),
                Err(e) => {
                    tracing::warn!("Error extracting comments from post {}: {e}", cand.id);
                    self.summary.reply_fetch_failures += 1;
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let top = summarize(&thread, self.filter.keywords(), self.opts.max_replies, self.opts.reply_max_chars);
        let row = OutputRow::from_candidate(&cand, top, self.opts.content_max_chars);
        self.sink.append(&row)?;
        self.known.insert(cand.id);
        self.summary.rows_written += 1;

        tracing::info!("    Found matching post: {}...", truncate_chars(&row.title, 50));
        self.progress.set_message(format!("rows written: {}", self.summary.rows_written));
        Ok(())
    }
}
