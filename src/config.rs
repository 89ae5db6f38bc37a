use crate::date::parse_day_start;
use crate::summarize::DEFAULT_MAX_REPLIES;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Ceilings on stored text. Configs may tighten these, never loosen them.
pub const CONTENT_MAX_CHARS: usize = 2000;
pub const REPLY_MAX_CHARS: usize = 500;

/// User-facing options with the research defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct CollectOptions {
    pub source_groups: Vec<String>, // subreddit names, no "r/"
    pub keywords: Vec<String>,
    pub start_ts: i64,              // inclusive, midnight UTC
    pub end_ts: i64,                // inclusive, midnight UTC
    pub min_upvotes: i64,
    pub output_file: PathBuf,

    // remote pacing / retry
    pub request_delay: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub page_size: usize,
    pub max_results_per_query: Option<usize>,

    // row shaping
    pub content_max_chars: usize,
    pub reply_max_chars: usize,
    pub max_replies: usize,

    pub progress: bool,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            source_groups: ["GlobalOffensive", "csgo", "CS2", "gaming", "Steam"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            keywords: [
                "case opening",
                "gambling",
                "loot box",
                "lootbox",
                "addiction",
                "skin gambling",
                "case unboxing",
                "csgo case",
                "cs2 case",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            start_ts: 1_731_024_000, // 2024-11-08
            end_ts: 1_762_560_000,   // 2025-11-08
            min_upvotes: 5,
            output_file: PathBuf::from("reddit_cs_gambling_data.csv"),

            request_delay: Duration::from_secs(1),
            max_retries: 3,
            retry_delay: Duration::from_secs(5),
            page_size: 100,
            max_results_per_query: Some(1000),

            content_max_chars: CONTENT_MAX_CHARS,
            reply_max_chars: REPLY_MAX_CHARS,
            max_replies: DEFAULT_MAX_REPLIES,

            progress: true,
        }
    }
}

impl CollectOptions {
    pub fn with_source_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.source_groups = groups.into_iter().map(|g| normalize_group(g.as_ref())).filter(|g| !g.is_empty()).collect();
        self
    }
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }
    pub fn with_date_range(mut self, start_ts: i64, end_ts: i64) -> Self {
        self.start_ts = start_ts;
        self.end_ts = end_ts;
        self
    }
    /// Same as `with_date_range`, from `YYYY-MM-DD` strings.
    pub fn with_dates(self, start: &str, end: &str) -> Result<Self> {
        let s = parse_day_start(start).map_err(|e| anyhow!("start_date: {e}"))?;
        let e = parse_day_start(end).map_err(|e| anyhow!("end_date: {e}"))?;
        Ok(self.with_date_range(s, e))
    }
    pub fn with_min_upvotes(mut self, n: i64) -> Self {
        self.min_upvotes = n;
        self
    }
    pub fn with_output_file(mut self, path: impl AsRef<Path>) -> Self {
        self.output_file = path.as_ref().to_path_buf();
        self
    }
    pub fn with_request_delay(mut self, d: Duration) -> Self {
        self.request_delay = d;
        self
    }
    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries.max(1);
        self.retry_delay = retry_delay;
        self
    }
    pub fn with_page_size(mut self, n: usize) -> Self {
        self.page_size = n.clamp(1, 100);
        self
    }
    pub fn with_max_results_per_query(mut self, cap: Option<usize>) -> Self {
        self.max_results_per_query = cap;
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }

    /// Load a JSON config file; omitted fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
        let file: ConfigFile =
            serde_json::from_str(&text).with_context(|| format!("parse config {}", path.display()))?;
        file.apply(Self::default())
    }

    pub fn validate(&self) -> Result<()> {
        if self.source_groups.is_empty() {
            return Err(anyhow!("at least one source group is required"));
        }
        if self.keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(anyhow!("at least one keyword is required"));
        }
        if self.start_ts > self.end_ts {
            return Err(anyhow!("start_date is after end_date"));
        }
        if self.content_max_chars > CONTENT_MAX_CHARS {
            return Err(anyhow!("content_max_chars may not exceed {CONTENT_MAX_CHARS}"));
        }
        if self.reply_max_chars > REPLY_MAX_CHARS {
            return Err(anyhow!("reply_max_chars may not exceed {REPLY_MAX_CHARS}"));
        }
        if self.max_replies > DEFAULT_MAX_REPLIES {
            return Err(anyhow!("max_replies may not exceed {DEFAULT_MAX_REPLIES}"));
        }
        Ok(())
    }
}

/// On-disk shape of the config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(alias = "subreddits")]
    pub source_groups: Option<Vec<String>>,
    pub keywords: Option<Vec<String>>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub min_upvotes: Option<i64>,
    pub output_file: Option<PathBuf>,
    pub request_delay_secs: Option<f64>,
    pub max_retries: Option<u32>,
    pub retry_delay_secs: Option<f64>,
    pub page_size: Option<usize>,
    pub max_results_per_query: Option<usize>,
    pub content_max_chars: Option<usize>,
    pub reply_max_chars: Option<usize>,
    pub max_replies: Option<usize>,
    pub progress: Option<bool>,
}

impl ConfigFile {
    pub fn apply(self, mut o: CollectOptions) -> Result<CollectOptions> {
        if let Some(v) = self.source_groups { o = o.with_source_groups(v); }
        if let Some(v) = self.keywords { o = o.with_keywords(v); }
        if let Some(s) = self.start_date.as_deref() {
            o.start_ts = parse_day_start(s).map_err(|e| anyhow!("start_date: {e}"))?;
        }
        if let Some(s) = self.end_date.as_deref() {
            o.end_ts = parse_day_start(s).map_err(|e| anyhow!("end_date: {e}"))?;
        }
        if let Some(v) = self.min_upvotes { o.min_upvotes = v; }
        if let Some(v) = self.output_file { o.output_file = v; }
        if let Some(v) = self.request_delay_secs { o.request_delay = secs("request_delay_secs", v)?; }
        if let Some(v) = self.max_retries { o.max_retries = v.max(1); }
        if let Some(v) = self.retry_delay_secs { o.retry_delay = secs("retry_delay_secs", v)?; }
        if let Some(v) = self.page_size { o = o.with_page_size(v); }
        if let Some(v) = self.max_results_per_query { o.max_results_per_query = Some(v); }
        if let Some(v) = self.content_max_chars { o.content_max_chars = v; }
        if let Some(v) = self.reply_max_chars { o.reply_max_chars = v; }
        if let Some(v) = self.max_replies { o.max_replies = v; }
        if let Some(v) = self.progress { o.progress = v; }
        Ok(o)
    }
}

fn secs(name: &str, v: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(v).map_err(|_| anyhow!("{name} must be a non-negative number of seconds"))
}

#[inline]
pub fn normalize_group(s: &str) -> String {
    let s = s.trim();
    s.strip_prefix("r/").unwrap_or(s).to_string()
}

/// API credentials, read from the environment.
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

pub const DEFAULT_USER_AGENT: &str = concat!("rcollect/", env!("CARGO_PKG_VERSION"));

impl Credentials {
    /// `REDDIT_CLIENT_ID`, `REDDIT_CLIENT_SECRET`, `REDDIT_USER_AGENT` (optional).
    /// Returns `None` when id or secret is unset or blank.
    pub fn from_env() -> Option<Self> {
        let get = |k: &str| std::env::var(k).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Some(Self {
            client_id: get("REDDIT_CLIENT_ID")?,
            client_secret: get("REDDIT_CLIENT_SECRET")?,
            user_agent: get("REDDIT_USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_research_setup() {
        let o = CollectOptions::default();
        assert_eq!(o.source_groups.len(), 5);
        assert_eq!(o.keywords.len(), 9);
        assert_eq!(o.min_upvotes, 5);
        assert_eq!(o.start_ts, parse_day_start("2024-11-08").unwrap());
        assert_eq!(o.end_ts, parse_day_start("2025-11-08").unwrap());
        o.validate().unwrap();
    }

    #[test]
    fn config_file_overrides_only_given_fields() {
        let file: ConfigFile = serde_json::from_str(
            r#"{"subreddits":["r/GlobalOffensive"],"start_date":"2025-01-01","min_upvotes":10,"request_delay_secs":0.5}"#,
        )
        .unwrap();
        let o = file.apply(CollectOptions::default()).unwrap();
        assert_eq!(o.source_groups, vec!["GlobalOffensive".to_string()]);
        assert_eq!(o.start_ts, 1_735_689_600);
        assert_eq!(o.end_ts, CollectOptions::default().end_ts);
        assert_eq!(o.min_upvotes, 10);
        assert_eq!(o.request_delay, Duration::from_millis(500));
        assert_eq!(o.keywords.len(), 9);
    }

    #[test]
    fn rejects_bad_config() {
        assert!(serde_json::from_str::<ConfigFile>(r#"{"subredits":[]}"#).is_err());
        let bad_date: ConfigFile = serde_json::from_str(r#"{"end_date":"soon"}"#).unwrap();
        assert!(bad_date.apply(CollectOptions::default()).is_err());
        let inverted = CollectOptions::default().with_date_range(10, 5);
        assert!(inverted.validate().is_err());
        let negative: ConfigFile = serde_json::from_str(r#"{"retry_delay_secs":-1.0}"#).unwrap();
        assert!(negative.apply(CollectOptions::default()).is_err());
    }

    #[test]
    fn text_limits_cannot_be_raised() {
        let tighter: ConfigFile = serde_json::from_str(r#"{"content_max_chars":100,"max_replies":2}"#).unwrap();
        tighter.apply(CollectOptions::default()).unwrap().validate().unwrap();

        for body in [r#"{"content_max_chars":2001}"#, r#"{"reply_max_chars":10000}"#, r#"{"max_replies":6}"#] {
            let file: ConfigFile = serde_json::from_str(body).unwrap();
            let err = file.apply(CollectOptions::default()).unwrap().validate().unwrap_err();
            assert!(err.to_string().contains("may not exceed"), "{body}: {err}");
        }
    }
}
