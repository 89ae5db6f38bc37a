//! Relevance predicates: recency window, popularity floor and keyword match.

use crate::record::Candidate;

/// Normalize a keyword list: trim + lowercase, drop blanks, sort + dedup.
pub fn normalize_keywords<I, S>(keywords: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut v: Vec<String> = keywords
        .into_iter()
        .map(|k| k.as_ref().trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    v.sort();
    v.dedup();
    v
}

/// Case-insensitive substring match against already-normalized keywords.
/// A keyword inside a larger word still counts.
pub fn matches_keywords(text: &str, keywords: &[String]) -> bool {
    if text.is_empty() {
        return false;
    }
    let hay = text.to_lowercase();
    keywords.iter().any(|kw| hay.contains(kw.as_str()))
}

/// Conjunction of the three inclusion predicates. Pure; build once per run.
#[derive(Clone, Debug)]
pub struct RelevanceFilter {
    start_ts: i64, // inclusive
    end_ts: i64,   // inclusive
    min_upvotes: i64,
    keywords: Vec<String>,
}

impl RelevanceFilter {
    pub fn new<I, S>(start_ts: i64, end_ts: i64, min_upvotes: i64, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self { start_ts, end_ts, min_upvotes, keywords: normalize_keywords(keywords) }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    #[inline]
    pub fn within_dates(&self, ts: i64) -> bool {
        self.start_ts <= ts && ts <= self.end_ts
    }

    #[inline]
    pub fn meets_upvotes(&self, score: i64) -> bool {
        score >= self.min_upvotes
    }

    pub fn is_relevant(&self, c: &Candidate) -> bool {
        if !self.within_dates(c.created_utc) { return false; }
        if !self.meets_upvotes(c.score) { return false; }
        matches_keywords(&c.title, &self.keywords) || matches_keywords(&c.body, &self.keywords)
    }
}
