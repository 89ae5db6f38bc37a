use crate::filters::matches_keywords;
use crate::record::{truncate_chars, Reply, SummarizedReply, DELETED_AUTHOR};

pub const DEFAULT_MAX_REPLIES: usize = 5;

/// Pick the on-topic replies of a thread, best score first.
///
/// - Only replies whose text matches one of `keywords` qualify; removed or
///   deleted bodies never do.
/// - Ordering is by descending score; the sort is stable, so tied replies keep
///   their thread order.
/// - Each body is cut to `max_len` characters and at most `max_count` replies
///   are returned (possibly none).
pub fn summarize(thread: &[Reply], keywords: &[String], max_count: usize, max_len: usize) -> Vec<SummarizedReply> {
    let mut picked: Vec<&Reply> = thread
        .iter()
        .filter(|r| !is_placeholder_body(&r.body))
        .filter(|r| matches_keywords(&r.body, keywords))
        .collect();
    picked.sort_by(|a, b| b.score.cmp(&a.score));
    picked
        .into_iter()
        .take(max_count)
        .map(|r| SummarizedReply {
            author: r.author.clone().unwrap_or_else(|| DELETED_AUTHOR.to_string()),
            body: truncate_chars(&r.body, max_len),
            score: r.score,
            created_utc: r.created_utc,
        })
        .collect()
}

fn is_placeholder_body(body: &str) -> bool {
    let b = body.trim();
    b.is_empty() || b == "[deleted]" || b == "[removed]"
}
