//! Candidate / reply / output-row types, plus the raw listing shape the remote
//! source produces before validation.

use crate::date::human_date;
use crate::error::MalformedCandidate;
use serde::{Deserialize, Deserializer, Serialize};

/// Column order of the output table. Matches files written by earlier
/// collector versions so their identifiers stay visible to dedup.
pub const COLUMNS: [&str; 12] = [
    "post_id",
    "title",
    "author",
    "content",
    "upvotes",
    "timestamp",
    "date",
    "subreddit",
    "url",
    "flair",
    "comment_count",
    "top_comments",
];

pub const ID_COLUMN: usize = 0;

/// Placeholder the API (and the table) uses for accounts that no longer exist.
pub const DELETED_AUTHOR: &str = "[deleted]";

const SITE_ROOT: &str = "https://www.reddit.com";

/// One search hit as delivered by the remote source.
/// Every field is optional; `Candidate::try_from` decides what is required.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawListing {
    pub id: Option<String>,
    pub title: Option<String>,
    pub selftext: Option<String>,
    pub author: Option<String>,
    pub score: Option<i64>,
    #[serde(default, deserialize_with = "de_opt_epoch")]
    pub created_utc: Option<i64>,
    pub subreddit: Option<String>,
    pub permalink: Option<String>,
    pub link_flair_text: Option<String>,
    pub num_comments: Option<i64>,
}

/// A validated search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: String,
    pub title: String,
    pub body: String,
    pub author: Option<String>,
    pub score: i64,
    pub created_utc: i64,
    pub group: String,
    pub url: String,
    pub flair: Option<String>,
    pub num_comments: i64,
}

impl TryFrom<RawListing> for Candidate {
    type Error = MalformedCandidate;

    fn try_from(raw: RawListing) -> Result<Self, Self::Error> {
        let id = match raw.id.filter(|s| !s.trim().is_empty()) {
            Some(id) => id,
            None => return Err(MalformedCandidate { id: None, field: "id" }),
        };
        let missing = |field| MalformedCandidate { id: Some(id.clone()), field };
        let title = raw.title.ok_or_else(|| missing("title"))?;
        let score = raw.score.ok_or_else(|| missing("score"))?;
        let created_utc = raw.created_utc.ok_or_else(|| missing("created_utc"))?;
        let group = raw.subreddit.ok_or_else(|| missing("subreddit"))?;
        let url = match raw.permalink.as_deref() {
            Some(p) if p.starts_with("http") => p.to_string(),
            Some(p) => format!("{SITE_ROOT}{p}"),
            None => format!("{SITE_ROOT}/comments/{id}/"),
        };

        Ok(Candidate {
            title,
            body: raw.selftext.unwrap_or_default(),
            author: raw.author.filter(|a| !a.is_empty()),
            score,
            created_utc,
            group,
            url,
            flair: raw.link_flair_text.filter(|f| !f.is_empty()),
            num_comments: raw.num_comments.unwrap_or(0),
            id,
        })
    }
}

/// One reply in a discussion thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub author: Option<String>,
    pub body: String,
    pub score: i64,
    pub created_utc: i64,
}

impl Reply {
    pub fn new(body: impl Into<String>, score: i64) -> Self {
        Self { author: None, body: body.into(), score, created_utc: 0 }
    }
}

/// A reply as embedded in the `top_comments` column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarizedReply {
    pub author: String,
    pub body: String,
    pub score: i64,
    #[serde(deserialize_with = "de_epoch")]
    pub created_utc: i64,
}

/// One persisted row of the output table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRow {
    pub post_id: String,
    pub title: String,
    pub author: String,
    pub content: String,
    pub upvotes: i64,
    pub timestamp: i64,
    pub date: String,
    pub subreddit: String,
    pub url: String,
    pub flair: String,
    pub comment_count: i64,
    pub top_comments: Vec<SummarizedReply>,
}

impl OutputRow {
    /// Assemble a row; `content` is cut to `content_max_chars` characters.
    pub fn from_candidate(c: &Candidate, top_comments: Vec<SummarizedReply>, content_max_chars: usize) -> Self {
        Self {
            post_id: c.id.clone(),
            title: c.title.clone(),
            author: c.author.clone().unwrap_or_else(|| DELETED_AUTHOR.to_string()),
            content: truncate_chars(&c.body, content_max_chars),
            upvotes: c.score,
            timestamp: c.created_utc,
            date: human_date(c.created_utc),
            subreddit: c.group.clone(),
            url: c.url.clone(),
            flair: c.flair.clone().unwrap_or_default(),
            comment_count: c.num_comments,
            top_comments,
        }
    }

    /// Field values in `COLUMNS` order.
    pub fn to_fields(&self) -> Vec<String> {
        // An empty reply list is written as an empty cell, not `[]`.
        let comments = if self.top_comments.is_empty() {
            String::new()
        } else {
            serde_json::to_string(&self.top_comments).unwrap_or_default()
        };
        vec![
            self.post_id.clone(),
            self.title.clone(),
            self.author.clone(),
            self.content.clone(),
            self.upvotes.to_string(),
            self.timestamp.to_string(),
            self.date.clone(),
            self.subreddit.clone(),
            self.url.clone(),
            self.flair.clone(),
            self.comment_count.to_string(),
            comments,
        ]
    }

    /// Decode a data row (already split into `COLUMNS.len()` fields).
    pub fn from_fields(fields: &[String]) -> Result<Self, String> {
        if fields.len() != COLUMNS.len() {
            return Err(format!("expected {} fields, found {}", COLUMNS.len(), fields.len()));
        }
        let top_comments = if fields[11].trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&fields[11]).map_err(|e| format!("top_comments: {e}"))?
        };
        Ok(Self {
            post_id: fields[0].clone(),
            title: fields[1].clone(),
            author: fields[2].clone(),
            content: fields[3].clone(),
            upvotes: parse_int(&fields[4], "upvotes")?,
            timestamp: parse_int(&fields[5], "timestamp")?,
            date: fields[6].clone(),
            subreddit: fields[7].clone(),
            url: fields[8].clone(),
            flair: fields[9].clone(),
            comment_count: parse_int(&fields[10], "comment_count")?,
            top_comments,
        })
    }
}

/// Keep at most `max` characters (not bytes) of `s`.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((cut, _)) => s[..cut].to_string(),
        None => s.to_string(),
    }
}

// Older tables store numbers the way a dataframe writes them ("1731024000.0").
fn parse_int(s: &str, column: &str) -> Result<i64, String> {
    let t = s.trim();
    t.parse::<i64>()
        .or_else(|_| t.parse::<f64>().map(|f| f as i64))
        .map_err(|_| format!("{column}: not a number: {s:?}"))
}

// The API sends `created_utc` as a float.
fn de_epoch<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    let v = f64::deserialize(d)?;
    Ok(v as i64)
}

fn de_opt_epoch<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    let v = Option::<f64>::deserialize(d)?;
    Ok(v.map(|f| f as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RawListing {
        RawListing {
            id: Some("abc123".into()),
            title: Some("My case opening addiction story".into()),
            selftext: None,
            author: None,
            score: Some(10),
            created_utc: Some(1_735_689_600),
            subreddit: Some("GlobalOffensive".into()),
            permalink: Some("/r/GlobalOffensive/comments/abc123/my_case/".into()),
            link_flair_text: Some(String::new()),
            num_comments: Some(4),
        }
    }

    #[test]
    fn validates_required_fields() {
        let c = Candidate::try_from(raw()).unwrap();
        assert_eq!(c.body, "");
        assert_eq!(c.author, None);
        assert_eq!(c.flair, None);
        assert_eq!(c.url, "https://www.reddit.com/r/GlobalOffensive/comments/abc123/my_case/");

        let err = Candidate::try_from(RawListing { score: None, ..raw() }).unwrap_err();
        assert_eq!(err.field, "score");
        assert_eq!(err.id.as_deref(), Some("abc123"));

        let err = Candidate::try_from(RawListing { id: Some("  ".into()), ..raw() }).unwrap_err();
        assert_eq!(err.field, "id");
    }

    #[test]
    fn raw_listing_accepts_float_timestamps() {
        let v: RawListing = serde_json::from_str(r#"{"id":"x","created_utc":1735689600.0,"score":3}"#).unwrap();
        assert_eq!(v.created_utc, Some(1_735_689_600));
    }

    #[test]
    fn row_uses_placeholders_and_truncates() {
        let mut c = Candidate::try_from(raw()).unwrap();
        c.body = "é".repeat(10);
        let row = OutputRow::from_candidate(&c, Vec::new(), 4);
        assert_eq!(row.author, "[deleted]");
        assert_eq!(row.content, "éééé");
        assert_eq!(row.flair, "");
        assert_eq!(row.date, "2025-01-01 00:00:00");
        assert_eq!(row.to_fields()[11], "");
        assert_eq!(OutputRow::from_fields(&row.to_fields()).unwrap(), row);
    }

    #[test]
    fn decodes_dataframe_style_numbers() {
        let mut fields: Vec<String> = COLUMNS.iter().map(|_| String::new()).collect();
        fields[4] = "7".into();
        fields[5] = "1731024000.0".into();
        fields[10] = "2".into();
        fields[11] = r#"[{"author":"a","body":"b","score":1,"created_utc":1731024001.0}]"#.into();
        let row = OutputRow::from_fields(&fields).unwrap();
        assert_eq!(row.timestamp, 1_731_024_000);
        assert_eq!(row.top_comments[0].created_utc, 1_731_024_001);
    }
}
