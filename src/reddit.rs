//! Reddit implementation of `RemoteSource`: application-only OAuth, subreddit
//! search listings, and comment threads flattened breadth-first.

use crate::config::Credentials;
use crate::error::FetchError;
use crate::pacing::{IntervalPacer, Pacer, SystemClock};
use crate::record::{RawListing, Reply};
use crate::remote::{RemoteSource, SearchPage};
use reqwest::blocking::{Client, Response};
use serde_json::Value;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

const AUTH_URL: &str = "https://www.reddit.com/api/v1/access_token";
const API_BASE: &str = "https://oauth.reddit.com";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
// Refresh this long before the advertised expiry.
const TOKEN_SLACK: Duration = Duration::from_secs(60);
const FALLBACK_TOKEN_TTL: Duration = Duration::from_secs(3600);

struct Token {
    value: String,
    expires_at: Instant,
}

pub struct RedditClient {
    http: Client,
    creds: Credentials,
    token: Option<Token>,
    page_size: usize,
    reply_limit: usize,
    // Spaces every send, including token grants and the re-GET after a 401.
    pacer: IntervalPacer<SystemClock>,
}

impl RedditClient {
    /// Build the HTTP client and obtain a first token, which doubles as a
    /// connectivity and credential check.
    pub fn connect(creds: Credentials, page_size: usize, request_delay: Duration) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(creds.user_agent.clone())
            .build()
            .map_err(|e| FetchError::Rejected(format!("http client: {e}")))?;
        let mut client = Self {
            http,
            creds,
            token: None,
            page_size: page_size.clamp(1, 100),
            reply_limit: 200,
            pacer: IntervalPacer::new(SystemClock, request_delay),
        };
        client.refresh_token()?;
        tracing::info!("Reddit API client ready (application-only OAuth)");
        Ok(client)
    }

    fn refresh_token(&mut self) -> Result<(), FetchError> {
        self.pacer.wait_if_needed();
        let res = self
            .http
            .post(AUTH_URL)
            .basic_auth(&self.creds.client_id, Some(&self.creds.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .map_err(classify_reqwest)?;
        let body = read_json(res, "token grant")?;
        let (value, ttl) = parse_token(&body)?;
        self.token = Some(Token { value, expires_at: token_deadline(Instant::now(), ttl) });
        Ok(())
    }

    fn bearer(&mut self) -> Result<String, FetchError> {
        let fresh = self.token.as_ref().is_some_and(|t| Instant::now() + TOKEN_SLACK < t.expires_at);
        if !fresh {
            tracing::debug!("refreshing API token");
            self.refresh_token()?;
        }
        self.token
            .as_ref()
            .map(|t| t.value.clone())
            .ok_or_else(|| FetchError::Auth("no access token".into()))
    }

    /// GET with bearer auth. A 401 triggers one token refresh before giving up.
    fn get_json(&mut self, path: &str, query: &[(&str, String)], context: &str) -> Result<Value, FetchError> {
        let url = format!("{API_BASE}{path}");
        let mut refreshed = false;
        loop {
            let token = self.bearer()?;
            self.pacer.wait_if_needed();
            let res = self.http.get(&url).bearer_auth(token).query(query).send().map_err(classify_reqwest)?;
            if res.status().as_u16() == 401 && !refreshed {
                self.token = None;
                refreshed = true;
                continue;
            }
            return read_json(res, context);
        }
    }
}

impl RemoteSource for RedditClient {
    fn search(&mut self, group: &str, keyword: &str, after: Option<&str>) -> Result<SearchPage, FetchError> {
        let mut query = vec![
            ("q", keyword.to_string()),
            ("restrict_sr", "1".to_string()),
            ("sort", "new".to_string()),
            ("t", "all".to_string()),
            ("limit", self.page_size.to_string()),
            ("raw_json", "1".to_string()),
        ];
        if let Some(a) = after {
            query.push(("after", a.to_string()));
        }
        let body = self.get_json(&format!("/r/{group}/search"), &query, &format!("search r/{group} {keyword:?}"))?;
        parse_search_listing(&body)
    }

    fn fetch_replies(&mut self, record_id: &str) -> Result<Vec<Reply>, FetchError> {
        let query = [("limit", self.reply_limit.to_string()), ("raw_json", "1".to_string())];
        let body = self.get_json(&format!("/comments/{record_id}"), &query, &format!("comments {record_id}"))?;
        parse_comment_thread(&body)
    }
}

fn classify_reqwest(e: reqwest::Error) -> FetchError {
    if let Some(status) = e.status() {
        return FetchError::from_status(status.as_u16(), "request");
    }
    if e.is_decode() || e.is_builder() {
        return FetchError::Rejected(e.to_string());
    }
    // timeouts, connection resets, DNS hiccups
    FetchError::transient(e.to_string())
}

fn read_json(res: Response, context: &str) -> Result<Value, FetchError> {
    let status = res.status();
    if !status.is_success() {
        return Err(FetchError::from_status(status.as_u16(), context));
    }
    let text = res.text().map_err(classify_reqwest)?;
    serde_json::from_str(&text).map_err(|e| FetchError::Rejected(format!("{context}: invalid JSON: {e}")))
}

/// Absurd `expires_in` values fall back to an hour instead of overflowing.
fn token_deadline(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl)
        .or_else(|| now.checked_add(FALLBACK_TOKEN_TTL))
        .unwrap_or(now)
}

fn parse_token(body: &Value) -> Result<(String, Duration), FetchError> {
    if let Some(err) = body.get("error") {
        return Err(FetchError::Auth(format!("token grant refused: {err}")));
    }
    let value = body
        .get("access_token")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| FetchError::Auth("token grant response has no access_token".into()))?;
    let ttl = body
        .get("expires_in")
        .and_then(Value::as_u64)
        .map_or(FALLBACK_TOKEN_TTL, Duration::from_secs);
    Ok((value.to_string(), ttl))
}

/// `Listing` of `t3` children → candidates plus the `after` cursor.
pub fn parse_search_listing(body: &Value) -> Result<SearchPage, FetchError> {
    let data = body
        .get("data")
        .ok_or_else(|| FetchError::Rejected("search response has no data".into()))?;
    let children = data.get("children").and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]);

    let mut candidates = Vec::with_capacity(children.len());
    for child in children {
        if child.get("kind").and_then(Value::as_str) != Some("t3") {
            continue;
        }
        let item = child.get("data").cloned().unwrap_or(Value::Null);
        let raw = match serde_json::from_value::<RawListing>(item.clone()) {
            Ok(r) => r,
            // Keep the id (if any) so the collector can count and report it.
            Err(_) => RawListing { id: item.get("id").and_then(Value::as_str).map(str::to_string), ..Default::default() },
        };
        candidates.push(raw);
    }

    let next_cursor = data
        .get("after")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    Ok(SearchPage { candidates, next_cursor })
}

/// `[post_listing, comment_listing]` → every loaded comment, breadth-first.
/// "more" stubs are dropped.
pub fn parse_comment_thread(body: &Value) -> Result<Vec<Reply>, FetchError> {
    let listing = body
        .as_array()
        .and_then(|a| a.get(1))
        .ok_or_else(|| FetchError::Rejected("comments response is not [post, comments]".into()))?;

    let mut out = Vec::new();
    let mut queue: VecDeque<&Value> = VecDeque::new();
    queue.extend(listing_children(listing));

    while let Some(node) = queue.pop_front() {
        if node.get("kind").and_then(Value::as_str) != Some("t1") {
            continue;
        }
        let Some(d) = node.get("data") else { continue };
        out.push(Reply {
            author: d.get("author").and_then(Value::as_str).filter(|s| !s.is_empty()).map(str::to_string),
            body: d.get("body").and_then(Value::as_str).unwrap_or_default().to_string(),
            score: d.get("score").and_then(Value::as_i64).unwrap_or(0),
            created_utc: d.get("created_utc").and_then(Value::as_f64).map(|f| f as i64).unwrap_or(0),
        });
        // `replies` is "" when empty, a Listing otherwise.
        if let Some(replies) = d.get("replies") {
            queue.extend(listing_children(replies));
        }
    }
    Ok(out)
}

fn listing_children(listing: &Value) -> impl Iterator<Item = &Value> {
    listing
        .get("data")
        .and_then(|d| d.get("children"))
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_search_listing() {
        let body = json!({
            "kind": "Listing",
            "data": {
                "after": "t3_b2",
                "children": [
                    { "kind": "t3", "data": {
                        "id": "a1", "title": "My case opening addiction story", "selftext": "",
                        "author": "someone", "score": 10, "created_utc": 1735689600.0,
                        "subreddit": "GlobalOffensive", "permalink": "/r/GlobalOffensive/comments/a1/x/",
                        "link_flair_text": null, "num_comments": 3
                    }},
                    { "kind": "t3", "data": { "id": "b2", "score": "lots" } },
                    { "kind": "t5", "data": { "id": "ignored" } }
                ]
            }
        });
        let page = parse_search_listing(&body).unwrap();
        assert_eq!(page.next_cursor.as_deref(), Some("t3_b2"));
        assert_eq!(page.candidates.len(), 2);
        assert_eq!(page.candidates[0].created_utc, Some(1_735_689_600));
        assert_eq!(page.candidates[1].id.as_deref(), Some("b2"));
        assert_eq!(page.candidates[1].title, None);
    }

    #[test]
    fn last_page_has_no_cursor() {
        let page = parse_search_listing(&json!({ "data": { "after": null, "children": [] } })).unwrap();
        assert!(page.next_cursor.is_none());
        assert!(page.candidates.is_empty());
        assert!(parse_search_listing(&json!({ "message": "nope" })).is_err());
    }

    #[test]
    fn flattens_comment_tree_breadth_first() {
        let c = |id: &str, score: i64, replies: Value| {
            json!({ "kind": "t1", "data": {
                "id": id, "author": "u", "body": format!("body {id}"), "score": score,
                "created_utc": 1735689600.0, "replies": replies
            }})
        };
        let listing = |children: Vec<Value>| json!({ "kind": "Listing", "data": { "children": children } });
        let body = json!([
            listing(vec![json!({ "kind": "t3", "data": { "id": "p" } })]),
            listing(vec![
                c("a", 5, listing(vec![c("a1", 1, json!(""))])),
                c("b", 7, json!("")),
                json!({ "kind": "more", "data": { "children": ["zz"] } }),
            ]),
        ]);
        let replies = parse_comment_thread(&body).unwrap();
        let bodies: Vec<&str> = replies.iter().map(|r| r.body.as_str()).collect();
        assert_eq!(bodies, ["body a", "body b", "body a1"]);
        assert_eq!(replies[1].score, 7);
        assert_eq!(replies[0].created_utc, 1_735_689_600);
    }

    #[test]
    fn token_errors_are_auth_failures() {
        assert!(matches!(parse_token(&json!({ "error": "invalid_grant" })), Err(FetchError::Auth(_))));
        assert!(matches!(parse_token(&json!({ "token_type": "bearer" })), Err(FetchError::Auth(_))));
        let (tok, ttl) = parse_token(&json!({ "access_token": "abc", "expires_in": 86400 })).unwrap();
        assert_eq!(tok, "abc");
        assert_eq!(ttl, Duration::from_secs(86400));
    }

    #[test]
    fn huge_token_lifetime_does_not_overflow() {
        let (_, ttl) = parse_token(&json!({ "access_token": "abc", "expires_in": u64::MAX })).unwrap();
        let now = Instant::now();
        assert_eq!(token_deadline(now, ttl), now + FALLBACK_TOKEN_TTL);
        assert_eq!(token_deadline(now, Duration::from_secs(60)), now + Duration::from_secs(60));

        let (_, ttl) = parse_token(&json!({ "access_token": "abc" })).unwrap();
        assert_eq!(ttl, FALLBACK_TOKEN_TTL);
    }
}
