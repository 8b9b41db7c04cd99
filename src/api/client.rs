//! HTTP client for kemono/coomer style community APIs.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use reqwest::cookie::Jar;
use reqwest::{header, Client, Response};
use url::Url;

use crate::api::session::{generate_session_token, SESSION_COOKIE};
use crate::api::types::{Creator, Post};
use crate::error::{Error, Result};

/// Number of posts the listing endpoint returns per page.
pub const PAGE_SIZE: usize = 50;

/// Browser user agent sent with every request unless configured otherwise.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/105.0.0.0 Safari/537.36";

/// Timeouts and identity for one API session.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Ceiling applied to every request in the run.
    pub timeout: Duration,
    /// Socket connect timeout.
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60 * 60),
            connect_timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// API client bound to one site, carrying a per-run session cookie.
pub struct PartyApi {
    client: Client,
    site: Url,
    session_token: String,
}

impl PartyApi {
    /// Create a client for `site` (e.g. `https://kemono.su`).
    pub fn new(site: &str, settings: &ClientSettings) -> Result<Self> {
        let site = Url::parse(site.trim_end_matches('/'))?;
        let session_token = generate_session_token();

        let jar = Arc::new(Jar::default());
        jar.add_cookie_str(&format!("{}={}", SESSION_COOKIE, session_token), &site);

        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT_ENCODING, header::HeaderValue::from_static("identity"));
        headers.insert(header::CACHE_CONTROL, header::HeaderValue::from_static("no-cache"));
        headers.insert(header::PRAGMA, header::HeaderValue::from_static("no-cache"));
        if let Ok(referer) = header::HeaderValue::from_str(site.as_str()) {
            headers.insert(header::REFERER, referer);
        }

        let client = Client::builder()
            .user_agent(&settings.user_agent)
            .default_headers(headers)
            .cookie_provider(jar)
            .timeout(settings.timeout)
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(|e| Error::Api(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            site,
            session_token,
        })
    }

    /// The site this client talks to, without a trailing slash.
    pub fn site(&self) -> &str {
        self.site.as_str().trim_end_matches('/')
    }

    /// The anti-bot cookie value minted for this session.
    pub fn session_token(&self) -> &str {
        &self.session_token
    }

    /// Build the download URL for a server file path.
    ///
    /// `{site}/data{remote_path}?f={name}`; the name is query-encoded.
    pub fn file_url(&self, remote_path: &str, name: &str) -> Result<Url> {
        let path = if remote_path.starts_with('/') {
            remote_path.to_string()
        } else {
            format!("/{}", remote_path)
        };
        let mut url = Url::parse(&format!("{}/data{}", self.site(), path))?;
        url.query_pairs_mut().append_pair("f", name);
        Ok(url)
    }

    /// Issue a metadata probe (HEAD, redirects followed).
    pub async fn probe(&self, url: &Url) -> Result<Response> {
        tracing::debug!("HEAD {}", url);
        let response = self.client.head(url.clone()).send().await?;
        tracing::debug!("Probe status: {}", response.status());
        Ok(response)
    }

    /// Request a byte range of a file. `end` is inclusive; `None` leaves it open.
    ///
    /// A range covering the whole file (`0-`) is sent as a plain GET, since
    /// servers refuse any range over an empty body.
    pub async fn fetch_range(&self, url: &Url, start: u64, end: Option<u64>) -> Result<Response> {
        let range = match end {
            Some(end) => Some(format!("bytes={}-{}", start, end)),
            None if start > 0 => Some(format!("bytes={}-", start)),
            None => None,
        };
        tracing::debug!("GET {} ({})", url, range.as_deref().unwrap_or("whole file"));

        let mut request = self.client.get(url.clone());
        if let Some(range) = range {
            request = request.header(header::RANGE, range);
        }

        Ok(request.send().await?)
    }

    /// Fetch the full creator index.
    pub async fn get_creators(&self) -> Result<Vec<Creator>> {
        let url = format!("{}/api/v1/creators.txt", self.site());
        tracing::debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(Error::Api(format!("Failed to get creators: HTTP {}", status)));
        }

        serde_json::from_str(&text).map_err(|e| {
            Error::Api(format!(
                "Failed to parse creators: {} - Response: {}",
                e,
                snippet(&text, 500)
            ))
        })
    }

    /// Find a creator by service and id or name.
    pub async fn find_creator(&self, service: &str, search: &str) -> Result<Creator> {
        let creators = self.get_creators().await?;
        select_creator(creators, service, search)
    }

    /// Fetch one page of posts starting at `offset`.
    pub async fn get_posts_page(&self, creator: &Creator, offset: usize) -> Result<Vec<Post>> {
        let url = format!(
            "{}/api/v1/{}/user/{}",
            self.site(),
            creator.service,
            creator.id
        );
        tracing::debug!("GET {}?o={}", url, offset);

        let response = self
            .client
            .get(&url)
            .query(&[("o", offset)])
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::Api("Rate limited while listing posts".into()));
        }

        let text = response.text().await?;
        if !status.is_success() {
            return Err(Error::Api(format!(
                "Failed to list posts: HTTP {} - {}",
                status,
                snippet(&text, 200)
            )));
        }

        serde_json::from_str(&text).map_err(|e| {
            Error::Api(format!(
                "Failed to parse posts: {} - Response: {}",
                e,
                snippet(&text, 500)
            ))
        })
    }

    /// Lazily walk a creator's posts, newest first.
    ///
    /// Pages are fetched on demand; the walk stops on an empty or short page.
    pub fn posts<'a>(&'a self, creator: &'a Creator) -> impl Stream<Item = Result<Post>> + 'a {
        stream::try_unfold(Some(0usize), move |offset| async move {
            let Some(offset) = offset else {
                return Ok::<_, Error>(None);
            };

            let page = self.get_posts_page(creator, offset).await?;
            if page.is_empty() {
                return Ok(None);
            }

            let next = (page.len() == PAGE_SIZE).then_some(offset + page.len());
            Ok(Some((stream::iter(page.into_iter().map(Ok)), next)))
        })
        .try_flatten()
    }

    /// Collect up to `limit` posts (all of them when `None`).
    pub async fn list_posts(&self, creator: &Creator, limit: Option<usize>) -> Result<Vec<Post>> {
        let posts = self.posts(creator);
        match limit {
            Some(limit) => posts.take(limit).try_collect().await,
            None => posts.try_collect().await,
        }
    }
}

/// Cut a response body down for error messages without splitting a character.
fn snippet(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Pick a creator out of the index: exact id, then case-insensitive id,
/// then exact name, then case-insensitive name.
pub fn select_creator(creators: Vec<Creator>, service: &str, search: &str) -> Result<Creator> {
    let lowered = search.to_lowercase();
    let candidates: Vec<Creator> = creators
        .into_iter()
        .filter(|c| c.service == service)
        .collect();

    let matchers: [&dyn Fn(&Creator) -> bool; 4] = [
        &|c| c.id == search,
        &|c| c.id.to_lowercase() == lowered,
        &|c| c.name == search,
        &|c| c.name.to_lowercase() == lowered,
    ];

    for matcher in matchers {
        if let Some(found) = candidates.iter().find(|&c| matcher(c)) {
            return Ok(found.clone());
        }
    }

    Err(Error::CreatorNotFound {
        service: service.to_string(),
        search: search.to_string(),
    })
}

/// Creators whose lowercased name contains `query`, optionally limited to
/// one service.
pub fn search_creators(creators: Vec<Creator>, query: &str, service: Option<&str>) -> Vec<Creator> {
    let query = query.to_lowercase();
    creators
        .into_iter()
        .filter(|c| service.map_or(true, |s| c.service == s))
        .filter(|c| c.name.to_lowercase().contains(&query))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creators() -> Vec<Creator> {
        vec![
            Creator::new("111", "Alice", "patreon"),
            Creator::new("222", "alice", "fanbox"),
            Creator::new("333", "Bob", "patreon"),
        ]
    }

    #[test]
    fn test_select_by_id() {
        let found = select_creator(creators(), "patreon", "333").unwrap();
        assert_eq!(found.name, "Bob");
    }

    #[test]
    fn test_select_by_name_case_insensitive() {
        let found = select_creator(creators(), "patreon", "ALICE").unwrap();
        assert_eq!(found.id, "111");
    }

    #[test]
    fn test_select_respects_service() {
        let found = select_creator(creators(), "fanbox", "alice").unwrap();
        assert_eq!(found.id, "222");
        assert!(matches!(
            select_creator(creators(), "fanbox", "Bob"),
            Err(Error::CreatorNotFound { .. })
        ));
    }

    #[test]
    fn test_search_creators() {
        let found = search_creators(creators(), "LIC", None);
        assert_eq!(found.len(), 2);
        let found = search_creators(creators(), "lic", Some("fanbox"));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "222");
        assert!(search_creators(creators(), "zed", None).is_empty());
    }

    #[test]
    fn test_file_url_encodes_name() {
        let api = PartyApi::new("https://kemono.su/", &ClientSettings::default()).unwrap();
        let url = api.file_url("/ab/cd/abcdef.png", "my file #1.png").unwrap();
        assert_eq!(url.path(), "/data/ab/cd/abcdef.png");
        let (key, value) = url.query_pairs().next().unwrap();
        assert_eq!(key, "f");
        assert_eq!(value, "my file #1.png");
        assert!(!url.as_str().contains(' '));
    }

    #[test]
    fn test_site_trailing_slash_trimmed() {
        let api = PartyApi::new("https://coomer.su/", &ClientSettings::default()).unwrap();
        assert_eq!(api.site(), "https://coomer.su");
        assert_eq!(api.session_token().len(), 32);
    }
}
