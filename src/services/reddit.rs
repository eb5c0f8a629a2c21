use std::time::{Duration, Instant};

use async_trait::async_trait;
use bon::bon;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::models::types::{Block, Story};
use crate::services::settings::RedditConfig;
use crate::traits::story_fetcher::StoryFetcher;

pub const DEFAULT_AUTH_URL: &str = "https://www.reddit.com/api/v1/access_token";
pub const DEFAULT_API_BASE_URL: &str = "https://oauth.reddit.com";
pub const DEFAULT_COMMENTS_BASE_URL: &str = "https://old.reddit.com";
pub const DEFAULT_USER_AGENT: &str = "mailshine/0.1";

/// Tokens are refreshed this long before Reddit says they expire
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    data: RedditPost,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RedditPost {
    title: String,
    url: String,
    permalink: String,
    num_comments: u64,
    score: i64,
    selftext_html: Option<String>,
}

/// Клиент Reddit API (OAuth client credentials)
pub struct RedditClient {
    client: Client,
    client_id: String,
    client_secret: String,
    auth_url: String,
    api_base_url: String,
    comments_base_url: String,
    user_agent: String,
    token: RwLock<Option<CachedToken>>,
}

#[bon]
impl RedditClient {
    #[builder]
    pub fn new(
        client_id: String,
        client_secret: String,
        auth_url: Option<String>,
        api_base_url: Option<String>,
        comments_base_url: Option<String>,
        user_agent: Option<String>,
        timeout: Duration,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        if client_id.is_empty() || client_secret.is_empty() {
            return Err("reddit: client_id and client_secret are required".into());
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            client_id,
            client_secret,
            auth_url: auth_url.unwrap_or_else(|| DEFAULT_AUTH_URL.to_string()),
            api_base_url: trim_slash(api_base_url.unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())),
            comments_base_url: trim_slash(
                comments_base_url.unwrap_or_else(|| DEFAULT_COMMENTS_BASE_URL.to_string()),
            ),
            user_agent: user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            token: RwLock::new(None),
        })
    }
}

impl RedditClient {
    pub fn from_config(cfg: &RedditConfig) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Self::builder()
            .client_id(cfg.client_id.clone())
            .client_secret(cfg.client_secret.clone())
            .maybe_auth_url(cfg.auth_url.clone())
            .maybe_api_base_url(cfg.api_base_url.clone())
            .maybe_comments_base_url(cfg.comments_base_url.clone())
            .maybe_user_agent(cfg.user_agent.clone())
            .timeout(Duration::from_secs(cfg.request_timeout_secs.unwrap_or(30)))
            .build()
    }

    async fn access_token(&self) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        if let Some(t) = self.token.read().await.as_ref() {
            if t.expires_at > Instant::now() {
                return Ok(t.value.clone());
            }
        }

        let mut guard = self.token.write().await;
        // another task may have refreshed while we waited for the lock
        if let Some(t) = guard.as_ref() {
            if t.expires_at > Instant::now() {
                return Ok(t.value.clone());
            }
        }

        debug!(auth_url = %self.auth_url, "reddit: requesting access token");
        let resp = self
            .client
            .post(&self.auth_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(format!("reddit: token request failed: {}", resp.status()).into());
        }
        let body: TokenResponse = resp.json().await?;
        if body.access_token.is_empty() {
            return Err("reddit: token response has no access_token".into());
        }

        let ttl = Duration::from_secs(body.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        info!(expires_in = body.expires_in, "reddit: access token acquired");
        *guard = Some(CachedToken {
            value: body.access_token.clone(),
            expires_at: Instant::now() + ttl,
        });
        Ok(body.access_token)
    }

    /// Лучшие записи сабреддита за сутки
    pub async fn top_stories(
        &self,
        subreddit: &str,
        limit: usize,
    ) -> Result<Vec<Story>, Box<dyn std::error::Error + Send + Sync>> {
        let token = self.access_token().await?;
        let url = format!("{}/r/{}/top", self.api_base_url, subreddit);
        info!(%url, limit, "reddit: fetching top stories");

        let limit_param = limit.to_string();
        let resp = self
            .client
            .get(&url)
            .query(&[("t", "day"), ("limit", limit_param.as_str()), ("raw_json", "1")])
            .bearer_auth(&token)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .await?;
        if !resp.status().is_success() {
            if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
                *self.token.write().await = None;
            }
            return Err(format!("reddit: listing r/{} failed: {}", subreddit, resp.status()).into());
        }

        let listing: Listing = resp.json().await?;
        let stories: Vec<Story> = listing
            .data
            .children
            .into_iter()
            .take(limit)
            .map(|c| self.to_story(subreddit, c.data))
            .collect();
        debug!(subreddit, count = stories.len(), "reddit: listing parsed");
        Ok(stories)
    }

    fn to_story(&self, subreddit: &str, post: RedditPost) -> Story {
        let hostname = match url::Url::parse(&post.url) {
            Ok(u) => u.host_str().unwrap_or_default().to_string(),
            Err(e) => {
                warn!(url = %post.url, error = %e, "reddit: story link is not a valid url");
                String::new()
            }
        };
        Story {
            title: post.title,
            link: post.url,
            hostname,
            comments_link: format!("{}{}", self.comments_base_url, post.permalink),
            num_comments: post.num_comments,
            score: post.score,
            subreddit: format!("r/{}", subreddit),
            excerpt_html: post.selftext_html.filter(|s| !s.trim().is_empty()),
        }
    }
}

#[async_trait]
impl StoryFetcher for RedditClient {
    async fn fetch_block(
        &self,
        source: &str,
        limit: usize,
    ) -> Result<Block, Box<dyn std::error::Error + Send + Sync>> {
        let stories = self.top_stories(source, limit).await?;
        Ok(Block {
            title: format!("r/{}", source),
            stories,
        })
    }
}

fn trim_slash(s: String) -> String {
    s.trim_end_matches('/').to_string()
}
