use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use bon::Builder;
use chrono::Utc;
use tracing::{info, warn};

use crate::models::types::{Digest, FeedName, NewDigest};
use crate::services::settings::FeedConfig;
use crate::traits::digest_store::DigestStore;
use crate::traits::story_fetcher::StoryFetcher;

/// Сборка дайджестов по лентам из конфигурации
#[derive(Builder, Clone)]
pub struct DigestService {
    fetcher: Arc<dyn StoryFetcher>,
    store: Arc<dyn DigestStore>,
    feeds: BTreeMap<FeedName, FeedConfig>,
}

impl DigestService {
    pub fn feeds(&self) -> impl Iterator<Item = &FeedName> {
        self.feeds.keys()
    }

    /// Создаёт и сохраняет очередной дайджест ленты
    pub async fn create_digest(&self, name: &FeedName) -> Result<Digest> {
        let feed = self
            .feeds
            .get(name)
            .ok_or_else(|| anyhow!("unknown feed {:?}", name.as_str()))?;

        let count = self
            .store
            .count_digests_by_feed(name)
            .await
            .map_err(|e| anyhow!("counting digests of {}: {}", name, e))?;

        let mut content = Vec::with_capacity(feed.reddits.len());
        for sub in &feed.reddits {
            let block = self
                .fetcher
                .fetch_block(sub, feed.num_items)
                .await
                .map_err(|e| anyhow!("fetching r/{}: {}", sub, e))?;
            if block.stories.is_empty() {
                warn!(feed = %name, subreddit = %sub, "digest: subreddit returned no stories");
            }
            content.push(block);
        }

        let digest = NewDigest {
            title: format!("{} #{}", feed.title, count + 1),
            feed_name: name.clone(),
            created_at: Utc::now(),
            content,
        };
        let saved = self
            .store
            .insert_digest(digest)
            .await
            .map_err(|e| anyhow!("saving digest of {}: {}", name, e))?;
        info!(feed = %name, id = %saved.id, title = %saved.title, "digest: created");
        Ok(saved)
    }

    /// Дайджест для каждой ленты, по порядку имён; первая ошибка прерывает обход
    pub async fn create_all_digests(&self) -> Result<Vec<Digest>> {
        let mut created = Vec::with_capacity(self.feeds.len());
        for name in self.feeds.keys() {
            let digest = self
                .create_digest(name)
                .await
                .with_context(|| format!("feed {}", name))?;
            created.push(digest);
        }
        Ok(created)
    }

    /// Создаёт первый дайджест для лент, у которых ещё нет ни одного
    pub async fn ensure_initial_digests(&self) -> Result<Vec<Digest>> {
        let mut created = Vec::new();
        for name in self.feeds.keys() {
            let count = self
                .store
                .count_digests_by_feed(name)
                .await
                .map_err(|e| anyhow!("counting digests of {}: {}", name, e))?;
            if count == 0 {
                info!(feed = %name, "digest: feed has no digests yet, creating the first one");
                created.push(self.create_digest(name).await?);
            }
        }
        Ok(created)
    }
}
