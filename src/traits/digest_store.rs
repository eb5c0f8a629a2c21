use async_trait::async_trait;

use crate::models::types::{Digest, DigestId, FeedName, NewDigest};

/// Trait для хранилища дайджестов
#[async_trait]
pub trait DigestStore: Send + Sync {
    /// Создаёт структуру хранилища, если её ещё нет
    async fn initialize(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Сохраняет дайджест и присваивает ему идентификатор
    async fn insert_digest(
        &self,
        digest: NewDigest,
    ) -> Result<Digest, Box<dyn std::error::Error + Send + Sync>>;

    /// Дайджесты ленты, новые первыми
    async fn get_digests_by_feed(
        &self,
        feed: &FeedName,
    ) -> Result<Vec<Digest>, Box<dyn std::error::Error + Send + Sync>>;

    /// Загружает дайджест по идентификатору
    async fn get_digest_by_id(
        &self,
        id: DigestId,
    ) -> Result<Option<Digest>, Box<dyn std::error::Error + Send + Sync>>;

    /// Количество дайджестов ленты
    async fn count_digests_by_feed(
        &self,
        feed: &FeedName,
    ) -> Result<usize, Box<dyn std::error::Error + Send + Sync>>;
}
