use async_trait::async_trait;

use crate::models::types::Block;

/// Общий интерфейс источника записей для дайджеста.
///
/// Реализации должны быть потокобезопасны: один экземпляр используется
/// и планировщиком, и ручной генерацией (`--generate`).
#[async_trait]
pub trait StoryFetcher: Send + Sync {
    /// Возвращает блок из не более чем `limit` лучших записей источника.
    async fn fetch_block(
        &self,
        source: &str,
        limit: usize,
    ) -> Result<Block, Box<dyn std::error::Error + Send + Sync>>;
}
