use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};
use derive_more::{From, Into, Display, AsRef, FromStr};

/// Имя ленты из конфигурации (ключ в `feeds`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, From, Into, Display, AsRef, FromStr)]
#[from(String, &str)]
pub struct FeedName(String);

impl FeedName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Идентификатор дайджеста, сквозной для всех лент
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, From, Into, Display, FromStr)]
pub struct DigestId(u64);

impl DigestId {
    pub fn get(&self) -> u64 {
        self.0
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

/// Разметка, безопасная для вставки в HTML без экранирования
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, From, Into, Display, AsRef)]
#[from(String, &str)]
pub struct SafeHtml(String);

impl SafeHtml {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Одна запись из сабреддита
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub title: String,
    pub link: String,
    pub hostname: String,
    pub comments_link: String,
    pub num_comments: u64,
    #[serde(default)]
    pub score: i64,
    pub subreddit: String,
    /// Текст поста, уже отрендеренный Reddit в HTML
    #[serde(default)]
    pub excerpt_html: Option<String>,
}

/// Блок дайджеста: записи одного источника
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub title: String,
    pub stories: Vec<Story>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDigest {
    pub title: String,
    pub feed_name: FeedName,
    pub created_at: DateTime<Utc>,
    pub content: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Digest {
    pub id: DigestId,
    pub title: String,
    pub feed_name: FeedName,
    pub created_at: DateTime<Utc>,
    pub content: Vec<Block>,
}

impl Digest {
    pub fn from_new(id: DigestId, new: NewDigest) -> Self {
        Self {
            id,
            title: new.title,
            feed_name: new.feed_name,
            created_at: new.created_at,
            content: new.content,
        }
    }

    pub fn story_count(&self) -> usize {
        self.content.iter().map(|b| b.stories.len()).sum()
    }
}

/// Состояние хранилища дайджестов
#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct Manifest {
    #[serde(default)]
    pub last_digest_id: Option<DigestId>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Следующий свободный идентификатор (начиная с 1)
    pub fn next_id(&self) -> DigestId {
        self.last_digest_id.map_or(DigestId::from(1), |id| id.next())
    }
}
