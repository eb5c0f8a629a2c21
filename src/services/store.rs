use async_trait::async_trait;
use bon::Builder;
use std::fs;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::models::types::{Digest, DigestId, FeedName, Manifest, NewDigest};
use crate::traits::digest_store::DigestStore;

/// Реализация DigestStore для файловой системы.
///
/// Layout:
///
/// ```text
/// <dir>/manifest.json        last allocated id
/// <dir>/digests/<id>.json    one file per digest
/// ```
#[derive(Builder)]
pub struct FileSystemDigestStore {
    #[builder(into)]
    dir: PathBuf,
    /// Serializes id allocation and manifest updates
    #[builder(skip)]
    write_lock: Mutex<()>,
}

impl FileSystemDigestStore {
    fn manifest_path(&self) -> PathBuf {
        self.dir.join("manifest.json")
    }

    fn digests_dir(&self) -> PathBuf {
        self.dir.join("digests")
    }

    fn digest_path(&self, id: DigestId) -> PathBuf {
        self.digests_dir().join(format!("{}.json", id))
    }

    fn load_manifest(&self) -> std::io::Result<Manifest> {
        let p = self.manifest_path();
        if !p.exists() {
            return Ok(Manifest::new());
        }
        let data = fs::read_to_string(p)?;
        match serde_json::from_str::<Manifest>(&data) {
            Ok(m) => Ok(m),
            Err(e) => {
                warn!(error = %e, "store: manifest is unreadable, starting from scratch");
                Ok(Manifest::new())
            }
        }
    }

    fn save_manifest(&self, manifest: &Manifest) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let json = serde_json::to_string_pretty(manifest)?;
        fs::write(self.manifest_path(), json)?;
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<Digest>, Box<dyn std::error::Error + Send + Sync>> {
        let dir = self.digests_dir();
        if !dir.exists() {
            return Ok(vec![]);
        }
        let mut out = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let data = fs::read_to_string(&path)?;
            match serde_json::from_str::<Digest>(&data) {
                Ok(d) => out.push(d),
                Err(e) => warn!(path = %path.display(), error = %e, "store: skipping unreadable digest"),
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl DigestStore for FileSystemDigestStore {
    async fn initialize(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        fs::create_dir_all(self.digests_dir())?;
        if !self.manifest_path().exists() {
            self.save_manifest(&Manifest::new())?;
        }
        info!(dir = %self.dir.display(), "store: initialized");
        Ok(())
    }

    async fn insert_digest(
        &self,
        digest: NewDigest,
    ) -> Result<Digest, Box<dyn std::error::Error + Send + Sync>> {
        let _guard = self.write_lock.lock().await;
        fs::create_dir_all(self.digests_dir())?;

        let mut manifest = self.load_manifest()?;
        let id = manifest.next_id();
        let digest = Digest::from_new(id, digest);

        // the id is recorded before its file exists, so a failed write never
        // hands the same id out twice
        manifest.last_digest_id = Some(id);
        self.save_manifest(&manifest)?;
        let json = serde_json::to_string_pretty(&digest)?;
        fs::write(self.digest_path(id), json)?;

        info!(%id, feed = %digest.feed_name, stories = digest.story_count(), "store: digest inserted");
        Ok(digest)
    }

    async fn get_digests_by_feed(
        &self,
        feed: &FeedName,
    ) -> Result<Vec<Digest>, Box<dyn std::error::Error + Send + Sync>> {
        let mut digests: Vec<Digest> = self
            .read_all()?
            .into_iter()
            .filter(|d| &d.feed_name == feed)
            .collect();
        digests.sort_by(|a, b| b.id.cmp(&a.id));
        debug!(%feed, count = digests.len(), "store: digests loaded");
        Ok(digests)
    }

    async fn get_digest_by_id(
        &self,
        id: DigestId,
    ) -> Result<Option<Digest>, Box<dyn std::error::Error + Send + Sync>> {
        let p = self.digest_path(id);
        if !p.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(p)?;
        Ok(Some(serde_json::from_str::<Digest>(&data)?))
    }

    async fn count_digests_by_feed(
        &self,
        feed: &FeedName,
    ) -> Result<usize, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.read_all()?.iter().filter(|d| &d.feed_name == feed).count())
    }
}
