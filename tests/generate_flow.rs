use mailshine::models::types::{DigestId, FeedName};
use mailshine::run_generate;
use mailshine::services::store::FileSystemDigestStore;
use mailshine::traits::digest_store::DigestStore;
use pretty_assertions::assert_eq;
use serial_test::serial;
use wiremock::MockServer;

mod common;

use crate::common::{mount_token, mount_top, mount_top_error, write_config};

#[tokio::test]
#[serial]
async fn generate_creates_one_digest_per_feed() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_top(&server, "Games", 2).await;
    mount_top(&server, "pcgaming", 2).await;
    mount_top(&server, "rust", 3).await;

    let tmp = tempfile::tempdir().unwrap();
    let store_dir = tmp.path().join("store");
    let cfg = write_config(tmp.path(), &server.uri(), &store_dir);

    run_generate(cfg.to_str().unwrap()).await.unwrap();
    run_generate(cfg.to_str().unwrap()).await.unwrap();

    let store = FileSystemDigestStore::builder().dir(&store_dir).build();
    let games = store.get_digests_by_feed(&FeedName::from("games")).await.unwrap();
    let titles: Vec<&str> = games.iter().map(|d| d.title.as_str()).collect();
    assert_eq!(titles, vec!["Games #2", "Games #1"]);

    let first = &games[1];
    let blocks: Vec<&str> = first.content.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(blocks, vec!["r/Games", "r/pcgaming"]);
    assert_eq!(first.story_count(), 4);

    // feeds are processed in name order: games, then rust
    assert_eq!(first.id, DigestId::from(1));
    let rust = store.get_digest_by_id(DigestId::from(2)).await.unwrap().unwrap();
    assert_eq!(rust.title, "Rust #1");
    assert_eq!(rust.story_count(), 3);
}

#[tokio::test]
#[serial]
async fn generate_fails_when_a_subreddit_fails() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_top(&server, "Games", 2).await;
    mount_top_error(&server, "pcgaming", 500).await;

    let tmp = tempfile::tempdir().unwrap();
    let store_dir = tmp.path().join("store");
    let cfg = write_config(tmp.path(), &server.uri(), &store_dir);

    let err = run_generate(cfg.to_str().unwrap()).await.unwrap_err();
    assert!(err.to_string().contains("r/pcgaming"), "{err}");

    let store = FileSystemDigestStore::builder().dir(&store_dir).build();
    assert_eq!(store.count_digests_by_feed(&FeedName::from("games")).await.unwrap(), 0);
    assert_eq!(store.count_digests_by_feed(&FeedName::from("rust")).await.unwrap(), 0);
}
