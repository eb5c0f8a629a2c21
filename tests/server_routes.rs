use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Utc;
use mailshine::models::types::{Block, FeedName, NewDigest, Story};
use mailshine::services::render::Renderer;
use mailshine::services::settings::FeedConfig;
use mailshine::services::store::FileSystemDigestStore;
use mailshine::subsystems::server::build_router;
use mailshine::subsystems::AppState;
use mailshine::traits::digest_store::DigestStore;
use pretty_assertions::assert_eq;
use rstest::rstest;

fn new_digest(feed: &str, title: &str) -> NewDigest {
    NewDigest {
        title: title.to_string(),
        feed_name: feed.into(),
        created_at: Utc::now(),
        content: vec![Block {
            title: "r/Games".to_string(),
            stories: vec![Story {
                title: "A <great> game".to_string(),
                link: "https://www.example.com/game".to_string(),
                hostname: "www.example.com".to_string(),
                comments_link: "https://old.reddit.com/r/Games/comments/k4gz5k/game/".to_string(),
                num_comments: 7,
                score: 99,
                subreddit: "r/Games".to_string(),
                excerpt_html: None,
            }],
        }],
    }
}

struct TestServer {
    addr: SocketAddr,
    _store_dir: tempfile::TempDir,
    _static_dir: tempfile::TempDir,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Store with games #1 (id 1), rust #1 (id 2), games #2 (id 3)
async fn start() -> TestServer {
    let store_dir = tempfile::tempdir().unwrap();
    let static_dir = tempfile::tempdir().unwrap();
    std::fs::write(static_dir.path().join("style.css"), "body { margin: 0; }").unwrap();

    let store = Arc::new(FileSystemDigestStore::builder().dir(store_dir.path()).build());
    store.initialize().await.unwrap();
    store.insert_digest(new_digest("games", "Games #1")).await.unwrap();
    store.insert_digest(new_digest("rust", "Rust #1")).await.unwrap();
    store.insert_digest(new_digest("games", "Games #2")).await.unwrap();

    let mut feeds = BTreeMap::new();
    feeds.insert(FeedName::from("games"), FeedConfig { title: "Games".into(), reddits: vec!["Games".into()], num_items: 1 });
    feeds.insert(FeedName::from("rust"), FeedConfig { title: "Rust".into(), reddits: vec!["rust".into()], num_items: 1 });

    let renderer = Renderer::builder().base_url("http://localhost:8080".to_string()).build().unwrap();
    let state = AppState::builder()
        .store(store)
        .renderer(Arc::new(renderer))
        .feeds(Arc::new(feeds))
        .build();
    let router = build_router(state, static_dir.path().to_str());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestServer { addr, _store_dir: store_dir, _static_dir: static_dir }
}

#[tokio::test]
async fn index_says_welcome() {
    let srv = start().await;
    let resp = reqwest::get(srv.url("/")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "Welcome!\n");
}

#[rstest]
#[case("/feeds/games")]
#[case("/feeds/games/")]
#[tokio::test]
async fn feed_page_lists_newest_first(#[case] path: &str) {
    let srv = start().await;
    let resp = reqwest::get(srv.url(path)).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body = resp.text().await.unwrap();
    let newest = body.find("Games #2").unwrap();
    let oldest = body.find("Games #1").unwrap();
    assert!(newest < oldest);
    assert!(!body.contains("Rust #1"));
}

#[tokio::test]
async fn digest_page_renders_escaped_story() {
    let srv = start().await;
    let resp = reqwest::get(srv.url("/feeds/games/digests/3")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body = resp.text().await.unwrap();
    assert!(body.contains("<title>Games #2</title>"));
    assert!(body.contains("A &lt;great&gt; game"), "{body}");
    assert!(body.contains("7 comments"));
}

#[tokio::test]
async fn rss_feed_has_item_per_digest() {
    let srv = start().await;
    let resp = reqwest::get(srv.url("/feeds/games/rss")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let ctype = resp.headers()["content-type"].to_str().unwrap().to_string();
    assert!(ctype.starts_with("application/rss+xml"), "{ctype}");
    let body = resp.text().await.unwrap();
    assert!(body.starts_with("<?xml"));
    assert_eq!(body.matches("<item>").count(), 2);
}

#[tokio::test]
async fn unknown_feed_is_not_found() {
    let srv = start().await;
    let resp = reqwest::get(srv.url("/feeds/nope")).await.unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(resp.text().await.unwrap(), "Not Found: Couldn't find feed \"nope\"");
}

#[rstest]
#[case("/feeds/games/digests/99")]
#[case("/feeds/games/digests/abc")]
// digest 2 belongs to the rust feed
#[case("/feeds/games/digests/2")]
#[case("/feeds/nope/digests/1")]
#[tokio::test]
async fn missing_digests_are_not_found(#[case] path: &str) {
    let srv = start().await;
    let resp = reqwest::get(srv.url(path)).await.unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn serves_static_files() {
    let srv = start().await;
    let resp = reqwest::get(srv.url("/static/style.css")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "body { margin: 0; }");
}
