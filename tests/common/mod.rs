#![allow(dead_code)]

use std::fs;
use std::path::Path;

use serde_json::{Value, json};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ACCESS_TOKEN: &str = "test-token";
/// base64("id:secret")
pub const BASIC_AUTH: &str = "Basic aWQ6c2VjcmV0";

pub fn listing(sub: &str, n: usize) -> Value {
    let children: Vec<Value> = (0..n)
        .map(|i| {
            json!({
                "kind": "t3",
                "data": {
                    "title": format!("{} story {}", sub, i),
                    "url": format!("https://www.example.com/{}/{}", sub, i),
                    "permalink": format!("/r/{}/comments/abc{}/story_{}/", sub, i, i),
                    "num_comments": 10 * i,
                    "score": 100 - i as i64,
                    "subreddit": sub,
                    "selftext_html": if i == 0 { Value::from("<p>Self <b>post</b> body</p>") } else { Value::Null },
                }
            })
        })
        .collect();
    json!({ "kind": "Listing", "data": { "children": children, "after": null } })
}

pub async fn mount_token(server: &MockServer) {
    mount_token_times(server, 1u64..).await;
}

pub async fn mount_token_times(server: &MockServer, times: impl Into<wiremock::Times>) {
    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .and(header("authorization", BASIC_AUTH))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": ACCESS_TOKEN,
            "token_type": "bearer",
            "expires_in": 86400,
            "scope": "*"
        })))
        .expect(times)
        .mount(server)
        .await;
}

pub async fn mount_top(server: &MockServer, sub: &str, limit: usize) {
    Mock::given(method("GET"))
        .and(path(format!("/r/{}/top", sub)))
        .and(query_param("t", "day"))
        .and(query_param("limit", limit.to_string()))
        .and(query_param("raw_json", "1"))
        .and(header("authorization", format!("Bearer {}", ACCESS_TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(sub, limit)))
        .mount(server)
        .await;
}

pub async fn mount_top_error(server: &MockServer, sub: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(format!("/r/{}/top", sub)))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Writes a two-feed config that points every Reddit endpoint at `reddit_base`
pub fn write_config(dir: &Path, reddit_base: &str, store_dir: &Path) -> std::path::PathBuf {
    let cfg = format!(
        r#"
base_url: "http://localhost:8080"
feeds:
  games:
    title: "Games"
    reddits: ["Games", "pcgaming"]
    num_items: 2
  rust:
    title: "Rust"
    reddits: ["rust"]
    num_items: 3
reddit:
  client_id: "id"
  client_secret: "secret"
  auth_url: "{base}/api/v1/access_token"
  api_base_url: "{base}"
  request_timeout_secs: 5
store:
  dir: "{store}"
"#,
        base = reddit_base,
        store = store_dir.display(),
    );
    let p = dir.join("config.yaml");
    fs::write(&p, cfg).unwrap();
    p
}
