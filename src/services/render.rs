use bon::bon;
use serde::Serialize;
use tera::{Context, Tera};
use tracing::debug;

use crate::models::types::{Digest, FeedName};
use crate::services::filters::{self, DigestUrl};
use crate::services::settings::{AppConfig, FeedConfig};

pub const DEFAULT_TITLE_MAX_CHARS: usize = 300;
pub const DEFAULT_EXCERPT_MAX_CHARS: usize = 500;

const DIGEST_BODY_TEMPLATE: &str = include_str!("../../templates/digest_body.html");
const DIGEST_TEMPLATE: &str = include_str!("../../templates/digest.html");
const FEED_TEMPLATE: &str = include_str!("../../templates/feed.html");
const RSS_TEMPLATE: &str = include_str!("../../templates/rss.xml");

#[derive(Serialize)]
struct DigestLink<'a> {
    id: u64,
    title: &'a str,
    date: String,
}

#[derive(Serialize)]
struct RssItem<'a> {
    title: &'a str,
    url: String,
    pub_date: String,
    description: String,
}

/// Рендеринг страниц дайджестов и RSS через tera
pub struct Renderer {
    tera: Tera,
    base_url: String,
    urls: DigestUrl,
    title_max_chars: usize,
    excerpt_max_chars: usize,
}

#[bon]
impl Renderer {
    #[builder]
    pub fn new(
        base_url: String,
        title_max_chars: Option<usize>,
        excerpt_max_chars: Option<usize>,
        ellipsis: Option<String>,
    ) -> tera::Result<Self> {
        let mut tera = Tera::default();
        // the .html/.xml names turn on tera's autoescaping
        tera.add_raw_templates(vec![
            ("digest_body.html", DIGEST_BODY_TEMPLATE),
            ("digest.html", DIGEST_TEMPLATE),
            ("feed.html", FEED_TEMPLATE),
            ("rss.xml", RSS_TEMPLATE),
        ])?;
        filters::register(&mut tera, &base_url, ellipsis);

        let base_url = base_url.trim_end_matches('/').to_string();
        Ok(Self {
            tera,
            urls: DigestUrl::new(&base_url),
            base_url,
            title_max_chars: title_max_chars.unwrap_or(DEFAULT_TITLE_MAX_CHARS),
            excerpt_max_chars: excerpt_max_chars.unwrap_or(DEFAULT_EXCERPT_MAX_CHARS),
        })
    }
}

impl Renderer {
    pub fn from_config(cfg: &AppConfig) -> tera::Result<Self> {
        let render = cfg.render.as_ref();
        Self::builder()
            .base_url(cfg.base_url.clone())
            .maybe_title_max_chars(render.and_then(|r| r.title_max_chars))
            .maybe_excerpt_max_chars(render.and_then(|r| r.excerpt_max_chars))
            .maybe_ellipsis(render.and_then(|r| r.ellipsis.clone()))
            .build()
    }

    pub fn feed_url(&self, name: &FeedName) -> String {
        format!("{}/feeds/{}", self.base_url, name)
    }

    pub fn rss_url(&self, name: &FeedName) -> String {
        format!("{}/feeds/{}/rss", self.base_url, name)
    }

    fn digest_context(&self, feed: &FeedConfig, digest: &Digest) -> Context {
        let mut ctx = Context::new();
        ctx.insert("feed", feed);
        ctx.insert("digest", digest);
        ctx.insert("date", &digest.created_at.format("%B %-d, %Y").to_string());
        ctx.insert("rss_url", &self.rss_url(&digest.feed_name));
        ctx.insert("title_max_chars", &self.title_max_chars);
        ctx.insert("excerpt_max_chars", &self.excerpt_max_chars);
        ctx
    }

    /// Полная HTML-страница дайджеста
    pub fn render_digest(&self, feed: &FeedConfig, digest: &Digest) -> tera::Result<String> {
        debug!(id = %digest.id, "render: digest page");
        self.tera.render("digest.html", &self.digest_context(feed, digest))
    }

    /// Тело дайджеста без обёртки страницы (для RSS)
    pub fn render_digest_body(&self, feed: &FeedConfig, digest: &Digest) -> tera::Result<String> {
        self.tera.render("digest_body.html", &self.digest_context(feed, digest))
    }

    pub fn render_feed_page(
        &self,
        name: &FeedName,
        feed: &FeedConfig,
        digests: &[Digest],
    ) -> tera::Result<String> {
        let links: Vec<DigestLink> = digests
            .iter()
            .map(|d| DigestLink {
                id: d.id.get(),
                title: &d.title,
                date: d.created_at.format("%Y-%m-%d").to_string(),
            })
            .collect();

        let mut ctx = Context::new();
        ctx.insert("feed", feed);
        ctx.insert("feed_name", name.as_str());
        ctx.insert("rss_url", &self.rss_url(name));
        ctx.insert("digests", &links);
        self.tera.render("feed.html", &ctx)
    }

    pub fn render_rss(
        &self,
        name: &FeedName,
        feed: &FeedConfig,
        digests: &[Digest],
    ) -> tera::Result<String> {
        let mut items = Vec::with_capacity(digests.len());
        for d in digests {
            items.push(RssItem {
                title: &d.title,
                url: self.urls.url(name.as_str(), &d.id.to_string()),
                pub_date: d.created_at.to_rfc2822(),
                description: self.render_digest_body(feed, d)?,
            });
        }

        let mut ctx = Context::new();
        ctx.insert("feed", feed);
        ctx.insert("feed_url", &self.feed_url(name));
        ctx.insert("items", &items);
        self.tera.render("rss.xml", &ctx)
    }
}
