//! Template filters and functions registered on the renderer's tera instance.
//!
//! The truncation filters are the loosely typed boundary in front of
//! [`crate::truncate::truncate`]: argument values are checked here and
//! mapped onto [`TruncateError`]. A failing call is logged and renders as
//! empty content.

use std::collections::HashMap;

use tera::{Filter, Function, Tera, Value};
use tracing::warn;
use url::{Position, Url};

use crate::truncate::{Mode, Text, TruncateError, Truncation, truncate};

/// `trunc` / `truncate_html`
pub struct TruncateFilter {
    mode: Mode,
    /// Plain-text ellipsis used when the template passes none
    default_ellipsis: Option<String>,
}

impl TruncateFilter {
    pub fn new(mode: Mode, default_ellipsis: Option<String>) -> Self {
        Self { mode, default_ellipsis }
    }

    fn apply(&self, value: &Value, args: &HashMap<String, Value>) -> Result<Truncation, TruncateError> {
        let text = match value {
            Value::String(s) => s.as_str(),
            Value::Null => return Err(TruncateError::MissingArgument("text")),
            _ => return Err(TruncateError::InvalidTextType),
        };
        let budget = budget_arg(args.get("length"))?;

        let html_ellipsis = ellipsis_arg(args.get("ellipsis_html"))?.map(Text::Html);
        let plain_ellipsis = ellipsis_arg(args.get("ellipsis"))?
            .or(self.default_ellipsis.as_deref())
            .map(Text::Plain);

        let text = match self.mode {
            Mode::Html => Text::Html(text),
            Mode::Plain => Text::Plain(text),
        };
        truncate(text, budget, html_ellipsis.or(plain_ellipsis))
    }
}

impl Filter for TruncateFilter {
    fn filter(&self, value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
        match self.apply(value, args) {
            Ok(t) => Ok(Value::String(t.html.into_inner())),
            Err(e) => {
                warn!(mode = %self.mode, error = %e, "render: truncation failed, rendering empty");
                Ok(Value::String(String::new()))
            }
        }
    }

    fn is_safe(&self) -> bool {
        true
    }
}

fn budget_arg(arg: Option<&Value>) -> Result<usize, TruncateError> {
    let arg = arg.ok_or(TruncateError::MissingArgument("length"))?;
    let n = match arg {
        Value::Number(n) => n.as_i64().ok_or_else(|| TruncateError::InvalidBudget(n.to_string()))?,
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| TruncateError::InvalidBudget(s.clone()))?,
        Value::Null => return Err(TruncateError::MissingArgument("length")),
        other => return Err(TruncateError::InvalidBudget(other.to_string())),
    };
    usize::try_from(n)
        .ok()
        .filter(|b| *b > 0)
        .ok_or_else(|| TruncateError::InvalidBudget(n.to_string()))
}

fn ellipsis_arg(arg: Option<&Value>) -> Result<Option<&str>, TruncateError> {
    match arg {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(TruncateError::InvalidEllipsisType),
    }
}

/// `www.example.com` -> `example.com`
pub fn trim_www(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    let s = tera::try_get_value!("trim_www", "value", String, value);
    Ok(Value::String(s.strip_prefix("www.").unwrap_or(&s).to_string()))
}

/// Rewrites a link so it opens in the Apollo Reddit client
pub fn apollo_link(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    let s = tera::try_get_value!("apollo_link", "value", String, value);
    match Url::parse(&s) {
        Ok(u) => Ok(Value::String(format!("apollo://{}", &u[Position::BeforeUsername..]))),
        Err(_) => Ok(Value::String(s)),
    }
}

/// `digest_url(feed=..., id=...)`
pub struct DigestUrl {
    base_url: String,
}

impl DigestUrl {
    pub fn new(base_url: &str) -> Self {
        Self { base_url: base_url.trim_end_matches('/').to_string() }
    }

    pub fn url(&self, feed: &str, id: &str) -> String {
        format!("{}/feeds/{}/digests/{}", self.base_url, feed, id)
    }
}

impl Function for DigestUrl {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let feed = match args.get("feed") {
            Some(Value::String(s)) => s.clone(),
            _ => return Err(tera::Error::msg("digest_url: `feed` must be a string")),
        };
        let id = match args.get("id") {
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) => s.clone(),
            _ => return Err(tera::Error::msg("digest_url: `id` is required")),
        };
        Ok(Value::String(self.url(&feed, &id)))
    }
}

pub fn register(tera: &mut Tera, base_url: &str, default_ellipsis: Option<String>) {
    tera.register_filter("trunc", TruncateFilter::new(Mode::Plain, default_ellipsis.clone()));
    tera.register_filter("truncate_html", TruncateFilter::new(Mode::Html, default_ellipsis));
    tera.register_filter("trim_www", trim_www);
    tera.register_filter("apollo_link", apollo_link);
    tera.register_function("digest_url", DigestUrl::new(base_url));
}
