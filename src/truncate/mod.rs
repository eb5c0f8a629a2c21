//! Markup-aware truncation.
//!
//! Shortens HTML or plain text to a bounded number of visible characters.
//! Cuts prefer word boundaries, never split a code point, and in HTML mode
//! every tag left open at the cut is closed again, so the output is
//! well-nested markup whenever the input was.

pub mod boundary;
pub mod scanner;
pub mod stack;

use std::borrow::Cow;

use thiserror::Error;

use crate::models::types::SafeHtml;
use boundary::BoundaryTracker;
use scanner::{TagKind, scan_tag};
use stack::OpenTagStack;

/// Appended when the caller does not supply an ellipsis.
pub const DEFAULT_ELLIPSIS: &str = " …";

/// How the input is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    /// Trusted markup: tags are skipped and kept balanced.
    Html,
    /// Untrusted text: nothing is interpreted, the output is escaped.
    Plain,
}

/// A string together with its safety classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Text<'a> {
    Html(&'a str),
    Plain(&'a str),
}

impl<'a> Text<'a> {
    pub fn mode(&self) -> Mode {
        match self {
            Text::Html(_) => Mode::Html,
            Text::Plain(_) => Mode::Plain,
        }
    }

    pub fn as_str(&self) -> &'a str {
        match *self {
            Text::Html(s) | Text::Plain(s) => s,
        }
    }

    /// Markup-safe rendition: markup as-is, plain text escaped.
    pub fn to_safe(&self) -> Cow<'a, str> {
        match *self {
            Text::Html(s) => Cow::Borrowed(s),
            Text::Plain(s) => escape(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TruncateError {
    #[error("truncation length must be a positive integer, got {0}")]
    InvalidBudget(String),
    #[error("truncate requires a length and a string: {0} is missing")]
    MissingArgument(&'static str),
    #[error("ellipsis must be a string")]
    InvalidEllipsisType,
    #[error("text to truncate must be a string")]
    InvalidTextType,
}

/// Result of a truncation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Truncation {
    pub html: SafeHtml,
    /// Whether anything was cut (and the ellipsis appended).
    pub truncated: bool,
}

pub fn escape(text: &str) -> Cow<'_, str> {
    html_escape::encode_quoted_attribute(text)
}

/// Truncates `text` to at most `budget` visible characters.
///
/// Markup and the ellipsis do not count against the budget. When the text
/// already fits it is returned unchanged (escaped in plain mode) and no
/// ellipsis is added.
pub fn truncate(
    text: Text<'_>,
    budget: usize,
    ellipsis: Option<Text<'_>>,
) -> Result<Truncation, TruncateError> {
    if budget == 0 {
        return Err(TruncateError::InvalidBudget(budget.to_string()));
    }

    let input = text.as_str();
    // visible length never exceeds the full length
    if input.chars().count() <= budget {
        return Ok(untouched(text));
    }

    let markup = text.mode() == Mode::Html;
    let mut tracker = BoundaryTracker::default();
    let mut tags = OpenTagStack::default();
    let mut visible = 0usize;
    let mut cursor = 0usize;

    while let Some(ch) = input[cursor..].chars().next() {
        if markup && ch == '<' {
            if let Some(tag) = scan_tag(input, cursor) {
                match tag.kind {
                    TagKind::Start if tag.opens_element() => tags.open(tag.name, cursor),
                    TagKind::End => tags.close(tag.name, cursor),
                    _ => {}
                }
                tracker.skip_markup();
                cursor = tag.end;
                continue;
            }
        }

        visible += 1;
        tracker.observe(cursor, ch);
        if visible > budget {
            let cut = tracker.candidate().unwrap_or(cursor);
            let ellipsis = ellipsis.map_or(Cow::Borrowed(DEFAULT_ELLIPSIS), |e| e.to_safe());
            return Ok(finish(input, cut, markup, tags, &ellipsis));
        }
        cursor += ch.len_utf8();
    }

    Ok(untouched(text))
}

fn untouched(text: Text<'_>) -> Truncation {
    Truncation {
        html: SafeHtml::from(text.to_safe().into_owned()),
        truncated: false,
    }
}

fn finish(input: &str, cut: usize, markup: bool, mut tags: OpenTagStack<'_>, ellipsis: &str) -> Truncation {
    let kept = &input[..cut];
    let mut out = String::with_capacity(cut + ellipsis.len() + 16);

    if markup {
        out.push_str(kept);
        out.push_str(ellipsis);
        tags.rewind_to(cut);
        for tag in tags.unclosed() {
            out.push_str("</");
            out.push_str(tag.name);
            out.push('>');
        }
    } else {
        out.push_str(&escape(kept));
        out.push_str(ellipsis);
    }

    Truncation {
        html: SafeHtml::from(out),
        truncated: true,
    }
}
