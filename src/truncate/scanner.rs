//! Tag boundary recognition for the truncator.
//!
//! This is not an HTML parser: it only answers "does a tag start here, and
//! where does it end". Attribute text is skipped without interpretation.

/// Kind of a recognized tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    /// `<name ...>`
    Start,
    /// `</name>`
    End,
    /// `<name/>`, `<name ... />`, comments and declarations.
    SelfClosing,
}

/// A tag found at some offset of the input. Borrows its name from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag<'a> {
    pub kind: TagKind,
    pub name: &'a str,
    /// Offset just past the closing `>`.
    pub end: usize,
}

/// Elements that never receive a closing tag, with or without `/>`.
const VOID_ELEMENTS: [&str; 9] = [
    "br", "col", "link", "base", "img", "param", "area", "hr", "input",
];

const COMMENT_OPEN: &str = "<!--";
const COMMENT_CLOSE: &str = "-->";

pub fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

impl Tag<'_> {
    /// True for start tags that must be closed if the text is cut inside them.
    pub fn opens_element(&self) -> bool {
        self.kind == TagKind::Start && !is_void(self.name)
    }
}

fn is_name_terminator(b: u8) -> bool {
    b.is_ascii_whitespace() || matches!(b, b'/' | b'>' | b'<')
}

/// Tries to recognize a tag at `offset`, which is expected to point at `<`.
///
/// Returns `None` when the bytes do not look like a tag; the caller then
/// treats the `<` as ordinary text. Recognized shapes:
///
/// * `<name>`, `<name attr...>`
/// * `</name>`, `</name attr...>`
/// * `<name/>`, `<name />`, `<name attr... />`
/// * `<!-- ... -->`, `<!DOCTYPE ...>`, `<?...>` (skipped, never opened)
pub fn scan_tag(input: &str, offset: usize) -> Option<Tag<'_>> {
    let bytes = input.as_bytes();
    if bytes.get(offset) != Some(&b'<') {
        return None;
    }

    let rest = &input[offset..];
    if rest.starts_with(COMMENT_OPEN) {
        let body = &rest[COMMENT_OPEN.len()..];
        let close = body.find(COMMENT_CLOSE)?;
        return Some(Tag {
            kind: TagKind::SelfClosing,
            name: "!--",
            end: offset + COMMENT_OPEN.len() + close + COMMENT_CLOSE.len(),
        });
    }

    let mut i = offset + 1;
    let closing = bytes.get(i) == Some(&b'/');
    if closing {
        i += 1;
    }

    let name_start = i;
    match bytes.get(name_start) {
        Some(b) if b.is_ascii_alphabetic() => {}
        Some(b'!' | b'?') if !closing => {}
        _ => return None,
    }
    while i < bytes.len() && !is_name_terminator(bytes[i]) {
        i += 1;
    }
    let name = &input[name_start..i];

    // a `<` before the `>` means this is not a tag
    let gt = i + bytes[i..].iter().position(|&b| b == b'>' || b == b'<')?;
    if bytes[gt] == b'<' {
        return None;
    }
    let interior = &bytes[i..gt];

    let self_closing = match interior.first() {
        None => false,
        Some(b'/') if interior.len() == 1 => true,
        Some(b'/') => return None,
        // whitespace: attribute text or `<name />`
        Some(_) => interior.trim_ascii_end().ends_with(b"/"),
    };

    let kind = if closing {
        TagKind::End
    } else if self_closing || matches!(name.as_bytes()[0], b'!' | b'?') {
        TagKind::SelfClosing
    } else {
        TagKind::Start
    };

    Some(Tag { kind, name, end: gt + 1 })
}
