//! Removal of the `wicket:` namespace markup once composition is
//! done.

use crate::str_util::{find_ignore_ascii_case, starts_with_ignore_ascii_case, word_len};

const NAMESPACE: &str = "wicket:";

/// Length of the tag starting at `s` (which starts with `<`) if it is
/// a `<wicket:...>`, `</wicket:...>`, `<_wicket:...>` or
/// `</_wicket:...>` tag.
fn namespace_tag_len(s: &str) -> Option<usize> {
    let mut rest = &s[1..];
    rest = rest.strip_prefix('/').unwrap_or(rest);
    rest = rest.strip_prefix('_').unwrap_or(rest);
    if !starts_with_ignore_ascii_case(rest, NAMESPACE) {
        return None
    }
    let end = rest.find('>')?;
    Some(s.len() - rest.len() + end + 1)
}

fn strip_tags(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut rest = markup;
    while let Some(i) = rest.find('<') {
        out.push_str(&rest[..i]);
        match namespace_tag_len(&rest[i..]) {
            Some(len) => rest = &rest[i + len..],
            None => {
                out.push('<');
                rest = &rest[i + 1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Remove `wicket:NAME` and `wicket:NAME="..."` tokens, including
/// whatever non-space text is glued to their front and one preceding
/// whitespace character.
fn strip_attributes(markup: &str) -> String {
    let bytes = markup.as_bytes();
    let mut out = String::with_capacity(markup.len());
    // start of the not yet copied part
    let mut copied = 0;
    let mut pos = 0;
    while let Some(q) = find_ignore_ascii_case(markup, NAMESPACE, pos) {
        let name_start = q + NAMESPACE.len();
        let namelen = word_len(&markup[name_start..]);
        if namelen == 0 {
            pos = name_start;
            continue;
        }
        let mut end = name_start + namelen;
        if markup[end..].starts_with("=\"") {
            if let Some(len) = markup[end + 2..].find('"') {
                end += 2 + len + 1;
            }
        }
        let mut start = q;
        while start > copied && !bytes[start - 1].is_ascii_whitespace() {
            start -= 1;
        }
        if start > copied && bytes[start - 1].is_ascii_whitespace() {
            start -= 1;
        }
        out.push_str(&markup[copied..start]);
        copied = end;
        pos = end;
    }
    out.push_str(&markup[copied..]);
    out
}

/// Remove all namespace tags, then all namespace attributes, until
/// nothing is left to remove.
pub fn strip(markup: &str) -> String {
    let mut current = strip_attributes(&strip_tags(markup));
    loop {
        let next = strip_attributes(&strip_tags(&current));
        if next.len() == current.len() {
            return current
        }
        current = next;
    }
}
