//! `[name]` placeholder interpolation, plus the `[%= name %]` and
//! `[%- name %]` tag forms. Square brackets are used since `<...>`
//! and `{...}`-like syntax would clash with the markup itself and
//! with inline scripts.

use std::{ops::Range, str::FromStr};

use anyhow::bail;
use kstring::KString;

use super::error::{RenderError, RenderErrorKind};
use super::variables::VariableSet;
use crate::str_util::{find_ignore_ascii_case, starts_with_ignore_ascii_case};
use crate::webutils::html_escape;

/// What to do with a placeholder naming a variable that isn't set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndefinedVariables {
    /// Render as the empty string.
    Empty,
    /// Leave the placeholder in the output unchanged.
    Keep,
    /// Fail the render pass.
    Fail,
}

impl Default for UndefinedVariables {
    fn default() -> Self {
        UndefinedVariables::Empty
    }
}

impl FromStr for UndefinedVariables {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "empty" => Ok(UndefinedVariables::Empty),
            "keep" => Ok(UndefinedVariables::Keep),
            "fail" => Ok(UndefinedVariables::Fail),
            _ => bail!("invalid policy {s:?}, expecting one of empty, keep, fail"),
        }
    }
}

/// Length of the variable name at the start of `s`: an ASCII letter
/// or `_`, then letters, digits, `_` or `-`.
fn name_len(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    match bytes.first() {
        Some(b) if b.is_ascii_alphabetic() || *b == b'_' => (),
        _ => return None
    }
    Some(bytes.iter()
         .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_' || **b == b'-')
         .count())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlaceholderKind {
    /// `[name]`
    Plain,
    /// `[%= name %]`, value is HTML-escaped
    Escaped,
    /// `[%- name %]`
    Raw,
}

#[derive(Debug)]
struct Placeholder<'s> {
    name: &'s str,
    kind: PlaceholderKind,
    /// Bytes taken up after the opening `[`, including the closing
    /// `]` or `%]`.
    len: usize,
}

/// Parse the placeholder whose opening `[` directly precedes `s`.
fn parse_placeholder(s: &str) -> Option<Placeholder> {
    if let Some(tag) = s.strip_prefix('%') {
        let (kind, inner) = match tag.as_bytes().first() {
            Some(b'=') => (PlaceholderKind::Escaped, &tag[1..]),
            Some(b'-') => (PlaceholderKind::Raw, &tag[1..]),
            _ => return None
        };
        let inner = inner.trim_start();
        let len = name_len(inner)?;
        let rest = inner[len..].trim_start().strip_prefix("%]")?;
        Some(Placeholder { name: &inner[..len], kind, len: s.len() - rest.len() })
    } else {
        let len = name_len(s)?;
        if s[len..].starts_with(']') {
            Some(Placeholder { name: &s[..len], kind: PlaceholderKind::Plain, len: len + 1 })
        } else {
            None
        }
    }
}

/// Whether `s` starts with an opening tag named `tagname` (ASCII case
/// insensitive), i.e. not a longer name like `<scripts`.
fn starts_with_tag(s: &str, tagname: &str) -> bool {
    starts_with_ignore_ascii_case(s, tagname)
        && match s.as_bytes().get(tagname.len()) {
            None => true,
            Some(b) => b.is_ascii_whitespace() || *b == b'>' || *b == b'/',
        }
}

/// Byte ranges of `<script>` and `<style>` elements, from the
/// opening tag to the closing one (or the end of `markup`).
fn raw_text_ranges(markup: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut pos = 0;
    while let Some(j) = markup[pos..].find('<') {
        let start = pos + j;
        let rest = &markup[start..];
        let closing = if starts_with_tag(rest, "<script") {
            "</script"
        } else if starts_with_tag(rest, "<style") {
            "</style"
        } else {
            pos = start + 1;
            continue
        };
        let end = find_ignore_ascii_case(markup, closing, start)
            .unwrap_or(markup.len());
        ranges.push(start..end);
        pos = end.max(start + 1);
    }
    ranges
}

/// Replace every `[name]`, `[%= name %]` and `[%- name %]` in
/// `markup` with the value of `name` from `variables`, HTML-escaped
/// for `[%= %]`. Brackets around anything else (`a[0]`, `[if IE]`)
/// are passed through, and so are `[name]` placeholders for undefined
/// variables inside `<script>` and `<style>` elements (`arr[i]`,
/// `a[href]`), whatever the policy.
pub fn render(
    markup: &str,
    variables: &VariableSet,
    undefined: UndefinedVariables,
) -> Result<String, RenderError> {
    let raw_text = raw_text_ranges(markup);
    let in_raw_text = |i: usize| raw_text.iter().any(|r| r.contains(&i));
    let mut out = String::with_capacity(markup.len());
    let mut pos = 0;
    while let Some(j) = markup[pos..].find('[') {
        let i = pos + j;
        out.push_str(&markup[pos..i]);
        let placeholder = match parse_placeholder(&markup[i + 1..]) {
            Some(p) => p,
            None => {
                out.push('[');
                pos = i + 1;
                continue
            }
        };
        let end = i + 1 + placeholder.len;
        match variables.get(placeholder.name) {
            Some(value) => match placeholder.kind {
                PlaceholderKind::Escaped => out.push_str(&html_escape(value)),
                _ => out.push_str(value),
            },
            None if placeholder.kind == PlaceholderKind::Plain && in_raw_text(i) =>
                out.push_str(&markup[i..end]),
            None => match undefined {
                UndefinedVariables::Empty => (),
                UndefinedVariables::Keep => out.push_str(&markup[i..end]),
                UndefinedVariables::Fail =>
                    return Err(RenderErrorKind::UndefinedVariable {
                        name: KString::from_ref(placeholder.name)
                    }.into()),
            }
        }
        pos = end;
    }
    out.push_str(&markup[pos..]);
    Ok(out)
}


#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> VariableSet {
        [("name", "Alice"), ("page-title", "Home"), ("empty", "")].into_iter().collect()
    }

    #[test]
    fn t_render() {
        let t = |s: &str, expected: &str| {
            assert_eq!(render(s, &vars(), UndefinedVariables::Empty).unwrap(), expected);
        };
        t("", "");
        t("no placeholders <b>here</b>", "no placeholders <b>here</b>");
        t("Hello [name]!", "Hello Alice!");
        t("<title>[page-title]</title>[name][name]", "<title>Home</title>AliceAlice");
        t("[empty]|[missing]|", "||");
        t("a[0] [if IE] [ name] [name", "a[0] [if IE] [ name] [name");
        t("[[name]]", "[Alice]");
        t("ü[name]ü", "üAliceü");
    }

    #[test]
    fn t_render_tag_forms() {
        let vars: VariableSet = [("title", "Home"), ("markup", "<i>'x'</i>")]
            .into_iter().collect();
        let t = |s: &str, expected: &str| {
            assert_eq!(render(s, &vars, UndefinedVariables::Empty).unwrap(), expected);
        };
        t("<h1>[%= title %]</h1>", "<h1>Home</h1>");
        t("[%=title%]|[%-  title %]", "Home|Home");
        t("[%= markup %]", "&lt;i&gt;&#39;x&#39;&lt;/i&gt;");
        t("[%- markup %]", "<i>'x'</i>");
        t("[%= missing %]|[%- missing %]", "|");
        t("[%= title] [% title %] [%= 1 %] [%= title", "[%= title] [% title %] [%= 1 %] [%= title");
        assert_eq!(render("[%= missing %]", &vars, UndefinedVariables::Keep).unwrap(),
                   "[%= missing %]");
        assert!(render("[%- missing %]", &vars, UndefinedVariables::Fail).is_err());
    }

    #[test]
    fn t_render_script_and_style() {
        let vars: VariableSet = [("title", "Home")].into_iter().collect();
        let t = |s: &str, policy: UndefinedVariables, expected: &str| {
            assert_eq!(render(s, &vars, policy).unwrap(), expected);
        };
        t("<style>a[href] { color: red }</style><script>x = arr[i];</script>\
           <h1>[%= title %]</h1>",
          UndefinedVariables::Empty,
          "<style>a[href] { color: red }</style><script>x = arr[i];</script>\
           <h1>Home</h1>");
        t("<SCRIPT type=\"module\">t = '[title]'; u = a[i];</SCRIPT>[i]",
          UndefinedVariables::Empty,
          "<SCRIPT type=\"module\">t = 'Home'; u = a[i];</SCRIPT>");
        t("<script>a[i]</script>", UndefinedVariables::Fail, "<script>a[i]</script>");
        t("<script>unterminated[i]", UndefinedVariables::Empty, "<script>unterminated[i]");
        t("<scripts>[i]</scripts>", UndefinedVariables::Empty, "<scripts></scripts>");
        assert!(render("<script>[%= i %]</script>", &vars, UndefinedVariables::Fail).is_err());
    }

    #[test]
    fn t_render_keep() {
        assert_eq!(render("x [missing] [name]", &vars(), UndefinedVariables::Keep).unwrap(),
                   "x [missing] Alice");
    }

    #[test]
    fn t_render_fail() {
        let e = render("x [missing]", &vars(), UndefinedVariables::Fail).err().unwrap();
        assert_eq!(e.to_string(), "undefined variable \"missing\"");
        assert!(render("x [name]", &vars(), UndefinedVariables::Fail).is_ok());
    }

    #[test]
    fn t_policy_from_str() {
        assert_eq!("keep".parse::<UndefinedVariables>().unwrap(), UndefinedVariables::Keep);
        assert!("strict".parse::<UndefinedVariables>().is_err());
    }
}
