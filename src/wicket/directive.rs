//! Finding directives in markup. Each `find_*` function returns the
//! leftmost complete directive as a span into the markup together
//! with its parsed parts; callers process it and scan again.

use std::ops::Range;

pub const CHILD_SLOT: &str = "<wicket:child></wicket:child>";

const EXTEND_START: &str = "<!-- extend-page=\"";
const INCLUDE_START: &str = "<!-- include-panel=\"";
const WITH_START: &str = "with=\"";
const COMMENT_END: &str = "-->";

/// The element wrapping a child's contribution in an extending
/// fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Extend,
    Panel,
    Dialog,
}

impl BlockKind {
    pub fn tag_name(self) -> &'static str {
        match self {
            BlockKind::Extend => "extend",
            BlockKind::Panel => "panel",
            BlockKind::Dialog => "dialog",
        }
    }

    pub fn members() -> &'static [Self] {
        &[BlockKind::Extend, BlockKind::Panel, BlockKind::Dialog]
    }

    fn closing_tag(self) -> String {
        format!("</wicket:{}>", self.tag_name())
    }

    /// Parse `<wicket:KIND ...>` at the start of `s`, returning the
    /// kind and the length of the whole opening tag.
    fn parse_opening_tag(s: &str) -> Option<(Self, usize)> {
        let rest = s.strip_prefix("<wicket:")?;
        for kind in Self::members() {
            if let Some(after) = rest.strip_prefix(kind.tag_name()) {
                match after.bytes().next() {
                    Some(b'>') => (),
                    Some(b) if b.is_ascii_whitespace() || b == b'/' => (),
                    _ => continue,
                }
                let taglen = after.find('>')? + 1;
                return Some((*kind, s.len() - after.len() + taglen))
            }
        }
        None
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ExtendDirective<'m> {
    /// From the start of the comment to the end of the closing tag.
    pub span: Range<usize>,
    pub ancestor: &'m str,
    /// Contents of the `with="..."` clause, if present.
    pub with_clause: Option<&'m str>,
    pub kind: BlockKind,
    /// Everything between the opening tag and the last matching
    /// closing tag.
    pub content: &'m str,
}

#[derive(Debug, PartialEq, Eq)]
pub struct IncludeDirective<'m> {
    /// The whole comment.
    pub span: Range<usize>,
    pub panel: &'m str,
    /// The raw text between the panel name and the comment end.
    pub attributes: &'m str,
}

fn skip_blanks(s: &str) -> &str {
    s.trim_start_matches(|c| c == ' ' || c == '\t')
}

fn parse_extend_at(markup: &str, start: usize) -> Option<ExtendDirective> {
    let name_start = start + EXTEND_START.len();
    let name_len = markup[name_start..].find('"')?;
    let ancestor = &markup[name_start..name_start + name_len];
    let mut rest = skip_blanks(&markup[name_start + name_len + 1..]);
    let mut with_clause = None;
    if let Some(after) = rest.strip_prefix(WITH_START) {
        let clause_len = after.find('"')?;
        with_clause = Some(&after[..clause_len]);
        rest = skip_blanks(&after[clause_len + 1..]);
    }
    rest = rest.strip_prefix(COMMENT_END)?;
    rest = rest.strip_prefix('\r').unwrap_or(rest);
    rest = rest.strip_prefix('\n')?;
    let (kind, taglen) = BlockKind::parse_opening_tag(rest)?;
    let content_start = markup.len() - rest.len() + taglen;
    let closing = kind.closing_tag();
    let content_len = markup[content_start..].rfind(&closing)?;
    Some(ExtendDirective {
        span: start..content_start + content_len + closing.len(),
        ancestor,
        with_clause,
        kind,
        content: &markup[content_start..content_start + content_len],
    })
}

/// Find the leftmost extend directive: the comment
/// `<!-- extend-page="NAME" with="..." -->` (the `with` clause being
/// optional), a line break, and a `<wicket:extend>` (or `panel`,
/// `dialog`) element reaching to the last matching closing tag.
pub fn find_extend_directive(markup: &str) -> Option<ExtendDirective> {
    markup.match_indices(EXTEND_START)
        .find_map(|(start, _)| parse_extend_at(markup, start))
}

fn parse_include_at(markup: &str, start: usize) -> Option<IncludeDirective> {
    let name_start = start + INCLUDE_START.len();
    let name_len = markup[name_start..].find('"')?;
    if name_len == 0 {
        return None
    }
    let attrs_start = name_start + name_len + 1;
    let line = markup[attrs_start..].split('\n').next()?;
    let attrs_len = line.find(COMMENT_END)?;
    Some(IncludeDirective {
        span: start..attrs_start + attrs_len + COMMENT_END.len(),
        panel: &markup[name_start..name_start + name_len],
        attributes: &markup[attrs_start..attrs_start + attrs_len],
    })
}

/// Find the leftmost `<!-- include-panel="NAME" attrs... -->`
/// comment; it must end on the line it starts on.
pub fn find_include_directive(markup: &str) -> Option<IncludeDirective> {
    markup.match_indices(INCLUDE_START)
        .find_map(|(start, _)| parse_include_at(markup, start))
}

/// Put `child` in place of the first child slot of `ancestor`;
/// `None` if there is no slot.
pub fn graft_child(ancestor: &str, child: &str) -> Option<String> {
    if ancestor.contains(CHILD_SLOT) {
        Some(ancestor.replacen(CHILD_SLOT, child, 1))
    } else {
        None
    }
}
