//! Variable sets for a render pass and the ways they are filled:
//! query parameters, `with="..."` clauses on extend directives and
//! attributes on include directives.

use kstring::KString;

use crate::str_util::word_len;
use super::error::{RenderError, RenderErrorKind};

/// An ordered mapping from variable name to value. Small, hence a
/// plain association list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableSet(Vec<(KString, String)>);

impl VariableSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k.as_str() == name).map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Set `name`, replacing an existing value in place (keeping its
    /// position).
    pub fn insert(&mut self, name: KString, value: String) {
        if let Some(slot) = self.0.iter_mut().find(|(k, _)| *k == name) {
            slot.1 = value;
        } else {
            self.0.push((name, value));
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Add the pairs from `additions` whose names are not bound yet;
    /// existing entries are never overwritten. Used when defaults
    /// declared by an ancestor flow in below what the child (or the
    /// query string) already set.
    pub fn merge_first_wins(
        &mut self,
        additions: impl IntoIterator<Item = (KString, String)>
    ) {
        for (name, value) in additions {
            if !self.contains(&name) {
                self.0.push((name, value));
            }
        }
    }

    /// A new set where the entries from `local` replace those with
    /// the same name in `self`. Used to enter a panel's own scope.
    pub fn merge_override_wins(&self, local: &VariableSet) -> VariableSet {
        let mut merged = self.clone();
        for (name, value) in &local.0 {
            merged.insert(name.clone(), value.clone());
        }
        merged
    }
}

impl<K: Into<KString>, V: Into<String>> FromIterator<(K, V)> for VariableSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = VariableSet::new();
        for (k, v) in iter {
            set.insert(k.into(), v.into());
        }
        set
    }
}


/// Parse `name="value"` pairs as found after the panel name in an
/// include directive. Names are `\w+` and must start the input or
/// follow whitespace; values are double-quoted without escapes.
/// Anything not fitting is skipped, never an error.
pub fn extract_inline_variables(attributes: &str) -> VariableSet {
    let mut vars = VariableSet::new();
    let bytes = attributes.as_bytes();
    let mut pos = 0;
    while pos < bytes.len() {
        if bytes[pos].is_ascii_whitespace() {
            pos += 1;
            continue;
        }
        let namelen = word_len(&attributes[pos..]);
        let after_name = pos + namelen;
        if namelen > 0 && attributes[after_name..].starts_with("=\"") {
            let value_start = after_name + 2;
            match attributes[value_start..].find('"') {
                Some(len) => {
                    vars.insert(KString::from_ref(&attributes[pos..after_name]),
                                attributes[value_start..value_start + len].to_string());
                    pos = value_start + len + 1;
                }
                None => break,
            }
        } else {
            // Skip this token, including any quoted part of it.
            let mut in_quotes = false;
            while pos < bytes.len() && (in_quotes || !bytes[pos].is_ascii_whitespace()) {
                if bytes[pos] == b'"' {
                    in_quotes = !in_quotes;
                }
                pos += 1;
            }
        }
    }
    vars
}

/// Parse the contents of a `with="n1: v1, n2: v2"` clause into
/// ordered, trimmed pairs.
pub fn extract_extend_variables(
    with_clause: &str
) -> Result<Vec<(KString, String)>, RenderError> {
    if with_clause.trim().is_empty() {
        return Ok(Vec::new())
    }
    with_clause.split(',').map(|pair| {
        let mut parts = pair.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(name), Some(value), None) =>
                Ok((KString::from_ref(name.trim()), value.trim().to_string())),
            _ => Err(RenderErrorKind::MalformedVariableDeclaration {
                clause: with_clause.to_string()
            }.into())
        }
    }).collect()
}
