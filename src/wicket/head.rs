//! Collect `<wicket:head>` contributions while climbing an extend
//! chain, and splice them into the root's head placeholder.

pub const HEAD_OPEN: &str = "<wicket:head>";
pub const HEAD_CLOSE: &str = "</wicket:head>";
pub const HEAD_PLACEHOLDER: &str = "<!-- wicket-head -->";

/// Head blocks in the order they were collected (child before
/// parent).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HeadContributions(Vec<String>);

impl HeadContributions {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append the contents of the first `<wicket:head>` region of
    /// `markup`, up to the nearest closing tag. The region is left in
    /// `markup`.
    pub fn collect(&mut self, markup: &str) {
        if let Some(start) = markup.find(HEAD_OPEN) {
            let inner_start = start + HEAD_OPEN.len();
            if let Some(len) = markup[inner_start..].find(HEAD_CLOSE) {
                self.0.push(markup[inner_start..inner_start + len].to_string());
            }
        }
    }

    pub fn blocks(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Replace the first head placeholder in `markup` with the
    /// collected blocks joined by newlines. Without a placeholder the
    /// collected blocks are dropped.
    pub fn splice(&self, markup: &str) -> String {
        if markup.contains(HEAD_PLACEHOLDER) {
            markup.replacen(HEAD_PLACEHOLDER, &self.0.join("\n"), 1)
        } else {
            markup.to_string()
        }
    }
}
