//! Convert markdown to HTML, for the entry page.

use std::path::{Path, PathBuf};

use anyhow::{Result, Context, anyhow};
use pulldown_cmark::{Parser, Options, Event, Tag, html};

use crate::io_util::my_read_to_string;

fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
    options
}

/// The text of the first heading, if any.
pub fn markdown_title(source: &str) -> Option<String> {
    let mut title: Option<String> = None;
    for event in Parser::new_ext(source, options()) {
        match event {
            Event::Start(Tag::Heading(..)) => title = Some(String::new()),
            Event::End(Tag::Heading(..)) => if title.is_some() { return title },
            Event::Text(t) | Event::Code(t) =>
                if let Some(title) = &mut title {
                    title.push_str(&t)
                },
            _ => ()
        }
    }
    None
}

pub fn markdown_to_html(source: &str) -> String {
    let mut out = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut out, Parser::new_ext(source, options()));
    out
}

pub struct MarkdownFile {
    path: PathBuf
}

impl MarkdownFile {
    pub fn new(path: impl Into<PathBuf>) -> MarkdownFile {
        MarkdownFile { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file and convert it to a complete HTML document.
    pub fn process_to_html(&self) -> Result<String> {
        let source = my_read_to_string(&self.path).with_context(
            || anyhow!("reading markdown file {:?}", self.path))?;
        let title = markdown_title(&source).unwrap_or_else(
            || self.path.to_string_lossy().into_owned());
        Ok(format!("<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\">\
                    <title>{}</title></head>\n<body>\n{}</body></html>\n",
                   crate::webutils::html_escape(&title),
                   markdown_to_html(&source)))
    }
}
