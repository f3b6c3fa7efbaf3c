//! The handlers making up the mockup server's routes.

use std::{io::Read, path::PathBuf, sync::Arc};

use anyhow::{Result, Context, anyhow};
use rouille::{Request, Response};

use crate::{easy_fs::easy_filepaths_recursive,
            handler::{Handler, ExactFnHandler, FnHandler},
            http_response_status_codes::HttpResponseStatusCode,
            markdown::MarkdownFile,
            ppath::PPath,
            query_string::QueryString,
            url_encoding::url_encode_path,
            webutils::{add_live_reload, add_syntax_highlighting, errorpage_with_message,
                       html_escape, htmlresponse, textresponse},
            wicket::{compose::Composer, resolver::FragmentLocator}};
use crate::{or_return_none, info};

/// Upper limit for request bodies read by the echo handler.
const MAX_BODY_SIZE: u64 = 1 << 20;

/// The kinds of fragments that get a listing and a rendering route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    Page,
    Panel,
    Dialog,
}

impl FragmentKind {
    pub fn members() -> &'static [Self] {
        &[FragmentKind::Page, FragmentKind::Panel, FragmentKind::Dialog]
    }

    /// The first path segment of the routes, e.g. `pages`.
    pub fn route(self) -> &'static str {
        match self {
            FragmentKind::Page => "pages",
            FragmentKind::Panel => "panels",
            FragmentKind::Dialog => "dialogs",
        }
    }

    /// What the file paths of this kind contain.
    pub fn marker(self) -> &'static str {
        match self {
            FragmentKind::Page => "Page.html",
            FragmentKind::Panel => "Panel.html",
            FragmentKind::Dialog => "Dialog.html",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            FragmentKind::Page => "Pages",
            FragmentKind::Panel => "Panels",
            FragmentKind::Dialog => "Dialogs",
        }
    }
}

fn with_live_reload(html: String, live_reload: Option<u16>) -> String {
    match live_reload {
        Some(port) => add_live_reload(html, port),
        None => html
    }
}

/// The paths (relative to `scope`, with slashes) of the files below
/// `scope` whose relative path contains the marker of `kind`, sorted.
pub fn list_fragments(scope: &std::path::Path, kind: FragmentKind) -> Result<Vec<String>> {
    if !scope.is_dir() {
        return Ok(Vec::new())
    }
    let mut paths: Vec<String> = easy_filepaths_recursive(scope)?
        .iter()
        .filter_map(|path| {
            let relpath = path.strip_prefix(scope).ok()?;
            let segments: Vec<&str> = relpath.components()
                .map(|c| c.as_os_str().to_str())
                .collect::<Option<_>>()?;
            let relpath = segments.join("/");
            if relpath.contains(kind.marker()) { Some(relpath) } else { None }
        })
        .collect();
    paths.sort();
    Ok(paths)
}

/// `GET /pages` etc.: links to all fragments of `kind` in `scope`.
pub fn listing_handler(
    scope: PathBuf,
    kind: FragmentKind,
    live_reload: Option<u16>,
) -> impl Handler {
    ExactFnHandler::new(move |_request: &Request| -> Result<Response> {
        let paths = list_fragments(&scope, kind)?;
        if paths.is_empty() {
            return Ok(textresponse(HttpResponseStatusCode::NotFound404, "No pages found."))
        }
        let route = kind.route();
        let mut links = String::new();
        for path in &paths {
            links.push_str(&format!("<a href=\"/{route}/{}\">/{route}/{}</a><br>\n",
                                    url_encode_path(path), html_escape(path)));
        }
        let title = kind.title();
        let html = format!("<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\">\
                            <title>{title}</title></head>\n\
                            <body>\n<h1>{title}</h1>\n{links}</body></html>\n");
        Ok(htmlresponse(HttpResponseStatusCode::OK200, with_live_reload(html, live_reload)))
    })
}

/// `GET /pages/<name>` etc.: the fragment composed with the query
/// string variables, followed by the live reload script and, if
/// `syntax_highlighting` is set, highlight.js.
pub fn fragment_handler<L: FragmentLocator + 'static>(
    composer: Arc<Composer<L>>,
    live_reload: Option<u16>,
    syntax_highlighting: bool,
) -> impl Handler {
    FnHandler::new(move |request: &Request, pathrest: &PPath| -> Result<Option<Response>> {
        if !matches!(request.method(), "GET" | "HEAD") {
            return Ok(None)
        }
        let name = or_return_none!(pathrest.canonical_relative());
        if name.is_empty() {
            return Ok(None)
        }
        let query = match QueryString::from_str(request.raw_query_string()) {
            Ok(q) => q,
            Err(e) => return Ok(Some(errorpage_with_message(
                HttpResponseStatusCode::BadRequest400, &e.to_string())))
        };
        match composer.render_fragment(&name, query.to_variables()) {
            Ok(html) => {
                let html = with_live_reload(html, live_reload);
                let html = if syntax_highlighting { add_syntax_highlighting(html) } else { html };
                Ok(Some(htmlresponse(HttpResponseStatusCode::OK200, html)))
            }
            Err(e) if e.is_not_found() => {
                info!("{e}");
                Ok(Some(textresponse(HttpResponseStatusCode::NotFound404, "Page not found.")))
            }
            Err(e) => Err(e).with_context(|| anyhow!("rendering fragment {name:?}"))
        }
    })
}

/// `GET /`: the entry markdown file as HTML.
pub fn markdownpage_handler(path: PathBuf, live_reload: Option<u16>) -> impl Handler {
    ExactFnHandler::new(move |_request: &Request| -> Result<Response> {
        let html = MarkdownFile::new(path.clone()).process_to_html()?;
        Ok(htmlresponse(HttpResponseStatusCode::OK200, with_live_reload(html, live_reload)))
    })
}

fn read_form_body(request: &Request) -> Result<QueryString> {
    let is_form = request.header("Content-Type").map_or(
        false, |ct| ct.starts_with("application/x-www-form-urlencoded"));
    if !is_form {
        return Ok(QueryString::default())
    }
    let mut body = String::new();
    if let Some(data) = request.data() {
        data.take(MAX_BODY_SIZE).read_to_string(&mut body).with_context(
            || anyhow!("reading request body"))?;
    }
    Ok(QueryString::from_str(&body)?)
}

/// `/test/post`, any method: shows the query string and url-encoded
/// form body as JSON.
pub fn post_echo_handler() -> impl Handler {
    ExactFnHandler::new(|request: &Request| -> Result<Response> {
        let query = QueryString::from_str(request.raw_query_string())?;
        let body = read_form_body(request)?;
        let html = format!(
            "<h2>Params</h2><pre>{}</pre><h2>Body</h2><pre>{}</pre>",
            html_escape(&serde_json::to_string_pretty(&query.to_json())?),
            html_escape(&serde_json::to_string_pretty(&body.to_json())?));
        Ok(htmlresponse(HttpResponseStatusCode::OK200, html))
    })
}
