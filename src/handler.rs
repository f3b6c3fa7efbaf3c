use std::fs::File;
use std::io::ErrorKind;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use std::{fmt::Debug, any::type_name, path::PathBuf, borrow::Cow};

use anyhow::{Result, Context, anyhow};
use httpdate::{fmt_http_date, parse_http_date};
use rouille::{Request, Response, extension_to_mime, ResponseBody};

use crate::easy_fs::{easy_filenames_in_dir, FileKind};
use crate::http_response_status_codes::HttpResponseStatusCode;
use crate::ppath::PPath;
use crate::url_encoding::url_encode;
use crate::webutils::{html_escape, htmlresponse};
use crate::{or_return_none, nowarn as debug};

// mtime has a nsec part where the If-Modified-Since time has none,
// hence only count it as newer if it is at least a second newer.
fn file_is_newer_than_snapshot_time(mtime: SystemTime, modsince: SystemTime) -> bool {
    match mtime.duration_since(modsince) {
        Err(_e) => false,
        Ok(secsnewer) => secsnewer >= Duration::from_secs(1)
    }
}

macro_rules! cow {
    ($a:expr, $b:expr) => {
        (Cow::from($a), Cow::from($b))
    }
}


pub trait Handler: Debug + Send + Sync {
    /// Returning Ok(None) means, the handler is refusing to handle
    /// the request. It is to be handled as 404 not found by the
    /// caller, unless there's another alternative handler picking up
    /// the request. Err means, the handler has accepted to handle the
    /// request but failed to; this is turned into an internal server
    /// error page and logged.
    fn call(
        &self,
        request: &Request,
        pathrest: &PPath)
        -> Result<Option<Response>>;
}

fn is_get_or_head(request: &Request) -> bool {
    matches!(request.method(), "GET" | "HEAD")
}

// ------------------------------------------------------------------
/// Serve files from the local file system
#[derive(Debug)]
pub struct FileHandler {
    /// Path to base directory in local file system from which to
    /// serve the files. `..` in the request path must not climb
    /// above it.
    basepath: PathBuf,
}

impl FileHandler {
    pub fn new(basepath: impl Into<PathBuf>) -> FileHandler {
        FileHandler {
            basepath: basepath.into()
        }
    }
}

impl Handler for FileHandler {
    /// Returns None if the path does not name a regular file, or
    /// for methods other than GET and HEAD.
    fn call(
        &self,
        request: &Request,
        pathrest: &PPath)
        -> Result<Option<Response>> {
        if !is_get_or_head(request) {
            return Ok(None)
        }
        let canonpathstr = or_return_none!(pathrest.canonical_relative());
        if canonpathstr.is_empty() {
            return Ok(None) // a directory, see DirIndexHandler
        }
        let full_path: PathBuf = self.basepath.join(&canonpathstr);

        let metadata =
            match full_path.metadata() {
                Ok(m) => m,
                Err(e) =>
                    match e.kind() {
                        ErrorKind::NotFound => return Ok(None),
                        _ => return Err(e).with_context(
                            || anyhow!("can't get metadata for: {:?}", full_path))
                    }
            };
        if !metadata.is_file() {
            return Ok(None)
        }
        let mimetype =
            match full_path.extension().and_then(|e| e.to_str()) {
                Some(extension) => extension_to_mime(extension),
                None => "text/plain"
            };
        let fh = match File::open(&full_path) {
            Ok(fh) => fh,
            Err(e) => return match e.kind() {
                ErrorKind::NotFound => Ok(None),
                _ => Err(e).with_context(
                    || anyhow!("can't open file for reading: {:?}", full_path))
            }
        };
        let mtime: SystemTime = metadata.modified()?;
        // A file with mtime in the future counts as new.
        let age: Duration = mtime.elapsed().unwrap_or_default();
        let age_seconds = age.as_secs();
        let age_allowed = age_seconds + age_seconds / 10;
        let expires = mtime.checked_add(Duration::from_secs(age_allowed)).ok_or_else(
            || anyhow!("time overflow for {:?}", full_path))?;
        let mtime_seconds = mtime.duration_since(UNIX_EPOCH)?.as_secs();
        let etag_quoted = format!("{:?}", mtime_seconds.to_string());
        let size = usize::try_from(metadata.len())?;

        let headers = vec![
            cow!("Content-type", mimetype),
            cow!("Last-Modified", fmt_http_date(mtime)),
            cow!("Cache-Control", format!("max-age={}", age_allowed)),
            cow!("Expires", fmt_http_date(expires)),
            cow!("ETag", etag_quoted.clone()),
        ];
        let send_file = |headers| {
            Ok(Some(Response {
                status_code: HttpResponseStatusCode::OK200.code(),
                headers,
                data: ResponseBody::from_reader_and_size(fh, size),
                upgrade: None,
            }))
        };
        let send_notmodified = |headers| {
            Ok(Some(Response {
                status_code: HttpResponseStatusCode::NotModified304.code(),
                headers,
                data: ResponseBody::empty(),
                upgrade: None,
            }))
        };
        if let Some(modsince_str) = request.header("If-Modified-Since") {
            let modsince = parse_http_date(modsince_str).with_context(
                || anyhow!("parsing If-Modified-Since {:?}", modsince_str))?;
            if file_is_newer_than_snapshot_time(mtime, modsince) {
                debug!("If-Modified-Since: {}; sending it", modsince_str);
                send_file(headers)
            } else {
                debug!("If-Modified-Since: {}; NotModified304", modsince_str);
                send_notmodified(headers)
            }
        } else if let Some(nonematch_str) = request.header("If-None-Match") {
            if nonematch_str == etag_quoted {
                send_notmodified(headers)
            } else {
                send_file(headers)
            }
        } else {
            send_file(headers)
        }
    }
}


// ------------------------------------------------------------------
/// Directory listings for the directories below a base directory.
#[derive(Debug)]
pub struct DirIndexHandler {
    basepath: PathBuf,
    /// The path the base directory is mounted at, e.g. `/doc`.
    mountpath: String,
}

impl DirIndexHandler {
    pub fn new(basepath: impl Into<PathBuf>, mountpath: &str) -> DirIndexHandler {
        DirIndexHandler {
            basepath: basepath.into(),
            mountpath: mountpath.trim_end_matches('/').to_string(),
        }
    }
}

impl Handler for DirIndexHandler {
    fn call(
        &self,
        request: &Request,
        pathrest: &PPath)
        -> Result<Option<Response>> {
        if !is_get_or_head(request) {
            return Ok(None)
        }
        let canonpathstr = or_return_none!(pathrest.canonical_relative());
        let dirpath = self.basepath.join(&canonpathstr);
        if !dirpath.is_dir() {
            return Ok(None)
        }
        let mut entries: Vec<(String, FileKind)> = easy_filenames_in_dir(dirpath)?
            .map(|r| r.map(|(name, kind)| (name.to_string_lossy().into_owned(), kind)))
            .collect::<Result<_>>()?;
        entries.sort_by(|(a, ak), (b, bk)| (ak, a).cmp(&(bk, b)));

        let urlbase = if canonpathstr.is_empty() {
            format!("{}/", self.mountpath)
        } else {
            let encoded: Vec<String> = canonpathstr.split('/').map(url_encode).collect();
            format!("{}/{}/", self.mountpath, encoded.join("/"))
        };
        let title = html_escape(&urlbase).into_owned();
        let mut html = format!("<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\">\
                                <title>{title}</title></head>\n<body>\n<h1>{title}</h1>\n<ul>\n");
        if !canonpathstr.is_empty() {
            html.push_str("<li><a href=\"../\">../</a></li>\n");
        }
        for (name, kind) in &entries {
            let slash = if *kind == FileKind::Dir { "/" } else { "" };
            html.push_str(&format!("<li><a href=\"{}{}{slash}\">{}{slash}</a></li>\n",
                                   urlbase, url_encode(name), html_escape(name)));
        }
        html.push_str("</ul>\n</body></html>\n");
        Ok(Some(htmlresponse(HttpResponseStatusCode::OK200, html)))
    }
}


// ------------------------------------------------------------------
/// A Handler that allows a path surplus, passing it to the handler
/// Fn. The handler may still refuse to handle the request (404).
#[derive(Clone, Copy)]
pub struct FnHandler<F>
where F: Fn(&Request, &PPath) -> Result<Option<Response>> + Send + Sync
{
    handler: F
}

impl<F> FnHandler<F>
where F: Fn(&Request, &PPath) -> Result<Option<Response>> + Send + Sync
{
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

impl<F> Handler for FnHandler<F>
where F: Fn(&Request, &PPath) -> Result<Option<Response>> + Send + Sync
{
    fn call(&self, request: &Request, pathrest: &PPath) -> Result<Option<Response>> {
        (self.handler)(request, pathrest)
    }
}

impl<F> Debug for FnHandler<F>
where F: Fn(&Request, &PPath) -> Result<Option<Response>> + Send + Sync
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("FnHandler({})", type_name::<F>()))
    }
}

// ------------------------------------------------------------------
/// A Handler that does not allow a path surplus, passing it to the
/// handler Fn.
#[derive(Clone, Copy)]
pub struct ExactFnHandler<F>
where F: Fn(&Request) -> Result<Response> + Send + Sync
{
    handler: F
}

impl<F> ExactFnHandler<F>
where F: Fn(&Request) -> Result<Response> + Send + Sync
{
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

impl<F> Handler for ExactFnHandler<F>
where F: Fn(&Request) -> Result<Response> + Send + Sync
{
    fn call(&self, request: &Request, pathrest: &PPath) -> Result<Option<Response>> {
        if pathrest.segments().is_empty() {
            Ok(Some((self.handler)(request)?))
        } else {
            // refuse to handle if there is a rest (-> 404)
            Ok(None)
        }
    }
}

impl<F> Debug for ExactFnHandler<F>
where F: Fn(&Request) -> Result<Response> + Send + Sync
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("ExactFnHandler({})", type_name::<F>()))
    }
}
