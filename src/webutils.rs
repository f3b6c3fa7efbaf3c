use std::borrow::Cow;

use rouille::{Response, ResponseBody};

use crate::http_response_status_codes::HttpResponseStatusCode;

/// Escape text for use in HTML content or double-quoted attribute
/// values.
pub fn html_escape(s: &str) -> Cow<str> {
    if !s.contains(|c| matches!(c, '<' | '>' | '&' | '"' | '\'')) {
        return Cow::Borrowed(s)
    }
    let mut out = String::with_capacity(s.len() + 16);
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c)
        }
    }
    Cow::Owned(out)
}

pub fn htmlresponse(status: HttpResponseStatusCode, html: String) -> Response {
    Response {
        status_code: status.code(),
        headers: vec![(Cow::from("Content-type"),
                       Cow::from("text/html; charset=utf-8"))],
        data: ResponseBody::from_string(html),
        upgrade: None,
    }
}

pub fn errorpage_from_status(status: HttpResponseStatusCode) -> Response {
    errorpage_with_message(status, status.desc())
}

/// An error page showing `message` (escaped) as explanation.
pub fn errorpage_with_message(status: HttpResponseStatusCode, message: &str) -> Response {
    let title = status.title();
    let explanation = html_escape(message);
    htmlresponse(
        status,
        format!("<html><head><title>{title}</title></head><body><h1>{title}</h1>\
                 <p>{explanation}</p></body></html>\n"))
}

/// A short plain text response, e.g. "Page not found.".
pub fn textresponse(status: HttpResponseStatusCode, text: &str) -> Response {
    Response::text(text).with_status_code(status.code())
}

/// Insert the live reload client script before the first `</body>`
/// unless the page already loads one.
pub fn add_live_reload(html: String, port: u16) -> String {
    if has_live_reload_script(&html) {
        return html
    }
    html.replacen("</body>",
                  &format!("<script src=\"//localhost:{port}/livereload.js\"></script></body>"),
                  1)
}

const HIGHLIGHT_JS_BASE: &str = "https://cdnjs.cloudflare.com/ajax/libs/highlight.js/11.9.0";

/// Insert the highlight.js script, its stylesheet and the call
/// highlighting all code blocks before the first `</body>`, unless
/// the page already makes that call.
pub fn add_syntax_highlighting(html: String) -> String {
    if html.contains("hljs.highlightAll()") {
        return html
    }
    html.replacen("</body>",
                  &format!("<script src=\"{HIGHLIGHT_JS_BASE}/highlight.min.js\"></script>\n\
                            <link rel=\"stylesheet\" \
                            href=\"{HIGHLIGHT_JS_BASE}/styles/atom-one-light.css\">\n\
                            <script>hljs.highlightAll();</script>\n</body>"),
                  1)
}

/// Whether `html` contains `localhost:<1-5 digits>/livereload.js`.
fn has_live_reload_script(html: &str) -> bool {
    html.match_indices("localhost:").any(|(i, m)| {
        let rest = &html[i + m.len()..];
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        (1..=5).contains(&digits) && rest[digits..].starts_with("/livereload.js")
    })
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_html_escape() {
        assert_eq!(html_escape("plain"), "plain");
        assert_eq!(html_escape("<a href=\"x\">&'"),
                   "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn t_add_live_reload() {
        assert_eq!(add_live_reload("<body>x</body></body>".into(), 35729),
                   "<body>x<script src=\"//localhost:35729/livereload.js\"></script>\
                    </body></body>");
        let has = "<body><script src=\"http://localhost:1234/livereload.js\"></script></body>";
        assert_eq!(add_live_reload(has.into(), 35729), has);
        assert_eq!(add_live_reload("<p>no body</p>".into(), 1), "<p>no body</p>");
        assert_eq!(add_live_reload("localhost:123456/livereload.js</body>".into(), 1),
                   "localhost:123456/livereload.js\
                    <script src=\"//localhost:1/livereload.js\"></script></body>");
    }

    #[test]
    fn t_add_syntax_highlighting() {
        let html = add_syntax_highlighting("<body><pre><code>x</code></pre></body>".into());
        assert_eq!(
            html,
            "<body><pre><code>x</code></pre>\
             <script src=\"https://cdnjs.cloudflare.com/ajax/libs/highlight.js/11.9.0/\
             highlight.min.js\"></script>\n\
             <link rel=\"stylesheet\" href=\"https://cdnjs.cloudflare.com/ajax/libs/\
             highlight.js/11.9.0/styles/atom-one-light.css\">\n\
             <script>hljs.highlightAll();</script>\n</body>");
        assert_eq!(add_syntax_highlighting(html.clone()), html);
        assert_eq!(add_syntax_highlighting("<p>no body</p>".into()), "<p>no body</p>");
    }

    #[test]
    fn t_errorpage() {
        let r = errorpage_with_message(HttpResponseStatusCode::InternalServerError500,
                                       "bad <thing>");
        assert_eq!(r.status_code, 500);
        let (mut reader, _) = r.data.into_reader_and_size();
        let mut body = String::new();
        std::io::Read::read_to_string(&mut reader, &mut body).unwrap();
        assert!(body.contains("<p>bad &lt;thing&gt;</p>"));
    }
}
