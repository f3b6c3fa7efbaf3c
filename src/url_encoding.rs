use pct_str::{PctString, URIReserved, InvalidPctString, PctStr};

pub fn url_encode(s: &str) -> String {
    let p = PctString::encode(s.chars(), URIReserved);
    p.to_string()
}

/// Encode each segment of a slash separated path, keeping the
/// slashes.
pub fn url_encode_path(s: &str) -> String {
    s.split('/').map(url_encode).collect::<Vec<_>>().join("/")
}

// Own error type owning the string, so that it doesn't borrow from
// the request.
#[derive(Debug, thiserror::Error)]
#[error("url decoding error: {0}")]
pub struct UrlDecodingError(Box<String>);

impl From<InvalidPctString<&str>> for UrlDecodingError {
    fn from(e: InvalidPctString<&str>) -> Self {
        Self(Box::new(format!("{}", e)))
    }
}

pub fn url_decode(s: &str) -> Result<String, UrlDecodingError> {
    let p = PctStr::new(s)?;
    Ok(p.decode())
}

/// Decoding for `application/x-www-form-urlencoded` data (query
/// strings and POST bodies): `+` stands for a space.
pub fn form_decode(s: &str) -> Result<String, UrlDecodingError> {
    if s.contains('+') {
        url_decode(&s.replace('+', " "))
    } else {
        url_decode(s)
    }
}
