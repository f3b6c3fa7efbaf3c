//! Paths independent of the local file system (pure functions), for
//! request paths and the parts of them left over after routing.

use std::fmt::{self, Display};

use kstring::KString;

/// Split a path string into its segments, dropping empty ones
/// (leading, trailing and duplicate slashes).
pub fn path_segments(s: &str) -> impl Iterator<Item = &str> {
    s.split('/').filter(|seg| !seg.is_empty())
}

/// Resolve `.` and `..` segments; `None` if `..` would climb above
/// the start.
pub fn canonicalize_path<S: AsRef<str>>(path: &[S]) -> Option<Vec<&str>> {
    let mut out = Vec::new();
    for segment in path {
        match segment.as_ref() {
            "." | "" => (),
            ".." =>
                if out.pop().is_none() {
                    return None
                },
            s => out.push(s)
        }
    }
    Some(out)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PPath {
    is_absolute: bool,
    ends_with_slash: bool,
    segments: Vec<KString>, // without empty ones
}

impl PPath {
    pub fn new(is_absolute: bool, ends_with_slash: bool, segments: Vec<KString>) -> Self {
        PPath { is_absolute, ends_with_slash, segments }
    }

    pub fn from_str(s: &str) -> Self {
        PPath {
            is_absolute: s.starts_with('/'),
            ends_with_slash: s.len() > 1 && s.ends_with('/'),
            segments: path_segments(s).map(KString::from_ref).collect(),
        }
    }

    pub fn is_absolute(&self) -> bool {
        self.is_absolute
    }

    pub fn ends_with_slash(&self) -> bool {
        self.ends_with_slash
    }

    pub fn segments(&self) -> &[KString] {
        &self.segments
    }

    /// The relative path made of the segments after the first `n`.
    pub fn rest(&self, n: usize) -> PPath {
        PPath {
            is_absolute: false,
            ends_with_slash: self.ends_with_slash,
            segments: self.segments.get(n..).unwrap_or(&[]).to_vec(),
        }
    }

    /// The canonical segments joined with slashes, without leading or
    /// trailing slash; `None` if the path climbs out via `..`.
    pub fn canonical_relative(&self) -> Option<String> {
        Some(canonicalize_path(&self.segments)?.join("/"))
    }
}

impl Display for PPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_absolute {
            f.write_str("/")?;
        }
        f.write_str(&self.segments.iter().map(|s| s.as_str()).collect::<Vec<_>>().join("/"))?;
        if self.ends_with_slash && !self.segments.is_empty() {
            f.write_str("/")?;
        }
        Ok(())
    }
}
