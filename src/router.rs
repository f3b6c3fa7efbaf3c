//! Routing request paths to the handlers registered for path
//! prefixes.

use std::fmt::Debug;

use kstring::KString;

use crate::ppath::{PPath, path_segments};

/// Allow multiple entries per path prefix. They shall be tried in
/// sequence. The longest registered prefix of a request path wins.
#[derive(Debug)]
pub struct MultiRouter<T>(Vec<(Vec<KString>, Vec<T>)>);

impl<T> Default for MultiRouter<T> {
    fn default() -> Self {
        MultiRouter(Vec::new())
    }
}

impl<T> MultiRouter<T> {
    pub fn new() -> MultiRouter<T> {
        Self::default()
    }

    /// Using path *strings*, and chaining.
    pub fn add(&mut self, path: &str, val: T) -> &mut Self
    where T: Debug
    {
        let pathv: Vec<KString> = path_segments(path).map(KString::from_ref).collect();
        match self.0.iter_mut().find(|(p, _)| *p == pathv) {
            Some((_, v)) => v.push(val),
            None => self.0.push((pathv, vec![val]))
        }
        self
    }

    /// The handlers for the longest registered prefix of `path`, and
    /// the rest of the path after that prefix.
    pub fn get(&self, path: &PPath) -> Option<(&Vec<T>, PPath)> {
        let segments = path.segments();
        let (prefix, vals) = self.0.iter()
            .filter(|(prefix, _)| segments.starts_with(prefix))
            .max_by_key(|(prefix, _)| prefix.len())?;
        Some((vals, path.rest(prefix.len())))
    }

    /// Registered prefixes in insertion order.
    pub fn prefixes(&self) -> impl Iterator<Item = String> + '_ {
        self.0.iter().map(|(p, _)| {
            let segs: Vec<&str> = p.iter().map(|s| s.as_str()).collect();
            format!("/{}", segs.join("/"))
        })
    }
}
