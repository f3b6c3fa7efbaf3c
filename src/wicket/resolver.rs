//! Mapping fragment names to file contents. The file system search
//! runs once per distinct name; its result (including absence) is
//! cached for the life of the resolver.

use std::{collections::HashMap,
          fmt::Debug,
          path::{Path, PathBuf, Component},
          sync::Mutex};

use anyhow::Result;
use kstring::KString;

use crate::{easy_fs::easy_filepaths_recursive,
            io_util::my_read_to_string_if_exists,
            nowarn as debug, warn, time};

/// Finds the file for a fragment name. Separate from the caching so
/// that searches can be observed and replaced in tests.
pub trait FragmentLocator: Debug + Send + Sync {
    fn locate(&self, name: &str) -> Result<Option<PathBuf>>;
}

/// Split a fragment name into its path segments; `None` for names
/// that can't denote a file below a root.
fn name_segments(name: &str) -> Option<Vec<&str>> {
    let segments: Vec<&str> = name.split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    if segments.is_empty() || segments.iter().any(|s| *s == "..") {
        None
    } else {
        Some(segments)
    }
}

fn ends_with_segments(relpath: &Path, segments: &[&str]) -> bool {
    let components: Vec<&str> = relpath.components().filter_map(|c| match c {
        Component::Normal(s) => s.to_str(),
        _ => None
    }).collect();
    components.len() >= segments.len()
        && components[components.len() - segments.len()..] == *segments
}

/// Searches the directory trees below the given roots. A name matches
/// the files whose trailing path segments equal the segments of the
/// name. With several matches, the earlier root wins, then the path
/// with fewer segments, then the lexicographically smaller path.
#[derive(Debug, Clone)]
pub struct TreeLocator {
    roots: Vec<PathBuf>,
}

impl TreeLocator {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        TreeLocator { roots }
    }
}

impl FragmentLocator for TreeLocator {
    fn locate(&self, name: &str) -> Result<Option<PathBuf>> {
        let segments = match name_segments(name) {
            Some(s) => s,
            None => return Ok(None)
        };
        for root in &self.roots {
            let mut candidates: Vec<(usize, PathBuf)> = easy_filepaths_recursive(root)?
                .into_iter()
                .filter_map(|path| {
                    let relpath = path.strip_prefix(root).ok()?;
                    if ends_with_segments(relpath, &segments) {
                        Some((relpath.components().count(), path))
                    } else {
                        None
                    }
                })
                .collect();
            candidates.sort();
            if candidates.len() > 1 {
                warn!("fragment name {name:?} is ambiguous, using {:?} out of {} candidates",
                      candidates[0].1, candidates.len());
            }
            if let Some((_, path)) = candidates.into_iter().next() {
                return Ok(Some(path))
            }
        }
        Ok(None)
    }
}


#[derive(Debug, Clone, PartialEq, Eq)]
enum CacheEntry {
    Found(PathBuf),
    NotFound,
}

#[derive(Debug)]
pub struct FragmentResolver<L: FragmentLocator = TreeLocator> {
    locator: L,
    cache: Mutex<HashMap<KString, CacheEntry>>,
}

impl<L: FragmentLocator> FragmentResolver<L> {
    pub fn new(locator: L) -> Self {
        FragmentResolver {
            locator,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Look up the cache entry for `name`, searching on the first
    /// request. Concurrent first requests for the same name may both
    /// search; the entry inserted first is kept.
    fn entry(&self, name: &str) -> Result<CacheEntry> {
        {
            let cache = self.cache.lock().expect("no panics while holding the lock");
            if let Some(entry) = cache.get(name) {
                return Ok(entry.clone())
            }
        }
        let entry = match time!(name; self.locator.locate(name))? {
            Some(path) => CacheEntry::Found(path),
            None => CacheEntry::NotFound,
        };
        debug!("resolved {name:?} to {entry:?}");
        let mut cache = self.cache.lock().expect("no panics while holding the lock");
        Ok(cache.entry(KString::from_ref(name)).or_insert(entry).clone())
    }

    /// The path `name` resolves to, if any.
    pub fn path(&self, name: &str) -> Result<Option<PathBuf>> {
        match self.entry(name)? {
            CacheEntry::Found(path) => Ok(Some(path)),
            CacheEntry::NotFound => Ok(None),
        }
    }

    /// The contents of the fragment `name`, or `None` if no file
    /// was found for it (now, or when it was first looked up).
    pub fn resolve(&self, name: &str) -> Result<Option<String>> {
        match self.path(name)? {
            Some(path) => {
                let content = my_read_to_string_if_exists(&path)?;
                if content.is_none() {
                    warn!("fragment {name:?} was cached at {path:?}, which is gone");
                }
                Ok(content)
            }
            None => Ok(None),
        }
    }

    /// Number of names resolved (or found missing) so far.
    pub fn cached_len(&self) -> usize {
        self.cache.lock().expect("no panics while holding the lock").len()
    }
}


#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::{fs, sync::{Arc, atomic::{AtomicUsize, Ordering}}};

    /// Counts the searches going through to the wrapped locator.
    #[derive(Debug)]
    pub(crate) struct CountingLocator {
        pub inner: TreeLocator,
        pub searches: Arc<AtomicUsize>,
    }

    impl FragmentLocator for CountingLocator {
        fn locate(&self, name: &str) -> Result<Option<PathBuf>> {
            self.searches.fetch_add(1, Ordering::SeqCst);
            self.inner.locate(name)
        }
    }

    pub(crate) fn write_files(root: &Path, files: &[(&str, &str)]) -> Result<()> {
        for (relpath, content) in files {
            let path = root.join(relpath);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, content)?;
        }
        Ok(())
    }

    #[test]
    fn t_name_segments() {
        assert_eq!(name_segments("a/./b.html"), Some(vec!["a", "b.html"]));
        assert_eq!(name_segments("/b.html"), Some(vec!["b.html"]));
        assert_eq!(name_segments("../b.html"), None);
        assert_eq!(name_segments(""), None);
        assert_eq!(name_segments("//"), None);
    }

    #[test]
    fn t_tree_locator() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let root = dir.path();
        write_files(root, &[
            ("package-a/pages/HomePage.html", "home"),
            ("package-a/deep/er/Same.html", "deep"),
            ("package-b/Same.html", "shallow"),
            ("package-b/x/Other.html", "b"),
            ("package-a/x/Other.html", "a"),
        ])?;
        let locator = TreeLocator::new(vec![root.to_path_buf()]);
        assert_eq!(locator.locate("HomePage.html")?,
                   Some(root.join("package-a/pages/HomePage.html")));
        assert_eq!(locator.locate("pages/HomePage.html")?,
                   Some(root.join("package-a/pages/HomePage.html")));
        assert_eq!(locator.locate("other/HomePage.html")?, None);
        assert_eq!(locator.locate("Page.html")?, None);
        // fewest segments first
        assert_eq!(locator.locate("Same.html")?, Some(root.join("package-b/Same.html")));
        // then lexicographic
        assert_eq!(locator.locate("Other.html")?, Some(root.join("package-a/x/Other.html")));
        Ok(())
    }

    #[test]
    fn t_tree_locator_root_order() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let root = dir.path();
        write_files(root, &[
            ("one/deep/down/P.html", "one"),
            ("two/P.html", "two"),
        ])?;
        let locator = TreeLocator::new(vec![root.join("one"), root.join("two")]);
        assert_eq!(locator.locate("P.html")?, Some(root.join("one/deep/down/P.html")));
        Ok(())
    }

    #[test]
    fn t_resolver_caches() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let root = dir.path();
        write_files(root, &[("panels/Greeting.html", "Hello")])?;
        let searches = Arc::new(AtomicUsize::new(0));
        let resolver = FragmentResolver::new(CountingLocator {
            inner: TreeLocator::new(vec![root.to_path_buf()]),
            searches: searches.clone(),
        });
        assert_eq!(resolver.resolve("Greeting.html")?.as_deref(), Some("Hello"));
        assert_eq!(resolver.resolve("Greeting.html")?.as_deref(), Some("Hello"));
        assert_eq!(searches.load(Ordering::SeqCst), 1);

        // absence is cached, too
        assert_eq!(resolver.resolve("Missing.html")?, None);
        write_files(root, &[("Missing.html", "late")])?;
        assert_eq!(resolver.resolve("Missing.html")?, None);
        assert_eq!(searches.load(Ordering::SeqCst), 2);
        assert_eq!(resolver.cached_len(), 2);

        // contents are read fresh, the path is not searched again
        write_files(root, &[("panels/Greeting.html", "Hi")])?;
        assert_eq!(resolver.resolve("Greeting.html")?.as_deref(), Some("Hi"));
        fs::remove_file(root.join("panels/Greeting.html"))?;
        assert_eq!(resolver.resolve("Greeting.html")?, None);
        assert_eq!(searches.load(Ordering::SeqCst), 2);
        Ok(())
    }

    #[test]
    fn t_resolver_concurrent_first_access() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write_files(dir.path(), &[("P.html", "p")])?;
        let resolver = Arc::new(FragmentResolver::new(
            TreeLocator::new(vec![dir.path().to_path_buf()])));
        let threads: Vec<_> = (0..8).map(|_| {
            let resolver = resolver.clone();
            std::thread::spawn(move || resolver.resolve("P.html").unwrap())
        }).collect();
        for t in threads {
            assert_eq!(t.join().unwrap().as_deref(), Some("p"));
        }
        assert_eq!(resolver.cached_len(), 1);
        Ok(())
    }
}
