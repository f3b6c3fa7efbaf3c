use std::io::BufWriter;
use std::{path::{Path, PathBuf}, fs::File};
use std::ffi::OsString;
use std::fs;

use anyhow::{Result, Context, anyhow};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum FileKind {
    Dir,
    File,
    Other
}

/// Symlinks to regular files count as files, symlinks to
/// directories are not followed.
fn is_symlink_to_file(ft: &fs::FileType, entry: &fs::DirEntry) -> bool {
    ft.is_symlink() && fs::metadata(entry.path()).map_or(false, |m| m.is_file())
}

pub fn easy_filenames_in_dir<P>(
    path: P
) -> Result<impl Iterator<Item = Result<(OsString, FileKind)>>>
where PathBuf: From<P>
{
    let pathbuf: PathBuf = path.into();
    Ok(fs::read_dir(&pathbuf).with_context(
        || anyhow!("can't open directory for reading: {:?}",
                   pathbuf.to_string_lossy()))?
       .map(
           move |entry_result: Result<fs::DirEntry, std::io::Error>|
                                      -> Result<(OsString, FileKind)>
           {
               let entry = entry_result.with_context(
                   || anyhow!("reading directory: {:?}", pathbuf.to_string_lossy()))?;
               let ft = entry.file_type().with_context(
                   || anyhow!("getting file type in: {:?}", pathbuf.to_string_lossy()))?;
               let filename = entry.file_name();
               Ok(
                   (
                       filename,
                       if ft.is_dir() {
                           FileKind::Dir
                       } else if ft.is_file() || is_symlink_to_file(&ft, &entry) {
                           FileKind::File
                       } else {
                           FileKind::Other
                       }
                   ))
           }))
}


pub fn easy_filepaths_in_dir<P>(
    path: P
) -> Result<impl Iterator<Item = Result<(PathBuf, FileKind)>>>
where PathBuf: From<P>,
      P: Clone
{
    let pathbuf: PathBuf = path.clone().into();
    Ok(easy_filenames_in_dir(path)?
        .map(move |v| -> Result<(PathBuf, FileKind)> {
            let (item, kind) = v?;
            let mut filepath = pathbuf.clone();
            filepath.push(item);
            Ok((filepath, kind))
        }))
}


/// All regular files below `root`, depth-unbounded. Entries of each
/// directory are visited in sorted order, so the result is sorted
/// depth-first. Symlinks to files are included, symlinked
/// directories, dangling symlinks, devices etc. are skipped.
pub fn easy_filepaths_recursive(root: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    let mut entries: Vec<(PathBuf, FileKind)> =
        easy_filepaths_in_dir(root)?.collect::<Result<_>>()?;
    entries.sort();
    for (path, kind) in entries {
        match kind {
            FileKind::File => out.push(path),
            FileKind::Dir => out.append(&mut easy_filepaths_recursive(&path)?),
            FileKind::Other => (),
        }
    }
    Ok(out)
}


pub fn open_log_output<P>(
    path: P
) -> Result<Box<BufWriter<File>>>
where PathBuf: From<P>,
      P: Clone
{
    let mut outp = File::options();
    outp.write(true).append(true).create(true);
    let pathb = PathBuf::from(path);
    if let Some(parent) = pathb.parent() {
        let _ignore = std::fs::create_dir_all(parent);
    }
    Ok(Box::new(BufWriter::new(outp.open(&pathb).with_context(
        || anyhow!("opening log for output: {:?}", pathb.to_string_lossy()))?)))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_easy_filepaths_recursive() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let root = dir.path();
        fs::create_dir_all(root.join("b/c"))?;
        fs::write(root.join("z.html"), "")?;
        fs::write(root.join("b/a.html"), "")?;
        fs::write(root.join("b/c/d.html"), "")?;
        let found: Vec<_> = easy_filepaths_recursive(root)?
            .into_iter()
            .map(|p| p.strip_prefix(root).expect("below root").to_path_buf())
            .collect();
        assert_eq!(found, vec![PathBuf::from("b/a.html"),
                               PathBuf::from("b/c/d.html"),
                               PathBuf::from("z.html")]);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn t_recursive_follows_file_symlinks() -> Result<()> {
        use std::os::unix::fs::symlink;
        let dir = tempfile::tempdir()?;
        let root = dir.path();
        fs::create_dir_all(root.join("shared"))?;
        fs::create_dir_all(root.join("pages"))?;
        fs::write(root.join("shared/Base.html"), "")?;
        symlink(root.join("shared/Base.html"), root.join("pages/Linked.html"))?;
        symlink(root.join("gone.html"), root.join("pages/Dangling.html"))?;
        symlink(root.join("pages"), root.join("shared/loop"))?;
        let found: Vec<_> = easy_filepaths_recursive(root)?
            .into_iter()
            .map(|p| p.strip_prefix(root).expect("below root").to_path_buf())
            .collect();
        assert_eq!(found, vec![PathBuf::from("pages/Linked.html"),
                               PathBuf::from("shared/Base.html")]);
        Ok(())
    }

    #[test]
    fn t_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(easy_filepaths_recursive(&dir.path().join("nope")).is_err());
    }
}
