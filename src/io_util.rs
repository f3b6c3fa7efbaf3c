use std::{path::Path, fs::read_to_string, io::ErrorKind};

use anyhow::{Result, anyhow, Context};


pub fn my_read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
    read_to_string(&path).with_context(
        || anyhow!("opening path for reading: {:?}", path.as_ref()))
}

/// Like `my_read_to_string` but a missing file (or a directory in
/// its place) gives `Ok(None)`.
pub fn my_read_to_string_if_exists<P: AsRef<Path>>(path: P) -> Result<Option<String>> {
    let path = path.as_ref();
    match read_to_string(path) {
        Ok(s) => Ok(Some(s)),
        Err(e) => match e.kind() {
            ErrorKind::NotFound => Ok(None),
            _ if path.is_dir() => Ok(None),
            _ => Err(e).with_context(
                || anyhow!("opening path for reading: {:?}", path))
        }
    }
}
