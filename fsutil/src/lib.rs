use std::{
    fs::{self, DirEntry, File, ReadDir},
    io,
    path::{Component, Path, PathBuf},
};

pub mod error {
    use std::{io, path::PathBuf};

    pub type Result<T> = std::result::Result<T, self::Error>;

    type Msg = &'static str;

    #[derive(Debug, thiserror::Error)]
    pub enum Error {
        #[error("{0} ({1}): {2}")]
        SingleIO(Msg, PathBuf, #[source] io::Error),

        #[error("{0} (from='{1}', to='{2}'): {3}")]
        FromToIO(Msg, PathBuf, PathBuf, #[source] io::Error),

        #[error("Cannot get current dir: {0}")]
        CurrentDir(#[source] io::Error),
    }

    impl Error {
        pub fn io_kind(&self) -> Option<io::ErrorKind> {
            match self {
                Error::SingleIO(_, _, e) | Error::FromToIO(_, _, _, e) | Error::CurrentDir(e) => {
                    Some(e.kind())
                }
            }
        }
    }
}
pub use error::{Error, Result};

#[must_use]
pub fn read_dir(dir: impl AsRef<Path>) -> Result<ReadDir> {
    fs::read_dir(&dir).map_err(|e| Error::SingleIO("Cannot read dir", dir.as_ref().to_owned(), e))
}

/// Every entry of `dir`. Fails on the first entry that cannot be read.
#[must_use]
pub fn read_dir_entries(dir: impl AsRef<Path>) -> Result<Vec<DirEntry>> {
    let dir = dir.as_ref();
    self::read_dir(dir)?
        .map(|entry| {
            entry.map_err(|e| Error::SingleIO("Cannot read dir entry", dir.to_owned(), e))
        })
        .collect()
}

#[must_use]
pub fn open_file(filepath: impl AsRef<Path>) -> Result<File> {
    File::open(&filepath)
        .map_err(|e| Error::SingleIO("Cannot open file", filepath.as_ref().to_owned(), e))
}

/// Create (or truncate) a file for writing.
#[must_use]
pub fn create_file(filepath: impl AsRef<Path>) -> Result<File> {
    File::create(&filepath)
        .map_err(|e| Error::SingleIO("Cannot create file", filepath.as_ref().to_owned(), e))
}

#[must_use]
pub fn mkdir_all(path: impl AsRef<Path>) -> Result<()> {
    let dir = path.as_ref();
    fs::create_dir_all(dir).map_err(|e| Error::SingleIO("Cannot create dir", dir.to_owned(), e))
}

#[must_use]
pub fn write<P, C>(filepath: P, contents: C) -> Result<()>
where
    P: AsRef<Path>,
    C: AsRef<[u8]>,
{
    fs::write(&filepath, contents)
        .map_err(|e| Error::SingleIO("Cannot write file", filepath.as_ref().to_owned(), e))
}

#[must_use]
pub fn write_with_mkdir<P, C>(filepath: P, contents: C) -> Result<()>
where
    P: AsRef<Path>,
    C: AsRef<[u8]>,
{
    if let Some(dir) = filepath.as_ref().parent() {
        if !dir.as_os_str().is_empty() {
            self::mkdir_all(dir)?;
        }
    }
    self::write(filepath, contents)
}

#[must_use]
pub fn read(filepath: impl AsRef<Path>) -> Result<Vec<u8>> {
    fs::read(&filepath)
        .map_err(|e| Error::SingleIO("Cannot read file", filepath.as_ref().to_owned(), e))
}

#[must_use]
pub fn read_to_string(filepath: impl AsRef<Path>) -> Result<String> {
    fs::read_to_string(&filepath)
        .map_err(|e| Error::SingleIO("Cannot read file", filepath.as_ref().to_owned(), e))
}

/// Atomically replace `to` with `from` (both must live on the same filesystem).
#[must_use]
pub fn rename(from: impl AsRef<Path>, to: impl AsRef<Path>) -> Result<()> {
    fs::rename(&from, &to).map_err(|e| {
        Error::FromToIO(
            "Cannot rename file",
            from.as_ref().to_owned(),
            to.as_ref().to_owned(),
            e,
        )
    })
}

#[must_use]
pub fn remove_file(filepath: impl AsRef<Path>) -> Result<()> {
    fs::remove_file(&filepath)
        .map_err(|e| Error::SingleIO("Cannot remove file", filepath.as_ref().to_owned(), e))
}

/// Same as [`remove_file`], but a missing file is not an error.
pub fn remove_file_if_exists(filepath: impl AsRef<Path>) -> Result<()> {
    match self::remove_file(&filepath) {
        Err(e) if e.io_kind() == Some(io::ErrorKind::NotFound) => {
            log::debug!("Nothing to remove: {:?}", filepath.as_ref());
            Ok(())
        }
        res => res,
    }
}

/// Normalize the path
/// ```
/// use fsutil::normalize_path;
/// use std::path::Path;
///
/// assert_eq!(normalize_path("./cases/./in/1.txt"), Path::new("cases/in/1.txt"));
/// assert_eq!(normalize_path("cases/in/../../out"), Path::new("out"));
/// assert_eq!(normalize_path("../a/../b"), Path::new("../b"));
/// assert_eq!(normalize_path("/"), Path::new("/"));
/// assert_eq!(normalize_path("./"), Path::new("."));
/// ```
pub fn normalize_path(path: impl AsRef<Path>) -> PathBuf {
    let mut stack: Vec<Component> = Vec::new();
    for c in path.as_ref().components() {
        match c {
            Component::CurDir => (),
            Component::ParentDir
                if matches!(stack.last(), Some(Component::Normal(_))) =>
            {
                stack.pop();
            }
            _ => stack.push(c),
        }
    }
    if stack.is_empty() {
        return PathBuf::from(".");
    }
    stack.iter().collect()
}

/// Make `path` absolute against the current dir without touching the filesystem
/// (the path does not need to exist yet).
pub fn absolutize(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    if path.is_absolute() {
        return Ok(normalize_path(path));
    }
    let cwd = std::env::current_dir().map_err(Error::CurrentDir)?;
    Ok(normalize_path(cwd.join(path)))
}

/// Path of the scratch file used while `filepath` is being written.
/// ```
/// use fsutil::partial_path;
/// use std::path::Path;
///
/// assert_eq!(partial_path("out/output1.txt"), Path::new("out/.output1.txt.part"));
/// ```
pub fn partial_path(filepath: impl AsRef<Path>) -> PathBuf {
    let filepath = filepath.as_ref();
    let mut name = std::ffi::OsString::from(".");
    name.push(filepath.file_name().unwrap_or_default());
    name.push(".part");
    filepath.with_file_name(name)
}
