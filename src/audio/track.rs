use std::fmt;
use std::path::{Path, PathBuf};

/// One playable file inside an album. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    name: String,
    path: PathBuf,
    index: usize,
}

impl Track {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, index: usize) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            index,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

/// A directory of songs as the scanner found it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Album {
    pub title: String,
    pub songs: Vec<String>,  // display names, extension trimmed
    pub paths: Vec<PathBuf>, // same order as `songs`
    pub cover: Option<PathBuf>,
    pub count: usize,
    pub index: usize, // position in the library listing
}

impl fmt::Display for Album {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {}", self.title, self.count)
    }
}
