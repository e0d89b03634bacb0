use super::{Album, AudioFormat};
use crate::error::ScanError;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

/// Turns a music folder into albums: every directory directly under the root
/// that holds at least one audio file becomes one album.
#[derive(Clone)]
pub struct MusicScanner {
    image_extensions: Vec<String>,
}

impl MusicScanner {
    pub fn new() -> Self {
        Self {
            image_extensions: vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()],
        }
    }

    pub fn collect_albums<P: AsRef<Path>>(&self, root: P) -> Result<Vec<Album>, ScanError> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()));
        }

        let mut albums = Vec::new();
        for entry in children(root) {
            let entry = entry.map_err(|e| unreadable(root, e))?;
            if !entry.file_type().is_dir() || is_hidden(entry.file_name()) {
                continue;
            }

            if let Some(album) = self.read_album(entry.path(), albums.len())? {
                debug!("Album '{}' with {} songs", album.title, album.count);
                albums.push(album);
            }
        }

        info!("Collected {} albums from {}", albums.len(), root.display());
        Ok(albums)
    }

    fn read_album(&self, dir: &Path, index: usize) -> Result<Option<Album>, ScanError> {
        let mut album = Album {
            title: dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            index,
            ..Album::default()
        };

        for entry in children(dir) {
            let entry = entry.map_err(|e| unreadable(dir, e))?;
            if !entry.file_type().is_file() || is_hidden(entry.file_name()) {
                continue;
            }

            let path = entry.path();
            if self.is_audio_file(path) {
                album.songs.push(song_name(path));
                album.paths.push(dir.join(entry.file_name()));
            } else if self.is_image_file(path) {
                album.cover = Some(dir.join(entry.file_name()));
            }
        }

        if album.songs.is_empty() {
            return Ok(None);
        }
        album.count = album.songs.len();
        Ok(Some(album))
    }

    fn is_audio_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| AudioFormat::from_extension(ext).is_supported())
            .unwrap_or(false)
    }

    fn is_image_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let normalized = ext.to_ascii_lowercase();
                self.image_extensions.contains(&normalized)
            })
            .unwrap_or(false)
    }
}

impl Default for MusicScanner {
    fn default() -> Self {
        Self::new()
    }
}

// Immediate children only, in file-name order
fn children(dir: &Path) -> impl Iterator<Item = walkdir::Result<DirEntry>> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
}

fn is_hidden(name: &OsStr) -> bool {
    name.to_str().map_or(false, |n| n.starts_with('.'))
}

fn song_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn unreadable(fallback: &Path, source: walkdir::Error) -> ScanError {
    let path = source
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(fallback));
    ScanError::Unreadable { path, source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    fn library() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "album_one/example_one.mp3");
        touch(root, "album_one/example_two.mp3");
        touch(root, "album_one/cover_art.png");
        touch(root, "album_one/.hidden.mp3");
        touch(root, "album_one/notes.txt");
        touch(root, "album_two/example_two.mp3");
        touch(root, "empty_album/readme.txt");
        touch(root, ".cache/ghost.mp3");
        touch(root, "loose.mp3");
        dir
    }

    #[test]
    fn test_collect_albums() {
        let dir = library();
        let root = dir.path();
        let albums = MusicScanner::new().collect_albums(root).unwrap();

        assert_eq!(
            albums,
            vec![
                Album {
                    title: "album_one".to_string(),
                    songs: vec!["example_one".to_string(), "example_two".to_string()],
                    paths: vec![
                        root.join("album_one/example_one.mp3"),
                        root.join("album_one/example_two.mp3"),
                    ],
                    cover: Some(root.join("album_one/cover_art.png")),
                    count: 2,
                    index: 0,
                },
                Album {
                    title: "album_two".to_string(),
                    songs: vec!["example_two".to_string()],
                    paths: vec![root.join("album_two/example_two.mp3")],
                    cover: None,
                    count: 1,
                    index: 1,
                },
            ]
        );
    }

    #[test]
    fn test_songs_and_paths_line_up() {
        let dir = TempDir::new().unwrap();
        for name in ["03 c.flac", "01 a.MP3", "02 b.ogg", "04 d.m4a", "05 e.wav"] {
            touch(dir.path(), &format!("mixed/{name}"));
        }
        let albums = MusicScanner::new().collect_albums(dir.path()).unwrap();
        let album = &albums[0];

        assert_eq!(album.songs, vec!["01 a", "02 b", "03 c", "04 d"]);
        assert_eq!(album.songs.len(), album.paths.len());
        for (song, path) in album.songs.iter().zip(&album.paths) {
            assert_eq!(path.file_stem().unwrap().to_str().unwrap(), song);
        }
        assert_eq!(album.cover, None);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            MusicScanner::new().collect_albums(&missing),
            Err(ScanError::NotADirectory(p)) if p == missing
        ));
    }

    #[test]
    fn test_no_albums_is_empty_not_error() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "docs/readme.txt");
        assert!(MusicScanner::new().collect_albums(dir.path()).unwrap().is_empty());
    }
}
