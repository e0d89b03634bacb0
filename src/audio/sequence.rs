use super::track::{Album, Track};
use crate::error::SequenceError;

/// Ordered, read-only list of tracks for one album.
///
/// Traversal is plain index arithmetic. Neither end wraps: `next` of the last
/// track and `previous` of the first are both `None`, and the caller decides
/// what that means.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackSequence {
    title: String,
    tracks: Vec<Track>,
}

impl TrackSequence {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            tracks: Vec::new(),
        }
    }

    /// Build a sequence in the album's listing order.
    pub fn from_album(album: &Album) -> Self {
        let mut sequence = Self::new(album.title.clone());
        for (name, path) in album.songs.iter().zip(&album.paths) {
            sequence.push(name.clone(), path.clone());
        }
        sequence
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Append a track that already carries its index. The index has to be the
    /// next free slot, which rules out duplicates and gaps.
    pub fn append(&mut self, track: Track) -> Result<(), SequenceError> {
        let expected = self.tracks.len();
        if track.index() != expected {
            return Err(SequenceError::NonContiguous {
                expected,
                found: track.index(),
            });
        }
        self.tracks.push(track);
        Ok(())
    }

    /// Append by name and path, assigning the next index.
    pub fn push(&mut self, name: impl Into<String>, path: impl Into<std::path::PathBuf>) -> usize {
        let index = self.tracks.len();
        self.tracks.push(Track::new(name, path, index));
        index
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn at(&self, index: usize) -> Result<&Track, SequenceError> {
        self.tracks.get(index).ok_or(SequenceError::OutOfRange {
            index,
            len: self.tracks.len(),
        })
    }

    pub fn next(&self, index: usize) -> Option<usize> {
        let next = index.checked_add(1)?;
        (next < self.tracks.len()).then_some(next)
    }

    pub fn previous(&self, index: usize) -> Option<usize> {
        if index >= self.tracks.len() {
            return None;
        }
        index.checked_sub(1)
    }

    /// "album / track" label for the status bar.
    pub fn status(&self, index: usize) -> Option<String> {
        self.tracks
            .get(index)
            .map(|track| format!("{} / {}", self.title, track.name()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }
}
