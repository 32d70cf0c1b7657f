//! Filesystem-backed song library: scans a music folder and probes each
//! file for tags and duration.
use color_eyre::Result;
use color_eyre::eyre::eyre;
use log::{info, warn};
use std::fs::File;
use std::path::{Path, PathBuf};
use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::{MetadataOptions, MetadataRevision, StandardTagKey};
use symphonia::core::probe::Hint;

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "ogg", "wav", "m4a", "aac"];

#[derive(Debug, Clone, PartialEq)]
pub struct Song {
    pub path: PathBuf,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    /// Seconds; 0 when the container doesn't say.
    pub duration: f32,
    pub artwork: Option<PathBuf>,
}

impl Song {
    /// The "artist - album" line shown under the title.
    pub fn artist_line(&self) -> String {
        match (&self.artist, &self.album) {
            (Some(artist), Some(album)) => format!("{artist} - {album}"),
            (Some(artist), None) => artist.clone(),
            (None, Some(album)) => album.clone(),
            (None, None) => "Unknown Album".to_string(),
        }
    }
}

pub struct Library {
    music_dir: PathBuf,
    songs: Vec<Song>,
}

impl Library {
    pub fn new(music_dir: PathBuf) -> Self {
        Self {
            music_dir,
            songs: Vec::new(),
        }
    }

    pub fn music_dir(&self) -> &Path {
        &self.music_dir
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    /// Rescans the music folder. Files that fail to probe are skipped with
    /// a log line; they never abort the scan.
    pub fn scan(&mut self) -> usize {
        let paths = collect_audio_paths(&self.music_dir);
        self.songs = paths
            .into_iter()
            .filter_map(|path| match probe_song(&path) {
                Ok(song) => Some(song),
                Err(err) => {
                    warn!("skipping {}: {err}", path.display());
                    None
                }
            })
            .collect();
        self.songs
            .sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));
        info!(
            "library scan: {} songs in {}",
            self.songs.len(),
            self.music_dir.display()
        );
        self.songs.len()
    }

    /// Indices of songs whose title or artist contains `filter`,
    /// case-insensitively. An empty filter matches everything.
    pub fn filtered(&self, filter: &str) -> Vec<usize> {
        if filter.is_empty() {
            return (0..self.songs.len()).collect();
        }
        let filter = filter.to_lowercase();
        self.songs
            .iter()
            .enumerate()
            .filter(|(_, song)| {
                song.title.to_lowercase().contains(&filter)
                    || song
                        .artist
                        .as_ref()
                        .is_some_and(|artist| artist.to_lowercase().contains(&filter))
            })
            .map(|(index, _)| index)
            .collect()
    }
}

pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_lowercase();
            AUDIO_EXTENSIONS.contains(&ext.as_str())
        })
}

/// Walks `dir` recursively, returning every audio file path, sorted.
/// Unreadable directories are logged and skipped.
pub fn collect_audio_paths(dir: &Path) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("cannot read {}: {err}", dir.display());
                continue;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if is_audio_file(&path) {
                paths.push(path);
            }
        }
    }
    paths.sort();
    paths
}

/// Probes a single file for tags and duration. The file is opened and the
/// container parsed, but no audio is decoded.
pub fn probe_song(path: &Path) -> Result<Song> {
    let src = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(ext);
    }

    let fmt_opts: FormatOptions = Default::default();
    let meta_opts: MetadataOptions = Default::default();
    let mut probed = symphonia::default::get_probe().format(&hint, mss, &fmt_opts, &meta_opts)?;

    let track = probed
        .format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| eyre!("no supported audio track"))?;

    let params = &track.codec_params;
    let duration = match (params.time_base, params.n_frames) {
        (Some(time_base), Some(frames)) => {
            let time = time_base.calc_time(frames);
            time.seconds as f32 + time.frac as f32
        }
        _ => 0.,
    };

    // tags can live on the format reader (vorbis comments) or on the probe
    // result (id3), so check both
    let mut tags = probed
        .format
        .metadata()
        .current()
        .map(tags_of)
        .unwrap_or_default();
    if tags == (None, None, None) {
        if let Some(meta) = probed.metadata.get() {
            if let Some(rev) = meta.current() {
                tags = tags_of(rev);
            }
        }
    }
    let (title, artist, album) = tags;

    let title = title.unwrap_or_else(|| {
        path.file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("Unknown")
            .to_string()
    });

    Ok(Song {
        path: path.to_path_buf(),
        title,
        artist,
        album,
        duration,
        artwork: find_artwork(path),
    })
}

fn tags_of(rev: &MetadataRevision) -> (Option<String>, Option<String>, Option<String>) {
    let mut title = None;
    let mut artist = None;
    let mut album = None;
    for tag in rev.tags() {
        match tag.std_key {
            Some(StandardTagKey::TrackTitle) => title = Some(tag.value.to_string()),
            Some(StandardTagKey::Artist) => artist = Some(tag.value.to_string()),
            Some(StandardTagKey::Album) => album = Some(tag.value.to_string()),
            _ => {}
        }
    }
    (title, artist, album)
}

// a cover image next to the file stands in for embedded artwork
fn find_artwork(path: &Path) -> Option<PathBuf> {
    let dir = path.parent()?;
    for name in ["cover", "folder", "front"] {
        for ext in ["png", "jpg", "jpeg"] {
            let candidate = dir.join(format!("{name}.{ext}"));
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(title: &str, artist: Option<&str>) -> Song {
        Song {
            path: PathBuf::from(format!("/music/{title}.flac")),
            title: title.to_string(),
            artist: artist.map(str::to_string),
            album: None,
            duration: 60.,
            artwork: None,
        }
    }

    #[test]
    fn recognizes_audio_extensions() {
        assert!(is_audio_file(Path::new("a.mp3")));
        assert!(is_audio_file(Path::new("b.FLAC")));
        assert!(!is_audio_file(Path::new("notes.txt")));
        assert!(!is_audio_file(Path::new("noext")));
    }

    #[test]
    fn scan_finds_only_audio_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("album")).unwrap();
        for name in ["one.mp3", "two.flac", "album/three.ogg"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::write(dir.path().join("cover.jpg"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let paths = collect_audio_paths(dir.path());
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, ["three.ogg", "one.mp3", "two.flac"]);
    }

    #[test]
    fn scan_of_missing_dir_is_empty() {
        let paths = collect_audio_paths(Path::new("/definitely/not/here"));
        assert!(paths.is_empty());
    }

    #[test]
    fn filter_matches_title_and_artist_case_insensitively() {
        let library = Library {
            music_dir: PathBuf::from("/music"),
            songs: vec![
                song("Blue Train", Some("John Coltrane")),
                song("So What", Some("Miles Davis")),
                song("Blue in Green", Some("Miles Davis")),
            ],
        };
        assert_eq!(library.filtered(""), vec![0, 1, 2]);
        assert_eq!(library.filtered("blue"), vec![0, 2]);
        assert_eq!(library.filtered("MILES"), vec![1, 2]);
        assert!(library.filtered("mingus").is_empty());
    }

    #[test]
    fn artist_line_fallbacks() {
        assert_eq!(
            song("x", Some("Artist")).artist_line(),
            "Artist".to_string()
        );
        assert_eq!(song("x", None).artist_line(), "Unknown Album".to_string());
        let mut with_album = song("x", Some("Artist"));
        with_album.album = Some("Album".to_string());
        assert_eq!(with_album.artist_line(), "Artist - Album");
    }

    #[test]
    fn probing_garbage_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.mp3");
        std::fs::write(&path, b"this is not audio").unwrap();
        assert!(probe_song(&path).is_err());
    }
}
