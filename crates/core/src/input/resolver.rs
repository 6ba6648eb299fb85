//! Directory scanning for character images and audio clips.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::InputConfig;

use super::types::{InputError, InputSet};

/// Classification of a directory entry by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Image,
    Audio,
}

/// Resolve a directory into an [`InputSet`].
///
/// Only regular files directly inside `directory` are considered; subfolders
/// and files with unrecognized extensions are ignored. Fails when the folder
/// is missing or unreadable, when there is not exactly one image, when there
/// is no audio clip, when two clips share a file stem (ignoring case), or
/// when any selected file is empty or unreadable.
pub fn resolve(directory: &Path, config: &InputConfig) -> Result<InputSet, InputError> {
    if !directory.exists() {
        return Err(InputError::DirectoryNotFound {
            path: directory.to_path_buf(),
        });
    }
    if !directory.is_dir() {
        return Err(InputError::NotADirectory {
            path: directory.to_path_buf(),
        });
    }

    let entries = fs::read_dir(directory).map_err(|e| unreadable(directory, e))?;

    let mut images = Vec::new();
    let mut audio_clips = Vec::new();

    for entry in entries {
        let entry = entry.map_err(|e| unreadable(directory, e))?;
        let path = entry.path();

        let file_type = entry.file_type().map_err(|e| unreadable(&path, e))?;
        if !file_type.is_file() && !(file_type.is_symlink() && path.is_file()) {
            continue;
        }

        match classify(&path, config) {
            Some(FileKind::Image) => images.push(path),
            Some(FileKind::Audio) => audio_clips.push(path),
            None => debug!("Ignoring unrecognized file {:?}", path),
        }
    }

    images.sort();
    let character_image = match images.len() {
        0 => {
            return Err(InputError::NoImage {
                dir: directory.to_path_buf(),
            })
        }
        1 => images.remove(0),
        _ => {
            return Err(InputError::MultipleImages {
                dir: directory.to_path_buf(),
                found: images,
            })
        }
    };

    if audio_clips.is_empty() {
        return Err(InputError::NoAudio {
            dir: directory.to_path_buf(),
        });
    }
    audio_clips.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    check_unique_stems(&audio_clips)?;

    check_readable(&character_image)?;
    for clip in &audio_clips {
        check_readable(clip)?;
    }

    info!(
        "Resolved input set: image {:?}, {} audio clip(s)",
        character_image.file_name().unwrap_or_default(),
        audio_clips.len()
    );

    Ok(InputSet::new(character_image, audio_clips))
}

/// Match a path's extension (case-insensitive) against the configured lists.
fn classify(path: &Path, config: &InputConfig) -> Option<FileKind> {
    let ext = path.extension()?.to_str()?;
    let matches = |list: &[String]| list.iter().any(|e| e.eq_ignore_ascii_case(ext));

    if matches(&config.image_extensions) {
        Some(FileKind::Image)
    } else if matches(&config.audio_extensions) {
        Some(FileKind::Audio)
    } else {
        None
    }
}

/// Each clip becomes `<stem>.<video_ext>`, so stems must not collide.
fn check_unique_stems(audio_clips: &[PathBuf]) -> Result<(), InputError> {
    let mut by_stem: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for clip in audio_clips {
        let stem = clip
            .file_stem()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        by_stem.entry(stem).or_default().push(clip.clone());
    }

    match by_stem.into_iter().find(|(_, clips)| clips.len() > 1) {
        Some((stem, found)) => Err(InputError::DuplicateClipStem { stem, found }),
        None => Ok(()),
    }
}

/// Ensure the file can be opened and is not zero-length.
fn check_readable(path: &Path) -> Result<(), InputError> {
    let metadata = fs::metadata(path).map_err(|e| unreadable(path, e))?;
    if metadata.len() == 0 {
        return Err(InputError::EmptyFile {
            path: path.to_path_buf(),
        });
    }
    fs::File::open(path).map_err(|e| unreadable(path, e))?;
    Ok(())
}

fn unreadable(path: &Path, source: std::io::Error) -> InputError {
    InputError::Unreadable {
        path: PathBuf::from(path),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str, contents: &[u8]) {
        fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn test_resolve_one_image_many_clips() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "char.png", b"png");
        touch(dir.path(), "b.wav", b"wav");
        touch(dir.path(), "a.wav", b"wav");
        touch(dir.path(), "notes.txt", b"ignored");

        let set = resolve(dir.path(), &InputConfig::default()).unwrap();
        assert_eq!(set.character_image(), dir.path().join("char.png"));
        let names: Vec<_> = set
            .audio_clips()
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.wav", "b.wav"]);
    }

    #[test]
    fn test_resolve_extension_is_case_insensitive() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "char.PNG", b"png");
        touch(dir.path(), "line.WAV", b"wav");

        let set = resolve(dir.path(), &InputConfig::default()).unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_resolve_missing_directory() {
        let err = resolve(Path::new("/nonexistent/input"), &InputConfig::default()).unwrap_err();
        assert!(matches!(err, InputError::DirectoryNotFound { .. }));
    }

    #[test]
    fn test_resolve_no_image() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.wav", b"wav");
        let err = resolve(dir.path(), &InputConfig::default()).unwrap_err();
        assert!(matches!(err, InputError::NoImage { .. }));
    }

    #[test]
    fn test_resolve_multiple_images() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "one.png", b"png");
        touch(dir.path(), "two.jpg", b"jpg");
        touch(dir.path(), "a.wav", b"wav");

        match resolve(dir.path(), &InputConfig::default()).unwrap_err() {
            InputError::MultipleImages { found, .. } => assert_eq!(found.len(), 2),
            other => panic!("Expected MultipleImages, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_no_audio() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "char.png", b"png");
        let err = resolve(dir.path(), &InputConfig::default()).unwrap_err();
        assert!(matches!(err, InputError::NoAudio { .. }));
    }

    #[test]
    fn test_resolve_empty_audio_file() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "char.png", b"png");
        touch(dir.path(), "a.wav", b"");
        match resolve(dir.path(), &InputConfig::default()).unwrap_err() {
            InputError::EmptyFile { path } => assert!(path.ends_with("a.wav")),
            other => panic!("Expected EmptyFile, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_empty_image_file() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "char.png", b"");
        touch(dir.path(), "a.wav", b"wav");
        let err = resolve(dir.path(), &InputConfig::default()).unwrap_err();
        assert!(matches!(err, InputError::EmptyFile { .. }));
    }

    #[test]
    fn test_resolve_ignores_subdirectories() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "char.png", b"png");
        touch(dir.path(), "a.wav", b"wav");
        fs::create_dir(dir.path().join("nested.wav")).unwrap();

        let set = resolve(dir.path(), &InputConfig::default()).unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_resolve_rejects_clips_with_same_stem() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "char.png", b"png");
        touch(dir.path(), "a.wav", b"wav");
        touch(dir.path(), "a.mp3", b"mp3");
        touch(dir.path(), "b.wav", b"wav");

        match resolve(dir.path(), &InputConfig::default()).unwrap_err() {
            InputError::DuplicateClipStem { stem, found } => {
                assert_eq!(stem, "a");
                assert_eq!(
                    found,
                    vec![dir.path().join("a.mp3"), dir.path().join("a.wav")]
                );
            }
            other => panic!("Expected DuplicateClipStem, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_same_stem_differing_case() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "char.png", b"png");
        touch(dir.path(), "Intro.wav", b"wav");
        touch(dir.path(), "intro.m4a", b"m4a");

        let err = resolve(dir.path(), &InputConfig::default()).unwrap_err();
        assert!(matches!(err, InputError::DuplicateClipStem { .. }));
    }

    #[test]
    fn test_resolve_file_path_is_not_directory() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "char.png", b"png");
        let err = resolve(&dir.path().join("char.png"), &InputConfig::default()).unwrap_err();
        assert!(matches!(err, InputError::NotADirectory { .. }));
    }
}
