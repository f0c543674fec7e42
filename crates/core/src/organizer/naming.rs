//! Library naming rules.
//!
//! Movies land in `Movies/<Title> (<Year>)/<Title> (<Year>).<ext>`; episodes
//! in `TV Shows/<Show>/Season NN/<Show> SNNENN.<ext>`. Every component passes
//! through [`sanitize`].

use std::path::{Path, PathBuf};

use crate::content::{ContentDescriptor, ContentKind};

pub const VIDEO_EXTENSIONS: &[&str] = &["mkv", "mp4", "avi", "mov", "wmv", "flv", "webm", "m4v"];

pub const SUBTITLE_EXTENSIONS: &[&str] = &["srt", "sub", "ass", "ssa", "vtt"];

const ILLEGAL_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

const FALLBACK_NAME: &str = "Untitled";

/// Upper bound, in bytes, on one path component on common filesystems.
const MAX_COMPONENT_BYTES: usize = 255;

const SIDECAR_SUFFIX: &str = ".metadata.json";

/// Room left in a video stem for a " (n)" collision suffix.
const COLLISION_RESERVE: usize = 8;

/// A video stem must still fit once the sidecar suffix or a collision
/// suffix is appended.
const MAX_VIDEO_STEM_BYTES: usize = MAX_COMPONENT_BYTES - SIDECAR_SUFFIX.len() - COLLISION_RESERVE;

/// Longest prefix of `s` within `max_bytes`, cut on a char boundary.
fn truncate_to_bytes(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Empty, ".", ".." and other dot-only names would escape or alias their
/// parent directory.
fn is_unusable(name: &str) -> bool {
    name.chars().all(|c| c == '.')
}

fn cap(name: &str, max_len: usize, max_bytes: usize) -> String {
    let by_chars: String = name.chars().take(max_len.max(1)).collect();
    truncate_to_bytes(&by_chars, max_bytes).trim_end().to_string()
}

/// Make `name` safe as a single path component.
///
/// Strips characters illegal on common filesystems and control characters,
/// collapses whitespace runs, trims, and caps the result at `max_len`
/// characters and 255 bytes. Dot-only names become "Untitled". Idempotent.
pub fn sanitize(name: &str, max_len: usize) -> String {
    sanitize_within(name, max_len, MAX_COMPONENT_BYTES)
}

fn sanitize_within(name: &str, max_len: usize, max_bytes: usize) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !ILLEGAL_CHARS.contains(c) && (c.is_whitespace() || !c.is_control()))
        .collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    let base = if is_unusable(&collapsed) {
        FALLBACK_NAME
    } else {
        collapsed.as_str()
    };

    let capped = cap(base, max_len, max_bytes);
    if is_unusable(&capped) {
        cap(FALLBACK_NAME, max_len, max_bytes)
    } else {
        capped
    }
}

/// `<stem><ext>` with the stem shortened so the whole name, its sidecar and
/// any collision suffix stay within one path component.
fn fit_file_name(stem: &str, ext: &str) -> String {
    let budget = MAX_VIDEO_STEM_BYTES.min(MAX_COMPONENT_BYTES.saturating_sub(ext.len()));
    let stem = truncate_to_bytes(stem, budget).trim_end();
    let stem = if is_unusable(stem) { FALLBACK_NAME } else { stem };
    format!("{}{}", stem, ext)
}

fn has_extension(path: &Path, set: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| set.iter().any(|known| known.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

pub fn is_video(path: &Path) -> bool {
    has_extension(path, VIDEO_EXTENSIONS)
}

pub fn is_subtitle(path: &Path) -> bool {
    has_extension(path, SUBTITLE_EXTENSIONS)
}

/// `.ext` of `path` with its original case, or empty.
fn dotted_extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default()
}

/// `<Title> (<Year>)`, or just the title when the year is unknown.
pub fn movie_base_name(content: &ContentDescriptor, max_len: usize) -> String {
    match content.year {
        Some(year) => {
            let suffix = format!(" ({})", year);
            let title = sanitize_within(
                &content.title,
                max_len,
                MAX_COMPONENT_BYTES - suffix.len(),
            );
            format!("{}{}", title, suffix)
        }
        None => sanitize(&content.title, max_len),
    }
}

/// Directory a piece of content is organized into, relative to the library's
/// movies or TV root.
pub fn content_dir(content: &ContentDescriptor, max_len: usize) -> PathBuf {
    match content.kind {
        ContentKind::Movie => PathBuf::from(movie_base_name(content, max_len)),
        ContentKind::Episode => PathBuf::from(sanitize(content.show_name(), max_len))
            .join(format!("Season {:02}", content.season_or_default())),
    }
}

/// Library file name for one video of a download.
///
/// Multi-file movies keep the sanitized original stem so extras stay
/// distinguishable. The result always fits in one path component.
pub fn video_file_name(
    content: &ContentDescriptor,
    original: &Path,
    multi_file: bool,
    max_len: usize,
) -> String {
    let ext = dotted_extension(original);
    let stem = match content.kind {
        ContentKind::Movie if multi_file => {
            let original_stem = original
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            format!(
                "{} - {}",
                movie_base_name(content, max_len),
                sanitize(&original_stem, max_len)
            )
        }
        ContentKind::Movie => movie_base_name(content, max_len),
        ContentKind::Episode => format!(
            "{} S{:02}E{:02}",
            sanitize(content.show_name(), max_len),
            content.season_or_default(),
            content.episode_or_default()
        ),
    };
    fit_file_name(&stem, &ext)
}

/// `dir/stem (n).ext` for the n-th collision of `path`.
pub fn with_collision_suffix(path: &Path, n: u32) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = format!("{} ({}){}", stem, n, dotted_extension(path));
    match path.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

/// Sidecar file name for a primary organized video.
pub fn sidecar_file_name(video: &Path) -> String {
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| FALLBACK_NAME.to_string());
    format!("{}{}", stem, SIDECAR_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_illegal_chars() {
        assert_eq!(sanitize("Mission: Impossible", 200), "Mission Impossible");
        assert_eq!(sanitize("What/If?", 200), "WhatIf");
        assert_eq!(sanitize("a<b>c\"d|e*f\\g", 200), "abcdefg");
        assert_eq!(sanitize("Tab\there", 200), "Tab here");
    }

    #[test]
    fn test_sanitize_collapses_and_trims() {
        assert_eq!(sanitize("  The    Matrix \n ", 200), "The Matrix");
    }

    #[test]
    fn test_sanitize_caps_length() {
        let long = "x".repeat(500);
        assert_eq!(sanitize(&long, 200).chars().count(), 200);

        // The cut can land on a space; the result is still trimmed.
        assert_eq!(sanitize("abc def", 4), "abc");
    }

    #[test]
    fn test_sanitize_empty_falls_back() {
        assert_eq!(sanitize("???", 200), "Untitled");
        assert_eq!(sanitize("", 200), "Untitled");
    }

    #[test]
    fn test_sanitize_rejects_dot_only_names() {
        assert_eq!(sanitize(".", 200), "Untitled");
        assert_eq!(sanitize("..", 200), "Untitled");
        assert_eq!(sanitize(" ... ", 200), "Untitled");
        assert_eq!(sanitize("../..", 200), "Untitled");
        // A cut that leaves only dots falls back as well.
        assert_eq!(sanitize("..abc", 2), "Un");
        // Dots inside a name are fine.
        assert_eq!(sanitize("Mr. Robot", 200), "Mr. Robot");
    }

    #[test]
    fn test_dot_only_titles_stay_inside_their_root() {
        let movie = ContentDescriptor::movie("..", None);
        assert_eq!(content_dir(&movie, 200), PathBuf::from("Untitled"));

        let show = ContentDescriptor::episode("..", 1, 2);
        assert_eq!(
            content_dir(&show, 200),
            PathBuf::from("Untitled").join("Season 01")
        );
        assert_eq!(
            video_file_name(&show, Path::new("x.mkv"), false, 200),
            "Untitled S01E02.mkv"
        );
    }

    #[test]
    fn test_sanitize_caps_bytes_on_char_boundary() {
        let wide = "é".repeat(200);
        let name = sanitize(&wide, 200);
        assert!(name.len() <= 255);
        assert_eq!(name.chars().count(), 127);
        assert!(name.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_long_multi_file_names_fit_one_component() {
        let movie = ContentDescriptor::movie("T".repeat(120), Some(2001));
        let original = format!("{}.mkv", "s".repeat(150));

        let name = video_file_name(&movie, Path::new(&original), true, 200);
        assert!(name.len() <= 255, "{} bytes", name.len());
        assert!(name.starts_with(&format!("{} (2001) - ", "T".repeat(120))));
        assert!(name.ends_with(".mkv"));

        let path = PathBuf::from("/lib").join(&name);
        assert!(sidecar_file_name(&path).len() <= 255);
        let suffixed = with_collision_suffix(&path, 99);
        assert!(suffixed.file_name().unwrap().len() <= 255);

        // Multibyte titles are cut by bytes, not chars.
        let wide = ContentDescriptor::movie("日本".repeat(100), Some(2001));
        let name = video_file_name(&wide, Path::new("extra.mp4"), true, 200);
        assert!(name.len() <= 255, "{} bytes", name.len());
        assert!(name.ends_with(".mp4"));
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let inputs = [
            "The Matrix",
            "  Spaced   out  ",
            "Star Wars: Episode IV - A New Hope",
            "Amélie",
            "a/b\\c:d",
            "???",
            "abc def",
            "trailing space cut here ",
            "..",
            "..abc",
        ];
        for max_len in [4, 10, 200] {
            for input in inputs {
                let once = sanitize(input, max_len);
                assert_eq!(sanitize(&once, max_len), once, "input {input:?} max {max_len}");
            }
        }
    }

    #[test]
    fn test_extension_matching_is_case_insensitive() {
        assert!(is_video(Path::new("Movie.MKV")));
        assert!(is_video(Path::new("dir/movie.m4v")));
        assert!(!is_video(Path::new("movie.nfo")));
        assert!(!is_video(Path::new("mkv")));
        assert!(is_subtitle(Path::new("movie.en.SRT")));
        assert!(!is_subtitle(Path::new("movie.txt")));
    }

    #[test]
    fn test_movie_names() {
        let matrix = ContentDescriptor::movie("The Matrix", Some(1999));
        assert_eq!(content_dir(&matrix, 200), PathBuf::from("The Matrix (1999)"));
        assert_eq!(
            video_file_name(&matrix, Path::new("The.Matrix.1999.1080p.mkv"), false, 200),
            "The Matrix (1999).mkv"
        );
        assert_eq!(
            video_file_name(&matrix, Path::new("sub/Extras: Making Of.mp4"), true, 200),
            "The Matrix (1999) - Extras Making Of.mp4"
        );

        let no_year = ContentDescriptor::movie("Primer", None);
        assert_eq!(content_dir(&no_year, 200), PathBuf::from("Primer"));
        assert_eq!(
            video_file_name(&no_year, Path::new("primer.avi"), false, 200),
            "Primer.avi"
        );
    }

    #[test]
    fn test_episode_names() {
        let ep = ContentDescriptor::episode("Breaking Bad", 1, 1);
        assert_eq!(
            content_dir(&ep, 200),
            PathBuf::from("Breaking Bad").join("Season 01")
        );
        assert_eq!(
            video_file_name(&ep, Path::new("Breaking.Bad.S01E01.720p.mkv"), false, 200),
            "Breaking Bad S01E01.mkv"
        );

        let mut unnumbered = ContentDescriptor::episode("Dark", 1, 1);
        unnumbered.season = None;
        unnumbered.episode = None;
        assert_eq!(
            video_file_name(&unnumbered, Path::new("dark.mp4"), true, 200),
            "Dark S01E01.mp4"
        );
    }

    #[test]
    fn test_collision_suffix() {
        let path = Path::new("/lib/Movies/X (2000)/X (2000).mkv");
        assert_eq!(
            with_collision_suffix(path, 1),
            PathBuf::from("/lib/Movies/X (2000)/X (2000) (1).mkv")
        );
        assert_eq!(
            with_collision_suffix(Path::new("noext"), 2),
            PathBuf::from("noext (2)")
        );
    }

    #[test]
    fn test_sidecar_file_name() {
        assert_eq!(
            sidecar_file_name(Path::new("/lib/Breaking Bad S01E01.mkv")),
            "Breaking Bad S01E01.metadata.json"
        );
    }
}
