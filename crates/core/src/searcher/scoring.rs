//! Candidate scoring and ranking.
//!
//! Scores are a pure function of a candidate's title, seeders and size string
//! plus the caller's quality preference. The constants are empirically tuned
//! and kept as-is.

use std::cmp::Ordering;

use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::{Quality, QualityPreference, TorrentCandidate};

/// Seeder points cap.
const MAX_SEEDER_POINTS: i64 = 1000;
const EXACT_QUALITY_BONUS: i64 = 500;
const SIZE_FIT_BONUS: i64 = 50;
const WEB_SOURCE_BONUS: i64 = 30;
const BLURAY_SOURCE_BONUS: i64 = 25;
const TRUSTED_GROUP_BONUS: i64 = 20;
const LOW_QUALITY_PENALTY: i64 = 200;
const LOW_SEEDERS_PENALTY: i64 = 100;
const LOW_SEEDERS_THRESHOLD: u32 = 5;

/// Release tags that mark camcorder/telesync rips.
const LOW_QUALITY_MARKERS: &[&str] = &["cam", "ts", "tc", "telesync", "telecine"];

/// Prefixes and suffixes release groups glue onto a marker (HDCAM, TSRip).
const MARKER_PREFIXES: &[&str] = &["hd", "hq", "new"];
const MARKER_SUFFIXES: &[&str] = &["rip"];

static SIZE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([\d.]+)\s*(GB|MB)").expect("valid size regex"));

/// Derive the quality tag from a release title.
pub fn detect_quality(title: &str) -> Quality {
    let lower = title.to_lowercase();
    if lower.contains("2160p") {
        Quality::Uhd2160p
    } else if lower.contains("4k") {
        Quality::Uhd4k
    } else if lower.contains("1080p") {
        Quality::Fhd1080p
    } else if lower.contains("720p") {
        Quality::Hd720p
    } else {
        Quality::Unknown
    }
}

/// Parse a "1.4 GB" / "700 MB" style size into gigabytes.
pub fn parse_size_gb(size: &str) -> Option<f64> {
    let caps = SIZE_RE.captures(size)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps.get(2)?.as_str();
    if unit.eq_ignore_ascii_case("GB") {
        Some(value)
    } else {
        Some(value / 1024.0)
    }
}

/// Human readable size, base 1024 with one decimal ("1.5 GB").
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, UNITS[unit])
}

/// Whether one title token is a camcorder/telesync tag.
///
/// The marker must make up the token once a known quality prefix or rip
/// suffix is removed, so "HDTC" and "TSRip" match while "Camera" and "Parts"
/// do not.
fn is_low_quality_token(token: &str) -> bool {
    let core = MARKER_PREFIXES
        .iter()
        .find_map(|prefix| token.strip_prefix(*prefix))
        .unwrap_or(token);
    let core = MARKER_SUFFIXES
        .iter()
        .find_map(|suffix| core.strip_suffix(*suffix))
        .unwrap_or(core);
    LOW_QUALITY_MARKERS.contains(&core) || LOW_QUALITY_MARKERS.contains(&token)
}

/// Whether the title carries a camcorder/telesync tag.
pub fn has_low_quality_marker(title: &str) -> bool {
    title
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(is_low_quality_token)
}

fn size_fits_quality(quality: Quality, size_gb: f64) -> bool {
    match quality {
        Quality::Hd720p => (0.8..=3.0).contains(&size_gb),
        Quality::Fhd1080p => (1.5..=8.0).contains(&size_gb),
        Quality::Uhd4k | Quality::Uhd2160p => (4.0..=25.0).contains(&size_gb),
        Quality::Unknown => false,
    }
}

/// Score one candidate. Never negative.
pub fn score_candidate(title: &str, seeders: u32, size: &str, preference: QualityPreference) -> u32 {
    let mut score: i64 = (seeders as i64 * 2).min(MAX_SEEDER_POINTS);

    let quality = detect_quality(title);
    score += match preference {
        QualityPreference::Auto => quality.rank() * 100,
        QualityPreference::Exact(wanted) if wanted == quality => EXACT_QUALITY_BONUS,
        QualityPreference::Exact(_) => quality.rank() * 50,
    };

    if parse_size_gb(size).is_some_and(|gb| size_fits_quality(quality, gb)) {
        score += SIZE_FIT_BONUS;
    }

    let lower = title.to_lowercase();
    if lower.contains("webrip") || lower.contains("web-dl") {
        score += WEB_SOURCE_BONUS;
    }
    if lower.contains("bluray") || lower.contains("bdrip") {
        score += BLURAY_SOURCE_BONUS;
    }
    if lower.contains("yts") || lower.contains("yify") {
        score += TRUSTED_GROUP_BONUS;
    }

    if has_low_quality_marker(title) {
        score -= LOW_QUALITY_PENALTY;
    }
    if seeders < LOW_SEEDERS_THRESHOLD {
        score -= LOW_SEEDERS_PENALTY;
    }

    score.max(0) as u32
}

/// Score, order and truncate candidates.
///
/// Ordering is score descending, then seeders descending, then input order
/// (the sort is stable).
pub fn rank_candidates(
    mut candidates: Vec<TorrentCandidate>,
    preference: QualityPreference,
    max_results: usize,
) -> Vec<TorrentCandidate> {
    for candidate in &mut candidates {
        candidate.quality = detect_quality(&candidate.title);
        candidate.score = score_candidate(
            &candidate.title,
            candidate.seeders,
            &candidate.size,
            preference,
        );
    }

    candidates.sort_by(|a, b| match b.score.cmp(&a.score) {
        Ordering::Equal => b.seeders.cmp(&a.seeders),
        other => other,
    });
    candidates.truncate(max_results);
    candidates
}
