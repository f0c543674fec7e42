//! Content descriptors.
//!
//! A [`ContentDescriptor`] identifies the movie or TV episode a download is
//! for. It drives search terms, library placement and the sidecar record.

use serde::{Deserialize, Serialize};

/// Kind of content being acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Movie,
    Episode,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Movie => "movie",
            ContentKind::Episode => "episode",
        }
    }
}

/// Identity of a piece of content (movie or single TV episode).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentDescriptor {
    /// External metadata id, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb_id: Option<u64>,
    /// Movie title, or episode title when `tv_show_name` is set.
    pub title: String,
    #[serde(rename = "type")]
    pub kind: ContentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tv_show_name: Option<String>,
}

impl ContentDescriptor {
    pub fn movie(title: impl Into<String>, year: Option<u16>) -> Self {
        Self {
            tmdb_id: None,
            title: title.into(),
            kind: ContentKind::Movie,
            year,
            season: None,
            episode: None,
            tv_show_name: None,
        }
    }

    pub fn episode(show: impl Into<String>, season: u32, episode: u32) -> Self {
        let show = show.into();
        Self {
            tmdb_id: None,
            title: show.clone(),
            kind: ContentKind::Episode,
            year: None,
            season: Some(season),
            episode: Some(episode),
            tv_show_name: Some(show),
        }
    }

    pub fn with_tmdb_id(mut self, id: u64) -> Self {
        self.tmdb_id = Some(id);
        self
    }

    pub fn is_movie(&self) -> bool {
        self.kind == ContentKind::Movie
    }

    /// Show name for episodes, falling back to the title.
    pub fn show_name(&self) -> &str {
        self.tv_show_name.as_deref().unwrap_or(&self.title)
    }

    /// Season number, defaulting to 1 when unknown.
    pub fn season_or_default(&self) -> u32 {
        self.season.unwrap_or(1)
    }

    /// Episode number, defaulting to 1 when unknown.
    pub fn episode_or_default(&self) -> u32 {
        self.episode.unwrap_or(1)
    }

    /// The title used as the base of torrent search terms.
    ///
    /// Episodes search as `"<Show> SxxEyy"` (or `"<Show> Sxx"` without an
    /// episode number).
    pub fn search_title(&self) -> String {
        match self.kind {
            ContentKind::Movie => self.title.clone(),
            ContentKind::Episode => match (self.season, self.episode) {
                (Some(s), Some(e)) => format!("{} S{:02}E{:02}", self.show_name(), s, e),
                (Some(s), None) => format!("{} S{:02}", self.show_name(), s),
                _ => self.show_name().to_string(),
            },
        }
    }

    /// Short label for logs.
    pub fn label(&self) -> String {
        match (self.kind, self.year) {
            (ContentKind::Movie, Some(year)) => format!("{} ({})", self.title, year),
            (ContentKind::Movie, None) => self.title.clone(),
            (ContentKind::Episode, _) => self.search_title(),
        }
    }
}
