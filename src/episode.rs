//! Pairing subtitle files with their videos through `S01E02`-style tags.

use std::{fs, path::Path, sync::OnceLock};

use regex::Regex;

use crate::{
    error::{Error, Result},
    files::{list_files, list_subtitle_files, stem},
};

/// Video extensions in order of preference.
const VIDEO_EXTENSIONS: &[&str] = &["mkv", "mp4"];

fn episode_tag_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r#"S[0-9]{2}E[0-9]{2}"#).unwrap())
}

/// Returns the first `SxxEyy` tag in a file name.
pub fn episode_tag(name: &str) -> Option<&str> {
    episode_tag_regex().find(name).map(|m| m.as_str())
}

/// Finds the video for an episode tag.
///
/// `.mkv` files are preferred over `.mp4` files. Within an extension the first
/// file by name wins.
pub fn find_video(dir: &Path, tag: &str) -> Result<Option<String>> {
    for ext in VIDEO_EXTENSIONS {
        let found = list_files(dir, &[*ext])?
            .into_iter()
            .find(|name| name.contains(tag));
        if found.is_some() {
            return Ok(found);
        }
    }
    Ok(None)
}

/// What happened to a subtitle file when matching it against the videos.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchStatus {
    /// The file name has no episode tag.
    Ignored,
    /// No video has the same episode tag.
    NotFound,
    /// The subtitle is already named after the video.
    Same(String),
    /// A video was found but the names differ.
    Found(String),
    /// The subtitle was renamed to this name.
    Renamed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeMatch {
    pub subtitle: String,
    pub status: MatchStatus,
}

fn match_subtitle(dir: &Path, subtitle: String) -> Result<EpisodeMatch> {
    let status = match episode_tag(&subtitle) {
        None => MatchStatus::Ignored,
        Some(tag) => match find_video(dir, tag)? {
            None => MatchStatus::NotFound,
            Some(video) if stem(&video) == stem(&subtitle) => MatchStatus::Same(video),
            Some(video) => MatchStatus::Found(video),
        },
    };
    Ok(EpisodeMatch { subtitle, status })
}

/// Matches every subtitle file in `dir` against the videos next to it.
pub fn match_subtitles(dir: &Path) -> Result<Vec<EpisodeMatch>> {
    list_subtitle_files(dir)?
        .into_iter()
        .map(|subtitle| match_subtitle(dir, subtitle))
        .collect()
}

/// Renames every subtitle file in `dir` after its video, keeping the
/// subtitle's extension.
///
/// Subtitles that are ignored, have no video, or are already named correctly
/// are reported as-is. The first failed rename stops the process.
pub fn rename_subtitles(dir: &Path) -> Result<Vec<EpisodeMatch>> {
    let mut results = Vec::new();
    for subtitle in list_subtitle_files(dir)? {
        let mut result = match_subtitle(dir, subtitle)?;
        if let MatchStatus::Found(video) = &result.status {
            let ext = &result.subtitle[stem(&result.subtitle).len()..];
            let new_name = format!("{}{ext}", stem(video));
            let from = dir.join(&result.subtitle);
            fs::rename(&from, dir.join(&new_name)).map_err(Error::io(&from))?;
            log::info!("renamed {} to {new_name}", result.subtitle);
            result.status = MatchStatus::Renamed(new_name);
        }
        results.push(result);
    }
    Ok(results)
}
