//! Where the image URLs come from.
//!
//! A URL file is either a plain list (one URL per line) or the chapter JSON produced by
//! the chapter scraper: `[{"chapterName": "...", "images": ["...", ...]}, ...]`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

const DEFAULT_URL_PREFIX: &str =
    "https://s2.manhuatop.org/manga_e7c1fdaad24fe62577ae5ed261115ba1/chapter_0";

const DEFAULT_PAGE_COUNT: usize = 23;

/// The built-in list: pages 1 through 23 of chapter 0.
pub fn default_urls() -> Vec<String> {
    (1..=DEFAULT_PAGE_COUNT)
        .map(|page| format!("{DEFAULT_URL_PREFIX}/ch_0_{page}.jpg"))
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub chapter_name: String,
    pub images: Vec<String>,
}

/// Read URLs from `path`. See [`parse_urls`].
pub fn load_urls(path: &Path, chapter: Option<&str>) -> Result<Vec<String>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read URL file: {}", path.display()))?;
    parse_urls(&contents, chapter)
        .with_context(|| format!("invalid URL file: {}", path.display()))
}

/// Parse a plain URL list or chapter JSON.
///
/// With chapter JSON, `chapter` selects a single chapter by name; without it every
/// chapter's images are concatenated in file order. Plain lists ignore blank lines and
/// `#` comments and don't support chapter selection.
pub fn parse_urls(contents: &str, chapter: Option<&str>) -> Result<Vec<String>> {
    if contents.trim_start().starts_with('[') {
        let chapters: Vec<Chapter> =
            serde_json::from_str(contents).context("failed to parse chapter JSON")?;
        return select_chapter(chapters, chapter);
    }

    if let Some(name) = chapter {
        bail!("chapter '{name}' requested but the URL file is a plain list");
    }

    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_owned)
        .collect())
}

fn select_chapter(chapters: Vec<Chapter>, name: Option<&str>) -> Result<Vec<String>> {
    let Some(name) = name else {
        return Ok(chapters.into_iter().flat_map(|c| c.images).collect());
    };

    let known: Vec<String> = chapters.iter().map(|c| c.chapter_name.clone()).collect();
    match chapters.into_iter().find(|c| c.chapter_name == name) {
        Some(chapter) => Ok(chapter.images),
        None => bail!(
            "chapter '{name}' not found; available: {}",
            known.join(", ")
        ),
    }
}
