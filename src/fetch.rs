use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{DynamicImage, ImageReader};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use tracing::{debug, info, warn};

/// A downloaded image, immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    /// Position of the source URL in the input list. Stable across skipped fetches, so it
    /// also names every per-image file derived from this asset.
    pub index: usize,
    pub url: String,
    pub path: PathBuf,
}

/// Downloads images over plain HTTP GET into a directory.
pub struct Fetcher {
    client: Client,
    images_dir: PathBuf,
}

impl Fetcher {
    pub fn new(images_dir: impl Into<PathBuf>) -> Result<Self> {
        let client = Client::builder()
            .user_agent("mangacast")
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            images_dir: images_dir.into(),
        })
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    /// Fetch every URL in order and return the assets that were saved.
    ///
    /// A response other than `200 OK` drops that entry: the result can be shorter than
    /// `urls` and never contains placeholders. Transport failures (DNS, refused
    /// connections, truncated bodies) and disk write failures abort the whole fetch.
    pub fn fetch_all(&self, urls: &[String]) -> Result<Vec<ImageAsset>> {
        fs::create_dir_all(&self.images_dir).with_context(|| {
            format!(
                "failed to create images dir: {}",
                self.images_dir.display()
            )
        })?;

        let mut assets = Vec::with_capacity(urls.len());
        for (index, url) in urls.iter().enumerate() {
            if let Some(asset) = self.fetch_one(index, url)? {
                assets.push(asset);
            }
        }

        info!(
            requested = urls.len(),
            saved = assets.len(),
            "images downloaded"
        );
        Ok(assets)
    }

    fn fetch_one(&self, index: usize, url: &str) -> Result<Option<ImageAsset>> {
        let resp = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("request failed: {url}"))?;

        if resp.status() != StatusCode::OK {
            warn!(index, url, status = %resp.status(), "unexpected status; skipping image");
            return Ok(None);
        }

        let bytes = resp
            .bytes()
            .with_context(|| format!("failed to read image body: {url}"))?;

        let path = self.images_dir.join(image_file_name(index));
        fs::write(&path, &bytes)
            .with_context(|| format!("failed to write image: {}", path.display()))?;

        debug!(index, url, bytes = bytes.len(), path = %path.display(), "saved image");
        Ok(Some(ImageAsset {
            index,
            url: url.to_owned(),
            path,
        }))
    }
}

pub fn image_file_name(index: usize) -> String {
    format!("image_{index}.jpg")
}

/// Decode an image, sniffing the format from its bytes.
///
/// Hosts regularly serve PNG or WebP under a `.jpg` name, so the extension is only a
/// fallback.
pub fn open_image(path: &Path) -> Result<DynamicImage> {
    let img = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .with_context(|| format!("failed to open image {}", path.display()))?
        .decode()
        .with_context(|| format!("failed to decode image {}", path.display()))?;
    Ok(img)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_follow_the_input_index() {
        assert_eq!(image_file_name(0), "image_0.jpg");
        assert_eq!(image_file_name(22), "image_22.jpg");
    }

    #[test]
    fn open_image_ignores_a_misleading_extension() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("image_0.jpg");
        image::RgbImage::from_pixel(3, 2, image::Rgb([1, 2, 3]))
            .save_with_format(&path, image::ImageFormat::Png)?;

        let img = open_image(&path)?;
        assert_eq!((img.width(), img.height()), (3, 2));
        Ok(())
    }

    #[test]
    fn unreachable_hosts_abort_the_fetch() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let fetcher = Fetcher::new(dir.path().join("images"))?;

        // Port 9 (discard) on localhost is closed in test environments.
        let url = "http://127.0.0.1:9/ch_0_1.jpg".to_owned();
        let err = fetcher.fetch_all(std::slice::from_ref(&url)).unwrap_err();
        assert!(format!("{err:#}").contains(&url), "unexpected: {err:#}");
        assert!(fetcher.images_dir().is_dir());
        assert!(!fetcher.images_dir().join("image_0.jpg").exists());
        Ok(())
    }
}
