use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use image::{ImageFormat, ImageReader};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::info;

/// Subdirectory of the media root holding post images.
const POSTS_DIR: &str = "posts";

/// Public URL prefix the media root is served under.
pub const MEDIA_URL: &str = "/media";

/// Manages uploaded images on disk.
///
/// Images are content-addressed: `{root}/posts/{sha256}.{ext}`, so uploading
/// the same picture twice reuses one file. Posts store the path relative to
/// the root.
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    pub async fn new(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(root.join(POSTS_DIR)).await?;
        info!("Media directory: {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write a validated image and return its path relative to the media root.
    pub async fn save_post_image(&self, data: &[u8], format: ImageFormat) -> Result<String> {
        let ext = format
            .extensions_str()
            .first()
            .ok_or_else(|| anyhow!("No file extension for {:?}", format))?;
        let digest = hex::encode(Sha256::digest(data));
        let relative = format!("{}/{}.{}", POSTS_DIR, digest, ext);

        let path = self.root.join(&relative);
        if fs::try_exists(&path).await? {
            return Ok(relative);
        }

        // Write to a temp name first so readers never see a partial file
        let tmp = self.root.join(format!("{}/.{}.tmp", POSTS_DIR, digest));
        fs::write(&tmp, data).await?;
        fs::rename(&tmp, &path).await?;

        info!("Stored image {} ({} bytes)", relative, data.len());
        Ok(relative)
    }

    pub fn url_for(&self, relative: &str) -> String {
        format!("{}/{}", MEDIA_URL, relative)
    }
}

/// Decode the whole payload; returns its format only if it is a readable image.
pub fn validate_image(data: &[u8]) -> Option<ImageFormat> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?;
    let format = reader.format()?;
    reader.decode().ok()?;
    Some(format)
}

#[cfg(test)]
pub(crate) fn tiny_png() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(2, 2, image::Rgb([200, 40, 40]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}
