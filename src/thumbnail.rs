//! Thumbnail generation.
//!
//! [`FrameExtractor`] is the one image-processing operation the scheduler
//! needs: decode the first frame of a source file and write it as a static
//! image. [`ImageFrameExtractor`] implements it with the `image` crate on
//! tokio's blocking pool.

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};
use std::path::{Path, PathBuf};


/// Extension of every generated thumbnail.
pub const THUMBNAIL_EXTENSION: &str = "jpg";

#[derive(thiserror::Error, Debug)]
pub enum ThumbnailError {
    #[error("error while decoding or encoding the image: {0}")]
    Image(#[from] image::ImageError),
    #[error("there was an i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("thumbnail task did not complete: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("{0}")]
    Other(String),
}

#[async_trait]
pub trait FrameExtractor: Send + Sync {
    /// Write the first frame of `source` as a static image at `dest`.
    async fn extract_first_frame(&self, source: &Path, dest: &Path)
        -> Result<(), ThumbnailError>;
}

/// Decodes with `image` (GIF decodes its first frame), scales down to fit a
/// `size`×`size` box and saves as JPEG.
#[derive(Debug, Clone)]
pub struct ImageFrameExtractor {
    size: u32,
}

impl ImageFrameExtractor {
    pub fn new(size: u32) -> Self {
        Self { size }
    }
}

#[async_trait]
impl FrameExtractor for ImageFrameExtractor {
    async fn extract_first_frame(
        &self,
        source: &Path,
        dest: &Path,
    ) -> Result<(), ThumbnailError> {
        let size = self.size;
        let source = source.to_path_buf();
        let dest = dest.to_path_buf();

        tokio::task::spawn_blocking(move || -> Result<(), ThumbnailError> {
            let frame = image::open(&source)?;
            let thumb = frame.thumbnail(size, size);
            // JPEG has no alpha channel.
            DynamicImage::ImageRgb8(thumb.to_rgb8()).save_with_format(&dest, ImageFormat::Jpeg)?;
            Ok(())
        })
        .await?
    }
}

/// `<thumbs_dir>/<filename>.jpg`. The full source filename is kept, so
/// `cat.gif` and `cat.png` get distinct thumbnails.
pub fn thumbnail_path_for(thumbs_dir: &Path, filename: &str) -> PathBuf {
    thumbs_dir.join(format!("{}.{}", filename, THUMBNAIL_EXTENSION))
}
