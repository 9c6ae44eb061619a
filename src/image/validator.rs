use crate::{Error, Result};
use image::ImageFormat;

/// What the decoder learned about a valid upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSummary {
    pub format: Option<ImageFormat>,
    pub width: u32,
    pub height: u32,
}

fn validate_sync(bytes: &[u8]) -> Result<ImageSummary> {
    let format = image::guess_format(bytes).ok();
    let img = image::load_from_memory(bytes)?;
    Ok(ImageSummary {
        format,
        width: img.width(),
        height: img.height(),
    })
}

/// Decode `bytes` on the blocking pool and report the image dimensions.
///
/// Returns [`Error::Image`] with the decoder's message when the bytes are
/// not a decodable image.
pub async fn validate_image(bytes: &[u8]) -> Result<ImageSummary> {
    let bytes = bytes.to_vec();
    tokio::task::spawn_blocking(move || validate_sync(&bytes))
        .await
        .map_err(|e| Error::Invariant(format!("Image validation task join error: {}", e)))?
}
