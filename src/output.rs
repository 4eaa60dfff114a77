//! Encoding of the rendered raster to the output file

use image::DynamicImage;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Error type for output operations
#[derive(Debug, Error)]
pub enum OutputError {
    /// IO error while preparing the destination
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Encoding error, including unknown extensions
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Save an image; the encoding is chosen from the path's extension.
///
/// # Arguments
///
/// * `image` - The image to save
/// * `path` - The output file path
/// * `create_dirs` - Create missing parent directories first
pub fn save_image(image: &DynamicImage, path: &Path, create_dirs: bool) -> Result<(), OutputError> {
    if create_dirs {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }

    image.save(path)?;
    tracing::info!(path = %path.display(), "wrote annotated overlay");
    Ok(())
}
