use crate::error::{ensure_non_empty, CompositeError};
use image::{ImageError, RgbImage};
use std::path::Path;

/// Decode an image file into 8-bit RGB
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<RgbImage, CompositeError> {
    let path = path.as_ref();
    let decoded = image::open(path).map_err(|err| match err {
        ImageError::IoError(source) => CompositeError::Io {
            path: path.to_path_buf(),
            source,
        },
        source => CompositeError::Decode {
            path: path.to_path_buf(),
            source,
        },
    })?;

    let image = decoded.to_rgb8();
    ensure_non_empty(&path.display().to_string(), image.dimensions())?;
    tracing::debug!("Loaded {} ({}x{})", path.display(), image.width(), image.height());
    Ok(image)
}
