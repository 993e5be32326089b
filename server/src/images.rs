use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{ImageFormat, ImageReader};
use uuid::Uuid;

pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

pub const ALLOWED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Gif,
    ImageFormat::WebP,
];

/// Root directory of the blob store, from MEDIA_ROOT (default "media").
pub fn media_root() -> PathBuf {
    std::env::var("MEDIA_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("media"))
}

/// Detect the image format from magic bytes and check it against the allowed set.
pub fn detect_format(data: &[u8]) -> Result<ImageFormat, String> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| format!("Failed to read image: {}", e))?;

    let format = reader
        .format()
        .ok_or_else(|| "Could not detect image format".to_string())?;

    if !ALLOWED_FORMATS.contains(&format) {
        return Err(format!(
            "Unsupported image format: {:?}. Allowed: JPEG, PNG, GIF, WebP",
            format
        ));
    }

    reader
        .decode()
        .map_err(|e| format!("Failed to decode image: {}", e))?;

    Ok(format)
}

/// Generate a collision-resistant storage path for an uploaded recipe image.
/// Keeps the original filename's extension, falling back to the detected
/// format when the filename has none.
pub fn recipe_image_path(filename: &str, format: ImageFormat) -> String {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_else(|| {
            format
                .extensions_str()
                .first()
                .copied()
                .unwrap_or("bin")
                .to_string()
        });

    format!("uploads/recipe/{}.{}", Uuid::new_v4(), ext)
}

/// Write image bytes under the media root at the given relative path.
pub fn store_image(relative_path: &str, data: &[u8]) -> std::io::Result<()> {
    let full_path = media_root().join(relative_path);
    if let Some(parent) = full_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(full_path, data)
}

/// Best-effort blob release. Failures are logged, never surfaced.
pub fn remove_image(relative_path: &str) {
    let full_path = media_root().join(relative_path);
    if let Err(e) = std::fs::remove_file(&full_path) {
        tracing::warn!("Failed to remove image {}: {}", full_path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_image_payload() {
        assert!(detect_format(b"definitely not an image").is_err());
        assert!(detect_format(&[]).is_err());
    }

    #[test]
    fn image_path_keeps_original_extension() {
        let path = recipe_image_path("dinner.JPG", ImageFormat::Jpeg);
        assert!(path.starts_with("uploads/recipe/"));
        assert!(path.ends_with(".jpg"));
    }

    #[test]
    fn image_path_falls_back_to_format_extension() {
        let path = recipe_image_path("upload", ImageFormat::Png);
        assert!(path.ends_with(".png"));
    }

    #[test]
    fn image_paths_are_unique() {
        let a = recipe_image_path("a.png", ImageFormat::Png);
        let b = recipe_image_path("a.png", ImageFormat::Png);
        assert_ne!(a, b);
    }
}
