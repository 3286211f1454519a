use std::fs;
use std::path::Path;

use crate::error::{Result, TrackerError};

const MIB: u64 = 1024 * 1024;

const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "bmp", "svg", "tif", "tiff", "ico", "heic", "avif",
];

/// Checks that `path` is a PDF or an image strictly smaller than `max_bytes`
/// and returns the name to display for it.
pub fn validate_file(path: &Path, max_bytes: u64) -> Result<String> {
    let metadata = fs::metadata(path)
        .map_err(|e| TrackerError::Validation(format!("Cannot read {}: {}", path.display(), e)))?;
    if !metadata.is_file() {
        return Err(TrackerError::Validation(format!("{} is not a file.", path.display())));
    }

    if !is_pdf_or_image(path) || metadata.len() >= max_bytes {
        return Err(TrackerError::Validation(format!(
            "Only PDFs or images under {} are allowed.",
            size_label(max_bytes)
        )));
    }

    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(filename)
}

fn is_pdf_or_image(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    let ext = ext.to_ascii_lowercase();
    ext == "pdf" || IMAGE_EXTENSIONS.contains(&ext.as_str())
}

fn size_label(bytes: u64) -> String {
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else {
        format!("{} bytes", bytes)
    }
}
