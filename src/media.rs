// ABOUTME: Image helpers: supported-format checks, base64 encoding, media-type sniffing,
// ABOUTME: and the file inspection shown in the metadata panel / `inspect` command.

use base64::{Engine, engine::general_purpose::STANDARD};
use image::{ImageDecoder, ImageFormat, ImageReader};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::time::SystemTime;

use crate::error::ChatError;

pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

/// An image the tool can process: an existing file with a supported extension.
pub fn is_supported_image(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Read an image once and return its MIME type plus base64-encoded bytes,
/// ready to embed in a chat request envelope.
pub fn encode_for_chat(path: &Path) -> Result<(&'static str, String), ChatError> {
    let bytes = fs::read(path)
        .map_err(|err| ChatError::Validation(format!("cannot read image {}: {}", path.display(), err)))?;
    let mime = sniff_media_type(&bytes).ok_or_else(|| {
        ChatError::Validation(format!("unsupported image format for chat: {}", path.display()))
    })?;
    Ok((mime, STANDARD.encode(&bytes)))
}

/// Detect an image's MIME type by sniffing the file's actual bytes.
pub fn media_type(path: &Path) -> Result<&'static str, ChatError> {
    encode_for_chat(path).map(|(mime, _)| mime)
}

fn sniff_media_type(bytes: &[u8]) -> Option<&'static str> {
    match image::guess_format(bytes).ok()? {
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::Gif => Some("image/gif"),
        ImageFormat::WebP => Some("image/webp"),
        _ => None,
    }
}

/// Summary of an image file for display purposes.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImageFileInfo {
    pub path: String,
    pub size: String,
    pub created_time: String,
    pub modified_time: String,
    pub image_format: Option<String>,
    pub dimensions: Option<(u32, u32)>,
    pub color_mode: Option<String>,
    pub is_valid: bool,
}

/// Convert bytes to a human-readable size (GB/MB/KB/B).
pub fn format_file_size(size: u64) -> String {
    const UNITS: [(&str, u64); 3] = [("GB", 1 << 30), ("MB", 1 << 20), ("KB", 1 << 10)];
    for (unit, threshold) in UNITS {
        if size >= threshold {
            return format!("{:.2} {}", size as f64 / threshold as f64, unit);
        }
    }
    format!("{} B", size)
}

fn format_timestamp(time: SystemTime) -> String {
    jiff::Timestamp::try_from(time)
        .map(|timestamp| {
            timestamp
                .to_zoned(jiff::tz::TimeZone::system())
                .strftime("%Y-%m-%d %H:%M:%S%.3f")
                .to_string()
        })
        .unwrap_or_default()
}

/// Inspect an image file. A missing file yields a zeroed, invalid info rather
/// than an error; a file that fails to decode keeps `is_valid = false`.
pub fn analyze_image_file(path: &Path) -> ImageFileInfo {
    let absolute = path
        .canonicalize()
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string();

    let Ok(metadata) = fs::metadata(path) else {
        return ImageFileInfo {
            path: absolute,
            size: "0 B".to_string(),
            ..Default::default()
        };
    };

    let mut info = ImageFileInfo {
        path: absolute,
        size: format_file_size(metadata.len()),
        created_time: metadata.created().map(format_timestamp).unwrap_or_default(),
        modified_time: metadata.modified().map(format_timestamp).unwrap_or_default(),
        ..Default::default()
    };

    if let Ok(reader) = ImageReader::open(path) {
        if let Ok(reader) = reader.with_guessed_format() {
            info.image_format = reader.format().map(|format| format!("{:?}", format));
            if let Ok(decoder) = reader.into_decoder() {
                info.dimensions = Some(decoder.dimensions());
                info.color_mode = Some(format!("{:?}", decoder.color_type()));
                info.is_valid = true;
            }
        }
    }

    info
}

#[cfg(test)]
pub(crate) mod test_images {
    use base64::{Engine, engine::general_purpose::STANDARD};

    /// A valid 1x1 PNG.
    const PNG_1X1_B64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    pub fn png_1x1() -> Vec<u8> {
        STANDARD.decode(PNG_1X1_B64).expect("embedded png decodes")
    }

    pub fn write_png(dir: &std::path::Path, name: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, png_1x1()).unwrap();
        path
    }
}
