/// Pick the MIME type sent upstream: a declared `image/*` type wins,
/// otherwise sniff the magic bytes.
pub fn resolve_image_mime(declared: Option<&str>, bytes: &[u8]) -> String {
    match declared.map(|m| m.trim().to_ascii_lowercase()) {
        Some(mime) if mime.len() > "image/".len() && mime.starts_with("image/") => mime,
        _ => detect_image_mime(bytes).to_string(),
    }
}

pub fn detect_image_mime(bytes: &[u8]) -> &'static str {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [0x89, 0x50, 0x4E, 0x47, ..] => "image/png",
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => "image/webp",
        [0x47, 0x49, 0x46, 0x38, ..] => "image/gif",
        _ => {
            tracing::warn!(
                "Unrecognized image format (first 4 bytes: {:02X?}), falling back to image/png",
                &bytes[..bytes.len().min(4)]
            );
            "image/png"
        }
    }
}
