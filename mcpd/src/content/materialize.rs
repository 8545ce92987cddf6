//! Writing decoded binary payloads to disk

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use base64::Engine;

use super::ContentError;

/// Extension used when the MIME type is not in the table
pub const FALLBACK_EXTENSION: &str = "bin";

const MIME_EXTENSIONS: &[(&str, &str)] = &[
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
    ("image/svg+xml", "svg"),
    ("image/bmp", "bmp"),
    ("image/tiff", "tiff"),
    ("image/x-icon", "ico"),
    ("audio/wav", "wav"),
    ("audio/x-wav", "wav"),
    ("audio/wave", "wav"),
    ("audio/mpeg", "mp3"),
    ("audio/mp3", "mp3"),
    ("audio/ogg", "ogg"),
    ("audio/webm", "webm"),
    ("audio/flac", "flac"),
    ("audio/aac", "aac"),
    ("audio/mp4", "m4a"),
    ("application/pdf", "pdf"),
    ("application/json", "json"),
    ("application/zip", "zip"),
    ("application/gzip", "gz"),
    ("text/plain", "txt"),
    ("text/html", "html"),
    ("text/csv", "csv"),
    ("text/markdown", "md"),
];

/// Map a MIME type to a file extension, ignoring parameters like `; charset=utf-8`
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    MIME_EXTENSIONS
        .iter()
        .find(|(mime, _)| *mime == essence)
        .map(|(_, ext)| *ext)
        .unwrap_or(FALLBACK_EXTENSION)
}

/// Decode `data` and write it to `<kind>-<millis>.<ext>` under `output_dir`.
///
/// The name is claimed with `create_new`; several items landing in the same
/// millisecond get a `-<n>` suffix instead of overwriting each other.
pub fn write_binary(
    kind: &'static str,
    data: &str,
    mime_type: &str,
    output_dir: &Path,
) -> Result<PathBuf, ContentError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|source| ContentError::Decode { kind, source })?;

    std::fs::create_dir_all(output_dir).map_err(|source| ContentError::Write {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let stamp = chrono::Utc::now().timestamp_millis();
    let ext = extension_for_mime(mime_type);

    let mut attempt = 0u32;
    loop {
        let file_name = if attempt == 0 {
            format!("{}-{}.{}", kind, stamp, ext)
        } else {
            format!("{}-{}-{}.{}", kind, stamp, attempt, ext)
        };
        let path = output_dir.join(file_name);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(&bytes)
                    .map_err(|source| ContentError::Write {
                        path: path.clone(),
                        source,
                    })?;
                tracing::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
                return Ok(path);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
            Err(source) => return Err(ContentError::Write { path, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_table() {
        assert_eq!(extension_for_mime("image/png"), "png");
        assert_eq!(extension_for_mime("IMAGE/JPEG"), "jpg");
        assert_eq!(extension_for_mime("audio/mpeg"), "mp3");
        assert_eq!(extension_for_mime("text/plain; charset=utf-8"), "txt");
        assert_eq!(extension_for_mime("application/x-unknown"), FALLBACK_EXTENSION);
        assert_eq!(extension_for_mime(""), FALLBACK_EXTENSION);
    }

    #[test]
    fn test_same_millisecond_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_binary("image", "AAEC", "image/png", dir.path()).unwrap();
        let b = write_binary("image", "AwQF", "image/png", dir.path()).unwrap();
        assert_ne!(a, b);
        assert_eq!(std::fs::read(&a).unwrap(), vec![0, 1, 2]);
        assert_eq!(std::fs::read(&b).unwrap(), vec![3, 4, 5]);
    }

    #[test]
    fn test_creates_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("output").join("dev");
        let path = write_binary("audio", "AAEC", "audio/wav", &nested).unwrap();
        assert!(path.starts_with(&nested));
        assert_eq!(path.extension().unwrap(), "wav");
    }
}
