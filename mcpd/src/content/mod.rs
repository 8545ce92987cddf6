//! Tool invocation results and how they are rendered for the operator
//!
//! Results arrive as raw MCP JSON. Text is printed as-is; binary payloads
//! (images, audio, blob resources) are decoded and written to an output directory,
//! and the printed line points at the file.

mod materialize;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use materialize::{extension_for_mime, write_binary, FALLBACK_EXTENSION};

/// Marker prepended to the whole rendering when the tool reports `isError`
pub const ERROR_PREFIX: &str = "Error: ";

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("invalid base64 in {kind} content: {source}")]
    Decode {
        kind: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result of one tool invocation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    #[serde(default)]
    pub content: Vec<ContentItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl ToolCallResult {
    pub fn is_error(&self) -> bool {
        self.is_error.unwrap_or(false)
    }
}

/// One content item, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    Text {
        text: String,
    },
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    Audio {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    ResourceLink {
        uri: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    Resource {
        resource: EmbeddedResource,
    },
    /// Anything this client does not know how to render
    #[serde(other)]
    Unsupported,
}

/// Body of an embedded `resource` item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmbeddedResource {
    Text {
        uri: String,
        #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
        text: String,
    },
    Blob {
        uri: String,
        #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
        blob: String,
    },
}

/// Render one item as a user-facing line, writing binary payloads under `output_dir`
pub fn render_item(item: &ContentItem, output_dir: &Path) -> Result<String, ContentError> {
    match item {
        ContentItem::Text { text } => Ok(text.clone()),
        ContentItem::Image { data, mime_type } => {
            let path = write_binary("image", data, mime_type, output_dir)?;
            Ok(format!("Saved image ({}) to {}", mime_type, path.display()))
        }
        ContentItem::Audio { data, mime_type } => {
            let path = write_binary("audio", data, mime_type, output_dir)?;
            Ok(format!("Saved audio ({}) to {}", mime_type, path.display()))
        }
        ContentItem::ResourceLink { uri, name } => Ok(match name {
            Some(name) => format!("Resource link: {} ({})", name, uri),
            None => format!("Resource link: {}", uri),
        }),
        ContentItem::Resource {
            resource: EmbeddedResource::Text { text, .. },
        } => Ok(text.clone()),
        ContentItem::Resource {
            resource:
                EmbeddedResource::Blob {
                    uri,
                    mime_type,
                    blob,
                },
        } => {
            let mime = mime_type.as_deref().unwrap_or("application/octet-stream");
            let path = write_binary("resource", blob, mime, output_dir)?;
            Ok(format!(
                "Saved resource {} ({}) to {}",
                uri,
                mime,
                path.display()
            ))
        }
        ContentItem::Unsupported => Ok("[unsupported content item]".to_string()),
    }
}

/// Render a whole result.
///
/// Items are joined with newlines. With no content but a structured payload, the
/// payload is pretty-printed instead. `isError` prefixes everything with [`ERROR_PREFIX`].
pub fn format_result(result: &ToolCallResult, output_dir: &Path) -> Result<String, ContentError> {
    let body = if result.content.is_empty() {
        match &result.structured_content {
            Some(structured) => {
                serde_json::to_string_pretty(structured).unwrap_or_else(|_| structured.to_string())
            }
            None => String::new(),
        }
    } else {
        result
            .content
            .iter()
            .map(|item| render_item(item, output_dir))
            .collect::<Result<Vec<_>, _>>()?
            .join("\n")
    };

    if result.is_error() {
        Ok(format!("{}{}", ERROR_PREFIX, body))
    } else {
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use serde_json::json;

    fn result_from(value: Value) -> ToolCallResult {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_text_passes_through() {
        let dir = tempfile::tempdir().unwrap();
        let result = result_from(json!({"content": [{"type": "text", "text": "hello"}]}));
        assert_eq!(format_result(&result, dir.path()).unwrap(), "hello");
    }

    #[test]
    fn test_png_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let bytes: Vec<u8> = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 1, 2, 255];
        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
        let result = result_from(json!({
            "content": [{"type": "image", "data": encoded, "mimeType": "image/png"}]
        }));

        let out = format_result(&result, dir.path()).unwrap();
        assert!(!out.contains(&encoded));

        let files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(files.len(), 1);
        let written = &files[0];
        assert_eq!(written.extension().unwrap(), "png");
        assert!(written
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("image-"));
        assert_eq!(std::fs::read(written).unwrap(), bytes);
        assert!(out.contains(&written.display().to_string()));
    }

    #[test]
    fn test_unknown_mime_uses_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"RIFF....");
        let result = result_from(json!({
            "content": [{"type": "audio", "data": encoded, "mimeType": "audio/x-made-up"}]
        }));

        let out = format_result(&result, dir.path()).unwrap();
        assert!(out.starts_with("Saved audio (audio/x-made-up) to "));
        assert!(out.ends_with(&format!(".{}", FALLBACK_EXTENSION)));
    }

    #[test]
    fn test_resource_variants() {
        let dir = tempfile::tempdir().unwrap();
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"%PDF-1.7");
        let result = result_from(json!({
            "content": [
                {"type": "resource_link", "uri": "file:///tmp/report.md", "name": "report"},
                {"type": "resource_link", "uri": "https://example.com/x"},
                {"type": "resource", "resource": {"uri": "mem://note", "mimeType": "text/plain", "text": "inline note"}},
                {"type": "resource", "resource": {"uri": "mem://doc", "mimeType": "application/pdf", "blob": encoded}}
            ]
        }));

        let out = format_result(&result, dir.path()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Resource link: report (file:///tmp/report.md)");
        assert_eq!(lines[1], "Resource link: https://example.com/x");
        assert_eq!(lines[2], "inline note");
        assert!(lines[3].starts_with("Saved resource mem://doc (application/pdf) to "));
        assert!(lines[3].ends_with(".pdf"));
    }

    #[test]
    fn test_is_error_prefixes_any_shape() {
        let dir = tempfile::tempdir().unwrap();
        let shapes = [
            json!({"content": [{"type": "text", "text": "boom"}], "isError": true}),
            json!({"content": [], "isError": true}),
            json!({"content": [{"type": "resource_link", "uri": "x://y"}], "isError": true}),
            json!({"content": [], "structuredContent": {"code": 7}, "isError": true}),
        ];
        for shape in shapes {
            let out = format_result(&result_from(shape), dir.path()).unwrap();
            assert!(out.starts_with(ERROR_PREFIX), "missing prefix: {}", out);
        }
    }

    #[test]
    fn test_structured_content_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let result = result_from(json!({"content": [], "structuredContent": {"count": 3}}));
        let out = format_result(&result, dir.path()).unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed, json!({"count": 3}));
    }

    #[test]
    fn test_unknown_item_type() {
        let dir = tempfile::tempdir().unwrap();
        let result = result_from(json!({"content": [{"type": "hologram", "data": "?"}]}));
        assert_eq!(result.content, vec![ContentItem::Unsupported]);
        assert_eq!(
            format_result(&result, dir.path()).unwrap(),
            "[unsupported content item]"
        );
    }

    #[test]
    fn test_bad_base64_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = result_from(json!({
            "content": [{"type": "image", "data": "!!not base64!!", "mimeType": "image/png"}]
        }));
        assert!(matches!(
            format_result(&result, dir.path()),
            Err(ContentError::Decode { kind: "image", .. })
        ));
    }
}
