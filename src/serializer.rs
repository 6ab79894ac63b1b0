//! Serialization module for reading and writing OpenAPI documents.
//!
//! Documents are persisted as pretty-printed JSON; supplementary documents may also
//! be YAML. Captured byte content always enters a document as text, see
//! [`encode_text`].

use crate::error::{Error, Result};
use crate::openapi_builder::Document;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::debug;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Serializes an OpenAPI document to JSON format with pretty printing.
///
/// Slashes are written unescaped.
///
/// # Errors
///
/// Returns [`Error::Serialization`] if the document cannot be encoded. The
/// persisted file is never replaced with an error message.
pub fn serialize_json(doc: &Document) -> Result<String> {
    debug!("Serializing OpenAPI document to JSON");
    Ok(serde_json::to_string_pretty(doc)?)
}

/// Serializes an OpenAPI document to YAML format.
pub fn serialize_yaml(doc: &Document) -> Result<String> {
    debug!("Serializing OpenAPI document to YAML");
    Ok(serde_yaml::to_string(doc)?)
}

/// Writes string content to a file, atomically replacing any previous content.
///
/// The content goes to a temporary file in the target directory which is then
/// renamed over the destination. Parent directories are created as needed.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut file = NamedTempFile::new_in(parent)?;
    file.write_all(content.as_bytes())?;
    file.as_file().sync_all()?;
    file.persist(path)?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

/// Reads a document from a JSON or YAML file (YAML for `.yaml`/`.yml`).
///
/// # Errors
///
/// - [`Error::NotFound`] if the file does not exist
/// - [`Error::Encoding`] if the file is not valid UTF-8
/// - [`Error::InvalidDocument`] if the content is not a document
pub fn read_document(path: &Path) -> Result<Document> {
    debug!("Reading document from {}", path.display());

    if !path.exists() {
        return Err(Error::NotFound(path.to_path_buf()));
    }

    let bytes = fs::read(path)?;
    let content = decode_text(&bytes, &path.display().to_string())?;

    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    let parsed = if is_yaml {
        serde_yaml::from_str(&content).map_err(|e| e.to_string())
    } else {
        serde_json::from_str(&content).map_err(|e| e.to_string())
    };

    parsed.map_err(|message| Error::InvalidDocument {
        file: path.to_path_buf(),
        message,
    })
}

/// Converts captured bytes into document text.
///
/// UTF-8 content is kept as-is; anything else is base64-encoded so the document
/// stays valid JSON.
pub fn encode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => STANDARD.encode(bytes),
    }
}

/// Decodes file content as UTF-8, skipping a byte-order mark.
pub fn decode_text(bytes: &[u8], origin: &str) -> Result<String> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|_| Error::Encoding(origin.to_string()))
}
