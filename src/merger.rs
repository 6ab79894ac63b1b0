use crate::error::{Error, Result};
use crate::openapi_builder::Document;
use crate::serializer::read_document;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const SUPPLEMENT_EXTENSIONS: &[&str] = &["json", "yaml", "yml"];

/// Read-time merger of the generated document with hand-written supplements.
///
/// Supplements only fill gaps: an operation is copied when its path and method are
/// missing from the primary document, and a component schema when its name is
/// missing. Nothing the primary document already holds is replaced.
///
/// # Example
///
/// ```no_run
/// use openapi_from_traffic::merger::DocumentMerger;
/// use openapi_from_traffic::openapi_builder::OpenApiBuilder;
/// use std::path::PathBuf;
///
/// let primary = OpenApiBuilder::new().build();
/// let merged = DocumentMerger::merge(primary, &[PathBuf::from("docs/extra")]).unwrap();
/// println!("{} operations", merged.operation_count());
/// ```
pub struct DocumentMerger;

impl DocumentMerger {
    /// Merges every supplement found under `paths` into `primary`.
    ///
    /// Each path is a document file or a directory searched recursively for
    /// `.json`, `.yaml` and `.yml` files, which are applied in sorted order.
    ///
    /// # Errors
    ///
    /// Fails if a configured path does not exist or a supplement cannot be parsed.
    pub fn merge(mut primary: Document, paths: &[PathBuf]) -> Result<Document> {
        for file in Self::supplement_files(paths)? {
            debug!("Merging supplementary document {}", file.display());
            let supplement = read_document(&file)?;
            Self::merge_document(&mut primary, supplement);
        }
        Ok(primary)
    }

    /// Fills the gaps of `primary` from one supplement.
    pub fn merge_document(primary: &mut Document, supplement: Document) {
        let before = primary.operation_count();

        for (uri, item) in supplement.paths {
            match primary.paths.get_mut(&uri) {
                None => {
                    primary.paths.insert(uri, item);
                }
                Some(existing) => {
                    for (method, operation) in item.operations {
                        existing.operations.entry(method).or_insert(operation);
                    }
                    for (key, value) in item.extensions {
                        existing.extensions.entry(key).or_insert(value);
                    }
                }
            }
        }

        for (name, schema) in supplement.components.schemas {
            primary.components.schemas.entry(name).or_insert(schema);
        }

        debug!(
            "Supplement added {} operations",
            primary.operation_count() - before
        );
    }

    /// Expands configured paths into the supplement files to read.
    pub fn supplement_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for path in paths {
            if !path.exists() {
                return Err(Error::NotFound(path.clone()));
            }
            if path.is_file() {
                files.push(path.clone());
                continue;
            }

            let mut found = Vec::new();
            for entry in WalkDir::new(path).into_iter().filter_entry(|e| {
                e.path() == path.as_path() || !e.file_name().to_string_lossy().starts_with('.')
            }) {
                match entry {
                    Ok(entry) if entry.file_type().is_file() && is_supplement(entry.path()) => {
                        found.push(entry.into_path());
                    }
                    Ok(_) => {}
                    Err(e) => warn!("Failed to access supplement path: {}", e),
                }
            }
            found.sort();
            info!("Found {} supplementary documents in {}", found.len(), path.display());
            files.extend(found);
        }

        Ok(files)
    }
}

fn is_supplement(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SUPPLEMENT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}
