//! Persistence drivers.
//!
//! A driver stores two things: the transient document that observations
//! accumulate into, and the final document that `flush` produces. Transient
//! state is read, modified and written back once per observation; drivers do not
//! lock, so accumulation across processes assumes a single writer.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::openapi_builder::Document;
use crate::serializer::{read_document, serialize_json, write_to_file};
use log::{debug, info};
use parking_lot::Mutex;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Storage contract for transient and final documents.
pub trait DocumentDriver: Send + Sync {
    /// Stores the in-progress document.
    fn save_transient(&self, document: &Document) -> Result<()>;

    /// Returns the in-progress document, `None` if nothing was accumulated yet.
    fn load_transient(&self) -> Result<Option<Document>>;

    /// Discards the in-progress document.
    fn clear_transient(&self) -> Result<()>;

    /// Durably stores the completed document, replacing any previous one.
    fn save_final(&self, document: &Document) -> Result<()>;

    /// Returns the completed document.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when no final document was ever saved.
    fn load_final(&self) -> Result<Document>;
}

/// Creates the driver named by `config.driver`.
pub fn from_config(config: &Config) -> Result<Box<dyn DocumentDriver>> {
    debug!("Selecting documentation driver {}", config.driver);

    match config.driver.as_str() {
        "local" => Ok(Box::new(LocalDriver::new(
            config.drivers.local.production_path.clone(),
        )?)),
        "storage" => Ok(Box::new(StorageDriver::new(
            config.drivers.storage.production_path.clone(),
            config.drivers.storage.temporary_path.clone(),
        )?)),
        other => Err(Error::UnknownDriver(other.to_string())),
    }
}

fn require_path(path: PathBuf, driver: &str) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(Error::MissingProductionPath(driver.to_string()));
    }
    Ok(path)
}

fn write_document(document: &Document, path: &Path) -> Result<()> {
    let content = serialize_json(document)?;
    write_to_file(&content, path)
}

/// Keeps transient state in memory and writes the final document to a file.
///
/// Suited to a single process that observes traffic and flushes at the end,
/// such as a test run.
pub struct LocalDriver {
    production_path: PathBuf,
    data: Mutex<Option<Document>>,
}

impl LocalDriver {
    pub fn new(production_path: PathBuf) -> Result<Self> {
        Ok(Self {
            production_path: require_path(production_path, "local")?,
            data: Mutex::new(None),
        })
    }
}

impl DocumentDriver for LocalDriver {
    fn save_transient(&self, document: &Document) -> Result<()> {
        *self.data.lock() = Some(document.clone());
        Ok(())
    }

    fn load_transient(&self) -> Result<Option<Document>> {
        Ok(self.data.lock().clone())
    }

    fn clear_transient(&self) -> Result<()> {
        *self.data.lock() = None;
        Ok(())
    }

    fn save_final(&self, document: &Document) -> Result<()> {
        info!("Saving documentation to {}", self.production_path.display());
        write_document(document, &self.production_path)
    }

    fn load_final(&self) -> Result<Document> {
        read_document(&self.production_path)
    }
}

/// Keeps both documents in files, so several processes can accumulate in turn.
pub struct StorageDriver {
    production_path: PathBuf,
    temporary_path: PathBuf,
}

impl StorageDriver {
    pub fn new(production_path: PathBuf, temporary_path: PathBuf) -> Result<Self> {
        let production_path = require_path(production_path, "storage")?;
        let temporary_path = if temporary_path.as_os_str().is_empty() {
            production_path.with_extension("tmp.json")
        } else {
            temporary_path
        };

        Ok(Self {
            production_path,
            temporary_path,
        })
    }
}

impl DocumentDriver for StorageDriver {
    fn save_transient(&self, document: &Document) -> Result<()> {
        write_document(document, &self.temporary_path)
    }

    fn load_transient(&self) -> Result<Option<Document>> {
        match read_document(&self.temporary_path) {
            Ok(document) => Ok(Some(document)),
            Err(Error::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn clear_transient(&self) -> Result<()> {
        match fs::remove_file(&self.temporary_path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn save_final(&self, document: &Document) -> Result<()> {
        info!("Saving documentation to {}", self.production_path.display());
        write_document(document, &self.production_path)
    }

    fn load_final(&self) -> Result<Document> {
        read_document(&self.production_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openapi_builder::OpenApiBuilder;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample_document() -> Document {
        serde_json::from_value(json!({
            "openapi": "3.0.0",
            "paths": {
                "/users/{id}": {
                    "get": {
                        "tags": ["users"],
                        "parameters": [{"in": "path", "name": "id", "required": true, "schema": {"type": "string"}}],
                        "responses": {
                            "200": {"description": "OK", "content": {"application/json": {"example": {"id": 1}}}},
                            "404": {"description": "Not Found", "content": {"video/mp4": "*Unavailable for preview*"}}
                        },
                        "security": [],
                        "description": "",
                        "operationId": "Get/users/{id}UsersId"
                    }
                }
            },
            "components": {"schemas": {}, "securitySchemes": {}}
        }))
        .unwrap()
    }

    #[test]
    fn test_local_driver_transient_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let driver = LocalDriver::new(temp_dir.path().join("doc.json")).unwrap();

        assert!(driver.load_transient().unwrap().is_none());
        driver.save_transient(&sample_document()).unwrap();
        assert_eq!(driver.load_transient().unwrap(), Some(sample_document()));
        driver.clear_transient().unwrap();
        assert!(driver.load_transient().unwrap().is_none());
    }

    #[test]
    fn test_final_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let driver = LocalDriver::new(temp_dir.path().join("doc.json")).unwrap();
        let document = sample_document();

        driver.save_final(&document).unwrap();

        assert_eq!(driver.load_final().unwrap(), document);
    }

    #[test]
    fn test_load_final_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let driver = LocalDriver::new(temp_dir.path().join("doc.json")).unwrap();

        assert!(matches!(driver.load_final(), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_storage_driver_persists_transient_to_disk() {
        let temp_dir = TempDir::new().unwrap();
        let production = temp_dir.path().join("doc.json");
        let temporary = temp_dir.path().join("doc.tmp.json");

        let writer = StorageDriver::new(production.clone(), temporary.clone()).unwrap();
        writer.save_transient(&sample_document()).unwrap();

        let reader = StorageDriver::new(production, temporary.clone()).unwrap();
        assert_eq!(reader.load_transient().unwrap(), Some(sample_document()));

        reader.clear_transient().unwrap();
        assert!(!temporary.exists());
        reader.clear_transient().unwrap();
    }

    #[test]
    fn test_storage_driver_default_temporary_path() {
        let temp_dir = TempDir::new().unwrap();
        let driver = StorageDriver::new(temp_dir.path().join("doc.json"), PathBuf::new()).unwrap();

        driver.save_transient(&OpenApiBuilder::new().build()).unwrap();
        assert!(temp_dir.path().join("doc.tmp.json").exists());
    }

    #[test]
    fn test_from_config() {
        let mut config = Config::from_yaml_str("config_version: \"2.0\"").unwrap();
        assert!(matches!(
            from_config(&config),
            Err(Error::MissingProductionPath(driver)) if driver == "local"
        ));

        config.drivers.local.production_path = PathBuf::from("doc.json");
        assert!(from_config(&config).is_ok());

        config.driver = "redis".to_string();
        assert!(matches!(
            from_config(&config),
            Err(Error::UnknownDriver(name)) if name == "redis"
        ));
    }
}
