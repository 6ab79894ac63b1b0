//! Documentation service.
//!
//! [`AutoDoc`] is what a host talks to: it validates the configuration, owns the
//! persistence driver and runs one accumulation [`Session`] per observed exchange.

use crate::accumulator::Session;
use crate::config::{Config, SecurityMode};
use crate::driver::{self, DocumentDriver};
use crate::error::Result;
use crate::extractor::{ObservedRequest, ObservedResponse, RouteResolver};
use crate::merger::DocumentMerger;
use crate::openapi_builder::{Document, OpenApiBuilder};
use log::{debug, info, warn};
use parking_lot::Mutex;

/// Runtime documentation generator.
///
/// Observations inside one process are serialized; several processes sharing a
/// storage driver must not observe at the same time.
pub struct AutoDoc {
    config: Config,
    security: Option<SecurityMode>,
    driver: Box<dyn DocumentDriver>,
    cycle: Mutex<()>,
}

impl AutoDoc {
    /// Validates `config` and creates the driver it names.
    ///
    /// # Errors
    ///
    /// Configuration errors (version, security mode, driver name or paths).
    pub fn new(config: Config) -> Result<Self> {
        let security = config.validate()?;
        let driver = driver::from_config(&config)?;
        Ok(Self::assemble(config, security, driver))
    }

    /// Like [`AutoDoc::new`] with a caller-supplied driver.
    pub fn with_driver(config: Config, driver: Box<dyn DocumentDriver>) -> Result<Self> {
        let security = config.validate()?;
        Ok(Self::assemble(config, security, driver))
    }

    fn assemble(
        config: Config,
        security: Option<SecurityMode>,
        driver: Box<dyn DocumentDriver>,
    ) -> Self {
        info!(
            "Documentation {} with driver {}",
            if config.enabled { "enabled" } else { "disabled" },
            config.driver
        );

        Self {
            config,
            security,
            driver,
            cycle: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Records one exchange into the transient document.
    ///
    /// Returns `false` without touching the document when observation is disabled,
    /// the host asked to skip the exchange, or the request was not routed.
    pub fn observe(
        &self,
        request: &dyn ObservedRequest,
        response: &dyn ObservedResponse,
        resolver: &dyn RouteResolver,
    ) -> Result<bool> {
        if !self.config.enabled {
            return Ok(false);
        }
        if request.skip_documentation() || request.route().is_none() {
            debug!("Not documenting {} {}", request.method(), request.uri());
            return Ok(false);
        }

        let _cycle = self.cycle.lock();
        let document = self
            .driver
            .load_transient()?
            .unwrap_or_else(|| self.empty_document());

        let mut session = Session::begin(document, &self.config, self.security);
        session.observe(request, response, resolver)?;
        self.driver.save_transient(&session.commit())?;

        Ok(true)
    }

    /// Persists the transient document as the final document and clears it.
    ///
    /// Flushing with nothing observed writes an empty document.
    pub fn flush(&self) -> Result<Document> {
        let _cycle = self.cycle.lock();
        let document = match self.driver.load_transient()? {
            Some(document) => document,
            None => {
                warn!("Nothing was observed, saving an empty document");
                self.empty_document()
            }
        };

        self.driver.save_final(&document)?;
        self.driver.clear_transient()?;
        info!("Saved documentation with {} operations", document.operation_count());

        Ok(document)
    }

    /// Returns the final document merged with the configured supplements.
    ///
    /// # Errors
    ///
    /// [`crate::error::Error::NotFound`] when nothing was ever flushed.
    pub fn read(&self) -> Result<Document> {
        let document = self.driver.load_final()?;
        DocumentMerger::merge(document, &self.config.additional_paths)
    }

    fn empty_document(&self) -> Document {
        OpenApiBuilder::from_config(&self.config, self.security).build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::extractor::{CapturedRequest, CapturedResponse, NoRequests, RouteBinding};
    use http::{Method, StatusCode};
    use tempfile::TempDir;

    fn config(dir: &TempDir, enabled: bool) -> Config {
        Config::from_yaml_str(&format!(
            "config_version: \"2.0\"\nenabled: {}\ndrivers:\n  local:\n    production_path: {}\n",
            enabled,
            dir.path().join("documentation.json").display()
        ))
        .unwrap()
    }

    fn ping() -> CapturedRequest {
        CapturedRequest::new(Method::GET, "/ping").route(RouteBinding::closure("/ping"))
    }

    #[test]
    fn test_observe_flush_read() {
        let dir = TempDir::new().unwrap();
        let autodoc = AutoDoc::new(config(&dir, true)).unwrap();

        assert!(autodoc
            .observe(&ping(), &CapturedResponse::new(StatusCode::OK), &NoRequests)
            .unwrap());
        autodoc.flush().unwrap();

        let document = autodoc.read().unwrap();
        assert!(document.operation("/ping", "get").is_some());
        assert!(dir.path().join("documentation.json").exists());
    }

    #[test]
    fn test_disabled_and_skipped_requests_are_ignored() {
        let dir = TempDir::new().unwrap();
        let response = CapturedResponse::new(StatusCode::OK);

        let disabled = AutoDoc::new(config(&dir, false)).unwrap();
        assert!(!disabled.observe(&ping(), &response, &NoRequests).unwrap());

        let enabled = AutoDoc::new(config(&dir, true)).unwrap();
        assert!(!enabled.observe(&ping().skipped(), &response, &NoRequests).unwrap());
        let unrouted = CapturedRequest::new(Method::GET, "/favicon.ico");
        assert!(!enabled.observe(&unrouted, &response, &NoRequests).unwrap());

        assert_eq!(enabled.flush().unwrap().operation_count(), 0);
    }

    #[test]
    fn test_read_before_flush_is_not_found() {
        let dir = TempDir::new().unwrap();
        let autodoc = AutoDoc::new(config(&dir, true)).unwrap();

        assert!(matches!(autodoc.read(), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_with_driver_validates_config() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir, true);
        let driver = Box::new(crate::driver::LocalDriver::new(dir.path().join("doc.json")).unwrap());
        config.config_version = Some("1.0".to_string());

        assert!(matches!(
            AutoDoc::with_driver(config, driver),
            Err(Error::IncompatibleConfig { .. })
        ));
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir, true);
        config.security = Some("oauth".to_string());

        assert!(matches!(
            AutoDoc::new(config),
            Err(Error::WrongSecurityConfig(_))
        ));
    }
}
