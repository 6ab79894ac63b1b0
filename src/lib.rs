//! OpenAPI from traffic - OpenAPI documentation inferred from live HTTP exchanges.
//!
//! A host application (or a test suite driving it) hands every finished
//! request/response pair to [`service::AutoDoc`]. Each exchange is merged into a
//! growing OpenAPI document: paths and methods, path/query/header parameters,
//! request body schemas built from declared validation rules, response examples and
//! security requirements. The document accumulates in a transient store until it is
//! flushed as the final document, which readers get merged with any hand-written
//! supplements.
//!
//! # Architecture
//!
//! 1. [`type_resolver`] - Maps rule tokens and runtime values to OpenAPI types
//! 2. [`rules`] - Parses declared validation rules
//! 3. [`parser`] - Reads `@key value` annotations from request doc comments
//! 4. [`schema_generator`] - Builds request object schemas and their examples
//! 5. [`extractor`] - The host interface, route resolution and recorded traffic
//! 6. [`accumulator`] - Merges one exchange into the document
//! 7. [`driver`] - Stores the transient and final documents
//! 8. [`merger`] - Fills gaps from supplementary documents at read time
//! 9. [`openapi_builder`] - The document model
//! 10. [`serializer`] - JSON/YAML encoding and atomic file writes
//! 11. [`service`] - Wires the above together
//!
//! # Example Usage
//!
//! ```no_run
//! use openapi_from_traffic::{
//!     config::Config,
//!     extractor::{CapturedRequest, CapturedResponse, NoRequests, RouteBinding},
//!     service::AutoDoc,
//! };
//! use http::{Method, StatusCode};
//! use std::path::Path;
//!
//! let config = Config::load(Path::new("autodoc.yaml")).unwrap();
//! let autodoc = AutoDoc::new(config).unwrap();
//!
//! let request = CapturedRequest::new(Method::GET, "/users/1")
//!     .route(RouteBinding::action("/users/{id}", "UserController", "show"));
//! let response = CapturedResponse::new(StatusCode::OK)
//!     .header("content-type", "application/json")
//!     .body(r#"{"id": 1}"#);
//!
//! autodoc.observe(&request, &response, &NoRequests).unwrap();
//! autodoc.flush().unwrap();
//! let document = autodoc.read().unwrap();
//! println!("{} operations", document.operation_count());
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod accumulator;
pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod extractor;
pub mod merger;
pub mod openapi_builder;
pub mod parser;
pub mod rules;
pub mod schema_generator;
pub mod serializer;
pub mod service;
pub mod type_resolver;
