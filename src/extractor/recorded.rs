//! Recorded traffic.
//!
//! A recording is a JSON file holding exchanges captured elsewhere together with the
//! route metadata needed to resolve them, so traffic can be replayed into a document
//! without the host application running. A bare JSON array is read as a list of
//! exchanges with no route metadata.
//!
//! ```json
//! {
//!   "routes": [{"method": "GET", "template": "/users/{id}"}],
//!   "handlers": {"UserController@show": [{"concrete": "ShowUserRequest"}]},
//!   "bindings": {},
//!   "requests": {"ShowUserRequest": {"query_rules": {"id": "required|integer"}}},
//!   "exchanges": [{
//!     "request": {
//!       "method": "GET",
//!       "uri": "/users/1?id=1",
//!       "route": {"template": "/users/{id}", "controller": "UserController", "action": "show"}
//!     },
//!     "response": {"status": 200, "headers": {"content-type": "application/json"}, "body": {"id": 1}}
//!   }]
//! }
//! ```

use super::{Attachment, CapturedRequest, CapturedResponse, InputType, RequestDescriptor, RouteBinding, RouteResolver};
use crate::error::{Error, Result};
use crate::serializer::decode_text;
use http::{Method, StatusCode};
use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Exchanges plus the route metadata that resolves them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Recording {
    #[serde(default)]
    pub routes: Vec<RecordedRoute>,
    /// Declared inputs by `Controller@action`
    #[serde(default)]
    pub handlers: BTreeMap<String, Vec<InputType>>,
    /// Concrete type by interface name
    #[serde(default)]
    pub bindings: BTreeMap<String, String>,
    /// Request descriptors by type name
    #[serde(default)]
    pub requests: BTreeMap<String, RequestDescriptor>,
    #[serde(default)]
    pub exchanges: Vec<RecordedExchange>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordedRoute {
    pub method: String,
    pub template: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordedExchange {
    pub request: RecordedRequest,
    pub response: RecordedResponse,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordedRequest {
    pub method: String,
    pub uri: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Sent as a `Cookie` header on replay
    #[serde(default)]
    pub cookies: BTreeMap<String, String>,
    #[serde(default)]
    pub input: Value,
    #[serde(default)]
    pub attachments: BTreeMap<String, Attachment>,
    #[serde(default)]
    pub route: Option<RouteBinding>,
    #[serde(default)]
    pub skip: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordedResponse {
    pub status: u16,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// A string is sent verbatim; any other JSON value is sent encoded
    #[serde(default)]
    pub body: Value,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecordingFile {
    Exchanges(Vec<RecordedExchange>),
    Full(Recording),
}

impl Recording {
    /// Loads a recording from a JSON file.
    pub fn load(path: &Path) -> Result<Recording> {
        debug!("Loading recording from {}", path.display());

        if !path.exists() {
            return Err(Error::NotFound(path.to_path_buf()));
        }
        let content = decode_text(&fs::read(path)?, &path.display().to_string())?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Recording> {
        let recording = match serde_json::from_str::<RecordingFile>(content)? {
            RecordingFile::Exchanges(exchanges) => Recording {
                exchanges,
                ..Default::default()
            },
            RecordingFile::Full(recording) => recording,
        };

        debug!(
            "Recording holds {} exchanges and {} request types",
            recording.exchanges.len(),
            recording.requests.len()
        );
        Ok(recording)
    }
}

impl RecordedExchange {
    /// Converts the exchange into owned request and response views.
    pub fn to_captured(&self) -> Result<(CapturedRequest, CapturedResponse)> {
        Ok((self.request.to_captured()?, self.response.to_captured()?))
    }
}

impl RecordedRequest {
    pub fn to_captured(&self) -> Result<CapturedRequest> {
        let method = Method::from_bytes(self.method.to_uppercase().as_bytes())
            .map_err(|_| Error::InvalidExchange(format!("bad method {:?}", self.method)))?;

        let mut request = CapturedRequest::new(method, &self.uri);
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }
        if !self.cookies.is_empty() {
            let cookie = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; ");
            request = request.header("cookie", &cookie);
        }
        if !self.input.is_null() {
            request = request.input(self.input.clone());
        }
        for (path, attachment) in &self.attachments {
            request = request.attachment(path, attachment.clone());
        }
        if let Some(route) = &self.route {
            request = request.route(route.clone());
        }
        if self.skip {
            request = request.skipped();
        }

        Ok(request)
    }
}

impl RecordedResponse {
    pub fn to_captured(&self) -> Result<CapturedResponse> {
        let status = StatusCode::from_u16(self.status)
            .map_err(|_| Error::InvalidExchange(format!("bad status {}", self.status)))?;

        let body = match &self.body {
            Value::Null => Vec::new(),
            Value::String(text) => text.clone().into_bytes(),
            other => serde_json::to_vec(other)?,
        };

        let mut response = CapturedResponse::new(status).body(body);
        for (name, value) in &self.headers {
            response = response.header(name, value);
        }
        Ok(response)
    }
}

impl RouteResolver for Recording {
    fn handler_inputs(&self, controller: &str, action: &str) -> Option<Vec<InputType>> {
        self.handlers
            .get(&format!("{}@{}", controller, action))
            .cloned()
    }

    fn binding(&self, interface: &str) -> Option<String> {
        self.bindings.get(interface).cloned()
    }

    fn descriptor(&self, type_name: &str) -> Option<RequestDescriptor> {
        self.requests.get(type_name).map(|descriptor| RequestDescriptor {
            type_name: type_name.to_string(),
            ..descriptor.clone()
        })
    }

    fn routes(&self) -> Vec<(Method, String)> {
        self.routes
            .iter()
            .filter_map(|route| match Method::from_bytes(route.method.to_uppercase().as_bytes()) {
                Ok(method) => Some((method, route.template.clone())),
                Err(_) => {
                    warn!("Skipping route {} with bad method {}", route.template, route.method);
                    None
                }
            })
            .collect()
    }
}
