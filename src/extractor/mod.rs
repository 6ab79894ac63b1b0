//! Host-facing observation interface.
//!
//! The accumulator never talks to a web framework directly. A host adapter exposes
//! each finished exchange through [`ObservedRequest`] and [`ObservedResponse`], and
//! answers route questions through [`RouteResolver`]. [`CapturedRequest`] and
//! [`CapturedResponse`] are owned implementations for hosts that prefer to copy the
//! exchange out, and [`recorded`] deserialises whole recordings of traffic.
//!
//! # Example
//!
//! ```
//! use openapi_from_traffic::extractor::{CapturedRequest, CapturedResponse, RouteBinding};
//! use http::{Method, StatusCode};
//! use serde_json::json;
//!
//! let request = CapturedRequest::new(Method::POST, "/users?lang=en")
//!     .header("content-type", "application/json")
//!     .input(json!({"name": "Ann"}))
//!     .route(RouteBinding::action("/users", "UserController", "store"));
//! let response = CapturedResponse::new(StatusCode::CREATED)
//!     .header("content-type", "application/json")
//!     .body(r#"{"id": 1}"#);
//! # let _ = (request, response);
//! ```

pub mod recorded;
pub mod route;

use crate::rules::FieldRules;
use http::header::{HeaderName, HeaderValue, COOKIE};
use http::{HeaderMap, Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The framework route an exchange was dispatched to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteBinding {
    /// Route template as declared, e.g. `/users/{id}`. Placeholders are kept verbatim.
    #[serde(default)]
    pub template: Option<String>,
    /// Controller identifier, or `None` for closure routes
    #[serde(default)]
    pub controller: Option<String>,
    /// Action (method) on the controller
    #[serde(default)]
    pub action: Option<String>,
}

impl RouteBinding {
    /// Binding for a controller action.
    pub fn action(template: &str, controller: &str, action: &str) -> Self {
        Self {
            template: Some(template.to_string()),
            controller: Some(controller.to_string()),
            action: Some(action.to_string()),
        }
    }

    /// Binding for a closure route; never resolves to a request descriptor.
    pub fn closure(template: &str) -> Self {
        Self {
            template: Some(template.to_string()),
            controller: None,
            action: None,
        }
    }
}

/// A live parameter value that is not plain JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Attachment {
    /// An uploaded file, with its temporary path when the host knows it
    Upload {
        #[serde(default)]
        temp_path: Option<String>,
    },
    /// Any other opaque object, known only by its type name
    Object { type_name: String },
}

/// Read access to an inbound request, as the host saw it.
pub trait ObservedRequest {
    fn method(&self) -> &Method;

    /// Full request URI including any query string.
    fn uri(&self) -> &str;

    /// Request headers; lookups are case-insensitive.
    fn headers(&self) -> &HeaderMap;

    /// Merged query and body parameters.
    fn input(&self) -> &Value;

    /// Non-JSON parameters keyed by dot path (`avatar`, `files.0`).
    fn attachments(&self) -> &[(String, Attachment)] {
        &[]
    }

    /// The matched route, `None` when the request was not routed.
    fn route(&self) -> Option<&RouteBinding>;

    /// Set by hosts to keep a single exchange out of the document.
    fn skip_documentation(&self) -> bool {
        false
    }

    /// Cookie value, read from the `Cookie` header by default.
    fn cookie(&self, name: &str) -> Option<String> {
        self.headers()
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|header| header.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.to_string())
    }
}

/// Read access to the outbound response.
pub trait ObservedResponse {
    fn status(&self) -> StatusCode;
    fn headers(&self) -> &HeaderMap;
    fn body(&self) -> &[u8];
}

/// A type the handler declares as an input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    /// A concrete type, by name
    Concrete(String),
    /// An interface whose implementation comes from the host's binding registry
    Interface(String),
    /// A scalar such as an id; never a request descriptor
    Builtin,
}

/// Declared input schema of a request type: its rules, attribute labels and doc comment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RequestDescriptor {
    #[serde(default)]
    pub type_name: String,
    #[serde(default)]
    pub doc_comment: String,
    #[serde(default)]
    pub body_rules: Option<BTreeMap<String, FieldRules>>,
    #[serde(default)]
    pub query_rules: Option<BTreeMap<String, FieldRules>>,
    #[serde(default)]
    pub attributes: Option<BTreeMap<String, String>>,
}

impl RequestDescriptor {
    pub fn new(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_doc_comment(mut self, doc_comment: &str) -> Self {
        self.doc_comment = doc_comment.to_string();
        self
    }

    pub fn body_rule(mut self, field: &str, rules: &str) -> Self {
        self.body_rules
            .get_or_insert_with(BTreeMap::new)
            .insert(field.to_string(), FieldRules::from(rules));
        self
    }

    pub fn query_rule(mut self, field: &str, rules: &str) -> Self {
        self.query_rules
            .get_or_insert_with(BTreeMap::new)
            .insert(field.to_string(), FieldRules::from(rules));
        self
    }

    pub fn attribute(mut self, field: &str, label: &str) -> Self {
        self.attributes
            .get_or_insert_with(BTreeMap::new)
            .insert(field.to_string(), label.to_string());
        self
    }
}

/// Host callback answering route questions the accumulator cannot answer itself.
pub trait RouteResolver {
    /// Declared input types of `controller::action`, `None` if the handler is unknown.
    fn handler_inputs(&self, controller: &str, action: &str) -> Option<Vec<InputType>>;

    /// Concrete implementation registered for an interface.
    fn binding(&self, _interface: &str) -> Option<String> {
        None
    }

    /// Validation descriptor for a concrete request type.
    fn descriptor(&self, type_name: &str) -> Option<RequestDescriptor>;

    /// Every registered `(method, template)` pair, used to recover templates
    /// for bindings that only know the concrete path.
    fn routes(&self) -> Vec<(Method, String)> {
        Vec::new()
    }
}

/// Resolver for hosts that declare no request types at all.
pub struct NoRequests;

impl RouteResolver for NoRequests {
    fn handler_inputs(&self, _controller: &str, _action: &str) -> Option<Vec<InputType>> {
        None
    }

    fn descriptor(&self, _type_name: &str) -> Option<RequestDescriptor> {
        None
    }
}

/// Owned copy of an inbound request.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    method: Method,
    uri: String,
    headers: HeaderMap,
    input: Value,
    attachments: Vec<(String, Attachment)>,
    route: Option<RouteBinding>,
    skip: bool,
}

impl CapturedRequest {
    pub fn new(method: Method, uri: &str) -> Self {
        Self {
            method,
            uri: uri.to_string(),
            headers: HeaderMap::new(),
            input: Value::Object(Default::default()),
            attachments: Vec::new(),
            route: None,
            skip: false,
        }
    }

    /// Appends a header. Invalid names or values are ignored.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn input(mut self, input: Value) -> Self {
        self.input = input;
        self
    }

    pub fn attachment(mut self, path: &str, attachment: Attachment) -> Self {
        self.attachments.push((path.to_string(), attachment));
        self
    }

    pub fn route(mut self, route: RouteBinding) -> Self {
        self.route = Some(route);
        self
    }

    pub fn skipped(mut self) -> Self {
        self.skip = true;
        self
    }
}

impl ObservedRequest for CapturedRequest {
    fn method(&self) -> &Method {
        &self.method
    }

    fn uri(&self) -> &str {
        &self.uri
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn input(&self) -> &Value {
        &self.input
    }

    fn attachments(&self) -> &[(String, Attachment)] {
        &self.attachments
    }

    fn route(&self) -> Option<&RouteBinding> {
        self.route.as_ref()
    }

    fn skip_documentation(&self) -> bool {
        self.skip
    }
}

/// Owned copy of an outbound response.
#[derive(Debug, Clone)]
pub struct CapturedResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl CapturedResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    /// Appends a header. Invalid names or values are ignored.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }
}

impl ObservedResponse for CapturedResponse {
    fn status(&self) -> StatusCode {
        self.status
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn body(&self) -> &[u8] {
        &self.body
    }
}
