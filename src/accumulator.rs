//! Schema accumulation.
//!
//! A [`Session`] owns the working document for one observation cycle. Each call to
//! [`Session::observe`] merges one exchange into the operation it belongs to;
//! [`Session::commit`] hands the document back for storage.
//!
//! Merging never discards what earlier observations learned: parameters are
//! de-duplicated by location and name with the first definition kept, and a
//! response example is recorded only the first time its status and MIME type are
//! seen.

use crate::config::{Config, SecurityMode};
use crate::error::Result;
use crate::extractor::route::{action_name, path_params, resolve_request, OperationTarget};
use crate::extractor::{ObservedRequest, ObservedResponse, RequestDescriptor, RouteResolver};
use crate::openapi_builder::{
    schema_ref, Document, MediaContent, MediaType, Operation, Parameter, ParameterLocation,
    ParameterSchema, RequestBody, Response,
};
use crate::parser::{ucfirst, AnnotationParser};
use crate::rules::{enum_values, is_required, FieldRules};
use crate::schema_generator::{field_description, SchemaGenerator};
use crate::serializer::encode_text;
use crate::type_resolver::parameter_type;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, Method};
use log::debug;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Request headers never documented as header parameters.
pub const DEFAULT_HEADERS: &[&str] = &[
    "host",
    "user-agent",
    "accept",
    "accept-language",
    "accept-charset",
    "authorization",
    "content-type",
    "content-length",
    "cookie",
];

/// Content stored for response MIME types that cannot be shown.
pub const UNAVAILABLE_FOR_PREVIEW: &str = "*Unavailable for preview*";

const DEFAULT_PRODUCE: &str = "text/plain";

/// One observation cycle over a working document.
pub struct Session<'c> {
    document: Document,
    config: &'c Config,
    security: Option<SecurityMode>,
    generator: SchemaGenerator,
}

impl<'c> Session<'c> {
    /// Starts a cycle over `document`, usually the transient document from the driver.
    pub fn begin(document: Document, config: &'c Config, security: Option<SecurityMode>) -> Self {
        Self {
            document,
            config,
            security,
            generator: SchemaGenerator::new(config.example_placeholders.clone()),
        }
    }

    /// Ends the cycle and returns the updated document.
    pub fn commit(self) -> Document {
        self.document
    }

    /// Merges one exchange into the document.
    ///
    /// Request analysis needs a descriptor from `resolver`; without one the
    /// operation's description is cleared and only the response is recorded.
    ///
    /// # Errors
    ///
    /// Returns an error only if a generated schema cannot be serialized.
    pub fn observe(
        &mut self,
        request: &dyn ObservedRequest,
        response: &dyn ObservedResponse,
        resolver: &dyn RouteResolver,
    ) -> Result<()> {
        let target = OperationTarget::resolve(request, resolver, &self.config.base_path);
        debug!("Observing {} {}", target.method, target.uri);

        let Document {
            paths, components, ..
        } = &mut self.document;
        let operation = paths
            .entry(target.uri.clone())
            .or_default()
            .operations
            .entry(target.method.clone())
            .or_insert_with(|| new_operation(&target.uri));

        save_consume(operation, request.method(), request.headers());
        save_tags(operation, &target.uri);
        if let Some(mode) = self.security {
            if supports_auth(request, mode, &self.config.session_cookie) {
                add_security(operation, mode);
            }
        }

        let annotations = match resolve_request(request.route(), resolver) {
            None => {
                operation.description.clear();
                BTreeMap::new()
            }
            Some(descriptor) => {
                let annotations = AnnotationParser::parse(&descriptor.doc_comment);
                let empty_rules = BTreeMap::new();
                let empty_attributes = BTreeMap::new();
                let attributes = descriptor.attributes.as_ref().unwrap_or(&empty_attributes);

                save_query_parameters(
                    operation,
                    descriptor.query_rules.as_ref().unwrap_or(&empty_rules),
                    attributes,
                    &annotations,
                );
                save_header_parameters(operation, request.headers());

                if !has_no_body(request.method()) {
                    let action = action_name(&target.uri);
                    let live = self
                        .generator
                        .live_parameters(request.input(), request.attachments());
                    let schema_name = format!("{}RequestObject", action);

                    if has_more_properties(&live, components.schemas.get(&schema_name)) {
                        let schema = self.generator.request_schema(
                            descriptor.body_rules.as_ref().unwrap_or(&empty_rules),
                            attributes,
                            &annotations,
                            &live,
                        );
                        debug!("Recording {} for {}", schema_name, target.uri);
                        components
                            .schemas
                            .insert(schema_name.clone(), serde_json::to_value(schema)?);
                    }
                    if components.schemas.contains_key(&schema_name) {
                        reference_body_schema(operation, &schema_name);
                    }
                }

                save_description(operation, &descriptor, &annotations);
                save_operation_id(operation, &target);
                annotations
            }
        };

        save_response(operation, response, &annotations, self.config);
        Ok(())
    }
}

fn new_operation(uri: &str) -> Operation {
    Operation {
        parameters: path_params(uri)
            .into_iter()
            .map(|name| Parameter {
                location: Some(ParameterLocation::Path),
                name,
                description: Some(String::new()),
                required: Some(true),
                schema: Some(ParameterSchema::of_type("string")),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
}

fn has_no_body(method: &Method) -> bool {
    method == Method::GET || method == Method::DELETE
}

fn header_text(headers: &HeaderMap, name: impl http::header::AsHeaderName) -> Option<String> {
    headers
        .get(name)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Records the request MIME type; drops `requestBody` while none is known.
///
/// GET and DELETE carry no documented body, so their `Content-Type` is ignored.
fn save_consume(operation: &mut Operation, method: &Method, headers: &HeaderMap) {
    let consume = header_text(headers, CONTENT_TYPE)
        .filter(|_| !has_no_body(method));
    match consume {
        Some(consume) => {
            operation
                .request_body
                .get_or_insert_with(RequestBody::default)
                .content
                .entry(consume)
                .or_default();
        }
        None => {
            if operation
                .request_body
                .as_ref()
                .is_some_and(|body| body.content.is_empty())
            {
                operation.request_body = None;
            }
        }
    }
}

fn save_tags(operation: &mut Operation, uri: &str) {
    let tag = uri.split('/').nth(1).unwrap_or_default();
    operation.tags = vec![tag.to_string()];
}

fn supports_auth(request: &dyn ObservedRequest, mode: SecurityMode, session_cookie: &str) -> bool {
    match mode {
        SecurityMode::Jwt => header_text(request.headers(), AUTHORIZATION).is_some(),
        SecurityMode::Laravel => request
            .cookie(session_cookie)
            .is_some_and(|value| !value.is_empty()),
    }
}

fn add_security(operation: &mut Operation, mode: SecurityMode) {
    if operation.security.is_empty() {
        operation
            .security
            .push(BTreeMap::from([(mode.as_str().to_string(), Vec::new())]));
    }
}

fn save_query_parameters(
    operation: &mut Operation,
    rules: &BTreeMap<String, FieldRules>,
    attributes: &BTreeMap<String, String>,
    annotations: &BTreeMap<String, String>,
) {
    for (name, field_rules) in rules {
        if operation.has_parameter(ParameterLocation::Query, name) {
            continue;
        }
        let rules = field_rules.rules();

        operation.parameters.push(Parameter {
            location: Some(ParameterLocation::Query),
            name: name.clone(),
            description: Some(field_description(name, rules, attributes, annotations, false)),
            required: is_required(rules).then_some(true),
            schema: Some(ParameterSchema {
                schema_type: Some(parameter_type(rules).to_string()),
                enum_values: enum_values(rules)
                    .map(|values| values.into_iter().map(Value::String).collect()),
                ..Default::default()
            }),
            ..Default::default()
        });
    }
}

fn save_header_parameters(operation: &mut Operation, headers: &HeaderMap) {
    for name in headers.keys() {
        let name = name.as_str();
        if DEFAULT_HEADERS.contains(&name) || operation.has_parameter(ParameterLocation::Header, name) {
            continue;
        }

        operation.parameters.push(Parameter {
            location: Some(ParameterLocation::Header),
            name: name.to_string(),
            required: Some(true),
            example: Some(Value::String(header_text(headers, name).unwrap_or_default())),
            schema: Some(ParameterSchema::of_type("string")),
            ..Default::default()
        });
    }
}

/// Whether the live payload has more top-level keys than the stored schema's example.
///
/// Rule-only properties are not counted, so a sparse first request does not block
/// a fuller one later.
fn has_more_properties(live: &Value, stored: Option<&Value>) -> bool {
    let live_count = live.as_object().map_or(0, Map::len);
    let stored_count = stored
        .and_then(|schema| schema.get("example"))
        .and_then(Value::as_object)
        .map_or(0, Map::len);
    live_count > stored_count
}

/// Points every recorded request content type at the request object schema,
/// unless the operation documents its body as a `body` parameter.
fn reference_body_schema(operation: &mut Operation, schema_name: &str) {
    if operation.parameters.iter().any(|parameter| parameter.name == "body") {
        return;
    }
    let Some(body) = operation.request_body.as_mut() else {
        return;
    };

    body.required = Some(true);
    body.description = Some(String::new());
    for media in body.content.values_mut() {
        media.schema = Some(schema_ref(schema_name));
    }
}

fn save_description(
    operation: &mut Operation,
    descriptor: &RequestDescriptor,
    annotations: &BTreeMap<String, String>,
) {
    let summary = annotations
        .get("summary")
        .filter(|summary| !summary.is_empty())
        .cloned()
        .unwrap_or_else(|| AnnotationParser::summary_from_type_name(&descriptor.type_name));
    operation.summary = Some(summary);

    if let Some(description) = annotations.get("description").filter(|d| !d.is_empty()) {
        operation.description = description.clone();
    }
}

/// `ucfirst(method) + uri`, then every tag and parameter name upper-cased first.
fn save_operation_id(operation: &mut Operation, target: &OperationTarget) {
    let mut operation_id = format!("{}{}", ucfirst(&target.method), target.uri);
    for tag in &operation.tags {
        operation_id.push_str(&ucfirst(tag));
    }
    for parameter in &operation.parameters {
        operation_id.push_str(&ucfirst(&parameter.name));
    }
    operation.operation_id = operation_id;
}

fn save_response(
    operation: &mut Operation,
    response: &dyn ObservedResponse,
    annotations: &BTreeMap<String, String>,
    config: &Config,
) {
    let status = response.status();
    let code = status.as_u16().to_string();
    let produce = header_text(response.headers(), CONTENT_TYPE)
        .unwrap_or_else(|| DEFAULT_PRODUCE.to_string());

    let entry = operation
        .responses
        .entry(code.clone())
        .or_insert_with(|| Response {
            description: annotations
                .get(&format!("_{}", code))
                .filter(|description| !description.is_empty())
                .map(String::as_str)
                .or_else(|| config.code_description(&code))
                .or_else(|| status.canonical_reason())
                .unwrap_or_default()
                .to_string(),
            ..Default::default()
        });

    let needs_example = match entry.content.get(&produce) {
        None => true,
        Some(MediaContent::Media(media)) => media.example.is_none(),
        Some(MediaContent::Placeholder(_)) => false,
    };
    if needs_example {
        debug!("Recording {} example for status {}", produce, code);
        let example = make_example(response.body(), &produce);
        entry.content.insert(produce, example);
    }
}

/// Builds the stored content for a response body of the given MIME type.
fn make_example(body: &[u8], produce: &str) -> MediaContent {
    let essence = produce
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let top_level = essence.split('/').next().unwrap_or_default();

    let example = if essence == "application/json" || essence.ends_with("+json") {
        if body.iter().all(u8::is_ascii_whitespace) {
            Value::Null
        } else {
            serde_json::from_slice(body).unwrap_or_else(|_| Value::String(encode_text(body)))
        }
    } else if essence == "application/pdf" || top_level == "image" {
        Value::String(STANDARD.encode(body))
    } else if top_level == "application" || top_level == "text" {
        Value::String(encode_text(body))
    } else {
        return MediaContent::Placeholder(UNAVAILABLE_FOR_PREVIEW.to_string());
    };

    MediaContent::Media(MediaType::with_example(example))
}
