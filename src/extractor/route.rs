//! Route and operation resolution.
//!
//! Turns an observed request into the `(uri, method)` key of the operation it
//! documents, and finds the request descriptor bound to the handler.

use super::{InputType, ObservedRequest, RequestDescriptor, RouteBinding, RouteResolver};
use crate::parser::{lcfirst, ucfirst};
use http::Method;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

static PATH_PARAM_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([^}]+)\}").expect("path parameter pattern is valid")
});

/// Identity of the operation an exchange documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationTarget {
    /// Normalized URI template, always starting with `/`
    pub uri: String,
    /// Lowercase HTTP method
    pub method: String,
}

impl OperationTarget {
    /// Resolves the target for a request.
    ///
    /// The route template is preferred over the concrete path so that placeholders
    /// survive; when the binding carries no template, the resolver's route table is
    /// searched for one.
    pub fn resolve(
        request: &dyn ObservedRequest,
        resolver: &dyn RouteResolver,
        base_path: &str,
    ) -> Self {
        let concrete = request_path(request.uri());
        let template = request
            .route()
            .and_then(|route| route.template.clone())
            .or_else(|| match_route(&resolver.routes(), request.method(), concrete));

        Self {
            uri: normalize_uri(template.as_deref().unwrap_or(concrete), base_path),
            method: request.method().as_str().to_lowercase(),
        }
    }
}

/// Strips scheme, host, query string and fragment from a URI.
pub fn request_path(uri: &str) -> &str {
    let path = match uri.find("://") {
        Some(scheme_end) => {
            let rest = &uri[scheme_end + 3..];
            rest.find('/').map_or("", |slash| &rest[slash..])
        }
        None => uri,
    };
    path.split(['?', '#']).next().unwrap_or_default()
}

/// Normalizes a URI into a `paths` key.
///
/// The base path prefix and query string are removed and exactly one leading slash
/// is kept. Trailing slashes are dropped.
pub fn normalize_uri(uri: &str, base_path: &str) -> String {
    let path = request_path(uri).trim_matches('/');
    let base = base_path.trim_matches('/');

    let path = if base.is_empty() {
        path
    } else {
        match path.strip_prefix(base) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
            _ => path,
        }
    };

    format!("/{}", path.trim_matches('/'))
}

/// Placeholder names of a URI template, in order of appearance.
pub fn path_params(template: &str) -> Vec<String> {
    PATH_PARAM_REGEX
        .captures_iter(template)
        .map(|captures| captures[1].to_string())
        .collect()
}

/// Finds the registered template matching a concrete path.
///
/// A template matches when the method is the same, the segment counts agree and
/// every literal segment is equal; placeholder segments match any non-empty value.
pub fn match_route(routes: &[(Method, String)], method: &Method, path: &str) -> Option<String> {
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    routes
        .iter()
        .filter(|(route_method, _)| route_method == method)
        .find(|(_, template)| {
            let template_segments: Vec<&str> = template.trim_matches('/').split('/').collect();
            template_segments.len() == segments.len()
                && template_segments
                    .iter()
                    .zip(&segments)
                    .all(|(expected, actual)| {
                        if PATH_PARAM_REGEX.is_match(expected) {
                            !actual.is_empty()
                        } else {
                            expected == actual
                        }
                    })
        })
        .map(|(_, template)| template.clone())
}

/// Finds the request descriptor bound to a route's handler.
///
/// The handler's declared inputs are scanned in order; interfaces are followed
/// through the host's bindings, and the first type whose name contains `Request`
/// wins. Closure routes and unknown handlers resolve to `None`.
pub fn resolve_request(
    route: Option<&RouteBinding>,
    resolver: &dyn RouteResolver,
) -> Option<RequestDescriptor> {
    let route = route?;
    let controller = route.controller.as_deref().filter(|c| *c != "Closure")?;
    let action = route.action.as_deref()?;

    let Some(inputs) = resolver.handler_inputs(controller, action) else {
        debug!("Handler {}@{} is unknown to the resolver", controller, action);
        return None;
    };

    let type_name = inputs
        .into_iter()
        .filter_map(|input| match input {
            InputType::Concrete(name) => Some(name),
            InputType::Interface(name) => resolver.binding(&name),
            InputType::Builtin => None,
        })
        .find(|name| name.contains("Request"));

    match type_name {
        Some(type_name) => {
            let descriptor = resolver.descriptor(&type_name);
            if descriptor.is_none() {
                debug!("No descriptor registered for {}", type_name);
            }
            descriptor
        }
        None => {
            debug!("Handler {}@{} declares no request type", controller, action);
            None
        }
    }
}

/// Camel-cased action name of a URI, used to name request schemas.
///
/// `/users/{id}/api-keys` becomes `usersIdApiKeys`.
pub fn action_name(uri: &str) -> String {
    uri.split(['/', '{', '}', '-', '_', ' '])
        .filter(|word| !word.is_empty())
        .enumerate()
        .map(|(i, word)| if i == 0 { lcfirst(word) } else { ucfirst(word) })
        .collect()
}
