use log::debug;
use std::collections::BTreeMap;

/// Doc-comment annotation parser.
///
/// Request types may carry `@key value` lines in their doc comment. Keys used by the
/// accumulator are `summary`, `description`, `_<status>` (response description) and
/// field names (parameter description); any other key is returned as well.
///
/// # Example
///
/// ```
/// use openapi_from_traffic::parser::AnnotationParser;
///
/// let doc = "/**\n * @summary Create a user\n * @_201 User created\n */";
/// let annotations = AnnotationParser::parse(doc);
/// assert_eq!(annotations["summary"], "Create a user");
/// assert_eq!(annotations["_201"], "User created");
/// ```
pub struct AnnotationParser;

impl AnnotationParser {
    /// Parses every line containing `@` into a key/value pair.
    ///
    /// The key is the word right after `@`; the value is the rest of the line.
    /// Later lines override earlier ones with the same key.
    pub fn parse(doc_comment: &str) -> BTreeMap<String, String> {
        let mut annotations = BTreeMap::new();

        for line in doc_comment.lines() {
            let Some(index) = line.find('@') else {
                continue;
            };
            let block = line[index + 1..].trim_end();
            let block = block.strip_suffix("*/").unwrap_or(block).trim_end();

            let mut words = block.split(' ');
            let key = words.next().unwrap_or_default();
            if key.is_empty() {
                continue;
            }
            let value = words.collect::<Vec<_>>().join(" ");

            annotations.insert(key.to_string(), value);
        }

        debug!("Parsed {} annotations", annotations.len());
        annotations
    }

    /// Derives a human summary from a request type name.
    ///
    /// `app::requests::CreateUserRequest` becomes `create user`.
    pub fn summary_from_type_name(type_name: &str) -> String {
        let short = type_name
            .rsplit(|c: char| c == ':' || c == '\\')
            .next()
            .unwrap_or(type_name)
            .replace("Request", "");

        split_camel_case(&short)
            .into_iter()
            .map(|word| {
                if word.chars().all(|c| !c.is_lowercase()) {
                    word.to_lowercase()
                } else {
                    lcfirst(&word)
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Splits `HTTPRequestId2` into `["HTTP", "Request", "Id2"]`.
fn split_camel_case(input: &str) -> Vec<String> {
    let chars: Vec<char> = input.chars().filter(|c| c.is_alphanumeric()).collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if !prev.is_uppercase() || next_is_lower {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
}

/// Lowercases the first character.
pub(crate) fn lcfirst(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Uppercases the first character.
pub(crate) fn ucfirst(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
