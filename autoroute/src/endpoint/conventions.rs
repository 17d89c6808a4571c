//! Naming conventions that turn identifiers into routes.
//!
//! Everything here is a pure, total function of its input.

use super::descriptor::HttpVerb;

/// Suffix stripped from service type names to form the route group.
pub const SERVICE_SUFFIX: &str = "AppService";

/// Suffix stripped from method names to form the path segment.
pub const ASYNC_SUFFIX: &str = "Async";

const READ_PREFIXES: &[&str] = &["get", "list", "find"];
const CREATE_PREFIXES: &[&str] = &["create", "add", "post"];
const UPDATE_PREFIXES: &[&str] = &["update", "put"];
const DELETE_PREFIXES: &[&str] = &["delete", "remove"];

/// Verb buckets, checked in order. The first bucket with a matching prefix wins.
const BUCKETS: &[(&[&str], HttpVerb)] = &[
    (READ_PREFIXES, HttpVerb::Get),
    (CREATE_PREFIXES, HttpVerb::Post),
    (UPDATE_PREFIXES, HttpVerb::Put),
    (DELETE_PREFIXES, HttpVerb::Delete),
];

/// Infers the HTTP verb from a method name. Unmatched names are POSTs.
pub fn infer_verb(method: &str) -> HttpVerb {
    BUCKETS
        .iter()
        .find(|(prefixes, _)| prefixes.iter().any(|p| starts_with_ignore_case(method, p)))
        .map(|(_, verb)| *verb)
        .unwrap_or(HttpVerb::Post)
}

/// `GetAllAsync` -> `getall`.
pub fn path_segment(method: &str) -> String {
    trim_suffix(method, ASYNC_SUFFIX).to_lowercase()
}

/// `ProductAppService` -> `product`.
pub fn route_group(type_name: &str) -> String {
    trim_suffix(type_name, SERVICE_SUFFIX).to_lowercase()
}

/// Display tag for a route group: `product` -> `Product`.
pub fn tag(group: &str) -> String {
    let mut chars = group.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Whether the method name falls in the delete bucket.
pub fn is_delete_name(method: &str) -> bool {
    DELETE_PREFIXES
        .iter()
        .any(|p| starts_with_ignore_case(method, p))
}

/// Removes `suffix` (case-insensitive) from the end of `input`, if present.
pub fn trim_suffix<'a>(input: &'a str, suffix: &str) -> &'a str {
    let Some(split) = input.len().checked_sub(suffix.len()) else {
        return input;
    };
    match (input.get(..split), input.get(split..)) {
        (Some(head), Some(tail)) if tail.eq_ignore_ascii_case(suffix) => head,
        _ => input,
    }
}

fn starts_with_ignore_case(input: &str, prefix: &str) -> bool {
    input
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}
