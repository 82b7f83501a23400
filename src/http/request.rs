//! Request extraction helpers.
//!
//! # Responsibilities
//! - Map HTTP methods onto routing verbs
//! - Extract the subdomain from the Host header
//!
//! # Design Decisions
//! - Unknown methods are rejected at the HTTP layer, never routed
//! - Bare hosts, `localhost` and IP addresses carry no subdomain

use axum::http::Method;

use crate::routing::Verb;

/// The routing verb for an HTTP method, if it is one we route.
pub fn verb_of(method: &Method) -> Option<Verb> {
    match *method {
        Method::GET => Some(Verb::Get),
        Method::POST => Some(Verb::Post),
        Method::PUT => Some(Verb::Put),
        Method::PATCH => Some(Verb::Patch),
        Method::DELETE => Some(Verb::Delete),
        Method::HEAD => Some(Verb::Head),
        Method::OPTIONS => Some(Verb::Options),
        _ => None,
    }
}

/// The subdomain of a Host header value, if it carries one.
///
/// Only hosts with three or more labels have a subdomain, and `www`
/// counts as none.
pub fn subdomain_of(host: &str) -> Option<String> {
    let host = host.rsplit_once(':').map(|(h, _)| h).unwrap_or(host);
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 3 {
        return None;
    }
    // IPv4 hosts look like four labels but have no subdomain.
    if labels.iter().all(|l| l.chars().all(|c| c.is_ascii_digit())) {
        return None;
    }
    let first = labels[0];
    if first.is_empty() || first.eq_ignore_ascii_case("www") {
        return None;
    }
    Some(first.to_string())
}
