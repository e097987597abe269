use std::collections::HashMap;

use axum::response::Response;

use super::response::bad_request;

pub type QueryMap = HashMap<String, String>;

/// Reads a required integer query parameter.
pub fn int_param(query: &QueryMap, name: &str) -> Result<i64, Response> {
    let raw = match query.get(name).map(|v| v.trim()) {
        None | Some("") => return Err(bad_request(format!("query \"{name}\" is empty"))),
        Some(raw) => raw,
    };
    raw.parse()
        .map_err(|_| bad_request(format!("query \"{name}\" is not a number")))
}
