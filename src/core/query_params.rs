use crate::config::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use std::collections::HashMap;

/// Parse query parameters out of a request URI.
///
/// Values are URL-decoded; when a key repeats, the last value wins. A bare
/// key without `=` is kept with an empty value so flag parameters can be
/// tested for presence.
pub fn parse_query_params(uri: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();

    if let Some(query_start) = uri.find('?') {
        let query = &uri[query_start + 1..];
        for param in query.split('&') {
            if let Some(eq_idx) = param.find('=') {
                let key = &param[..eq_idx];
                let encoded_value = &param[eq_idx + 1..];
                let decoded = urlencoding::decode(encoded_value)
                    .unwrap_or(std::borrow::Cow::Borrowed(encoded_value))
                    .to_string();
                params.insert(key.to_string(), decoded);
            } else if !param.is_empty() {
                params.insert(param.to_string(), String::new());
            }
        }
    }

    params
}

pub fn get_string(params: &HashMap<String, String>, key: &str) -> Option<String> {
    params.get(key).filter(|v| !v.is_empty()).cloned()
}

pub fn get_bool_flag(params: &HashMap<String, String>, key: &str) -> bool {
    params.get(key).map(|v| v == "true").unwrap_or(false)
}

/// Integer parameter with a floor of 1; non-numeric input falls back to the
/// default.
pub fn get_int(params: &HashMap<String, String>, key: &str, default: usize) -> usize {
    params
        .get(key)
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(default)
        .max(1)
}

/// Pagination pair for list endpoints. `page` and `limit` clamp to a minimum
/// of 1 (zero, negative, and garbage input included); `limit` is additionally
/// capped so a single request cannot ask for the whole collection.
pub fn page_params(params: &HashMap<String, String>) -> (usize, usize) {
    let page = get_int(params, "page", 1);
    let limit = get_int(params, "limit", DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
    (page, limit)
}
