//! Query-parameter composition for request URLs.
//!
//! Validation here is intentionally lax: arbitrary passthrough parameters
//! must survive untouched, so a misconfigured value surfaces as a blank
//! overlay rather than an error.

/// Appends `params` to `base` as a query string, respecting any query
/// separator already present in the base URL.
pub fn append_params(base: &str, params: &[(String, String)]) -> String {
    if params.is_empty() {
        return base.to_string();
    }
    let mut url = String::from(base);
    for (key, value) in params {
        let sep = if url.contains('?') {
            if url.ends_with('?') || url.ends_with('&') {
                ""
            } else {
                "&"
            }
        } else {
            "?"
        };
        url.push_str(sep);
        url.push_str(key);
        url.push('=');
        url.push_str(value);
    }
    url
}
