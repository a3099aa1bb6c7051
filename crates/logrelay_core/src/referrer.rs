// referrer.rs: reduce referrer URLs to scheme://host
use std::str;
use tracing::{debug, trace};
use url::Url;

/// Returns `scheme://host[:port]`, or an empty string for a missing or
/// malformed referrer. Path, query and fragment are always dropped.
///
/// One layer of surrounding `"` is removed; anything still quoted after that
/// is not a URL.
pub fn sanitize_referrer(raw: impl AsRef<[u8]>) -> String {
    let r = match str::from_utf8(raw.as_ref()) {
        Ok(s) => s.trim(),
        Err(e) => {
            debug!(error = %e, "referrer is not valid UTF-8");
            return String::new();
        }
    };
    let r = r.strip_prefix('"').unwrap_or(r);
    let r = r.strip_suffix('"').unwrap_or(r);
    if r == "-" {
        trace!("no referrer sent");
        return String::new();
    }
    let url = match Url::parse(r) {
        Ok(u) => u,
        Err(e) => {
            debug!(referrer = %r, error = %e, "malformed referrer");
            return String::new();
        }
    };
    let host = match url.host_str() {
        Some(h) if !h.is_empty() && !url.scheme().is_empty() => h,
        _ => {
            debug!(referrer = %r, "referrer has no host");
            return String::new();
        }
    };
    match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    }
}
