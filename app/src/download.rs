//! Subscription download and body decoding.
//!
//! Subscription endpoints serve either a plain newline-separated link list
//! or the same list base64-encoded as a single blob. Comment lines starting
//! with `#` are dropped either way.

use anyhow::{Context, Result};
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;

/// Download one subscription and return its links. Per-URL timeout comes
/// from the client; a failure here is reported by the caller, never fatal
/// to the other URLs.
pub async fn fetch_one(client: &reqwest::Client, url: &str) -> Result<Vec<String>> {
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("request to {url} failed"))?
        .error_for_status()
        .with_context(|| format!("{url} returned an error status"))?;
    let body = response
        .text()
        .await
        .with_context(|| format!("reading body from {url} failed"))?;
    Ok(extract_links(&body))
}

/// Split a subscription body into links, transparently decoding a
/// base64-wrapped body first.
pub fn extract_links(body: &str) -> Vec<String> {
    let text = decode_if_base64(body).unwrap_or_else(|| body.to_string());
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

/// Try to interpret the whole body as one base64 blob. Accepts standard and
/// URL-safe alphabets, padded or not. Returns `None` unless the decoded
/// bytes are UTF-8 that actually looks like a link list.
fn decode_if_base64(body: &str) -> Option<String> {
    let compact: String = body.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return None;
    }

    let url_safe = compact.contains('-') || compact.contains('_');
    let padded = compact.ends_with('=');
    let decoded = match (url_safe, padded) {
        (true, true) => URL_SAFE.decode(&compact),
        (true, false) => URL_SAFE_NO_PAD.decode(&compact),
        (false, true) => STANDARD.decode(&compact),
        (false, false) => STANDARD_NO_PAD.decode(&compact),
    }
    .ok()?;

    let text = String::from_utf8(decoded).ok()?;
    text.contains("://").then_some(text)
}
