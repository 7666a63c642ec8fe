//! Best-effort repair of loosely formatted subscription URIs.
//!
//! Subscription feeds routinely carry URIs with stray whitespace, broken
//! percent-encoding, HTML entity escapes, and unescaped credentials. The
//! passes below run in a fixed order; later passes assume the earlier ones
//! already ran. The whole pipeline is idempotent on its own output.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::{LinkError, Result};

/// Everything except `[A-Za-z0-9-_.~]`, the unreserved set.
const USERINFO: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Normalize one raw connection URI.
///
/// Fails with [`LinkError::EmptyInput`] when nothing is left after trimming
/// and with [`LinkError::MalformedScheme`] when no `scheme://` separator
/// survives the repair passes.
pub fn normalize(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(LinkError::EmptyInput);
    }

    // Spaces are stripped only ahead of the remark; remarks may legitimately
    // contain free text.
    let (before, after) = match trimmed.split_once('#') {
        Some((b, a)) => (b, a),
        None => (trimmed, ""),
    };
    let mut uri = format!("{}#{}", before.replace(' ', ""), after);

    uri = drop_malformed_percent(&uri);
    uri = drop_encoded_controls(&uri);
    uri = percent_decode_str(&uri).decode_utf8_lossy().into_owned();
    // Decoding can reveal new malformed sequences.
    uri = drop_malformed_percent(&uri);
    // Protect query-parameter boundaries ("&note=" must not become "¬e=")
    // before entity decoding.
    uri = escape_bare_ampersands(&uri);
    uri = unescape_amp_entities(&uri);

    let fixed = escape_userinfo(&uri)?;
    if fixed != trimmed {
        tracing::trace!(original = %trimmed, "repaired uri");
    }
    Ok(fixed)
}

/// Drop every `%` that is not followed by two hex digits; the following
/// characters are re-examined normally.
fn drop_malformed_percent(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if i + 2 < bytes.len()
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit()
            {
                out.extend_from_slice(&bytes[i..i + 3]);
                i += 3;
            } else {
                i += 1;
            }
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Drop percent-encoded ASCII control characters (`%00`–`%1F`, `%7F`).
fn drop_encoded_controls(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or("");
            if let Ok(val) = u8::from_str_radix(hex, 16) {
                if val <= 0x1f || val == 0x7f {
                    i += 3;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Escape every `&` that does not already start an `&amp;` entity.
fn escape_bare_ampersands(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'&' {
            if i + 4 < bytes.len() && &bytes[i + 1..i + 5] == b"amp;" {
                out.push('&');
            } else {
                out.push_str("&amp;");
            }
            i += 1;
        } else {
            let ch_len = utf8_len(bytes[i]);
            out.push_str(&input[i..i + ch_len]);
            i += ch_len;
        }
    }
    out
}

fn utf8_len(first: u8) -> usize {
    match first {
        b if b < 0x80 => 1,
        b if b >= 0xf0 => 4,
        b if b >= 0xe0 => 3,
        _ => 2,
    }
}

/// Decode HTML `&amp;` entities. After [`escape_bare_ampersands`] ran, every
/// ampersand in the string starts an `&amp;` sequence, so a single
/// left-to-right non-overlapping replace matches one decoding pass.
fn unescape_amp_entities(input: &str) -> String {
    input.replace("&amp;", "&")
}

/// Re-escape the user-info segment (between `scheme://` and the last `@`
/// before the query) so credentials with special characters do not corrupt
/// structured URL parsing downstream.
fn escape_userinfo(uri: &str) -> Result<String> {
    let (scheme, rest) = uri.split_once("://").ok_or(LinkError::MalformedScheme)?;

    if rest.bytes().filter(|&b| b == b'?').count() != 1 {
        return Ok(uri.to_string());
    }
    let (authority, query) = rest.split_once('?').unwrap_or((rest, ""));
    match authority.rfind('@') {
        Some(at) => {
            let user = &authority[..at];
            let addr = &authority[at + 1..];
            let escaped = utf8_percent_encode(user, USERINFO).to_string();
            Ok(format!("{scheme}://{escaped}@{addr}?{query}"))
        }
        None => Ok(uri.to_string()),
    }
}
