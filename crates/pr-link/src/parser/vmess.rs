use std::collections::HashMap;

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use serde_json::Value;

use crate::common::{build_tls_options, build_transport_options, Protocol, Query};
use crate::error::{LinkError, Result};
use crate::model::{OutboundDescriptor, Profile, ServerOptions, VmessOptions};

/// The scheme body is one base64 blob, not a structured URL. The alphabet
/// (standard vs URL-safe) and padding are auto-detected from the payload.
fn decode_body(body: &str) -> Result<Vec<u8>> {
    let is_url_safe = body.contains(['-', '_']);
    let is_raw = !body.ends_with('=');

    let decoded = match (is_url_safe, is_raw) {
        (true, true) => URL_SAFE_NO_PAD.decode(body),
        (true, false) => URL_SAFE.decode(body),
        (false, true) => STANDARD_NO_PAD.decode(body),
        (false, false) => STANDARD.decode(body),
    }?;
    Ok(decoded)
}

/// Flatten the decoded JSON object into string-coerced query-equivalent
/// fields, the way v2rayN-style links are interpreted.
fn coerce_fields(value: Value) -> Result<HashMap<String, String>> {
    let Value::Object(map) = value else {
        return Err(LinkError::Parse {
            scheme: "vmess",
            msg: "payload is not a JSON object".to_string(),
        });
    };

    let mut fields = HashMap::with_capacity(map.len());
    for (key, val) in map {
        let coerced = match val {
            Value::Null => String::new(),
            Value::String(s) => s,
            other => other.to_string(),
        };
        fields.insert(key, coerced);
    }
    Ok(fields)
}

pub(super) fn parse(raw_uri: &str) -> Result<Profile> {
    let body = raw_uri.trim().trim_start_matches("vmess://");
    let decoded = decode_body(body)?;
    let value: Value = serde_json::from_slice(&decoded)?;
    let query = Query::from_map(coerce_fields(value)?);

    let server = query.get("add").to_string();
    let server_port: u16 = query
        .get("port")
        .parse()
        .map_err(|_| LinkError::InvalidPort)?;

    let tls = build_tls_options(&query, Protocol::Vmess)?;
    let transport = build_transport_options(&query, Protocol::Vmess)?;

    let descriptor = OutboundDescriptor::Vmess(VmessOptions {
        server: ServerOptions {
            server,
            server_port,
        },
        uuid: query.get("id").to_string(),
        security: query.get("scy").to_string(),
        tls,
        transport,
    });

    Ok(Profile::new(descriptor, raw_uri.trim().to_string()))
}
