use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use url::Url;

use crate::common::{decode_component, endpoint_from_url, Query};
use crate::error::{LinkError, Result};
use crate::fixer;
use crate::model::{OutboundDescriptor, Profile, ServerOptions, ShadowsocksOptions};

/// Resolve `(method, password)` from the user-info segment.
///
/// Resolution order:
///   1. a literal `:` (or explicit URL password) splits method from password;
///   2. the whole user-info may be base64 of `method:password`;
///   3. a bare user-info is the password, with `method` read from the query
///      (defaulting to `none`).
fn resolve_credentials(url: &Url, query: &Query) -> Result<(String, String)> {
    let username = decode_component(url.username());
    let url_password = url.password().map(decode_component);

    let auth_part = match &url_password {
        Some(p) => format!("{username}:{p}"),
        None => username.clone(),
    };

    if !auth_part.contains(':') {
        if let Ok(decoded) = STANDARD.decode(&auth_part) {
            let decoded = String::from_utf8_lossy(&decoded).into_owned();
            return match decoded.split_once(':') {
                Some((method, password)) => Ok((method.to_string(), password.to_string())),
                None => Err(LinkError::MalformedCredentials(
                    "base64 user-info lacks a method:password separator",
                )),
            };
        }
    }

    if let Some((method, password)) = auth_part.split_once(':') {
        return Ok((method.to_string(), password.to_string()));
    }

    let method = match query.get("method") {
        "" => "none".to_string(),
        m => m.to_string(),
    };
    Ok((method, auth_part))
}

pub(super) fn parse(raw_uri: &str) -> Result<Profile> {
    let uri = fixer::normalize(raw_uri)?;
    let mut url = Url::parse(&uri)?;

    // The whole host component may itself be base64 of
    // `method:password@host:port`; when it decodes, re-parse with the
    // decoded value.
    if let Some(host) = url.host_str() {
        if let Ok(decoded) = STANDARD.decode(host) {
            let decoded = String::from_utf8_lossy(&decoded).into_owned();
            let fragment = url.fragment().unwrap_or("");
            url = Url::parse(&format!("ss://{decoded}#{fragment}"))?;
        }
    }

    let (server, server_port) = endpoint_from_url(&url)?;
    let query = Query::from_url(&url);
    let (method, password) = resolve_credentials(&url, &query)?;

    let descriptor = OutboundDescriptor::Shadowsocks(ShadowsocksOptions {
        server: ServerOptions {
            server,
            server_port,
        },
        method,
        password,
    });

    Ok(Profile::new(descriptor, uri))
}
