//! Cross-scheme helpers: query access, endpoint extraction, and the shared
//! TLS / transport option builders.

use std::collections::HashMap;

use percent_encoding::percent_decode_str;
use url::Url;

use crate::error::{LinkError, Result};
use crate::model::{
    EchOptions, RealityOptions, TlsOptions, TransportOptions, UtlsOptions,
};

/// Protocol hint for the option builders; some share links rename keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Protocol {
    Vless,
    Trojan,
    Vmess,
}

/// Decoded query parameters, first value wins.
#[derive(Debug, Default)]
pub(crate) struct Query(HashMap<String, String>);

impl Query {
    pub(crate) fn from_url(url: &Url) -> Self {
        let mut map = HashMap::new();
        for (k, v) in url.query_pairs() {
            map.entry(k.into_owned()).or_insert_with(|| v.into_owned());
        }
        Self(map)
    }

    pub(crate) fn from_map(map: HashMap<String, String>) -> Self {
        Self(map)
    }

    pub(crate) fn get(&self, key: &str) -> &str {
        self.0.get(key).map(String::as_str).unwrap_or("")
    }
}

/// Percent-decode a URI component, tolerating bad sequences.
pub(crate) fn decode_component(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// Extract `(address, port)` from a parsed URL, unwrapping IPv6 brackets.
/// A missing port yields 0 and is rejected later during validation.
pub(crate) fn endpoint_from_url(url: &Url) -> Result<(String, u16)> {
    let host = url.host_str().ok_or(LinkError::MalformedNetloc)?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    Ok((host.to_string(), url.port().unwrap_or(0)))
}

/// Build TLS options from share-link query parameters.
///
/// Returns `None` when no security parameter is present. Values outside
/// `{tls, reality, none}` are rejected. Reality forces fingerprint spoofing
/// on, defaulting to a fixed browser identity.
pub(crate) fn build_tls_options(
    query: &Query,
    protocol: Protocol,
) -> Result<Option<TlsOptions>> {
    let security_key = if protocol == Protocol::Vmess {
        "tls"
    } else {
        "security"
    };

    let security = query.get(security_key);
    if security.is_empty() {
        return Ok(None);
    }
    if !matches!(security, "tls" | "reality" | "none") {
        return Err(LinkError::UnsupportedSecurity(security.to_string()));
    }

    let mut options = TlsOptions {
        enabled: security != "none",
        server_name: query.get("sni").to_string(),
        ..TlsOptions::default()
    };

    let fp = query.get("fp");
    if !fp.is_empty() {
        options.utls = Some(UtlsOptions {
            enabled: true,
            fingerprint: fp.to_string(),
        });
    }

    let alpn = query.get("alpn");
    if !alpn.is_empty() {
        options.alpn = alpn.split(',').map(str::to_string).collect();
    }

    let ech = query.get("ech");
    if !ech.is_empty() {
        options.ech = Some(EchOptions {
            enabled: true,
            config: vec![ech.to_string()],
        });
    }

    if query.get("insecure") == "1" || query.get("allowInsecure") == "1" {
        options.insecure = true;
    }

    if security == "reality" {
        options.reality = Some(RealityOptions {
            enabled: true,
            public_key: query.get("pbk").to_string(),
            short_id: query.get("sid").to_string(),
        });
        // uTLS is required by the reality client.
        options.utls = Some(UtlsOptions {
            enabled: true,
            fingerprint: if fp.is_empty() {
                "chrome".to_string()
            } else {
                fp.to_string()
            },
        });
    }

    Ok(Some(options))
}

/// Build stream transport options from share-link query parameters.
///
/// Returns `None` for plain TCP. `kcp`/`mkcp`/`xhttp`/`splithttp` are known
/// but unsupported; anything else is an unknown transport.
pub(crate) fn build_transport_options(
    query: &Query,
    protocol: Protocol,
) -> Result<Option<TransportOptions>> {
    let (type_key, service_name_key) = if protocol == Protocol::Vmess {
        ("net", "path")
    } else {
        ("type", "serviceName")
    };

    let path = query.get("path");
    let host = query.get("host");
    let service_name = query.get(service_name_key);

    let transport = match query.get(type_key) {
        "" | "raw" | "tcp" => None,
        "http" | "h2" => Some(TransportOptions::Http {
            host: vec![host.to_string()],
            path: path.to_string(),
            method: "GET".to_string(),
        }),
        "ws" | "websocket" => Some(TransportOptions::WebSocket {
            path: if path.is_empty() {
                "/".to_string()
            } else {
                path.to_string()
            },
        }),
        "quic" => Some(TransportOptions::Quic),
        "grpc" => Some(TransportOptions::Grpc {
            service_name: service_name.to_string(),
        }),
        "httpupgrade" => Some(TransportOptions::HttpUpgrade {
            host: host.to_string(),
            path: path.to_string(),
        }),
        t @ ("kcp" | "mkcp" | "xhttp" | "splithttp") => {
            return Err(LinkError::UnsupportedTransport(t.to_string()));
        }
        other => return Err(LinkError::UnknownTransport(other.to_string())),
    };

    Ok(transport)
}
