use url::Url;

use crate::common::{
    build_tls_options, build_transport_options, decode_component, endpoint_from_url, Protocol,
    Query,
};
use crate::error::{LinkError, Result};
use crate::fixer;
use crate::model::{OutboundDescriptor, Profile, ServerOptions, TrojanOptions};

/// Trojan passwords are frequently not percent-safe and may themselves
/// contain `@`, so the URI cannot be fed to a structured parser directly.
/// Split on the last `#` (remark) and the last `@` before it, then parse a
/// placeholder URL for everything after the credentials.
fn split_credentials(uri: &str) -> Result<(String, Url)> {
    let before_remark = match uri.rfind('#') {
        Some(i) => &uri[..i],
        None => uri,
    };

    let last_at = before_remark
        .rfind('@')
        .ok_or(LinkError::MalformedNetloc)?;
    let before_at = &before_remark[..last_at];
    let after_at = &before_remark[last_at + 1..];

    let (scheme, user_info) = before_at
        .split_once("://")
        .ok_or(LinkError::MalformedScheme)?;

    let placeholder = format!("{scheme}://placeholder@{after_at}");
    let url = Url::parse(&placeholder)?;
    Ok((user_info.to_string(), url))
}

pub(super) fn parse(raw_uri: &str) -> Result<Profile> {
    let uri = fixer::normalize(raw_uri)?;
    let (user_info, url) = split_credentials(&uri)?;
    let (server, server_port) = endpoint_from_url(&url)?;
    let query = Query::from_url(&url);

    let tls = build_tls_options(&query, Protocol::Trojan)?;
    let transport = build_transport_options(&query, Protocol::Trojan)?;

    let descriptor = OutboundDescriptor::Trojan(TrojanOptions {
        server: ServerOptions {
            server,
            server_port,
        },
        password: decode_component(&user_info),
        tls,
        transport,
    });

    Ok(Profile::new(descriptor, uri))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_password_with_literal_at_sign() {
        let profile = parse("trojan://p%40ss@host.example:443?security=none#r").unwrap();
        let OutboundDescriptor::Trojan(o) = &profile.descriptor else {
            panic!("wrong descriptor");
        };
        assert_eq!(o.password, "p@ss");
        assert_eq!(o.server.server, "host.example");
        assert_eq!(o.server.server_port, 443);
    }

    #[test]
    fn unencoded_at_in_password_still_splits_on_last_at() {
        // No query part, so the normalizer leaves the raw '@' in place.
        let profile = parse("trojan://we@k:pw@srv.example:8443#m").unwrap();
        let OutboundDescriptor::Trojan(o) = &profile.descriptor else {
            panic!("wrong descriptor");
        };
        assert_eq!(o.password, "we@k:pw");
        assert_eq!(o.server.server, "srv.example");
        assert_eq!(o.server.server_port, 8443);
    }

    #[test]
    fn missing_at_is_rejected() {
        assert!(parse("trojan://srv.example:8443#m").is_err());
    }

    #[test]
    fn tls_and_transport_from_query() {
        let profile = parse(
            "trojan://pw@srv.example:443?security=tls&sni=srv.example&type=grpc&serviceName=gun#g",
        )
        .unwrap();
        let OutboundDescriptor::Trojan(o) = &profile.descriptor else {
            panic!("wrong descriptor");
        };
        assert!(o.tls.as_ref().unwrap().enabled);
        assert!(o.transport.is_some());
    }
}
