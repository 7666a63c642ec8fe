//! Scheme dispatch: one parser per supported share-link scheme.

mod hysteria2;
mod shadowsocks;
mod trojan;
mod vless;
mod vmess;

use crate::error::{LinkError, Result};
use crate::model::Profile;

/// Supported share-link schemes. The registry is this enum; dispatch is a
/// match, populated once at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Vless,
    Trojan,
    Vmess,
    Shadowsocks,
    Hysteria2,
}

impl Scheme {
    /// Look up the scheme for a URI prefix. `hy2` is an alias of `hysteria2`.
    pub fn from_uri_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "vless" => Some(Self::Vless),
            "trojan" => Some(Self::Trojan),
            "vmess" => Some(Self::Vmess),
            "ss" => Some(Self::Shadowsocks),
            "hysteria2" | "hy2" => Some(Self::Hysteria2),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Vless => "vless",
            Self::Trojan => "trojan",
            Self::Vmess => "vmess",
            Self::Shadowsocks => "shadowsocks",
            Self::Hysteria2 => "hysteria2",
        }
    }
}

/// Parse one raw connection URI into a typed [`Profile`].
///
/// Fails with [`LinkError::EmptyInput`] for blank lines,
/// [`LinkError::UnknownScheme`] for schemes outside the supported set, and
/// [`LinkError::Parse`] wrapping the scheme-specific cause otherwise.
pub fn parse_profile(raw_uri: &str) -> Result<Profile> {
    let raw_uri = raw_uri.trim();
    if raw_uri.is_empty() {
        return Err(LinkError::EmptyInput);
    }

    let prefix = raw_uri.split("://").next().unwrap_or("");
    let scheme = Scheme::from_uri_prefix(prefix)
        .ok_or_else(|| LinkError::UnknownScheme(prefix.to_string()))?;

    let parsed = match scheme {
        Scheme::Vless => vless::parse(raw_uri),
        Scheme::Trojan => trojan::parse(raw_uri),
        Scheme::Vmess => vmess::parse(raw_uri),
        Scheme::Shadowsocks => shadowsocks::parse(raw_uri),
        Scheme::Hysteria2 => hysteria2::parse(raw_uri),
    };

    parsed.map_err(|e| LinkError::Parse {
        scheme: scheme.name(),
        msg: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OutboundDescriptor;

    #[test]
    fn blank_line_is_empty_input() {
        assert!(matches!(parse_profile("  "), Err(LinkError::EmptyInput)));
    }

    #[test]
    fn unknown_scheme_is_rejected() {
        match parse_profile("socks5://u:p@h:1080") {
            Err(LinkError::UnknownScheme(s)) => assert_eq!(s, "socks5"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn hy2_alias_dispatches_to_hysteria2() {
        let profile = parse_profile("hy2://pw@h2.example:443?sni=h2.example#a").unwrap();
        assert!(matches!(
            profile.descriptor,
            OutboundDescriptor::Hysteria2(_)
        ));
    }

    #[test]
    fn scheme_errors_carry_protocol_prefix() {
        // Bad base64 payload surfaces as a vmess parse error.
        match parse_profile("vmess://!!!notbase64!!!") {
            Err(LinkError::Parse { scheme, .. }) => assert_eq!(scheme, "vmess"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
