//! Typed outbound descriptor model shared by the parsers and the prober.

use serde::{Deserialize, Serialize};

/// A parsed connection profile: one outbound descriptor plus the canonical
/// (post-normalization) URI it was built from.
///
/// `uri` is never mutated after creation; it is what gets written back out
/// for profiles that survive probing. `tag` is assigned once, after the whole
/// batch has been validated, and only serves to correlate probe results.
#[derive(Debug, Clone)]
pub struct Profile {
    pub descriptor: OutboundDescriptor,
    pub uri: String,
    pub tag: Option<String>,
}

impl Profile {
    pub fn new(descriptor: OutboundDescriptor, uri: String) -> Self {
        Self {
            descriptor,
            uri,
            tag: None,
        }
    }

    /// Tag as set during the tagging pass; empty string before that pass
    /// has run.
    pub fn tag(&self) -> &str {
        self.tag.as_deref().unwrap_or("")
    }
}

/// Protocol-specific connection parameters for one outbound.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum OutboundDescriptor {
    Vless(VlessOptions),
    Trojan(TrojanOptions),
    Vmess(VmessOptions),
    Shadowsocks(ShadowsocksOptions),
    Hysteria2(Hysteria2Options),
}

impl OutboundDescriptor {
    pub fn protocol(&self) -> &'static str {
        match self {
            Self::Vless(_) => "vless",
            Self::Trojan(_) => "trojan",
            Self::Vmess(_) => "vmess",
            Self::Shadowsocks(_) => "shadowsocks",
            Self::Hysteria2(_) => "hysteria2",
        }
    }

    /// Server endpoint common to every protocol.
    pub fn server(&self) -> (&str, u16) {
        let s = match self {
            Self::Vless(o) => &o.server,
            Self::Trojan(o) => &o.server,
            Self::Vmess(o) => &o.server,
            Self::Shadowsocks(o) => &o.server,
            Self::Hysteria2(o) => &o.server,
        };
        (&s.server, s.server_port)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerOptions {
    pub server: String,
    pub server_port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VlessOptions {
    #[serde(flatten)]
    pub server: ServerOptions,
    pub uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<TransportOptions>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrojanOptions {
    #[serde(flatten)]
    pub server: ServerOptions,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<TransportOptions>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmessOptions {
    #[serde(flatten)]
    pub server: ServerOptions,
    pub uuid: String,
    /// Encryption method (`scy` in the share link).
    #[serde(default)]
    pub security: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<TransportOptions>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShadowsocksOptions {
    #[serde(flatten)]
    pub server: ServerOptions,
    pub method: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hysteria2Options {
    #[serde(flatten)]
    pub server: ServerOptions,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obfs: Option<Hysteria2Obfs>,
    pub tls: TlsOptions,
}

/// Salamander obfuscation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hysteria2Obfs {
    #[serde(rename = "type")]
    pub obfs_type: String,
    pub password: String,
}

/// TLS settings shared across protocols.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TlsOptions {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub server_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alpn: Vec<String>,
    /// Skip certificate verification.
    #[serde(default)]
    pub insecure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utls: Option<UtlsOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reality: Option<RealityOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ech: Option<EchOptions>,
}

/// TLS fingerprint spoofing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UtlsOptions {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub fingerprint: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RealityOptions {
    #[serde(default)]
    pub enabled: bool,
    pub public_key: String,
    #[serde(default)]
    pub short_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EchOptions {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub config: Vec<String>,
}

/// Stream transport layered under the protocol, when not plain TCP.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransportOptions {
    Http {
        #[serde(default)]
        host: Vec<String>,
        #[serde(default)]
        path: String,
        #[serde(default)]
        method: String,
    },
    #[serde(rename = "ws")]
    WebSocket {
        #[serde(default)]
        path: String,
    },
    Quic,
    Grpc {
        #[serde(default)]
        service_name: String,
    },
    HttpUpgrade {
        #[serde(default)]
        host: String,
        #[serde(default)]
        path: String,
    },
}
