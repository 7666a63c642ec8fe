use url::Url;

use crate::common::{decode_component, endpoint_from_url, Query};
use crate::error::Result;
use crate::fixer;
use crate::model::{
    Hysteria2Obfs, Hysteria2Options, OutboundDescriptor, Profile, ServerOptions, TlsOptions,
};

pub(super) fn parse(raw_uri: &str) -> Result<Profile> {
    let uri = fixer::normalize(raw_uri)?;
    let url = Url::parse(&uri)?;
    let (server, server_port) = endpoint_from_url(&url)?;
    let query = Query::from_url(&url);

    let sni = query.get("sni").to_string();
    let insecure = query.get("insecure") == "1";

    let obfs_type = query.get("obfs");
    let obfs_password = query.get("obfs-password");
    let obfs = (!obfs_type.is_empty() && !obfs_password.is_empty()).then(|| Hysteria2Obfs {
        obfs_type: obfs_type.to_string(),
        password: obfs_password.to_string(),
    });

    // Hysteria2 is always TLS. Without an SNI there is nothing to verify
    // the certificate against, so verification is off in that case.
    let tls = TlsOptions {
        enabled: true,
        server_name: sni.clone(),
        insecure: insecure || sni.is_empty(),
        ..TlsOptions::default()
    };

    let descriptor = OutboundDescriptor::Hysteria2(Hysteria2Options {
        server: ServerOptions {
            server,
            server_port,
        },
        password: decode_component(url.username()),
        obfs,
        tls,
    });

    Ok(Profile::new(descriptor, uri))
}
