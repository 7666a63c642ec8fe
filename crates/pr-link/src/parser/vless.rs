use url::Url;

use crate::common::{
    build_tls_options, build_transport_options, decode_component, endpoint_from_url, Protocol,
    Query,
};
use crate::error::Result;
use crate::fixer;
use crate::model::{OutboundDescriptor, Profile, ServerOptions, VlessOptions};

pub(super) fn parse(raw_uri: &str) -> Result<Profile> {
    let uri = fixer::normalize(raw_uri)?;
    let url = Url::parse(&uri)?;
    let (server, server_port) = endpoint_from_url(&url)?;
    let query = Query::from_url(&url);

    let mut flow = query.get("flow").to_string();
    // udp443 is a client-side hint only; the wire flow is plain vision.
    if flow == "xtls-rprx-vision-udp443" {
        flow = "xtls-rprx-vision".to_string();
    }

    let tls = build_tls_options(&query, Protocol::Vless)?;
    let transport = build_transport_options(&query, Protocol::Vless)?;

    let descriptor = OutboundDescriptor::Vless(VlessOptions {
        server: ServerOptions {
            server,
            server_port,
        },
        uuid: decode_component(url.username()),
        flow: (!flow.is_empty()).then_some(flow),
        tls,
        transport,
    });

    Ok(Profile::new(descriptor, uri))
}
