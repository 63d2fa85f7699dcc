use tokio_util::sync::CancellationToken;
use shared::protocol::{
    ADVERTISE_PORT, ADVERTISE_TXT, MDNS_DOMAIN, PUBLIC_INSTANCE_SUFFIX, PUBLIC_NAME_PREFIX,
    WORKSTATION_SERVICE_TYPE,
};
use crate::error::{Error, Result};
use crate::iface::{self, BindInterface};
use super::{Discovery, ProxyService};

/// Public hostname used when none is configured.
pub fn default_public_name() -> Result<String> {
    let hostname = hostname::get()?.to_string_lossy().to_string();
    Ok(public_name_for(&hostname))
}

/// Short hostnames are used whole; long ones keep their last 12 characters.
pub fn public_name_for(hostname: &str) -> String {
    let chars: Vec<char> = hostname.chars().collect();
    if chars.len() < 12 {
        return format!("{}{}", PUBLIC_NAME_PREFIX, hostname);
    }
    let tail: String = chars[chars.len() - 12..].iter().collect();
    format!("{}{}.local", PUBLIC_NAME_PREFIX, tail)
}

/// mDNS only answers for names under "local."
fn mdns_hostname(name: &str) -> String {
    let name = name.trim_end_matches('.');
    match name.strip_suffix(".local") {
        Some(_) => format!("{}.", name),
        None => format!("{}.{}", name, MDNS_DOMAIN),
    }
}

/// The announcement for this host on `iface`.
pub fn build_proxy(instance_prefix: &str, hostname: &str, iface: &BindInterface) -> Result<ProxyService> {
    let address = iface
        .first_address()
        .ok_or_else(|| Error::NoAddress(iface.name.clone()))?;

    Ok(ProxyService {
        instance: format!("{}{}", instance_prefix, PUBLIC_INSTANCE_SUFFIX),
        service_type: WORKSTATION_SERVICE_TYPE.to_string(),
        domain: MDNS_DOMAIN.to_string(),
        port: ADVERTISE_PORT,
        hostname: mdns_hostname(hostname),
        addresses: vec![address],
        txt: ADVERTISE_TXT
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        interface: Some(iface.name.clone()),
    })
}

/// Advertise this host until `cancel` fires, then withdraw.
pub async fn advertise<D: Discovery>(
    discovery: &D,
    instance_prefix: &str,
    hostname: &str,
    bind_interface: &str,
    cancel: CancellationToken,
) -> Result<()> {
    let iface = iface::resolve(bind_interface)?;
    let service = build_proxy(instance_prefix, hostname, &iface)?;
    hold_registration(discovery, &service, cancel).await
}

pub async fn hold_registration<D: Discovery>(
    discovery: &D,
    service: &ProxyService,
    cancel: CancellationToken,
) -> Result<()> {
    let registration = discovery.register_proxy(service)?;

    tracing::info!(
        "Registered {} as {} for {} on port {}",
        service.service_type,
        registration.fullname(),
        service.hostname,
        service.port
    );

    cancel.cancelled().await;

    let fullname = registration.fullname().to_string();
    registration.shutdown()?;
    tracing::info!("Unregistered {}", fullname);
    Ok(())
}
