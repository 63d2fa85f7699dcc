use std::collections::HashMap;
use std::net::IpAddr;
use chrono::Utc;
use mdns_sd::{IfKind, ServiceDaemon, ServiceEvent, ServiceInfo};
use shared::types::ServiceEntry;
use crate::error::Result;
use crate::iface::BindInterface;
use super::{service_domain, BrowseSession, Discovery, ProxyService, Registration};

/// [`Discovery`] on top of `mdns-sd`.
///
/// Every browse and every registration gets its own daemon so the interface
/// restriction can differ between cycles, and tearing one down can't disturb
/// the other.
#[derive(Debug, Clone, Copy, Default)]
pub struct MdnsSd;

fn new_daemon(interface: Option<&str>) -> Result<ServiceDaemon> {
    let daemon = ServiceDaemon::new()?;
    if let Some(name) = interface {
        daemon.disable_interface(IfKind::All)?;
        daemon.enable_interface(name)?;
    }
    Ok(daemon)
}

impl Discovery for MdnsSd {
    fn browse(
        &self,
        service_type: &str,
        domain: &str,
        iface: Option<&BindInterface>,
    ) -> Result<BrowseSession> {
        let daemon = new_daemon(iface.map(|i| i.name.as_str()))?;
        let ty_domain = service_domain(service_type, domain);

        let events = match daemon.browse(&ty_domain) {
            Ok(events) => events,
            Err(e) => {
                let _ = daemon.shutdown();
                return Err(e.into());
            }
        };

        let (tx, rx) = flume::unbounded();
        tokio::spawn(async move {
            // Ends when the daemon shuts down or the session is dropped
            while let Ok(event) = events.recv_async().await {
                match event {
                    ServiceEvent::ServiceResolved(info) => {
                        let entry = convert_service_info(&info);
                        tracing::debug!(
                            "Instance: {}, HostName: {}, AddrIPv4: {:?}, AddrIPv6: {:?}",
                            entry.instance,
                            entry.hostname,
                            entry.ipv4,
                            entry.ipv6
                        );
                        if tx.send(entry).is_err() {
                            break;
                        }
                    }
                    other => tracing::trace!("Ignoring browse event {:?}", other),
                }
            }
        });

        Ok(BrowseSession::new(rx).on_drop(move || {
            let _ = daemon.stop_browse(&ty_domain);
            if let Err(e) = daemon.shutdown() {
                tracing::debug!("Failed to shut down browse daemon: {}", e);
            }
        }))
    }

    fn register_proxy(&self, service: &ProxyService) -> Result<Registration> {
        let daemon = new_daemon(service.interface.as_deref())?;
        let ty_domain = service_domain(&service.service_type, &service.domain);

        let addresses = service
            .addresses
            .iter()
            .map(IpAddr::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let properties: HashMap<String, String> = service.txt.clone().into_iter().collect();

        let info = ServiceInfo::new(
            &ty_domain,
            &service.instance,
            &service.hostname,
            addresses.as_str(),
            service.port,
            properties,
        )?;
        let fullname = info.get_fullname().to_string();

        daemon.register(info)?;

        let name = fullname.clone();
        Ok(Registration::new(fullname, move || {
            daemon.unregister(&name)?;
            daemon.shutdown()?;
            Ok(())
        }))
    }
}

/// Owned copy of a resolved service
fn convert_service_info(info: &ServiceInfo) -> ServiceEntry {
    let fullname = info.get_fullname();
    let instance = fullname
        .strip_suffix(info.get_type())
        .map(|s| s.trim_end_matches('.'))
        .unwrap_or(fullname)
        .to_string();

    let mut ipv4 = Vec::new();
    let mut ipv6 = Vec::new();
    for addr in info.get_addresses() {
        match addr {
            IpAddr::V4(v4) => ipv4.push(*v4),
            IpAddr::V6(v6) => ipv6.push(*v6),
        }
    }
    // The library hands back a set; sort so "first address" is stable
    ipv4.sort();
    ipv6.sort();

    let txt = info
        .get_properties()
        .iter()
        .map(|prop| (prop.key().to_string(), prop.val_str().to_string()))
        .collect();

    ServiceEntry {
        instance,
        hostname: info.get_hostname().to_string(),
        ipv4,
        ipv6,
        port: info.get_port(),
        txt,
        observed_at: Utc::now(),
    }
}
