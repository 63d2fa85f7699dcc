pub mod advertise;
pub mod browser;
pub mod daemon;
#[cfg(test)]
pub mod mock;

use std::collections::BTreeMap;
use std::net::IpAddr;
use shared::types::ServiceEntry;
use crate::error::Result;
use crate::iface::BindInterface;

/// The two things we need from an mDNS implementation.
pub trait Discovery: Send + Sync + 'static {
    /// Start browsing `service_type` in `domain`, restricted to `iface` when
    /// given. Entries stream back on the session until it is dropped.
    fn browse(
        &self,
        service_type: &str,
        domain: &str,
        iface: Option<&BindInterface>,
    ) -> Result<BrowseSession>;

    /// Announce a service on behalf of `service.hostname`.
    fn register_proxy(&self, service: &ProxyService) -> Result<Registration>;
}

/// An in-flight browse. Dropping it tears the browse down.
pub struct BrowseSession {
    entries: flume::Receiver<ServiceEntry>,
    teardown: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl BrowseSession {
    pub fn new(entries: flume::Receiver<ServiceEntry>) -> Self {
        Self { entries, teardown: None }
    }

    pub fn on_drop(mut self, teardown: impl FnOnce() + Send + Sync + 'static) -> Self {
        self.teardown = Some(Box::new(teardown));
        self
    }

    /// Next discovered entry, or `None` once the browse has ended.
    pub async fn next(&self) -> Option<ServiceEntry> {
        self.entries.recv_async().await.ok()
    }
}

impl Drop for BrowseSession {
    fn drop(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

/// A live announcement; call [`Registration::shutdown`] to withdraw it.
pub struct Registration {
    fullname: String,
    unregister: Box<dyn FnOnce() -> Result<()> + Send>,
}

impl Registration {
    pub fn new(fullname: String, unregister: impl FnOnce() -> Result<()> + Send + 'static) -> Self {
        Self {
            fullname,
            unregister: Box::new(unregister),
        }
    }

    pub fn fullname(&self) -> &str {
        &self.fullname
    }

    pub fn shutdown(self) -> Result<()> {
        (self.unregister)()
    }
}

/// A service announced for a host, possibly not this one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyService {
    pub instance: String,
    pub service_type: String,
    pub domain: String,
    pub port: u16,
    pub hostname: String,
    pub addresses: Vec<IpAddr>,
    pub txt: BTreeMap<String, String>,
    pub interface: Option<String>,
}

/// "_workstation._tcp" + "local." -> "_workstation._tcp.local."
pub fn service_domain(service_type: &str, domain: &str) -> String {
    format!("{}.{}", service_type.trim_end_matches('.'), domain.trim_start_matches('.'))
}
