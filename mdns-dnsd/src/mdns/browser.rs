use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use shared::protocol::MDNS_DOMAIN;
use shared::types::ServiceEntry;
use crate::directory::{Directory, ReconcileReport};
use crate::error::{Error, Result};
use crate::iface::{self, BindInterface};
use crate::rewrite::rewrite;
use super::{BrowseSession, Discovery};

#[derive(Debug, Clone)]
pub struct BrowseSettings {
    /// e.g. "_workstation._tcp"
    pub service_type: String,
    /// Domain discovered hosts are moved into
    pub domain: String,
    /// Instance-name substring; empty keeps everything
    pub filter: String,
    /// Interface name; empty means the default route
    pub interface: String,
    pub interval: Duration,
    pub timeout: Duration,
}

type InterfaceResolver = fn(&str) -> Result<BindInterface>;

/// One browse cycle: discover, filter, rewrite, reconcile.
pub struct Browser<D> {
    discovery: D,
    directory: Directory,
    settings: BrowseSettings,
    resolve_interface: InterfaceResolver,
}

impl<D: Discovery> Browser<D> {
    pub fn new(discovery: D, directory: Directory, settings: BrowseSettings) -> Self {
        Self {
            discovery,
            directory,
            settings,
            resolve_interface: iface::resolve,
        }
    }

    #[cfg(test)]
    pub fn with_interface_resolver(mut self, resolver: InterfaceResolver) -> Self {
        self.resolve_interface = resolver;
        self
    }

    /// Run one cycle. On error the directory is left as it was.
    pub async fn run_cycle(&self) -> Result<ReconcileReport> {
        let iface = match (self.resolve_interface)(&self.settings.interface) {
            Ok(iface) => {
                tracing::debug!("Bind to interface '{}'", iface.name);
                Some(iface)
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to find interface for '{}', browsing on all: {}",
                    self.settings.interface,
                    e
                );
                None
            }
        };

        let session = self
            .discovery
            .browse(&self.settings.service_type, MDNS_DOMAIN, iface.as_ref())?;
        let observed = self.collect(&session).await;
        drop(session);

        Ok(self.directory.reconcile(observed?))
    }

    /// Gather entries until the browse timeout, keyed by lowercased rewritten
    /// hostname. A stream that ends before the timeout is a failed browse.
    async fn collect(&self, session: &BrowseSession) -> Result<HashMap<String, ServiceEntry>> {
        let deadline = Instant::now() + self.settings.timeout;
        let mut observed = HashMap::new();

        loop {
            let entry = match tokio::time::timeout_at(deadline, session.next()).await {
                Ok(Some(entry)) => entry,
                Ok(None) => {
                    return Err(Error::Protocol(format!(
                        "browse for {} ended before the timeout",
                        self.settings.service_type
                    )));
                }
                Err(_) => break,
            };

            if !entry.instance.contains(&self.settings.filter) {
                tracing::debug!(
                    "Ignoring entry '{}' because it doesn't match filter '{}'",
                    entry.instance,
                    self.settings.filter
                );
                continue;
            }

            match rewrite(&entry.hostname, &self.settings.domain) {
                Ok(name) => {
                    observed.insert(name.to_ascii_lowercase(), entry);
                }
                Err(e) => tracing::warn!("Skipping instance '{}': {}", entry.instance, e),
            }
        }

        Ok(observed)
    }
}

/// Browse every interval until cancelled. Cycles never overlap.
pub async fn run_browser<D: Discovery>(browser: Browser<D>, cancel: CancellationToken) {
    tracing::info!(
        "Starting mDNS browser for {} every {:?}",
        browser.settings.service_type,
        browser.settings.interval
    );

    loop {
        tokio::select! {
            result = browser.run_cycle() => {
                match result {
                    Ok(report) if report.changed() => tracing::info!(
                        "Directory updated: {} added, {} updated, {} removed, {} hosts",
                        report.added,
                        report.updated,
                        report.removed,
                        browser.directory.len()
                    ),
                    Ok(_) => tracing::debug!("Directory unchanged"),
                    Err(e) => tracing::error!(
                        "Failed to browse {} records: {}",
                        browser.settings.service_type,
                        e
                    ),
                }
            }
            _ = cancel.cancelled() => break,
        }

        tokio::select! {
            _ = tokio::time::sleep(browser.settings.interval) => {}
            _ = cancel.cancelled() => break,
        }
    }

    tracing::info!("mDNS browser shutting down");
}
