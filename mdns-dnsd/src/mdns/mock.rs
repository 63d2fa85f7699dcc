use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use shared::types::ServiceEntry;
use crate::error::{Error, Result};
use crate::iface::BindInterface;
use super::{BrowseSession, Discovery, ProxyService, Registration};

/// What one scripted browse does.
enum Cycle {
    /// Deliver the entries, then stay open until the session is dropped.
    Open(Vec<ServiceEntry>),
    /// Like `Open`, plus more entries sent `after` the browse started.
    Late {
        entries: Vec<ServiceEntry>,
        late: Vec<ServiceEntry>,
        after: Duration,
    },
    /// Deliver the entries, then end the stream.
    Closed(Vec<ServiceEntry>),
    /// Refuse to start.
    Failure(Error),
}

/// Scripted discovery: each browse pops the next prepared cycle. With
/// nothing queued the browse stays open and silent.
#[derive(Clone, Default)]
pub struct MockDiscovery {
    cycles: Arc<Mutex<VecDeque<Cycle>>>,
    pub browsed: Arc<Mutex<Vec<(String, String, Option<String>)>>>,
    pub registered: Arc<Mutex<Vec<ProxyService>>>,
    pub unregistered: Arc<Mutex<Vec<String>>>,
}

impl MockDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, cycle: Cycle) {
        self.cycles.lock().unwrap().push_back(cycle);
    }

    pub fn push_cycle(&self, entries: Vec<ServiceEntry>) {
        self.push(Cycle::Open(entries));
    }

    pub fn push_late(&self, entries: Vec<ServiceEntry>, late: Vec<ServiceEntry>, after: Duration) {
        self.push(Cycle::Late { entries, late, after });
    }

    pub fn push_closed(&self, entries: Vec<ServiceEntry>) {
        self.push(Cycle::Closed(entries));
    }

    pub fn push_failure(&self, message: &str) {
        self.push(Cycle::Failure(Error::Protocol(message.to_string())));
    }
}

impl Discovery for MockDiscovery {
    fn browse(
        &self,
        service_type: &str,
        domain: &str,
        iface: Option<&BindInterface>,
    ) -> Result<BrowseSession> {
        self.browsed.lock().unwrap().push((
            service_type.to_string(),
            domain.to_string(),
            iface.map(|i| i.name.clone()),
        ));

        let cycle = self
            .cycles
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Cycle::Open(Vec::new()));
        let (tx, rx) = flume::unbounded();

        match cycle {
            Cycle::Failure(e) => return Err(e),
            Cycle::Closed(entries) => {
                for entry in entries {
                    tx.send(entry).unwrap();
                }
                return Ok(BrowseSession::new(rx));
            }
            Cycle::Open(entries) => {
                for entry in entries {
                    tx.send(entry).unwrap();
                }
            }
            Cycle::Late { entries, late, after } => {
                for entry in entries {
                    tx.send(entry).unwrap();
                }
                let late_tx = tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    for entry in late {
                        // Receiver is gone once the cycle has finished
                        let _ = late_tx.send(entry);
                    }
                });
            }
        }

        Ok(BrowseSession::new(rx).on_drop(move || drop(tx)))
    }

    fn register_proxy(&self, service: &ProxyService) -> Result<Registration> {
        self.registered.lock().unwrap().push(service.clone());
        let fullname = format!("{}.{}.{}", service.instance, service.service_type, service.domain);
        let unregistered = self.unregistered.clone();
        let name = fullname.clone();
        Ok(Registration::new(fullname, move || {
            unregistered.lock().unwrap().push(name);
            Ok(())
        }))
    }
}
