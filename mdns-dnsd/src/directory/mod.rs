pub mod hash;

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use shared::types::ServiceEntry;

/// Counts from one reconcile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
}

impl ReconcileReport {
    pub fn changed(&self) -> bool {
        self.added + self.updated + self.removed > 0
    }
}

/// Rewritten hostname -> last observed entry.
///
/// Clones share the same map. The browse loop is the only writer and goes
/// through [`Directory::reconcile`]; everything else reads.
#[derive(Clone, Default)]
pub struct Directory {
    hosts: Arc<RwLock<HashMap<String, ServiceEntry>>>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact, case-insensitive lookup of a fully-qualified name
    pub fn lookup(&self, name: &str) -> Option<ServiceEntry> {
        let hosts = self.hosts.read().unwrap_or_else(PoisonError::into_inner);
        hosts.get(&name.to_ascii_lowercase()).cloned()
    }

    /// Copy of the whole directory
    pub fn snapshot(&self) -> HashMap<String, ServiceEntry> {
        self.hosts.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn len(&self) -> usize {
        self.hosts.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// SHA-256 over the stable contents, see [`hash::compute_hash`]
    pub fn fingerprint(&self) -> String {
        let hosts = self.hosts.read().unwrap_or_else(PoisonError::into_inner);
        hash::compute_hash(&hosts)
    }

    /// Replace the contents with `observed`.
    ///
    /// The write lock is held from the first removal to the last upsert, so
    /// readers see either the previous browse or this one.
    pub fn reconcile(&self, observed: HashMap<String, ServiceEntry>) -> ReconcileReport {
        let observed: HashMap<String, ServiceEntry> = observed
            .into_iter()
            .map(|(name, entry)| (name.to_ascii_lowercase(), entry))
            .collect();

        let mut report = ReconcileReport::default();
        let mut hosts = self.hosts.write().unwrap_or_else(PoisonError::into_inner);

        hosts.retain(|name, _| {
            let keep = observed.contains_key(name);
            if !keep {
                tracing::info!("Directory: delete {}", name);
                report.removed += 1;
            }
            keep
        });

        for (name, entry) in observed {
            match hosts.get(&name) {
                None => {
                    tracing::info!("Directory: add {}", name);
                    report.added += 1;
                }
                Some(old) if old.data_differs(&entry) => {
                    tracing::info!("Directory: update {}", name);
                    report.updated += 1;
                }
                Some(_) => {}
            }
            hosts.insert(name, entry);
        }

        report
    }
}
