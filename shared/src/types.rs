use std::collections::BTreeMap;
use std::net::{Ipv4Addr, Ipv6Addr};
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

/// A single host observed during an mDNS browse.
/// Owned copy of whatever the discovery library handed back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    /// Instance label, e.g. "build-box" from "build-box._workstation._tcp.local."
    pub instance: String,

    /// Hostname in the discovery domain, e.g. "build-box.local."
    pub hostname: String,

    /// IPv4 addresses, sorted
    pub ipv4: Vec<Ipv4Addr>,

    /// IPv6 addresses, sorted
    pub ipv6: Vec<Ipv6Addr>,

    /// Service port
    pub port: u16,

    /// TXT record key-value pairs
    pub txt: BTreeMap<String, String>,

    /// When this entry was received
    pub observed_at: DateTime<Utc>,
}

impl ServiceEntry {
    pub fn first_ipv4(&self) -> Option<Ipv4Addr> {
        self.ipv4.first().copied()
    }

    pub fn first_ipv6(&self) -> Option<Ipv6Addr> {
        self.ipv6.first().copied()
    }

    /// True when anything but the observation time differs.
    pub fn data_differs(&self, other: &ServiceEntry) -> bool {
        self.instance != other.instance
            || self.hostname != other.hostname
            || self.ipv4 != other.ipv4
            || self.ipv6 != other.ipv6
            || self.port != other.port
            || self.txt != other.txt
    }
}
