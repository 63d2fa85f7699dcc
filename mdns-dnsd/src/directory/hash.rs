use std::collections::{BTreeMap, HashMap};
use std::net::{Ipv4Addr, Ipv6Addr};
use serde::Serialize;
use sha2::{Sha256, Digest};
use shared::types::ServiceEntry;

/// Only fields that mean something changed; observed_at moves every browse.
#[derive(Serialize)]
struct HashView<'a> {
    name: &'a str,
    instance: &'a str,
    hostname: &'a str,
    ipv4: &'a [Ipv4Addr],
    ipv6: &'a [Ipv6Addr],
    port: u16,
    txt: &'a BTreeMap<String, String>,
}

/// SHA-256 of the directory, sorted by name so map order doesn't matter.
pub fn compute_hash(hosts: &HashMap<String, ServiceEntry>) -> String {
    let mut names: Vec<&String> = hosts.keys().collect();
    names.sort();

    let views: Vec<HashView<'_>> = names
        .into_iter()
        .map(|name| {
            let e = &hosts[name];
            HashView {
                name,
                instance: &e.instance,
                hostname: &e.hostname,
                ipv4: &e.ipv4,
                ipv6: &e.ipv6,
                port: e.port,
                txt: &e.txt,
            }
        })
        .collect();

    // Plain strings, addresses and integers cannot fail to serialize
    let json = serde_json::to_string(&views).unwrap_or_default();

    hex::encode(Sha256::digest(json.as_bytes()))
}
