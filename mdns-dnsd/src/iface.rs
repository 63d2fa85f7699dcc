use std::net::IpAddr;
use std::path::Path;
use crate::error::{Error, Result};

const ROUTE_TABLE: &str = "/proc/net/route";

/// A network interface and the addresses assigned to it, in system order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindInterface {
    pub name: String,
    pub addrs: Vec<IpAddr>,
}

impl BindInterface {
    pub fn first_address(&self) -> Option<IpAddr> {
        self.addrs.first().copied()
    }
}

/// Resolve the interface mDNS traffic should be bound to.
///
/// An empty `name` means the interface holding the IPv4 default route.
pub fn resolve(name: &str) -> Result<BindInterface> {
    resolve_with_table(name, ROUTE_TABLE)
}

pub fn resolve_with_table(name: &str, route_table: impl AsRef<Path>) -> Result<BindInterface> {
    if !name.is_empty() {
        return by_name(name);
    }

    let table = std::fs::read_to_string(route_table).map_err(Error::RouteTable)?;
    let default = default_route_interface(&table).ok_or(Error::NoDefaultRoute)?;
    by_name(default)
}

/// First interface in a `/proc/net/route` dump whose destination is 0.0.0.0.
pub fn default_route_interface(table: &str) -> Option<&str> {
    table.lines().find_map(|line| {
        let mut fields = line.split_whitespace();
        let iface = fields.next()?;
        (fields.next()? == "00000000").then_some(iface)
    })
}

fn by_name(name: &str) -> Result<BindInterface> {
    let addrs: Vec<IpAddr> = if_addrs::get_if_addrs()?
        .into_iter()
        .filter(|iface| iface.name == name)
        .map(|iface| iface.ip())
        .collect();

    if addrs.is_empty() {
        return Err(Error::InterfaceNotFound(name.to_string()));
    }

    Ok(BindInterface {
        name: name.to_string(),
        addrs,
    })
}
