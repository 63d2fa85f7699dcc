/// Service type browsed for and advertised, without the mDNS domain
pub const WORKSTATION_SERVICE_TYPE: &str = "_workstation._tcp";

/// The only domain mDNS answers for
pub const MDNS_DOMAIN: &str = "local.";

/// Port carried by the self-advertisement
pub const ADVERTISE_PORT: u16 = 12346;

/// Prefix of the default public hostname
pub const PUBLIC_NAME_PREFIX: &str = "host-mgr-";

/// Suffix appended to the instance prefix when advertising this host
pub const PUBLIC_INSTANCE_SUFFIX: &str = "-hostname-public";

/// TXT record key/value pairs attached to the self-advertisement
pub const ADVERTISE_TXT: [(&str, &str); 3] = [("txtv", "0"), ("lo", "1"), ("la", "2")];
