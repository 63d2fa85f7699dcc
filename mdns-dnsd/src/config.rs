use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::Deserialize;
use anyhow::{Context, Result};
use shared::protocol::WORKSTATION_SERVICE_TYPE;
use crate::error::Error;
use crate::mdns::browser::BrowseSettings;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mdns: MdnsConfig,
    #[serde(default)]
    pub dns: DnsConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub hook: HookConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MdnsConfig {
    /// Domain discovered hosts are served under
    pub domain: String,
    /// Instance-name substring; empty matches everything
    #[serde(default)]
    pub filter: String,
    /// Empty means the default-route interface
    #[serde(default)]
    pub interface: String,
    /// Overrides the name derived from the system hostname
    #[serde(default)]
    pub public_name: Option<String>,
    #[serde(default = "default_service_type")]
    pub service_type: String,
    #[serde(default = "default_browse_interval")]
    pub browse_interval_secs: u64,
    #[serde(default = "default_browse_timeout")]
    pub browse_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DnsConfig {
    #[serde(default = "default_dns_listen")]
    pub listen: String,
    #[serde(default = "default_ttl")]
    pub ttl: u32,
    /// Resolver for names outside our domain
    #[serde(default)]
    pub upstream: Option<String>,
    #[serde(default = "default_upstream_timeout")]
    pub upstream_timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiConfig {
    /// Status API is off unless this is set
    #[serde(default)]
    pub listen: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HookConfig {
    #[serde(default = "default_resolv_conf")]
    pub resolv_conf: PathBuf,
    /// Injected into resolv.conf while running; empty leaves it alone
    #[serde(default)]
    pub nameservers: Vec<String>,
}

fn default_service_type() -> String {
    WORKSTATION_SERVICE_TYPE.to_string()
}

// 5 seconds is the smallest TTL downstream caches honour
fn default_browse_interval() -> u64 {
    5
}

fn default_browse_timeout() -> u64 {
    1000
}

fn default_dns_listen() -> String {
    "0.0.0.0:53".to_string()
}

fn default_ttl() -> u32 {
    60
}

fn default_upstream_timeout() -> u64 {
    2000
}

fn default_resolv_conf() -> PathBuf {
    PathBuf::from("/etc/resolv.conf")
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            listen: default_dns_listen(),
            ttl: default_ttl(),
            upstream: None,
            upstream_timeout_ms: default_upstream_timeout(),
        }
    }
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            resolv_conf: default_resolv_conf(),
            nameservers: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(contents)?;
        config.mdns.domain = config.mdns.domain.trim_end_matches('.').to_string();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.mdns.domain.is_empty() {
            return Err(Error::Config("mdns.domain must not be empty".into()));
        }
        if self.mdns.browse_interval_secs == 0 {
            return Err(Error::Config("mdns.browse_interval_secs must be positive".into()));
        }
        if self.mdns.browse_timeout_ms == 0 {
            return Err(Error::Config("mdns.browse_timeout_ms must be positive".into()));
        }
        self.dns_listen()?;
        self.upstream()?;
        self.api_listen()?;
        Ok(())
    }

    pub fn dns_listen(&self) -> Result<SocketAddr, Error> {
        parse_addr("dns.listen", &self.dns.listen)
    }

    pub fn upstream(&self) -> Result<Option<SocketAddr>, Error> {
        self.dns
            .upstream
            .as_deref()
            .map(|addr| parse_addr("dns.upstream", addr))
            .transpose()
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.dns.upstream_timeout_ms)
    }

    pub fn api_listen(&self) -> Result<Option<SocketAddr>, Error> {
        self.api
            .listen
            .as_deref()
            .map(|addr| parse_addr("api.listen", addr))
            .transpose()
    }

    pub fn browse_settings(&self) -> BrowseSettings {
        BrowseSettings {
            service_type: self.mdns.service_type.clone(),
            domain: self.mdns.domain.clone(),
            filter: self.mdns.filter.clone(),
            interface: self.mdns.interface.clone(),
            interval: Duration::from_secs(self.mdns.browse_interval_secs),
            timeout: Duration::from_millis(self.mdns.browse_timeout_ms),
        }
    }
}

fn parse_addr(key: &str, value: &str) -> Result<SocketAddr, Error> {
    value
        .parse()
        .map_err(|e| Error::Config(format!("{} '{}': {}", key, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::parse("[mdns]\ndomain = \"example.com.\"\n").unwrap();

        assert_eq!(config.mdns.domain, "example.com");
        assert_eq!(config.mdns.filter, "");
        assert_eq!(config.mdns.interface, "");
        assert!(config.mdns.public_name.is_none());
        assert_eq!(config.dns.ttl, 60);
        assert_eq!(config.dns_listen().unwrap(), "0.0.0.0:53".parse().unwrap());
        assert!(config.upstream().unwrap().is_none());
        assert!(config.api_listen().unwrap().is_none());
        assert_eq!(config.hook.resolv_conf, PathBuf::from("/etc/resolv.conf"));

        let browse = config.browse_settings();
        assert_eq!(browse.service_type, "_workstation._tcp");
        assert_eq!(browse.interval, Duration::from_secs(5));
        assert_eq!(browse.timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_full_config() {
        let config = Config::parse(
            r#"
            [mdns]
            domain = "lab.example.com"
            filter = "lab"
            interface = "eth1"
            public_name = "host-mgr-lab"
            browse_interval_secs = 10
            browse_timeout_ms = 500

            [dns]
            listen = "127.0.0.1:5353"
            ttl = 30
            upstream = "1.1.1.1:53"

            [api]
            listen = "127.0.0.1:8053"

            [hook]
            resolv_conf = "/tmp/resolv.conf"
            nameservers = ["127.0.0.1"]
            "#,
        )
        .unwrap();

        assert_eq!(config.mdns.filter, "lab");
        assert_eq!(config.mdns.public_name.as_deref(), Some("host-mgr-lab"));
        assert_eq!(config.upstream().unwrap(), Some("1.1.1.1:53".parse().unwrap()));
        assert_eq!(config.upstream_timeout(), Duration::from_secs(2));
        assert_eq!(config.browse_settings().timeout, Duration::from_millis(500));
        assert_eq!(config.hook.nameservers, vec!["127.0.0.1".to_string()]);
    }

    #[test]
    fn test_missing_domain_rejected() {
        assert!(Config::parse("[mdns]\nfilter = \"x\"\n").is_err());
        assert!(Config::parse("[mdns]\ndomain = \".\"\n").is_err());
    }

    #[test]
    fn test_bad_addresses_rejected() {
        let err = Config::parse("[mdns]\ndomain = \"example.com\"\n[dns]\nupstream = \"not-an-addr\"\n")
            .unwrap_err();
        assert!(err.to_string().contains("dns.upstream"));
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(Config::parse("[mdns]\ndomain = \"example.com\"\nbrowse_interval_secs = 0\n").is_err());
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mdns-dnsd.toml");
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("mdns-dnsd.toml"));

        std::fs::write(&path, "[mdns]\ndomain = \"example.com\"\n").unwrap();
        assert_eq!(Config::load(&path).unwrap().mdns.domain, "example.com");
    }
}
