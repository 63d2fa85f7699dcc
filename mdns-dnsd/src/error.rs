use std::io;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("interface '{0}' not found")]
    InterfaceNotFound(String),

    #[error("default route interface is not found")]
    NoDefaultRoute,

    #[error("interface '{0}' has no address")]
    NoAddress(String),

    #[error("failed to read routing table: {0}")]
    RouteTable(#[source] io::Error),

    #[error("mDNS protocol error: {0}")]
    Protocol(String),

    #[error("malformed discovered name '{0}'")]
    MalformedEntry(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<mdns_sd::Error> for Error {
    fn from(e: mdns_sd::Error) -> Self {
        Error::Protocol(e.to_string())
    }
}
