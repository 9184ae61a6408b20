use serde::{Deserialize, Serialize};
use std::fmt;

/// Transport spoken to an egress point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EgressScheme {
    Http,
    Https,
}

impl EgressScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

/// Where a candidate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EgressOrigin {
    /// The operator's own egress point, always first in a pool
    Preferred,
    /// Parsed from the public listing
    Public,
}

/// A network egress point requests can be routed through
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EgressCandidate {
    /// host:port
    pub address: String,
    pub scheme: EgressScheme,
    pub origin: EgressOrigin,
}

impl EgressCandidate {
    pub fn preferred(address: impl Into<String>, scheme: EgressScheme) -> Self {
        Self {
            address: address.into(),
            scheme,
            origin: EgressOrigin::Preferred,
        }
    }

    /// Public candidates are only ever kept when they support encrypted transport
    pub fn public(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            scheme: EgressScheme::Https,
            origin: EgressOrigin::Public,
        }
    }

    pub fn is_preferred(&self) -> bool {
        self.origin == EgressOrigin::Preferred
    }

    /// Proxy URL handed to the HTTP client, e.g. `http://192.168.101.27:8080`
    ///
    /// A public candidate's `Https` scheme only says it tunnels https targets
    /// via CONNECT; the proxy itself still speaks plain HTTP.
    pub fn proxy_url(&self) -> String {
        let scheme = match self.origin {
            EgressOrigin::Preferred => self.scheme,
            EgressOrigin::Public => EgressScheme::Http,
        };
        format!("{}://{}", scheme.as_str(), self.address)
    }
}

impl fmt::Display for EgressCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let origin = match self.origin {
            EgressOrigin::Preferred => "preferred",
            EgressOrigin::Public => "public",
        };
        write!(f, "{} ({} {})", self.address, origin, self.scheme.as_str())
    }
}
