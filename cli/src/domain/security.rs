//! Firewall policy derived from the configured port list.
//!
//! Pure functions only. The policy contains exactly one ingress entry per
//! configured rule and nothing else.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Any IPv4 source.
pub const ANY_IPV4: &str = "0.0.0.0/0";

pub const DEFAULT_POLICY_DESCRIPTION: &str = "Allow game clients to connect to the server";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named port the game server listens on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortRule {
    pub name: String,
    pub port: u16,
    pub protocol: Protocol,
}

impl PortRule {
    #[must_use]
    pub fn new(name: impl Into<String>, port: u16, protocol: Protocol) -> Self {
        Self {
            name: name.into(),
            port,
            protocol,
        }
    }
}

/// One allow entry of the policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    pub source: String,
    pub port: u16,
    pub protocol: Protocol,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityPolicy {
    pub description: String,
    pub ingress: Vec<IngressRule>,
}

impl SecurityPolicy {
    /// Maps every rule to an ingress entry open to any IPv4 source.
    #[must_use]
    pub fn build(description: &str, rules: &BTreeSet<PortRule>) -> Self {
        let ingress = rules
            .iter()
            .map(|rule| IngressRule {
                source: ANY_IPV4.to_string(),
                port: rule.port,
                protocol: rule.protocol,
                description: format!("{} port", rule.name),
            })
            .collect();
        Self {
            description: description.to_string(),
            ingress,
        }
    }

    #[must_use]
    pub fn allows(&self, port: u16, protocol: Protocol) -> bool {
        self.ingress
            .iter()
            .any(|r| r.port == port && r.protocol == protocol)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ingress.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ingress.is_empty()
    }
}
