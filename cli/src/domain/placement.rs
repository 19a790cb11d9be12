//! Network placement: hints from config and the resolved context.

use serde::{Deserialize, Serialize};

/// An optional identifier that is either given explicitly or left to the
/// platform default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Hint<T> {
    Explicit(T),
    Default,
}

impl<T> Hint<T> {
    #[must_use]
    pub fn as_explicit(&self) -> Option<&T> {
        match self {
            Self::Explicit(v) => Some(v),
            Self::Default => None,
        }
    }

    #[must_use]
    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }
}

impl Hint<String> {
    /// Empty or whitespace-only config values mean "use the default".
    #[must_use]
    pub fn from_config(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Self::Default
        } else {
            Self::Explicit(trimmed.to_string())
        }
    }
}

/// An explicit subnet: only meaningful as a pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetRef {
    pub id: String,
    pub availability_zone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementSpec {
    pub network: Hint<String>,
    pub subnet: Hint<SubnetRef>,
}

impl PlacementSpec {
    /// Builds a placement from raw config strings.
    ///
    /// A subnet id without an availability zone (or the reverse) is dropped:
    /// both halves fall back to the default public subnets.
    #[must_use]
    pub fn from_config(network: &str, subnet_id: &str, availability_zone: &str) -> Self {
        let subnet = match (
            Hint::from_config(subnet_id),
            Hint::from_config(availability_zone),
        ) {
            (Hint::Explicit(id), Hint::Explicit(availability_zone)) => Hint::Explicit(SubnetRef {
                id,
                availability_zone,
            }),
            (Hint::Default, Hint::Default) => Hint::Default,
            (id, az) => {
                tracing::warn!(
                    subnet_id = ?id.as_explicit(),
                    availability_zone = ?az.as_explicit(),
                    "subnet id and availability zone must be set together; ignoring both"
                );
                Hint::Default
            }
        };
        Self {
            network: Hint::from_config(network),
            subnet,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub id: String,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subnet {
    pub id: String,
    pub network_id: String,
    pub availability_zone: String,
    /// Routes to the internet and assigns public addresses.
    #[serde(default)]
    pub public: bool,
}

/// Which subnets the instance may be placed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubnetSelection {
    /// Exactly the configured subnet.
    Explicit { subnet: Subnet },
    /// Every public subnet of the network, sorted by id. Never empty.
    Public { primary: Subnet, others: Vec<Subnet> },
}

impl SubnetSelection {
    /// Public selection from a list; `None` if the list has no entries.
    #[must_use]
    pub fn public(mut subnets: Vec<Subnet>) -> Option<Self> {
        subnets.sort_by(|a, b| a.id.cmp(&b.id));
        let mut iter = subnets.into_iter();
        let primary = iter.next()?;
        Some(Self::Public {
            primary,
            others: iter.collect(),
        })
    }

    /// The subnet the instance lands in.
    #[must_use]
    pub fn placement(&self) -> &Subnet {
        match self {
            Self::Explicit { subnet } => subnet,
            Self::Public { primary, .. } => primary,
        }
    }

    #[must_use]
    pub fn subnets(&self) -> Vec<&Subnet> {
        match self {
            Self::Explicit { subnet } => vec![subnet],
            Self::Public { primary, others } => {
                std::iter::once(primary).chain(others.iter()).collect()
            }
        }
    }
}

/// Resolved network placement. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkContext {
    pub network: Network,
    pub subnets: SubnetSelection,
}

impl NetworkContext {
    #[must_use]
    pub fn placement_subnet(&self) -> &Subnet {
        self.subnets.placement()
    }
}
