//! Save-data store model.
//!
//! A store is either *adopted* (named in config, looked up, never touched) or
//! *owned* (created by this deployment, versioned, retained forever).

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::ids::random_hex;

pub const DEFAULT_TRANSITION_DAYS: u32 = 30;
pub const RETENTION_RULE_ID: &str = "SaveFileRetention";

#[allow(clippy::expect_used)] // pattern is a compile-time constant
static STORE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9.-]{1,61}[a-z0-9]$").expect("valid store name regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreLifecycle {
    /// Pre-existing; this deployment only reads its policy.
    Adopted,
    /// Created by this deployment.
    Owned,
}

impl fmt::Display for StoreLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Adopted => "adopted",
            Self::Owned => "owned",
        })
    }
}

/// What happens to the store when the deployment goes away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPolicy {
    /// Never deleted by this system.
    Retain,
    /// Not managed by this deployment at all.
    Unmanaged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StorageClass {
    IntelligentTiering,
    StandardIa,
    Glacier,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub storage_class: StorageClass,
    pub after_days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleRule {
    pub id: String,
    pub enabled: bool,
    pub transitions: Vec<Transition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveStore {
    pub name: String,
    pub lifecycle: StoreLifecycle,
    pub versioned: bool,
    pub retention: RetentionPolicy,
    #[serde(default)]
    pub lifecycle_rules: Vec<LifecycleRule>,
}

impl SaveStore {
    /// A new store owned by this deployment: versioned, retained forever,
    /// with a single rule moving every object to intelligent tiering after
    /// `transition_after_days`.
    #[must_use]
    pub fn owned(name: impl Into<String>, transition_after_days: u32) -> Self {
        Self {
            name: name.into(),
            lifecycle: StoreLifecycle::Owned,
            versioned: true,
            retention: RetentionPolicy::Retain,
            lifecycle_rules: vec![LifecycleRule {
                id: RETENTION_RULE_ID.to_string(),
                enabled: true,
                transitions: vec![Transition {
                    storage_class: StorageClass::IntelligentTiering,
                    after_days: transition_after_days,
                }],
            }],
        }
    }

    /// Wraps a store found in the catalog. Its policy is kept exactly as
    /// recorded.
    #[must_use]
    pub fn adopted(mut found: SaveStore) -> Self {
        found.lifecycle = StoreLifecycle::Adopted;
        found.retention = RetentionPolicy::Unmanaged;
        found
    }

    #[must_use]
    pub fn is_owned(&self) -> bool {
        self.lifecycle == StoreLifecycle::Owned
    }

    /// Resource name used in role grants.
    #[must_use]
    pub fn arn(&self) -> String {
        store_arn(&self.name)
    }
}

#[must_use]
pub fn store_arn(name: &str) -> String {
    format!("arn:aws:s3:::{name}")
}

/// Outcome of store planning, before anything is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "store", rename_all = "snake_case")]
pub enum StorePlan {
    /// Use the configured, pre-existing store.
    Adopt(SaveStore),
    /// Keep the store this deployment created earlier.
    Keep(SaveStore),
    /// Create a fresh owned store.
    Create(SaveStore),
}

impl StorePlan {
    #[must_use]
    pub fn store(&self) -> &SaveStore {
        match self {
            Self::Adopt(s) | Self::Keep(s) | Self::Create(s) => s,
        }
    }

    #[must_use]
    pub fn into_store(self) -> SaveStore {
        match self {
            Self::Adopt(s) | Self::Keep(s) | Self::Create(s) => s,
        }
    }

    #[must_use]
    pub fn action(&self) -> &'static str {
        match self {
            Self::Adopt(_) => "adopt",
            Self::Keep(_) => "keep",
            Self::Create(_) => "create",
        }
    }
}

/// Whether `name` is a legal store name (3-63 chars, lowercase letters,
/// digits, dots and hyphens, alphanumeric at both ends).
#[must_use]
pub fn is_valid_store_name(name: &str) -> bool {
    STORE_NAME.is_match(name) && !name.contains("..")
}

/// Fresh, globally distinct store name: `<prefix>-saves-<16 hex>`.
#[must_use]
pub fn generate_store_name(prefix: &str) -> String {
    let mut stem: String = prefix
        .chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_alphanumeric() { c } else { '-' }
        })
        .collect();
    stem.truncate(32);
    let stem = stem.trim_matches('-');
    let stem = if stem.is_empty() { "campfire" } else { stem };
    format!("{stem}-saves-{}", random_hex(16))
}
