//! Property-based tests for store naming, policy building and placement.

use std::collections::{BTreeSet, HashSet};

use campfire_cli::domain::DeploymentConfig;
use campfire_cli::domain::placement::{Hint, Subnet, SubnetSelection};
use campfire_cli::domain::save_store::{generate_store_name, is_valid_store_name};
use campfire_cli::domain::security::{PortRule, Protocol, SecurityPolicy};
use proptest::prelude::*;

fn arb_protocol() -> impl Strategy<Value = Protocol> {
    prop_oneof![Just(Protocol::Tcp), Just(Protocol::Udp)]
}

fn arb_rules() -> impl Strategy<Value = BTreeSet<PortRule>> {
    prop::collection::btree_set(
        ("[a-z]{1,8}", 1u16..=u16::MAX, arb_protocol())
            .prop_map(|(name, port, protocol)| PortRule::new(name, port, protocol)),
        0..12,
    )
}

fn arb_subnets() -> impl Strategy<Value = Vec<Subnet>> {
    prop::collection::hash_set("subnet-[0-9a-f]{6}", 1..8).prop_map(|ids| {
        ids.into_iter()
            .map(|id| Subnet {
                id,
                network_id: "vpc-default".to_string(),
                availability_zone: "eu-west-1a".to_string(),
                public: true,
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn generated_store_names_are_valid_and_distinct(prefix in "[A-Za-z0-9 _-]{0,40}") {
        let names: HashSet<String> = (0..16).map(|_| generate_store_name(&prefix)).collect();
        prop_assert_eq!(names.len(), 16);
        for name in &names {
            prop_assert!(is_valid_store_name(name), "invalid name {}", name);
        }
    }

    #[test]
    fn explicit_store_names_are_adopted_verbatim(name in "[a-z0-9][a-z0-9-]{1,40}[a-z0-9]") {
        let mut config = DeploymentConfig::sample();
        config.save_store.name = name.clone();
        prop_assert_eq!(config.store_hint(), Hint::Explicit(name));
    }

    #[test]
    fn policy_has_one_entry_per_rule(rules in arb_rules()) {
        let policy = SecurityPolicy::build("game", &rules);
        prop_assert_eq!(policy.len(), rules.len());
        for rule in &rules {
            prop_assert!(policy.allows(rule.port, rule.protocol));
        }
    }

    #[test]
    fn public_selection_keeps_every_subnet_and_picks_lowest_id(subnets in arb_subnets()) {
        let lowest = subnets.iter().map(|s| s.id.clone()).min();
        let selection = SubnetSelection::public(subnets.clone()).expect("non-empty");
        prop_assert_eq!(Some(selection.placement().id.clone()), lowest);
        prop_assert_eq!(selection.subnets().len(), subnets.len());
    }

    #[test]
    fn config_validation_never_panics(
        threshold in 0u64..100,
        timeout in 0u64..2000,
        size in 0u32..64,
    ) {
        let mut config = DeploymentConfig::sample();
        config.idle.threshold_minutes = threshold;
        config.activation.timeout_seconds = timeout;
        config.instance.storage.root_volume.size_gb = size;
        let valid = threshold > 0 && (1..=900).contains(&timeout) && size > 0;
        prop_assert_eq!(config.validate().is_ok(), valid);
    }
}
