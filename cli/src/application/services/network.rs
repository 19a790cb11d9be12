//! Network placement resolution.
//!
//! An explicit identifier resolves to exactly that resource or fails; it
//! never falls back to a default.

use anyhow::{Context, Result};

use crate::application::ports::NetworkDirectory;
use crate::domain::error::ResolutionError;
use crate::domain::placement::{Hint, NetworkContext, PlacementSpec, SubnetSelection};

/// Resolves `placement` to a concrete network and subnet selection.
///
/// # Errors
///
/// Returns a [`ResolutionError`] if an explicit network or subnet does not
/// exist, if there is no default network, or if the network has no public
/// subnet.
pub async fn resolve(
    directory: &impl NetworkDirectory,
    placement: &PlacementSpec,
) -> Result<NetworkContext> {
    let network = match &placement.network {
        Hint::Explicit(id) => directory
            .find_network(id)
            .await
            .with_context(|| format!("looking up network {id}"))?
            .ok_or_else(|| ResolutionError::NetworkNotFound(id.clone()))?,
        Hint::Default => directory
            .default_network()
            .await
            .context("looking up default network")?
            .ok_or(ResolutionError::NoDefaultNetwork)?,
    };

    let subnets = directory
        .subnets(&network.id)
        .await
        .with_context(|| format!("listing subnets of {}", network.id))?;

    let selection = match &placement.subnet {
        Hint::Explicit(wanted) => {
            let subnet = subnets
                .into_iter()
                .find(|s| s.id == wanted.id && s.availability_zone == wanted.availability_zone)
                .ok_or_else(|| ResolutionError::SubnetNotFound {
                    id: wanted.id.clone(),
                    availability_zone: wanted.availability_zone.clone(),
                    network: network.id.clone(),
                })?;
            SubnetSelection::Explicit { subnet }
        }
        Hint::Default => SubnetSelection::public(subnets.into_iter().filter(|s| s.public).collect())
            .ok_or_else(|| ResolutionError::NoPublicSubnet(network.id.clone()))?,
    };

    tracing::info!(
        network = %network.id,
        explicit_network = !placement.network.is_default(),
        subnet = %selection.placement().id,
        explicit_subnet = !placement.subnet.is_default(),
        "network placement resolved"
    );
    Ok(NetworkContext {
        network,
        subnets: selection,
    })
}
