//! Save-data store resolution.
//!
//! A named store is adopted as-is. Without a name the deployment keeps the
//! store it created earlier, or creates a fresh one.

use anyhow::{Context, Result};

use crate::application::ports::StoreCatalog;
use crate::domain::error::ResolutionError;
use crate::domain::placement::Hint;
use crate::domain::save_store::{SaveStore, StorePlan, generate_store_name};

/// Inputs for store resolution.
#[derive(Debug, Clone, Copy)]
pub struct StoreRequest<'a> {
    pub hint: &'a Hint<String>,
    /// Store this deployment created on a previous run, if any.
    pub owned: Option<&'a SaveStore>,
    pub prefix: &'a str,
    pub transition_after_days: u32,
}

/// Decides what to do about the store without changing anything.
///
/// # Errors
///
/// Returns [`ResolutionError::StoreNotFound`] if an explicitly named store
/// does not exist.
pub async fn plan_store(catalog: &impl StoreCatalog, request: StoreRequest<'_>) -> Result<StorePlan> {
    match request.hint {
        Hint::Explicit(name) => {
            let found = catalog
                .find_store(name)
                .await
                .with_context(|| format!("looking up save store {name}"))?
                .ok_or_else(|| ResolutionError::StoreNotFound(name.clone()))?;
            tracing::info!(store = %name, versioned = found.versioned, "adopting existing save store");
            Ok(StorePlan::Adopt(SaveStore::adopted(found)))
        }
        Hint::Default => {
            if let Some(owned) = request.owned {
                if catalog
                    .find_store(&owned.name)
                    .await
                    .with_context(|| format!("looking up save store {}", owned.name))?
                    .is_some()
                {
                    tracing::info!(store = %owned.name, "keeping save store owned by this deployment");
                    return Ok(StorePlan::Keep(owned.clone()));
                }
                tracing::warn!(store = %owned.name, "previously created save store is gone; creating a new one");
            }
            let store = SaveStore::owned(
                generate_store_name(request.prefix),
                request.transition_after_days,
            );
            tracing::info!(store = %store.name, "new save store planned");
            Ok(StorePlan::Create(store))
        }
    }
}

/// Carries out a plan: creates the store if the plan says so.
///
/// # Errors
///
/// Returns an error if creating the store fails.
pub async fn realize(catalog: &impl StoreCatalog, plan: StorePlan) -> Result<SaveStore> {
    if let StorePlan::Create(store) = &plan {
        catalog
            .create_store(store)
            .await
            .with_context(|| format!("creating save store {}", store.name))?;
        tracing::info!(store = %store.name, "save store created");
    }
    Ok(plan.into_store())
}

/// Plans and realizes in one step.
///
/// # Errors
///
/// See [`plan_store`] and [`realize`].
pub async fn resolve(catalog: &impl StoreCatalog, request: StoreRequest<'_>) -> Result<SaveStore> {
    let plan = plan_store(catalog, request).await?;
    realize(catalog, plan).await
}
