//! Ownership chain walk

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::Instrument;

use super::ControllerFetcher;
use super::error::{FetchError, FetchResult};
use super::generic::{GenericResolver, ResourceMappingResolver, ScaleSubresourceClient};
use super::well_known::{ObjectCache, WellKnownResolver};
use crate::models::{ControllerKeyWithApiVersion, WellKnownKinds};

/// Resolves top-level controllers by following controlling owners to the root
///
/// Each step dispatches on kind: enabled well-known kinds are answered by
/// [`WellKnownResolver`], everything else by [`GenericResolver`].
#[derive(Clone)]
pub struct OwnershipWalker {
    well_known_kinds: WellKnownKinds,
    well_known: WellKnownResolver,
    generic: GenericResolver,
}

impl OwnershipWalker {
    pub fn new(
        well_known_kinds: WellKnownKinds,
        cache: Arc<dyn ObjectCache>,
        mapper: Arc<dyn ResourceMappingResolver>,
        scales: Arc<dyn ScaleSubresourceClient>,
    ) -> Self {
        Self {
            well_known_kinds,
            well_known: WellKnownResolver::new(cache),
            generic: GenericResolver::new(mapper, scales),
        }
    }

    /// Controlling owner of `key`, or `None` if `key` is a root
    pub async fn parent_of(
        &self,
        key: &ControllerKeyWithApiVersion,
    ) -> FetchResult<Option<ControllerKeyWithApiVersion>> {
        match self.well_known_kinds.lookup(key.kind()) {
            Some(kind) => self.well_known.parent_of(kind, key),
            None => self.generic.parent_of(key).await,
        }
    }

    async fn walk(
        &self,
        start: ControllerKeyWithApiVersion,
    ) -> FetchResult<Option<ControllerKeyWithApiVersion>> {
        let mut visited = HashSet::new();
        let mut current = start;

        loop {
            // Mark on becoming current, so a self-reference or 2-cycle is seen on the next lookup
            visited.insert(current.clone());

            let Some(owner) = self.parent_of(&current).await? else {
                tracing::debug!(
                    root = %current,
                    hops = visited.len() - 1,
                    "found top-level controller"
                );
                return Ok(Some(current));
            };

            if visited.contains(&owner) {
                return Err(FetchError::CycleDetected { key: owner });
            }

            tracing::trace!(from = %current, to = %owner, "following controlling owner");
            current = owner;
        }
    }
}

#[async_trait]
impl ControllerFetcher for OwnershipWalker {
    async fn find_top_level(
        &self,
        key: Option<ControllerKeyWithApiVersion>,
    ) -> FetchResult<Option<ControllerKeyWithApiVersion>> {
        let Some(start) = key else {
            return Ok(None);
        };

        let span = tracing::debug_span!("find_top_level", start = %start);
        self.walk(start).instrument(span).await
    }
}
