use std::collections::HashMap;
use std::fmt;

use super::handlers::{CategoryBased, CustomQuery, NearMe, QuickSnack, StaticSection};
use super::{Behaviour, BehaviourContext, BehaviourError, BehaviourKind, SectionSpec, ShopSource};
use crate::card::ShopCard;

/// Maps each [`BehaviourKind`] to the handler that serves it.
///
/// Built once at startup and shared read-only across requests.
pub struct BehaviourRegistry {
    handlers: HashMap<BehaviourKind, Box<dyn Behaviour>>,
}

impl BehaviourRegistry {
    /// A registry with no handlers.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// A registry with the built-in handler for every kind.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(BehaviourKind::NearMe, NearMe);
        registry.register(BehaviourKind::CategoryBased, CategoryBased);
        registry.register(BehaviourKind::QuickSnack, QuickSnack);
        registry.register(BehaviourKind::CustomQuery, CustomQuery);
        registry.register(BehaviourKind::Static, StaticSection);
        registry
    }

    /// Registers `handler` for `kind`, returning the handler it replaced.
    pub fn register(
        &mut self,
        kind: BehaviourKind,
        handler: impl Behaviour + 'static,
    ) -> Option<Box<dyn Behaviour>> {
        tracing::debug!(behaviour = %kind, "registered behaviour handler");
        self.handlers.insert(kind, Box::new(handler))
    }

    /// Checks that every kind has a handler.
    ///
    /// # Errors
    ///
    /// Returns [`BehaviourError::MissingHandler`] for the first uncovered kind.
    pub fn validate(&self) -> Result<(), BehaviourError> {
        match BehaviourKind::ALL
            .into_iter()
            .find(|k| !self.handlers.contains_key(k))
        {
            Some(missing) => Err(BehaviourError::MissingHandler(missing)),
            None => Ok(()),
        }
    }

    /// # Errors
    ///
    /// Returns [`BehaviourError::MissingHandler`] when `kind` is unregistered.
    pub fn get(&self, kind: BehaviourKind) -> Result<&dyn Behaviour, BehaviourError> {
        self.handlers
            .get(&kind)
            .map(Box::as_ref)
            .ok_or(BehaviourError::MissingHandler(kind))
    }

    /// Plans, fetches and ranks the shops for `section`.
    ///
    /// # Errors
    ///
    /// Returns [`BehaviourError::MissingHandler`] for an unregistered kind,
    /// [`BehaviourError::InvalidConfig`] when the handler rejects the section,
    /// and [`BehaviourError::Source`] when the fetch fails.
    pub async fn dispatch<S: ShopSource>(
        &self,
        source: &S,
        section: &SectionSpec,
        ctx: &BehaviourContext<'_>,
    ) -> Result<Vec<ShopCard>, BehaviourError> {
        let handler = self.get(section.kind())?;

        let Some(query) = handler.plan(section, ctx)? else {
            return Ok(Vec::new());
        };

        let shops = source
            .fetch_shops(&query)
            .await
            .map_err(|e| BehaviourError::Source(Box::new(e)))?;

        tracing::debug!(
            section_id = %section.id,
            behaviour = %section.kind(),
            fetched = shops.len(),
            "dispatching section"
        );

        handler.rank(shops, section, ctx)
    }
}

impl Default for BehaviourRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for BehaviourRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self.handlers.keys().map(|k| k.as_str()).collect();
        kinds.sort_unstable();
        f.debug_struct("BehaviourRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}
