//! Behaviour dispatch for suggestion sections.
//!
//! A section names a [`BehaviourKind`] and carries a typed [`BehaviourConfig`].
//! The [`BehaviourRegistry`] maps each kind to a [`Behaviour`] that decides
//! what to fetch from a [`ShopSource`] and how to rank the result.

mod config;
mod handlers;
mod registry;

use std::fmt;
use std::future::Future;
use std::str::FromStr;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::card::{ShopCard, ShopRecord};
use crate::geo::{BoundingBox, GeoPoint};

pub use config::{
    BehaviourConfig, CategoryConfig, CustomQueryConfig, NearMeConfig, QuickSnackConfig,
    StaticConfig,
};
pub use handlers::{
    quick_snack_categories, quick_snack_category_query, CategoryBased, CustomQuery,
    MenuCategoryCount, NearMe, QuickSnack, StaticSection,
};
pub use registry::BehaviourRegistry;

#[derive(Debug, Error)]
pub enum BehaviourError {
    #[error("unknown behaviour: {0}")]
    UnknownBehaviour(String),

    #[error("invalid {kind} config: {reason}")]
    InvalidConfig { kind: BehaviourKind, reason: String },

    #[error("no handler registered for {0}")]
    MissingHandler(BehaviourKind),

    #[error("shop source failed")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BehaviourKind {
    NearMe,
    CategoryBased,
    QuickSnack,
    CustomQuery,
    Static,
}

impl BehaviourKind {
    pub const ALL: [BehaviourKind; 5] = [
        BehaviourKind::NearMe,
        BehaviourKind::CategoryBased,
        BehaviourKind::QuickSnack,
        BehaviourKind::CustomQuery,
        BehaviourKind::Static,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BehaviourKind::NearMe => "NEAR_ME",
            BehaviourKind::CategoryBased => "CATEGORY_BASED",
            BehaviourKind::QuickSnack => "QUICK_SNACK",
            BehaviourKind::CustomQuery => "CUSTOM_QUERY",
            BehaviourKind::Static => "STATIC",
        }
    }
}

impl fmt::Display for BehaviourKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BehaviourKind {
    type Err = BehaviourError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BehaviourKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| BehaviourError::UnknownBehaviour(s.to_string()))
    }
}

/// A suggestion section resolved into its behaviour and typed config.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionSpec {
    pub id: Uuid,
    pub title: String,
    pub main_category_id: Option<Uuid>,
    pub config: BehaviourConfig,
}

impl SectionSpec {
    /// Builds a section from its stored columns.
    ///
    /// # Errors
    ///
    /// Returns [`BehaviourError::UnknownBehaviour`] for an unrecognised type and
    /// [`BehaviourError::InvalidConfig`] when the config does not match it.
    pub fn from_parts(
        id: Uuid,
        title: String,
        kind: &str,
        main_category_id: Option<Uuid>,
        config: &serde_json::Value,
    ) -> Result<Self, BehaviourError> {
        let kind: BehaviourKind = kind.parse()?;
        Ok(Self {
            id,
            title,
            main_category_id,
            config: BehaviourConfig::parse(kind, config)?,
        })
    }

    #[must_use]
    pub fn kind(&self) -> BehaviourKind {
        self.config.kind()
    }
}

/// Per-request inputs shared by every behaviour.
#[derive(Debug, Clone, Copy)]
pub struct BehaviourContext<'a> {
    pub origin: Option<GeoPoint>,
    pub radius_km: f64,
    /// Narrows a quick-snack section to a single chip.
    pub category: Option<&'a str>,
    pub now: NaiveTime,
}

impl BehaviourContext<'_> {
    fn bounding_box(&self) -> Option<BoundingBox> {
        self.origin
            .map(|origin| BoundingBox::around(origin, self.radius_km))
    }
}

/// Predicates for loading candidate shops. Active-only is implied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShopQuery {
    pub category_id: Option<Uuid>,
    /// Shops must have an available item in one of these categories.
    pub menu_categories: Vec<String>,
    /// Shops must have at least one available item.
    pub with_available_menu: bool,
    /// Case-insensitive substring over shop text fields and menu items.
    pub text: Option<String>,
    pub ids: Option<Vec<Uuid>>,
    pub within: Option<BoundingBox>,
}

/// Persistence collaborator that loads shops with their menus.
pub trait ShopSource: Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn fetch_shops(
        &self,
        query: &ShopQuery,
    ) -> impl Future<Output = Result<Vec<ShopRecord>, Self::Error>> + Send;
}

/// One strategy for producing a section's shop list.
pub trait Behaviour: Send + Sync {
    /// What to fetch. `Ok(None)` skips the fetch and yields no shops.
    ///
    /// # Errors
    ///
    /// Returns [`BehaviourError::InvalidConfig`] when the section's config
    /// belongs to another behaviour.
    fn plan(
        &self,
        section: &SectionSpec,
        ctx: &BehaviourContext<'_>,
    ) -> Result<Option<ShopQuery>, BehaviourError>;

    /// Filters and orders the fetched shops.
    ///
    /// # Errors
    ///
    /// Same as [`Behaviour::plan`].
    fn rank(
        &self,
        shops: Vec<ShopRecord>,
        section: &SectionSpec,
        ctx: &BehaviourContext<'_>,
    ) -> Result<Vec<ShopCard>, BehaviourError>;
}

#[cfg(test)]
#[path = "behaviour_test.rs"]
mod tests;
