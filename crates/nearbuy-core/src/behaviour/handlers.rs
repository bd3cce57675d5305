use std::collections::BTreeMap;

use serde::Serialize;

use super::config::{BehaviourConfig, QuickSnackConfig};
use super::{Behaviour, BehaviourContext, BehaviourError, BehaviourKind, SectionSpec, ShopQuery};
use crate::card::{ShopCard, ShopRecord};
use crate::geo::{distance_km, GeoPoint, Precision};
use crate::ranking::{rank, FilterCriteria, SortKey};

fn mismatch(expected: BehaviourKind, section: &SectionSpec) -> BehaviourError {
    BehaviourError::InvalidConfig {
        kind: expected,
        reason: format!("section carries a {} config", section.kind()),
    }
}

/// Radius-bounded and distance-sorted when located, upstream order otherwise.
fn located_criteria(ctx: &BehaviourContext<'_>) -> FilterCriteria {
    FilterCriteria {
        origin: ctx.origin,
        radius_km: ctx.origin.map(|_| ctx.radius_km),
        sort: if ctx.origin.is_some() {
            SortKey::Distance
        } else {
            SortKey::Relevance
        },
        ..FilterCriteria::default()
    }
}

/// Every active shop, nearest first.
#[derive(Debug, Default)]
pub struct NearMe;

impl Behaviour for NearMe {
    fn plan(
        &self,
        section: &SectionSpec,
        ctx: &BehaviourContext<'_>,
    ) -> Result<Option<ShopQuery>, BehaviourError> {
        if !matches!(section.config, BehaviourConfig::NearMe(_)) {
            return Err(mismatch(BehaviourKind::NearMe, section));
        }
        Ok(Some(ShopQuery {
            within: ctx.bounding_box(),
            ..ShopQuery::default()
        }))
    }

    fn rank(
        &self,
        shops: Vec<ShopRecord>,
        _section: &SectionSpec,
        ctx: &BehaviourContext<'_>,
    ) -> Result<Vec<ShopCard>, BehaviourError> {
        Ok(rank(&shops, &located_criteria(ctx), ctx.now).cards)
    }
}

/// Active shops of the section's main category, with distances but no radius.
#[derive(Debug, Default)]
pub struct CategoryBased;

impl Behaviour for CategoryBased {
    fn plan(
        &self,
        section: &SectionSpec,
        _ctx: &BehaviourContext<'_>,
    ) -> Result<Option<ShopQuery>, BehaviourError> {
        if !matches!(section.config, BehaviourConfig::CategoryBased(_)) {
            return Err(mismatch(BehaviourKind::CategoryBased, section));
        }
        Ok(section.main_category_id.map(|id| ShopQuery {
            category_id: Some(id),
            ..ShopQuery::default()
        }))
    }

    fn rank(
        &self,
        shops: Vec<ShopRecord>,
        _section: &SectionSpec,
        ctx: &BehaviourContext<'_>,
    ) -> Result<Vec<ShopCard>, BehaviourError> {
        let criteria = FilterCriteria {
            origin: ctx.origin,
            ..FilterCriteria::default()
        };
        Ok(rank(&shops, &criteria, ctx.now).cards)
    }
}

/// Shops serving the section's chips, with menus narrowed to those chips.
#[derive(Debug, Default)]
pub struct QuickSnack;

impl QuickSnack {
    fn config<'s>(section: &'s SectionSpec) -> Result<&'s QuickSnackConfig, BehaviourError> {
        match &section.config {
            BehaviourConfig::QuickSnack(c) => Ok(c),
            _ => Err(mismatch(BehaviourKind::QuickSnack, section)),
        }
    }

    fn targets(config: &QuickSnackConfig, ctx: &BehaviourContext<'_>) -> Vec<String> {
        match ctx.category {
            Some(category) => vec![category.to_string()],
            None => config.chips.clone(),
        }
    }
}

impl Behaviour for QuickSnack {
    fn plan(
        &self,
        section: &SectionSpec,
        ctx: &BehaviourContext<'_>,
    ) -> Result<Option<ShopQuery>, BehaviourError> {
        let config = Self::config(section)?;
        Ok(Some(ShopQuery {
            menu_categories: Self::targets(config, ctx),
            with_available_menu: true,
            within: ctx.bounding_box(),
            ..ShopQuery::default()
        }))
    }

    fn rank(
        &self,
        mut shops: Vec<ShopRecord>,
        section: &SectionSpec,
        ctx: &BehaviourContext<'_>,
    ) -> Result<Vec<ShopCard>, BehaviourError> {
        let config = Self::config(section)?;
        let targets = Self::targets(config, ctx);

        for shop in &mut shops {
            shop.menus.retain(|m| {
                m.is_available
                    && (targets.is_empty()
                        || m.category_name
                            .as_deref()
                            .is_some_and(|c| targets.iter().any(|t| t == c)))
            });
        }
        shops.retain(|s| !s.menus.is_empty());

        let criteria = FilterCriteria {
            min_rating: config.min_rating.filter(|r| *r > 0.0),
            ..located_criteria(ctx)
        };
        Ok(rank(&shops, &criteria, ctx.now).cards)
    }
}

/// Shops matching a fixed text query.
#[derive(Debug, Default)]
pub struct CustomQuery;

impl Behaviour for CustomQuery {
    fn plan(
        &self,
        section: &SectionSpec,
        ctx: &BehaviourContext<'_>,
    ) -> Result<Option<ShopQuery>, BehaviourError> {
        let BehaviourConfig::CustomQuery(config) = &section.config else {
            return Err(mismatch(BehaviourKind::CustomQuery, section));
        };
        Ok(Some(ShopQuery {
            text: Some(config.query.trim().to_string()),
            within: ctx.bounding_box(),
            ..ShopQuery::default()
        }))
    }

    fn rank(
        &self,
        shops: Vec<ShopRecord>,
        section: &SectionSpec,
        ctx: &BehaviourContext<'_>,
    ) -> Result<Vec<ShopCard>, BehaviourError> {
        let BehaviourConfig::CustomQuery(config) = &section.config else {
            return Err(mismatch(BehaviourKind::CustomQuery, section));
        };
        let criteria = FilterCriteria {
            sort: config.sort_by,
            ..located_criteria(ctx)
        };
        Ok(rank(&shops, &criteria, ctx.now).cards)
    }
}

/// Sections rendered purely by the client. Never fetches.
#[derive(Debug, Default)]
pub struct StaticSection;

impl Behaviour for StaticSection {
    fn plan(
        &self,
        _section: &SectionSpec,
        _ctx: &BehaviourContext<'_>,
    ) -> Result<Option<ShopQuery>, BehaviourError> {
        Ok(None)
    }

    fn rank(
        &self,
        _shops: Vec<ShopRecord>,
        _section: &SectionSpec,
        _ctx: &BehaviourContext<'_>,
    ) -> Result<Vec<ShopCard>, BehaviourError> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuCategoryCount {
    pub name: String,
    pub item_count: usize,
}

/// Candidate query for [`quick_snack_categories`].
#[must_use]
pub fn quick_snack_category_query(config: &QuickSnackConfig) -> ShopQuery {
    ShopQuery {
        menu_categories: config.chips.clone(),
        with_available_menu: true,
        ..ShopQuery::default()
    }
}

/// Counts available menu items per category across shops that meet the
/// section's rating and, when both sides are located, the radius.
///
/// Shops without coordinates are kept. Names are trimmed and the result is
/// sorted by name.
#[must_use]
pub fn quick_snack_categories(
    shops: &[ShopRecord],
    config: &QuickSnackConfig,
    origin: Option<GeoPoint>,
    radius_km: f64,
) -> Vec<MenuCategoryCount> {
    let min_rating = config.min_rating.unwrap_or(0.0);
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();

    let eligible = shops.iter().filter(|shop| {
        if shop.avg_rating.unwrap_or(0.0) < min_rating {
            return false;
        }
        let Some(from) = origin else {
            return true;
        };
        distance_km(
            Some(from.lat),
            Some(from.lng),
            shop.latitude,
            shop.longitude,
            Precision::Hundredths,
        )
        .is_none_or(|d| d <= radius_km)
    });

    for item in eligible.flat_map(|s| s.menus.iter()).filter(|m| m.is_available) {
        let Some(name) = item.category() else {
            continue;
        };
        if !config.chips.is_empty() && !config.chips.iter().any(|c| c == name) {
            continue;
        }
        *counts.entry(name).or_default() += 1;
    }

    counts
        .into_iter()
        .map(|(name, item_count)| MenuCategoryCount {
            name: name.to_string(),
            item_count,
        })
        .collect()
}
