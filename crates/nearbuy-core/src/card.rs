//! Shop records as loaded from storage and the card projection served to clients.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How many menu categories get a featured image on a card.
const FEATURED_MENU_ITEMS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: Uuid,
    pub item_name: String,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub category_name: Option<String>,
    pub image_url: Option<String>,
    pub is_available: bool,
    pub is_quick_snack: bool,
}

impl MenuItem {
    /// Trimmed, non-empty category name.
    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category_name
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRef {
    pub id: Uuid,
    pub name: String,
}

/// A shop with its menu, read-only input to formatting and ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct ShopRecord {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub category: Option<CategoryRef>,
    pub logo_url: Option<String>,
    /// Stored aggregate; never recomputed from reviews here.
    pub avg_rating: Option<f64>,
    pub review_count: Option<i64>,
    /// Free text, usually `"10:00 AM - 9:00 PM"` or `"10:00-21:00"`.
    pub open_hours: Option<String>,
    pub phone_number: Option<String>,
    pub menus: Vec<MenuItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturedMenuItem {
    pub category_name: String,
    pub image_url: Option<String>,
}

/// Client-facing projection of a [`ShopRecord`] plus per-request fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopCard {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub image_url: Option<String>,
    pub category: Option<CategoryRef>,
    pub rating: f64,
    pub reviews_count: i64,
    pub open_hours: Option<String>,
    pub contact_number: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub menu_categories: Vec<String>,
    pub tags: Vec<String>,
    pub featured_menu_items: Vec<FeaturedMenuItem>,
    pub distance_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_saved: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chip_menus: Option<Vec<MenuItem>>,
}

impl ShopCard {
    /// Formats a shop into a card. Only available menu items count towards
    /// prices and categories. `distance_km` is left unset.
    #[must_use]
    pub fn from_record(shop: &ShopRecord) -> Self {
        let available: Vec<&MenuItem> = shop.menus.iter().filter(|m| m.is_available).collect();

        let prices = available.iter().filter_map(|m| m.price);
        let (min_price, max_price) = prices.fold((None, None), |(lo, hi), p| {
            (
                Some(lo.map_or(p, |lo: f64| lo.min(p))),
                Some(hi.map_or(p, |hi: f64| hi.max(p))),
            )
        });

        let mut menu_categories: Vec<String> = Vec::new();
        for item in &available {
            if let Some(name) = item.category() {
                if !menu_categories.iter().any(|c| c == name) {
                    menu_categories.push(name.to_string());
                }
            }
        }

        let tags = shop
            .category
            .iter()
            .map(|c| c.name.clone())
            .chain(menu_categories.iter().cloned())
            .collect();

        let featured_menu_items = menu_categories
            .iter()
            .take(FEATURED_MENU_ITEMS)
            .map(|name| FeaturedMenuItem {
                category_name: name.clone(),
                image_url: available
                    .iter()
                    .find(|m| m.category() == Some(name.as_str()))
                    .and_then(|m| m.image_url.clone()),
            })
            .collect();

        Self {
            id: shop.id,
            name: shop.name.clone(),
            description: shop.description.clone(),
            address: shop.address.clone(),
            city: shop.city.clone(),
            latitude: shop.latitude,
            longitude: shop.longitude,
            image_url: shop.logo_url.clone(),
            category: shop.category.clone(),
            rating: shop.avg_rating.unwrap_or(0.0),
            reviews_count: shop.review_count.unwrap_or(0),
            open_hours: shop.open_hours.clone(),
            contact_number: shop.phone_number.clone(),
            min_price,
            max_price,
            menu_categories,
            tags,
            featured_menu_items,
            distance_km: None,
            is_saved: None,
            chip_menus: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryImage {
    pub name: String,
    pub image_url: Option<String>,
}

/// Pairs each category name with the first menu image found for it across `shops`.
#[must_use]
pub fn category_images(names: &[String], shops: &[ShopRecord]) -> Vec<CategoryImage> {
    names
        .iter()
        .map(|name| CategoryImage {
            name: name.clone(),
            image_url: shops
                .iter()
                .flat_map(|s| s.menus.iter())
                .filter(|m| m.category() == Some(name.as_str()))
                .find_map(|m| m.image_url.clone()),
        })
        .collect()
}
