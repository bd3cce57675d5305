//! Type-ahead suggestions merged from shop, category and menu-item matches.

use std::collections::HashSet;

use serde::Serialize;
use uuid::Uuid;

/// Shortest query that triggers a lookup.
pub const MIN_QUERY_CHARS: usize = 2;
pub const MAX_SUGGESTIONS: usize = 10;

pub const SHOP_LIMIT: i64 = 5;
pub const CATEGORY_LIMIT: i64 = 3;
pub const MENU_ITEM_LIMIT: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    Shop,
    Category,
    MenuItem,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shop_id: Option<Uuid>,
}

/// Trimmed query, or `None` when it is too short to look up.
#[must_use]
pub fn normalize_query(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim)
        .filter(|q| q.chars().count() >= MIN_QUERY_CHARS)
}

/// Concatenates the three lookups in priority order, drops later entries whose
/// name repeats an earlier one (case-insensitive), and caps the list.
#[must_use]
pub fn merge_suggestions(
    shops: Vec<Suggestion>,
    categories: Vec<Suggestion>,
    menu_items: Vec<Suggestion>,
) -> Vec<Suggestion> {
    let mut seen = HashSet::new();
    shops
        .into_iter()
        .chain(categories)
        .chain(menu_items)
        .filter(|s| seen.insert(s.name.to_lowercase()))
        .take(MAX_SUGGESTIONS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suggestion(name: &str, kind: SuggestionKind) -> Suggestion {
        Suggestion {
            id: Uuid::new_v4(),
            name: name.to_string(),
            kind,
            shop_id: None,
        }
    }

    #[test]
    fn short_queries_are_ignored() {
        assert_eq!(normalize_query(None), None);
        assert_eq!(normalize_query(Some(" a ")), None);
        assert_eq!(normalize_query(Some("  pi ")), Some("pi"));
    }

    #[test]
    fn merge_prefers_shops_and_dedupes_case_insensitively() {
        let merged = merge_suggestions(
            vec![suggestion("Pizza Hut", SuggestionKind::Shop)],
            vec![suggestion("Pizza", SuggestionKind::Category)],
            vec![
                suggestion("pizza hut", SuggestionKind::MenuItem),
                suggestion("Pizza Puff", SuggestionKind::MenuItem),
            ],
        );
        let names: Vec<_> = merged.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Pizza Hut", "Pizza", "Pizza Puff"]);
        assert_eq!(merged[0].kind, SuggestionKind::Shop);
    }

    #[test]
    fn merge_caps_at_ten() {
        let shops = (0..5)
            .map(|i| suggestion(&format!("shop {i}"), SuggestionKind::Shop))
            .collect();
        let categories = (0..3)
            .map(|i| suggestion(&format!("cat {i}"), SuggestionKind::Category))
            .collect();
        let items = (0..5)
            .map(|i| suggestion(&format!("item {i}"), SuggestionKind::MenuItem))
            .collect();
        let merged = merge_suggestions(shops, categories, items);
        assert_eq!(merged.len(), MAX_SUGGESTIONS);
        assert_eq!(merged.last().unwrap().name, "item 1");
    }

    #[test]
    fn menu_item_suggestions_serialize_shop_id() {
        let mut s = suggestion("Latte", SuggestionKind::MenuItem);
        let shop = Uuid::new_v4();
        s.shop_id = Some(shop);
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["type"], "menu_item");
        assert_eq!(json["shopId"], shop.to_string());
    }
}
