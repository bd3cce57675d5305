use std::sync::Mutex;

use chrono::NaiveTime;
use serde_json::json;
use uuid::Uuid;

use super::*;
use crate::card::fixtures::{menu, shop};
use crate::card::CategoryRef;

const ORIGIN: GeoPoint = GeoPoint {
    lat: 13.0,
    lng: 80.0,
};

#[derive(Debug, thiserror::Error)]
#[error("store offline")]
struct Offline;

/// Applies the category, chip and text predicates of a [`ShopQuery`] in memory.
#[derive(Default)]
struct MemorySource {
    shops: Vec<ShopRecord>,
    offline: bool,
    queries: Mutex<Vec<ShopQuery>>,
}

impl MemorySource {
    fn new(shops: Vec<ShopRecord>) -> Self {
        Self {
            shops,
            ..Self::default()
        }
    }

    fn fetch_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

impl ShopSource for MemorySource {
    type Error = Offline;

    async fn fetch_shops(&self, query: &ShopQuery) -> Result<Vec<ShopRecord>, Self::Error> {
        self.queries.lock().unwrap().push(query.clone());
        if self.offline {
            return Err(Offline);
        }
        Ok(self
            .shops
            .iter()
            .filter(|s| {
                query
                    .category_id
                    .is_none_or(|id| s.category.as_ref().is_some_and(|c| c.id == id))
            })
            .filter(|s| {
                query.menu_categories.is_empty()
                    || s.menus.iter().any(|m| {
                        m.is_available
                            && m.category_name
                                .as_ref()
                                .is_some_and(|c| query.menu_categories.contains(c))
                    })
            })
            .filter(|s| {
                query.text.as_deref().is_none_or(|t| {
                    let t = t.to_lowercase();
                    s.name.to_lowercase().contains(&t)
                        || s.menus.iter().any(|m| m.item_name.to_lowercase().contains(&t))
                })
            })
            .cloned()
            .collect())
    }
}

fn noon() -> NaiveTime {
    NaiveTime::from_hms_opt(12, 0, 0).unwrap()
}

fn ctx(origin: Option<GeoPoint>, radius_km: f64) -> BehaviourContext<'static> {
    BehaviourContext {
        origin,
        radius_km,
        category: None,
        now: noon(),
    }
}

fn section(kind: &str, config: serde_json::Value) -> SectionSpec {
    SectionSpec::from_parts(Uuid::new_v4(), "Section".to_string(), kind, None, &config).unwrap()
}

fn located(name: &str, km_north: f64) -> ShopRecord {
    let mut s = shop(name);
    s.latitude = Some(ORIGIN.lat + km_north / 111.195);
    s.longitude = Some(ORIGIN.lng);
    s
}

fn names(cards: &[ShopCard]) -> Vec<&str> {
    cards.iter().map(|c| c.name.as_str()).collect()
}

#[test]
fn kinds_parse_from_wire_names() {
    for kind in BehaviourKind::ALL {
        assert_eq!(kind.as_str().parse::<BehaviourKind>().unwrap(), kind);
    }
    assert!(matches!(
        "CUSTOM".parse::<BehaviourKind>(),
        Err(BehaviourError::UnknownBehaviour(ref s)) if s == "CUSTOM"
    ));
}

#[test]
fn section_rejects_unknown_type_without_fallback() {
    let err = SectionSpec::from_parts(Uuid::new_v4(), "x".into(), "TRENDING", None, &json!({}))
        .unwrap_err();
    assert!(matches!(err, BehaviourError::UnknownBehaviour(_)));
}

#[test]
fn config_rejects_unknown_fields_and_bad_values() {
    let err = BehaviourConfig::parse(BehaviourKind::NearMe, &json!({ "radius": 3 })).unwrap_err();
    assert!(matches!(
        err,
        BehaviourError::InvalidConfig {
            kind: BehaviourKind::NearMe,
            ..
        }
    ));

    assert!(BehaviourConfig::parse(BehaviourKind::QuickSnack, &json!({ "minRating": 9 })).is_err());
    assert!(BehaviourConfig::parse(BehaviourKind::CustomQuery, &json!({ "query": "  " })).is_err());
    assert!(BehaviourConfig::parse(BehaviourKind::CustomQuery, &json!({})).is_err());
    assert!(
        BehaviourConfig::parse(BehaviourKind::NearMe, &json!({ "maxDistanceKm": -2 })).is_err()
    );
}

#[test]
fn null_config_reads_as_empty_object() {
    let config = BehaviourConfig::parse(BehaviourKind::Static, &serde_json::Value::Null).unwrap();
    assert_eq!(config, BehaviourConfig::Static(StaticConfig {}));
}

#[test]
fn config_serializes_as_bare_object() {
    let config = BehaviourConfig::parse(
        BehaviourKind::QuickSnack,
        &json!({ "chips": ["Tea"], "minRating": 4.0 }),
    )
    .unwrap();
    assert_eq!(
        serde_json::to_value(&config).unwrap(),
        json!({ "chips": ["Tea"], "minRating": 4.0 })
    );
}

#[test]
fn default_registry_covers_every_kind() {
    assert!(BehaviourRegistry::with_defaults().validate().is_ok());
}

#[test]
fn empty_registry_reports_missing_handler() {
    let mut registry = BehaviourRegistry::empty();
    registry.register(BehaviourKind::NearMe, NearMe);
    assert!(matches!(
        registry.validate(),
        Err(BehaviourError::MissingHandler(BehaviourKind::CategoryBased))
    ));
}

#[tokio::test]
async fn near_me_filters_by_radius_and_sorts_by_distance() {
    let source = MemorySource::new(vec![
        located("mid", 4.0),
        located("far", 12.0),
        shop("nowhere"),
        located("near", 1.0),
    ]);
    let registry = BehaviourRegistry::with_defaults();

    let cards = registry
        .dispatch(&source, &section("NEAR_ME", json!({})), &ctx(Some(ORIGIN), 7.0))
        .await
        .unwrap();

    assert_eq!(names(&cards), vec!["near", "mid"]);
    let query = source.queries.lock().unwrap()[0].clone();
    assert!(query.within.is_some());
}

#[tokio::test]
async fn near_me_without_location_keeps_upstream_order() {
    let source = MemorySource::new(vec![located("b", 12.0), shop("a"), located("c", 1.0)]);
    let cards = BehaviourRegistry::with_defaults()
        .dispatch(&source, &section("NEAR_ME", json!(null)), &ctx(None, 7.0))
        .await
        .unwrap();
    assert_eq!(names(&cards), vec!["b", "a", "c"]);
    assert!(cards.iter().all(|c| c.distance_km.is_none()));
}

#[tokio::test]
async fn category_section_without_main_category_skips_fetch() {
    let source = MemorySource::new(vec![shop("a")]);
    let cards = BehaviourRegistry::with_defaults()
        .dispatch(&source, &section("CATEGORY_BASED", json!({})), &ctx(None, 7.0))
        .await
        .unwrap();
    assert!(cards.is_empty());
    assert_eq!(source.fetch_count(), 0);
}

#[tokio::test]
async fn category_section_restricts_to_main_category() {
    let food = CategoryRef {
        id: Uuid::new_v4(),
        name: "Food".to_string(),
    };
    let mut diner = located("diner", 20.0);
    diner.category = Some(food.clone());
    let mut salon = shop("salon");
    salon.category = Some(CategoryRef {
        id: Uuid::new_v4(),
        name: "Beauty".to_string(),
    });
    let source = MemorySource::new(vec![diner, salon]);

    let spec = SectionSpec::from_parts(
        Uuid::new_v4(),
        "Food".to_string(),
        "CATEGORY_BASED",
        Some(food.id),
        &json!({}),
    )
    .unwrap();
    let cards = BehaviourRegistry::with_defaults()
        .dispatch(&source, &spec, &ctx(Some(ORIGIN), 7.0))
        .await
        .unwrap();

    // no radius for category sections, but distance is still annotated
    assert_eq!(names(&cards), vec!["diner"]);
    assert!(cards[0].distance_km.is_some());
}

#[tokio::test]
async fn quick_snack_narrows_menus_and_applies_min_rating() {
    let mut tea_stall = located("tea stall", 1.0);
    tea_stall.avg_rating = Some(4.5);
    tea_stall.menus = vec![
        menu("Masala Chai", Some("Tea"), Some(15.0)),
        menu("Thali", Some("Meals"), Some(120.0)),
    ];
    let mut low_rated = located("low rated", 2.0);
    low_rated.avg_rating = Some(3.0);
    low_rated.menus = vec![menu("Green Tea", Some("Tea"), Some(30.0))];
    let mut unavailable = located("sold out", 0.5);
    unavailable.avg_rating = Some(5.0);
    let mut gone = menu("Iced Tea", Some("Tea"), Some(50.0));
    gone.is_available = false;
    unavailable.menus = vec![gone, menu("Samosa", Some("Snacks"), Some(20.0))];

    let source = MemorySource::new(vec![tea_stall, low_rated, unavailable]);
    let spec = section("QUICK_SNACK", json!({ "chips": ["Tea", "Snacks"], "minRating": 4.0 }));
    let mut context = ctx(Some(ORIGIN), 5.0);
    context.category = Some("Tea");

    let cards = BehaviourRegistry::with_defaults()
        .dispatch(&source, &spec, &context)
        .await
        .unwrap();

    assert_eq!(names(&cards), vec!["tea stall"]);
    assert_eq!(cards[0].menu_categories, vec!["Tea"]);
    assert_eq!(cards[0].max_price, Some(15.0));
    let query = source.queries.lock().unwrap()[0].clone();
    assert_eq!(query.menu_categories, vec!["Tea"]);
    assert!(query.with_available_menu);
}

#[tokio::test]
async fn custom_query_sorts_by_configured_key() {
    let mut a = shop("Biryani House");
    a.avg_rating = Some(3.9);
    let mut b = shop("Royal Biryani");
    b.avg_rating = Some(4.7);
    let c = shop("Dosa Corner");
    let source = MemorySource::new(vec![a, b, c]);

    let spec = section("CUSTOM_QUERY", json!({ "query": "biryani", "sortBy": "rating" }));
    let cards = BehaviourRegistry::with_defaults()
        .dispatch(&source, &spec, &ctx(None, 7.0))
        .await
        .unwrap();

    assert_eq!(names(&cards), vec!["Royal Biryani", "Biryani House"]);
}

#[tokio::test]
async fn static_section_never_fetches() {
    let source = MemorySource::new(vec![shop("a")]);
    let cards = BehaviourRegistry::with_defaults()
        .dispatch(&source, &section("STATIC", json!({})), &ctx(Some(ORIGIN), 7.0))
        .await
        .unwrap();
    assert!(cards.is_empty());
    assert_eq!(source.fetch_count(), 0);
}

#[tokio::test]
async fn source_failures_surface_as_source_errors() {
    let source = MemorySource {
        offline: true,
        ..MemorySource::default()
    };
    let err = BehaviourRegistry::with_defaults()
        .dispatch(&source, &section("NEAR_ME", json!({})), &ctx(None, 7.0))
        .await
        .unwrap_err();
    assert!(matches!(err, BehaviourError::Source(_)));
}

#[tokio::test]
async fn handler_registered_under_wrong_kind_is_rejected() {
    let mut registry = BehaviourRegistry::with_defaults();
    registry.register(BehaviourKind::NearMe, QuickSnack);
    let source = MemorySource::new(vec![shop("a")]);
    let err = registry
        .dispatch(&source, &section("NEAR_ME", json!({})), &ctx(None, 7.0))
        .await
        .unwrap_err();
    assert!(matches!(err, BehaviourError::InvalidConfig { .. }));
}

#[test]
fn quick_snack_categories_count_items_within_radius() {
    let mut near = located("near", 1.0);
    near.menus = vec![
        menu("Chai", Some(" Tea "), None),
        menu("Coffee", Some("Coffee"), None),
        menu("Samosa", Some("Snacks"), None),
    ];
    let mut far = located("far", 30.0);
    far.menus = vec![menu("Lemon Tea", Some("Tea"), None)];
    let mut unlocated = shop("unlocated");
    unlocated.menus = vec![menu("Kachori", Some("Snacks"), None)];

    let config = QuickSnackConfig {
        chips: vec!["Tea".to_string(), "Snacks".to_string()],
        ..QuickSnackConfig::default()
    };
    let counts = quick_snack_categories(&[near, far, unlocated], &config, Some(ORIGIN), 5.0);

    assert_eq!(
        counts,
        vec![
            MenuCategoryCount {
                name: "Snacks".to_string(),
                item_count: 2
            },
            MenuCategoryCount {
                name: "Tea".to_string(),
                item_count: 1
            },
        ]
    );
}

#[test]
fn quick_snack_category_query_requires_available_chip_items() {
    let config = QuickSnackConfig {
        chips: vec!["Tea".to_string()],
        ..QuickSnackConfig::default()
    };
    let query = quick_snack_category_query(&config);
    assert_eq!(query.menu_categories, vec!["Tea"]);
    assert!(query.with_available_menu);
    assert!(query.within.is_none());
}
