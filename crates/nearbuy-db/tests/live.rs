//! Live integration tests for nearbuy-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/nearbuy-db/`), so `"../../migrations"` resolves to the workspace
//! migration directory.

use nearbuy_core::sections::parse_sections;
use nearbuy_core::{BoundingBox, GeoPoint, ShopQuery, ShopSource, SuggestionKind};
use nearbuy_db::{
    category_suggestions, clear_search_history, delete_search_history, fetch_shops,
    get_active_section, get_shop_detail, list_active_offers, list_active_section_items,
    list_active_sections, list_categories_near, list_primary_images, list_recent_reviews,
    list_recent_searches, list_review_aggregates, list_saved_shops, menu_item_suggestions,
    saved_shop_ids, search_radius_km, seed_sections, shop_suggestions, upsert_search_history,
    DbError, NewSearchHistory, PgShopSource,
};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn insert_category(pool: &sqlx::PgPool, name: &str) -> Uuid {
    sqlx::query_scalar::<_, Uuid>("INSERT INTO main_categories (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap_or_else(|e| panic!("insert_category failed for '{name}': {e}"))
}

async fn insert_shop(
    pool: &sqlx::PgPool,
    name: &str,
    category_id: Option<Uuid>,
    lat: f64,
    lng: f64,
    is_active: bool,
) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO shops (name, city, category_id, latitude, longitude, avg_rating, is_active) \
         VALUES ($1, 'Chennai', $2, $3::float8::numeric, $4::float8::numeric, 4.2, $5) \
         RETURNING id",
    )
    .bind(name)
    .bind(category_id)
    .bind(lat)
    .bind(lng)
    .bind(is_active)
    .fetch_one(pool)
    .await
    .unwrap_or_else(|e| panic!("insert_shop failed for '{name}': {e}"))
}

async fn insert_menu(
    pool: &sqlx::PgPool,
    shop_id: Uuid,
    item_name: &str,
    category_name: &str,
    is_available: bool,
) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO menus (shop_id, item_name, category_name, price, is_available) \
         VALUES ($1, $2, $3, 40.50, $4) RETURNING id",
    )
    .bind(shop_id)
    .bind(item_name)
    .bind(category_name)
    .bind(is_available)
    .fetch_one(pool)
    .await
    .unwrap_or_else(|e| panic!("insert_menu failed for '{item_name}': {e}"))
}

async fn insert_review(pool: &sqlx::PgPool, shop_id: Uuid, rating: i16, is_approved: bool) {
    sqlx::query(
        "INSERT INTO reviews (shop_id, user_id, rating, is_approved) VALUES ($1, $2, $3, $4)",
    )
    .bind(shop_id)
    .bind(Uuid::new_v4())
    .bind(rating)
    .bind(is_approved)
    .execute(pool)
    .await
    .expect("insert_review failed");
}

// ---------------------------------------------------------------------------
// Section 1: Shop loading
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn fetch_shops_skips_inactive_and_loads_available_menus(pool: sqlx::PgPool) {
    let open = insert_shop(&pool, "Open Cafe", None, 13.0827, 80.2707, true).await;
    insert_shop(&pool, "Closed Cafe", None, 13.0827, 80.2707, false).await;
    insert_menu(&pool, open, "Masala Chai", "Tea", true).await;
    insert_menu(&pool, open, "Cold Coffee", "Coffee", false).await;

    let shops = fetch_shops(&pool, &ShopQuery::default())
        .await
        .expect("fetch_shops failed");

    assert_eq!(shops.len(), 1);
    let shop = &shops[0];
    assert_eq!(shop.name, "Open Cafe");
    assert!((shop.latitude.expect("latitude") - 13.0827).abs() < 1e-6);
    assert_eq!(shop.review_count, Some(0));
    assert_eq!(shop.menus.len(), 1, "unavailable items are not loaded");
    assert_eq!(shop.menus[0].item_name, "Masala Chai");
    assert_eq!(shop.menus[0].price, Some(40.5));
}

#[sqlx::test(migrations = "../../migrations")]
async fn fetch_shops_applies_category_and_menu_filters(pool: sqlx::PgPool) {
    let food = insert_category(&pool, "Food").await;
    let tea_shop = insert_shop(&pool, "Tea Stall", Some(food), 13.0, 80.0, true).await;
    let juice_shop = insert_shop(&pool, "Juice Bar", Some(food), 13.0, 80.0, true).await;
    insert_shop(&pool, "Bookstore", None, 13.0, 80.0, true).await;
    insert_menu(&pool, tea_shop, "Ginger Tea", "Tea", true).await;
    insert_menu(&pool, juice_shop, "Mango Juice", "Juice", true).await;

    let by_category = fetch_shops(
        &pool,
        &ShopQuery {
            category_id: Some(food),
            ..ShopQuery::default()
        },
    )
    .await
    .expect("fetch by category failed");
    assert_eq!(by_category.len(), 2);
    assert!(by_category
        .iter()
        .all(|s| s.category.as_ref().is_some_and(|c| c.name == "Food")));

    let by_menu = fetch_shops(
        &pool,
        &ShopQuery {
            menu_categories: vec!["Tea".to_string()],
            ..ShopQuery::default()
        },
    )
    .await
    .expect("fetch by menu category failed");
    assert_eq!(by_menu.len(), 1);
    assert_eq!(by_menu[0].id, tea_shop);

    let with_menu = fetch_shops(
        &pool,
        &ShopQuery {
            with_available_menu: true,
            ..ShopQuery::default()
        },
    )
    .await
    .expect("fetch with menu failed");
    assert_eq!(with_menu.len(), 2, "the bookstore has no menu");
}

#[sqlx::test(migrations = "../../migrations")]
async fn fetch_shops_text_matches_shop_and_menu_fields(pool: sqlx::PgPool) {
    let biryani = insert_shop(&pool, "Royal Biryani House", None, 13.0, 80.0, true).await;
    let bakery = insert_shop(&pool, "Corner Bakery", None, 13.0, 80.0, true).await;
    insert_menu(&pool, bakery, "Chicken Biryani Puff", "Snacks", true).await;
    insert_shop(&pool, "Shoe Mart", None, 13.0, 80.0, true).await;

    let shops = fetch_shops(
        &pool,
        &ShopQuery {
            text: Some("  BIRYANI ".to_string()),
            ..ShopQuery::default()
        },
    )
    .await
    .expect("text fetch failed");

    let mut ids: Vec<Uuid> = shops.iter().map(|s| s.id).collect();
    ids.sort();
    let mut expected = vec![biryani, bakery];
    expected.sort();
    assert_eq!(ids, expected);
}

#[sqlx::test(migrations = "../../migrations")]
async fn fetch_shops_text_treats_wildcards_literally(pool: sqlx::PgPool) {
    insert_shop(&pool, "100% Juice", None, 13.0, 80.0, true).await;
    insert_shop(&pool, "1000 Snacks", None, 13.0, 80.0, true).await;

    let shops = fetch_shops(
        &pool,
        &ShopQuery {
            text: Some("100%".to_string()),
            ..ShopQuery::default()
        },
    )
    .await
    .expect("text fetch failed");

    assert_eq!(shops.len(), 1);
    assert_eq!(shops[0].name, "100% Juice");
}

#[sqlx::test(migrations = "../../migrations")]
async fn fetch_shops_honours_ids_and_bounding_box(pool: sqlx::PgPool) {
    let near = insert_shop(&pool, "Near", None, 13.0827, 80.2707, true).await;
    let far = insert_shop(&pool, "Far", None, 12.9716, 77.5946, true).await;

    let within = fetch_shops(
        &pool,
        &ShopQuery {
            within: Some(BoundingBox::around(GeoPoint::new(13.08, 80.27), 5.0)),
            ..ShopQuery::default()
        },
    )
    .await
    .expect("bbox fetch failed");
    assert_eq!(within.len(), 1);
    assert_eq!(within[0].id, near);

    let by_ids = fetch_shops(
        &pool,
        &ShopQuery {
            ids: Some(vec![far]),
            ..ShopQuery::default()
        },
    )
    .await
    .expect("ids fetch failed");
    assert_eq!(by_ids.len(), 1);
    assert_eq!(by_ids[0].id, far);
}

#[sqlx::test(migrations = "../../migrations")]
async fn pg_shop_source_delegates_to_fetch_shops(pool: sqlx::PgPool) {
    insert_shop(&pool, "Only Shop", None, 13.0, 80.0, true).await;

    let source = PgShopSource::new(&pool);
    let shops = source
        .fetch_shops(&ShopQuery::default())
        .await
        .expect("source fetch failed");

    assert_eq!(shops.len(), 1);
    assert_eq!(shops[0].name, "Only Shop");
}

// ---------------------------------------------------------------------------
// Section 2: Shop detail, reviews and saved shops
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn shop_detail_includes_inactive_shops(pool: sqlx::PgPool) {
    let shop = insert_shop(&pool, "Gone", None, 13.0, 80.0, false).await;

    let detail = get_shop_detail(&pool, shop)
        .await
        .expect("get_shop_detail failed")
        .expect("row should exist");
    assert!(!detail.is_active);

    let missing = get_shop_detail(&pool, Uuid::new_v4())
        .await
        .expect("get_shop_detail failed");
    assert!(missing.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn review_queries_only_count_approved_reviews(pool: sqlx::PgPool) {
    let shop = insert_shop(&pool, "Reviewed", None, 13.0, 80.0, true).await;
    insert_review(&pool, shop, 5, true).await;
    insert_review(&pool, shop, 4, true).await;
    insert_review(&pool, shop, 1, false).await;

    let aggregates = list_review_aggregates(&pool, &[shop])
        .await
        .expect("list_review_aggregates failed");
    assert_eq!(aggregates.len(), 1);
    assert_eq!(aggregates[0].reviews_count, 2);
    assert!((aggregates[0].avg_rating.expect("avg") - 4.5).abs() < 1e-9);

    let recent = list_recent_reviews(&pool, shop, 10)
        .await
        .expect("list_recent_reviews failed");
    assert_eq!(recent.len(), 2);
    assert!(recent.iter().all(|r| r.rating >= 4));
}

#[sqlx::test(migrations = "../../migrations")]
async fn saved_shops_come_back_newest_first(pool: sqlx::PgPool) {
    let user = Uuid::new_v4();
    let older = insert_shop(&pool, "Older", None, 13.0, 80.0, true).await;
    let newer = insert_shop(&pool, "Newer", None, 13.0, 80.0, true).await;
    sqlx::query(
        "INSERT INTO saved_shops (user_id, shop_id, saved_at) VALUES \
         ($1, $2, NOW() - INTERVAL '2 days'), ($1, $3, NOW())",
    )
    .bind(user)
    .bind(older)
    .bind(newer)
    .execute(&pool)
    .await
    .expect("insert saved_shops failed");

    let saved = list_saved_shops(&pool, user)
        .await
        .expect("list_saved_shops failed");
    let order: Vec<Uuid> = saved.iter().map(|r| r.shop_id).collect();
    assert_eq!(order, vec![newer, older]);

    let ids = saved_shop_ids(&pool, user).await.expect("saved_shop_ids failed");
    assert!(ids.contains(&older) && ids.contains(&newer));

    let other = saved_shop_ids(&pool, Uuid::new_v4())
        .await
        .expect("saved_shop_ids failed");
    assert!(other.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn primary_images_and_offers_are_per_shop(pool: sqlx::PgPool) {
    let shop = insert_shop(&pool, "Offers", None, 13.0, 80.0, true).await;
    sqlx::query(
        "INSERT INTO shop_images (shop_id, image_url, is_primary) VALUES \
         ($1, 'https://img/side.jpg', FALSE), ($1, 'https://img/front.jpg', TRUE)",
    )
    .bind(shop)
    .execute(&pool)
    .await
    .expect("insert shop_images failed");
    sqlx::query(
        "INSERT INTO offers (shop_id, title, valid_from, is_active) VALUES \
         ($1, 'Old deal', NOW() - INTERVAL '10 days', TRUE), \
         ($1, 'New deal', NOW(), TRUE), \
         ($1, 'Hidden deal', NOW(), FALSE)",
    )
    .bind(shop)
    .execute(&pool)
    .await
    .expect("insert offers failed");

    let images = list_primary_images(&pool, &[shop])
        .await
        .expect("list_primary_images failed");
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].image_url, "https://img/front.jpg");

    let offers = list_active_offers(&pool, &[shop], 1)
        .await
        .expect("list_active_offers failed");
    assert_eq!(offers.len(), 1);
    assert_eq!(offers[0].title, "New deal");

    let all = list_active_offers(&pool, &[shop], 10)
        .await
        .expect("list_active_offers failed");
    assert_eq!(all.len(), 2, "inactive offers are excluded");
}

// ---------------------------------------------------------------------------
// Section 3: Categories and settings
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn categories_near_only_include_shops_in_box(pool: sqlx::PgPool) {
    let food = insert_category(&pool, "Food").await;
    let books = insert_category(&pool, "Books").await;
    insert_shop(&pool, "Diner", Some(food), 13.0827, 80.2707, true).await;
    insert_shop(&pool, "Library", Some(books), 12.9716, 77.5946, true).await;

    let rows = list_categories_near(&pool, BoundingBox::around(GeoPoint::new(13.08, 80.27), 5.0))
        .await
        .expect("list_categories_near failed");

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "Food");
}

#[sqlx::test(migrations = "../../migrations")]
async fn search_radius_reads_seeded_setting(pool: sqlx::PgPool) {
    let radius = search_radius_km(&pool).await.expect("search_radius_km failed");
    assert_eq!(radius, Some(5.0));

    sqlx::query("UPDATE app_config SET value = 'wide' WHERE key = 'search_radius_km'")
        .execute(&pool)
        .await
        .expect("update app_config failed");
    let radius = search_radius_km(&pool).await.expect("search_radius_km failed");
    assert_eq!(radius, None);
}

// ---------------------------------------------------------------------------
// Section 4: Sections
// ---------------------------------------------------------------------------

const SECTIONS_YAML: &str = r#"
sections:
  - key: near-me
    title: Near you
    type: NEAR_ME
    sort_order: 1
    config:
      maxDistanceKm: 3
  - key: food
    title: Food and dining
    type: CATEGORY_BASED
    main_category: food
    sort_order: 2
  - key: refer
    title: Refer a friend
    type: STATIC
    sort_order: 3
    items:
      - title: Invite friends
      - title: Share the app
"#;

#[sqlx::test(migrations = "../../migrations")]
async fn seed_sections_upserts_and_replaces_items(pool: sqlx::PgPool) {
    let food = insert_category(&pool, "Food").await;
    let file = parse_sections(SECTIONS_YAML).expect("sections should parse");

    let written = seed_sections(&pool, &file.sections)
        .await
        .expect("seed_sections failed");
    assert_eq!(written, 3);
    // Re-seeding is idempotent.
    seed_sections(&pool, &file.sections)
        .await
        .expect("second seed_sections failed");

    let sections = list_active_sections(&pool)
        .await
        .expect("list_active_sections failed");
    let keys: Vec<&str> = sections.iter().map(|s| s.key.as_str()).collect();
    assert_eq!(keys, vec!["near-me", "food", "refer"]);
    assert_eq!(sections[1].main_category_id, Some(food));
    assert_eq!(sections[1].main_category_name.as_deref(), Some("Food"));
    assert_eq!(sections[0].config["maxDistanceKm"], 3);

    let refer = &sections[2];
    let items = list_active_section_items(&pool, &[refer.id])
        .await
        .expect("list_active_section_items failed");
    let titles: Vec<&str> = items[&refer.id].iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, vec!["Invite friends", "Share the app"]);

    let fetched = get_active_section(&pool, refer.id)
        .await
        .expect("get_active_section failed")
        .expect("section should exist");
    assert_eq!(fetched.kind, "STATIC");
}

#[sqlx::test(migrations = "../../migrations")]
async fn seed_sections_rejects_unknown_category_without_writing(pool: sqlx::PgPool) {
    let file = parse_sections(SECTIONS_YAML).expect("sections should parse");

    let err = seed_sections(&pool, &file.sections)
        .await
        .expect_err("seeding should fail without the Food category");
    assert!(matches!(err, DbError::UnknownCategory(ref name) if name == "food"));

    let sections = list_active_sections(&pool)
        .await
        .expect("list_active_sections failed");
    assert!(sections.is_empty());
}

// ---------------------------------------------------------------------------
// Section 5: Search history and suggestions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn search_history_upsert_refreshes_existing_query(pool: sqlx::PgPool) {
    let user = Uuid::new_v4();
    let first = upsert_search_history(
        &pool,
        user,
        &NewSearchHistory {
            query: "biryani ",
            target_id: Some("shop-1"),
            target_name: Some("Royal Biryani"),
            target_type: Some("shop"),
        },
    )
    .await
    .expect("first upsert failed");
    assert_eq!(first.query, "biryani");

    let second = upsert_search_history(
        &pool,
        user,
        &NewSearchHistory {
            query: "biryani",
            ..NewSearchHistory::default()
        },
    )
    .await
    .expect("second upsert failed");

    assert_eq!(second.id, first.id);
    assert_eq!(second.target_name.as_deref(), Some("Royal Biryani"));
    assert!(second.searched_at >= first.searched_at);

    let recent = list_recent_searches(&pool, user, 10)
        .await
        .expect("list_recent_searches failed");
    assert_eq!(recent.len(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn search_history_delete_is_scoped_to_owner(pool: sqlx::PgPool) {
    let owner = Uuid::new_v4();
    let entry = upsert_search_history(
        &pool,
        owner,
        &NewSearchHistory {
            query: "tea",
            ..NewSearchHistory::default()
        },
    )
    .await
    .expect("upsert failed");

    let err = delete_search_history(&pool, Uuid::new_v4(), entry.id)
        .await
        .expect_err("other users cannot delete the entry");
    assert!(matches!(err, DbError::NotFound));

    delete_search_history(&pool, owner, entry.id)
        .await
        .expect("owner delete failed");

    for query in ["a1", "b2", "c3"] {
        upsert_search_history(
            &pool,
            owner,
            &NewSearchHistory {
                query,
                ..NewSearchHistory::default()
            },
        )
        .await
        .expect("upsert failed");
    }
    let removed = clear_search_history(&pool, owner)
        .await
        .expect("clear_search_history failed");
    assert_eq!(removed, 3);
}

#[sqlx::test(migrations = "../../migrations")]
async fn suggestions_match_each_source(pool: sqlx::PgPool) {
    insert_category(&pool, "Pizza Places").await;
    let shop = insert_shop(&pool, "Pizza Corner", None, 13.0, 80.0, true).await;
    insert_menu(&pool, shop, "Paneer Pizza", "Mains", true).await;
    insert_menu(&pool, shop, "Old Pizza", "Mains", false).await;

    let shops = shop_suggestions(&pool, "pizza").await.expect("shops failed");
    assert_eq!(shops.len(), 1);
    assert_eq!(shops[0].kind, SuggestionKind::Shop);

    let categories = category_suggestions(&pool, "pizza")
        .await
        .expect("categories failed");
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].name, "Pizza Places");

    let items = menu_item_suggestions(&pool, "pizza")
        .await
        .expect("menu items failed");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "Paneer Pizza");
    assert_eq!(items[0].shop_id, Some(shop));
}
