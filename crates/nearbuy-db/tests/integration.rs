//! Offline unit tests for nearbuy-db pool configuration and row types.
//! These tests do not require a live database connection.

use nearbuy_core::{AppConfig, Environment};
use nearbuy_db::{NewSearchHistory, PoolConfig, SectionRow};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        sections_path: PathBuf::from("./config/sections.yaml"),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        default_search_radius_km: 10.0,
        fallback_radius_km: 15.0,
        fallback_min_results: 5,
        rate_limit_per_minute: 120,
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

/// Compile-time smoke test: confirm that [`SectionRow`] has all expected
/// fields with the correct types. No database required.
#[test]
fn section_row_has_expected_fields() {
    use uuid::Uuid;

    let row = SectionRow {
        id: Uuid::new_v4(),
        key: "near-me".to_string(),
        title: "Near you".to_string(),
        subtitle: None,
        image_url: None,
        kind: "NEAR_ME".to_string(),
        main_category_id: None,
        main_category_name: None,
        main_category_image_url: None,
        config: serde_json::json!({ "maxDistanceKm": 3 }),
        sort_order: 0_i32,
    };

    assert_eq!(row.kind, "NEAR_ME");
    assert_eq!(row.config["maxDistanceKm"], 3);
    assert!(row.main_category_id.is_none());
}

#[test]
fn new_search_history_defaults_to_bare_query() {
    let entry = NewSearchHistory {
        query: "biryani",
        ..NewSearchHistory::default()
    };

    assert_eq!(entry.query, "biryani");
    assert!(entry.target_id.is_none());
    assert!(entry.target_name.is_none());
    assert!(entry.target_type.is_none());
}
