pub mod app_config;
pub mod behaviour;
pub mod card;
mod config;
pub mod geo;
pub mod hours;
pub mod ranking;
pub mod sections;
pub mod suggest;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use behaviour::{
    Behaviour, BehaviourConfig, BehaviourContext, BehaviourError, BehaviourKind,
    BehaviourRegistry, SectionSpec, ShopQuery, ShopSource,
};
pub use card::{CategoryRef, MenuItem, ShopCard, ShopRecord};
pub use config::{load_app_config, load_app_config_from_env};
pub use geo::{distance_km, BoundingBox, GeoPoint, Precision};
pub use ranking::{
    rank, CriteriaError, FilterCriteria, HoursFilter, PriceRange, RadiusFallback, Ranked, SortKey,
};
pub use sections::{load_sections, SectionDefinition, SectionsFile};
pub use suggest::{merge_suggestions, Suggestion, SuggestionKind};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read sections file {path}: {source}")]
    SectionsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse sections file: {0}")]
    SectionsFileParse(#[from] serde_yaml::Error),

    #[error("sections validation failed: {0}")]
    Validation(String),
}
