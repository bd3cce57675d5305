use serde::{Deserialize, Serialize};

use super::{BehaviourError, BehaviourKind};
use crate::ranking::SortKey;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NearMeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_distance_km: Option<f64>,
}

/// The category itself comes from the section's main category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CategoryConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_distance_km: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QuickSnackConfig {
    /// Menu category names offered as chips. Empty means every category.
    #[serde(default)]
    pub chips: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_distance_km: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CustomQueryConfig {
    pub query: String,
    #[serde(default)]
    pub sort_by: SortKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_distance_km: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticConfig {}

/// Section config, one variant per behaviour. Serializes as the bare inner object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BehaviourConfig {
    NearMe(NearMeConfig),
    CategoryBased(CategoryConfig),
    QuickSnack(QuickSnackConfig),
    CustomQuery(CustomQueryConfig),
    Static(StaticConfig),
}

impl BehaviourConfig {
    /// Parses and validates a stored JSON config for `kind`. `null` reads as `{}`.
    ///
    /// # Errors
    ///
    /// Returns [`BehaviourError::InvalidConfig`] for unknown fields, wrong types
    /// or out-of-range values.
    pub fn parse(kind: BehaviourKind, raw: &serde_json::Value) -> Result<Self, BehaviourError> {
        let empty = serde_json::Value::Object(serde_json::Map::new());
        let raw = if raw.is_null() { &empty } else { raw };

        let invalid = |e: serde_json::Error| BehaviourError::InvalidConfig {
            kind,
            reason: e.to_string(),
        };

        let config = match kind {
            BehaviourKind::NearMe => {
                BehaviourConfig::NearMe(NearMeConfig::deserialize(raw).map_err(invalid)?)
            }
            BehaviourKind::CategoryBased => {
                BehaviourConfig::CategoryBased(CategoryConfig::deserialize(raw).map_err(invalid)?)
            }
            BehaviourKind::QuickSnack => {
                BehaviourConfig::QuickSnack(QuickSnackConfig::deserialize(raw).map_err(invalid)?)
            }
            BehaviourKind::CustomQuery => {
                BehaviourConfig::CustomQuery(CustomQueryConfig::deserialize(raw).map_err(invalid)?)
            }
            BehaviourKind::Static => {
                BehaviourConfig::Static(StaticConfig::deserialize(raw).map_err(invalid)?)
            }
        };

        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn kind(&self) -> BehaviourKind {
        match self {
            BehaviourConfig::NearMe(_) => BehaviourKind::NearMe,
            BehaviourConfig::CategoryBased(_) => BehaviourKind::CategoryBased,
            BehaviourConfig::QuickSnack(_) => BehaviourKind::QuickSnack,
            BehaviourConfig::CustomQuery(_) => BehaviourKind::CustomQuery,
            BehaviourConfig::Static(_) => BehaviourKind::Static,
        }
    }

    /// Default radius for the section when the request gives none.
    #[must_use]
    pub fn max_distance_km(&self) -> Option<f64> {
        match self {
            BehaviourConfig::NearMe(c) => c.max_distance_km,
            BehaviourConfig::CategoryBased(c) => c.max_distance_km,
            BehaviourConfig::QuickSnack(c) => c.max_distance_km,
            BehaviourConfig::CustomQuery(c) => c.max_distance_km,
            BehaviourConfig::Static(_) => None,
        }
    }

    fn validate(&self) -> Result<(), BehaviourError> {
        let kind = self.kind();
        let invalid = |reason: String| Err(BehaviourError::InvalidConfig { kind, reason });

        if let Some(d) = self.max_distance_km() {
            if !d.is_finite() || d <= 0.0 {
                return invalid(format!("maxDistanceKm must be positive, got {d}"));
            }
        }

        match self {
            BehaviourConfig::QuickSnack(c) => {
                if let Some(r) = c.min_rating {
                    if !(0.0..=5.0).contains(&r) {
                        return invalid(format!("minRating must be between 0 and 5, got {r}"));
                    }
                }
                if c.chips.iter().any(|chip| chip.trim().is_empty()) {
                    return invalid("chips must not contain blank names".to_string());
                }
            }
            BehaviourConfig::CustomQuery(c) if c.query.trim().is_empty() => {
                return invalid("query must be non-empty".to_string());
            }
            _ => {}
        }

        Ok(())
    }
}
